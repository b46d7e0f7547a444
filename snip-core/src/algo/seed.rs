//! Density based choice of the first treatment plant

use std::collections::BTreeMap;

use geo::{BoundingRect, Euclidean, MultiPoint, Point, line_measures::Distance};
use log::info;

use crate::{Error, NodeId, model::AggregatedPoint};

/// Grid cell of the density tiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityCell {
    /// Row counted from the top edge of the bounding box
    pub row: usize,
    /// Column counted from the left edge of the bounding box
    pub col: usize,
    /// Number of aggregated points inside the cell
    pub count: usize,
    pub center: Point<f64>,
}

/// Seed node with the cell it was taken from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedSelection {
    pub node: NodeId,
    pub cell: DensityCell,
}

/// Picks the inlet where network growth starts.
///
/// See [`density_seed`] for the scan and tie-break order.
///
/// # Errors
///
/// [`Error::NoPointsFound`] for an empty point set and
/// [`Error::InvalidParameter`] for a non-positive tile size.
pub fn select_seed(points: &[AggregatedPoint], tile_size: f64) -> Result<NodeId, Error> {
    density_seed(points, tile_size).map(|selection| selection.node)
}

/// Tiles the bounding box of `points` into `tile_size` squares and returns
/// the point of the most populated tile.
///
/// Tiles are scanned row by row from the top (largest y) down, columns left
/// to right; the first tile with the highest count wins. Inside it the point
/// closest to the tile centre wins, then the lower node id.
pub fn density_seed(points: &[AggregatedPoint], tile_size: f64) -> Result<SeedSelection, Error> {
    if !(tile_size.is_finite() && tile_size > 0.0) {
        return Err(Error::parameter(
            "tile_size",
            format!("must be positive, got {tile_size}"),
        ));
    }
    let bounds = points
        .iter()
        .map(|point| point.position)
        .collect::<MultiPoint<f64>>()
        .bounding_rect()
        .ok_or(Error::NoPointsFound)?;
    let (min_x, max_y) = (bounds.min().x, bounds.max().y);

    let mut cells: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for (idx, point) in points.iter().enumerate() {
        let row = tile_index(max_y - point.position.y(), tile_size);
        let col = tile_index(point.position.x() - min_x, tile_size);
        cells.entry((row, col)).or_default().push(idx);
    }

    // BTreeMap iterates in row-major order; strict comparison keeps the first maximum
    let mut best: Option<(&(usize, usize), &Vec<usize>)> = None;
    for (key, members) in &cells {
        if best.is_none_or(|(_, top)| members.len() > top.len()) {
            best = Some((key, members));
        }
    }
    let ((row, col), members) = best.ok_or(Error::NoPointsFound)?;

    #[allow(clippy::cast_precision_loss)]
    let center = Point::new(
        min_x + (*col as f64 + 0.5) * tile_size,
        max_y - (*row as f64 + 0.5) * tile_size,
    );
    let node = members
        .iter()
        .map(|idx| &points[*idx])
        .min_by(|a, b| {
            Euclidean
                .distance(&a.position, &center)
                .total_cmp(&Euclidean.distance(&b.position, &center))
                .then_with(|| a.inlet.cmp(&b.inlet))
        })
        .map(|point| point.inlet)
        .ok_or(Error::NoPointsFound)?;

    let cell = DensityCell {
        row: *row,
        col: *col,
        count: members.len(),
        center,
    };
    info!(
        "Seed {node:?} selected in tile ({}, {}) holding {} of {} points",
        cell.row,
        cell.col,
        cell.count,
        points.len()
    );
    Ok(SeedSelection { node, cell })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tile_index(offset: f64, tile_size: f64) -> usize {
    (offset / tile_size).floor().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use geo::point;
    use rstest::rstest;

    use super::*;

    fn at(node: usize, x: f64, y: f64) -> AggregatedPoint {
        let mut point = AggregatedPoint::new(NodeId::new(node), point!(x: x, y: y), false);
        point.attach(node, 1.0, 0.0);
        point
    }

    #[test]
    fn densest_tile_wins() {
        let points = vec![
            at(0, 0.0, 0.0),
            at(1, 200.0, 200.0),
            at(2, 205.0, 195.0),
            at(3, 210.0, 210.0),
            at(4, 90.0, 40.0),
        ];
        let selection = density_seed(&points, 50.0).unwrap();
        assert_eq!(selection.cell.count, 3);
        assert_eq!(selection.cell.row, 0);
        assert_eq!(selection.cell.col, 4);
        assert_eq!(selection.node, NodeId::new(2));
    }

    #[rstest]
    #[case::top_row_first(vec![at(5, 0.0, 0.0), at(6, 0.0, 100.0)], 6)]
    #[case::left_column_first(vec![at(8, 100.0, 0.0), at(9, 0.0, 0.0)], 9)]
    fn ties_follow_scan_order(#[case] points: Vec<AggregatedPoint>, #[case] expected: usize) {
        assert_eq!(select_seed(&points, 10.0).unwrap(), NodeId::new(expected));
    }

    #[test]
    fn equidistant_points_fall_back_to_node_id() {
        // one tile centred on (10, 10)
        let points = vec![at(11, 0.0, 20.0), at(7, 4.0, 10.0), at(3, 16.0, 10.0)];
        let selection = density_seed(&points, 20.0).unwrap();
        assert_eq!(selection.cell.count, 3);
        assert_eq!(selection.node, NodeId::new(3));
    }

    #[test]
    fn selection_is_repeatable() {
        let points: Vec<AggregatedPoint> = (0..40)
            .map(|i| at(i, f64::from((i * 37 % 11) as u32) * 9.0, f64::from((i * 13 % 7) as u32) * 11.0))
            .collect();
        let first = select_seed(&points, 25.0).unwrap();
        for _ in 0..5 {
            assert_eq!(select_seed(&points, 25.0).unwrap(), first);
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(select_seed(&[], 50.0), Err(Error::NoPointsFound)));
        assert!(matches!(
            select_seed(&[at(0, 0.0, 0.0)], 0.0),
            Err(Error::InvalidParameter { name: "tile_size", .. })
        ));
    }
}
