//! Spatial index over terrain samples

use std::cmp::Ordering;

use geo::{Euclidean, Point, line_measures::Distance};
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::NodeId;

/// Terrain sample stored in the index: elevation and its graph node
pub type TerrainEntry = GeomWithData<Point<f64>, (f64, NodeId)>;

/// R-tree of terrain samples with the detected raster spacing
#[derive(Debug, Clone)]
pub struct TerrainIndex {
    rtree: RTree<TerrainEntry>,
    raster_size: f64,
}

impl TerrainIndex {
    pub fn new(entries: Vec<TerrainEntry>) -> Self {
        let rtree = RTree::bulk_load(entries);
        let raster_size = estimate_raster_size(&rtree);
        Self { rtree, raster_size }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Median spacing between neighbouring samples [m], zero for fewer than two samples
    pub fn raster_size(&self) -> f64 {
        self.raster_size
    }

    /// Elevation of the sample closest to `point`
    pub fn elevation_at(&self, point: &Point<f64>) -> Option<f64> {
        self.rtree.nearest_neighbor(point).map(|entry| entry.data.0)
    }

    /// Terrain nodes within `radius` of `point`, with their positions
    pub fn within(&self, point: Point<f64>, radius: f64) -> Vec<(NodeId, Point<f64>)> {
        let envelope = AABB::from_corners(
            Point::new(point.x() - radius, point.y() - radius),
            Point::new(point.x() + radius, point.y() + radius),
        );
        let mut found: Vec<(NodeId, Point<f64>)> = self
            .rtree
            .locate_in_envelope(&envelope)
            .filter(|entry| Euclidean.distance(entry.geom(), &point) <= radius)
            .map(|entry| (entry.data.1, *entry.geom()))
            .collect();
        found.sort_unstable_by_key(|(node, _)| *node);
        found
    }
}

fn estimate_raster_size(rtree: &RTree<TerrainEntry>) -> f64 {
    let mut spacings: Vec<f64> = rtree
        .iter()
        .filter_map(|entry| {
            rtree
                .nearest_neighbor_iter(entry.geom())
                .map(|other| Euclidean.distance(entry.geom(), other.geom()))
                .find(|distance| *distance > 0.0)
        })
        .collect();

    if spacings.is_empty() {
        return 0.0;
    }
    spacings.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    spacings[spacings.len() / 2]
}
