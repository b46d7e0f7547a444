use geo::{Euclidean, Point, line_measures::Distance};
use hashbrown::HashMap;
use log::{info, trace};
use rstar::{RTree, primitives::GeomWithData};

use crate::{
    Error, NodeId,
    model::{AggregatedPoint, Building, NodeKind, SewerGraph, SewerNode},
};

/// Inlet position stored with its index in the aggregated point list
type IndexedInlet = GeomWithData<Point<f64>, usize>;

/// Snaps buildings onto sewer inlets
///
/// Each building is projected on the closest street segment. Within
/// `threshold` it joins an existing inlet no farther than `threshold` away,
/// otherwise a new inlet is created at the projection, splitting the street
/// edge when the projection falls between vertices. Buildings farther than
/// `threshold` from every street become standalone nodes linked to the
/// terrain mesh.
///
/// # Errors
///
/// Returns [`Error::NoPointsFound`] for an empty building list,
/// [`Error::InvalidParameter`] for a non-positive threshold and
/// [`Error::MalformedInput`] for buildings with non-finite coordinates or a
/// non-positive population.
pub fn aggregate(
    buildings: &[Building],
    mut graph: SewerGraph,
    threshold: f64,
) -> Result<(Vec<AggregatedPoint>, SewerGraph), Error> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(Error::parameter(
            "aggregation_threshold",
            format!("must be positive, got {threshold}"),
        ));
    }
    if buildings.is_empty() {
        return Err(Error::NoPointsFound);
    }

    let mut points: Vec<AggregatedPoint> = Vec::new();
    let mut inlets = RTree::<IndexedInlet>::new();
    let mut point_of_node: HashMap<NodeId, usize> = HashMap::new();
    let mut standalone = 0usize;

    for (idx, building) in buildings.iter().enumerate() {
        validate_building(building)?;
        let position = building.position;

        let snap = graph
            .nearest_street(&position)
            .filter(|snap| snap.distance <= threshold);
        let Some(snap) = snap else {
            let node = standalone_node(&mut graph, building);
            let mut point = AggregatedPoint::new(node, position, true);
            point.attach(idx, building.population, 0.0);
            points.push(point);
            standalone += 1;
            continue;
        };

        let shared = inlets
            .nearest_neighbor(&position)
            .map(|entry| (entry.data, Euclidean.distance(entry.geom(), &position)))
            .filter(|(_, distance)| *distance <= threshold);
        if let Some((point_idx, distance)) = shared {
            trace!("Building {} joins inlet {point_idx} ({distance:.1} m)", building.id);
            points[point_idx].attach(idx, building.population, distance);
            continue;
        }

        let node = graph.inlet_at(&snap)?;
        let inlet_position = graph.position(node);
        let distance = Euclidean.distance(&inlet_position, &position);
        let point_idx = *point_of_node.entry(node).or_insert_with(|| {
            points.push(AggregatedPoint::new(node, inlet_position, false));
            inlets.insert(IndexedInlet::new(inlet_position, points.len() - 1));
            points.len() - 1
        });
        trace!("Building {} drains to inlet {node:?} ({distance:.1} m)", building.id);
        points[point_idx].attach(idx, building.population, distance);
    }

    info!(
        "Aggregated {} buildings onto {} inlets ({standalone} standalone)",
        buildings.len(),
        points.len()
    );
    Ok((points, graph))
}

fn standalone_node(graph: &mut SewerGraph, building: &Building) -> NodeId {
    let elevation = graph
        .elevation_at(&building.position)
        .unwrap_or_default();
    let node = graph.graph.add_node(SewerNode::new(
        building.position,
        elevation,
        NodeKind::Building,
    ));
    let links = graph.link_to_terrain(node);
    trace!(
        "Building {} is away from the streets, linked to {links} terrain samples",
        building.id
    );
    node
}

fn validate_building(building: &Building) -> Result<(), Error> {
    let entity = || format!("building {}", building.id);
    if !(building.position.x().is_finite() && building.position.y().is_finite()) {
        return Err(Error::malformed(entity(), "non-finite coordinate"));
    }
    if !(building.population.is_finite() && building.population > 0.0) {
        return Err(Error::malformed(
            entity(),
            format!("population must be positive, got {}", building.population),
        ));
    }
    Ok(())
}
