use geo::{BoundingRect, Coord, Intersects, MultiPoint, Point, Rect};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info};
use petgraph::graph::UnGraph;
use rstar::RTree;

use crate::{
    Error, NodeId, SNAP_TOLERANCE,
    config::RoutingFactors,
    model::{
        EdgeKind, NodeKind, SewerEdge, SewerGraph, SewerNode, StreetSegment, TerrainIndex,
        TerrainSample, terrain::TerrainEntry,
    },
};

/// Mesh radius as a multiple of the detected terrain raster spacing
const MESH_RADIUS_FACTOR: f64 = 1.5;

/// Builds the routing graph from street centrelines and terrain samples
///
/// Street vertices shared between segments are merged, every vertex takes the
/// elevation of its closest terrain sample and street edges are weighted with
/// `f_street`. Terrain samples form a secondary mesh weighted with `f_topo`,
/// linked to each other and to street vertices within the mesh radius. The
/// assembly only crosses this mesh to reach what the streets do not.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if a layer is empty, contains
/// non-finite or zero-length geometry, or if the layers do not overlap,
/// and [`Error::InvalidParameter`] for routing factors below one.
pub fn build_graph(
    streets: &[StreetSegment],
    terrain: &[TerrainSample],
    routing: &RoutingFactors,
) -> Result<SewerGraph, Error> {
    routing.validate()?;
    validate_terrain(terrain)?;
    validate_streets(streets)?;
    validate_overlap(streets, terrain)?;

    info!(
        "Building sewer graph from {} street segments and {} terrain samples",
        streets.len(),
        terrain.len()
    );

    let mut graph: UnGraph<SewerNode, SewerEdge> =
        UnGraph::with_capacity(terrain.len() + streets.len() * 2, terrain.len() * 4);

    let terrain_entries = terrain
        .iter()
        .map(|sample| {
            let node = graph.add_node(SewerNode::new(
                sample.position,
                sample.elevation,
                NodeKind::Terrain,
            ));
            TerrainEntry::new(sample.position, (sample.elevation, node))
        })
        .collect();
    let terrain_index = TerrainIndex::new(terrain_entries);
    let mesh_radius = routing
        .mesh_radius
        .unwrap_or(terrain_index.raster_size() * MESH_RADIUS_FACTOR);

    let mut vertices: HashMap<(i64, i64), NodeId> = HashMap::new();
    let mut street_pairs = Vec::new();
    for street in streets {
        for (a, b) in street.geometry.coords().tuple_windows() {
            let from = street_vertex(&mut graph, &mut vertices, &terrain_index, *a);
            let to = street_vertex(&mut graph, &mut vertices, &terrain_index, *b);
            if from != to {
                street_pairs.push((from, to));
            }
        }
    }

    let mut sewer_graph = SewerGraph::new(
        graph,
        RTree::new(),
        terrain_index,
        *routing,
        mesh_radius,
    );

    let mut segments = Vec::with_capacity(street_pairs.len());
    for (from, to) in street_pairs {
        if sewer_graph.graph.find_edge(from, to).is_some() {
            continue;
        }
        if sewer_graph.add_edge(from, to, EdgeKind::Street).is_some() {
            segments.push(sewer_graph.segment(from, to));
        }
    }
    let street_edges = segments.len();
    sewer_graph.street_index = RTree::bulk_load(segments);

    let mesh_links = build_terrain_mesh(&mut sewer_graph);

    info!(
        "Sewer graph ready: {} nodes, {street_edges} street edges, {mesh_links} terrain links (mesh radius {mesh_radius:.1} m)",
        sewer_graph.node_count(),
    );
    Ok(sewer_graph)
}

fn street_vertex(
    graph: &mut UnGraph<SewerNode, SewerEdge>,
    vertices: &mut HashMap<(i64, i64), NodeId>,
    terrain: &TerrainIndex,
    coord: Coord<f64>,
) -> NodeId {
    *vertices.entry(vertex_key(coord)).or_insert_with(|| {
        let point = Point::from(coord);
        let elevation = terrain.elevation_at(&point).unwrap_or_default();
        graph.add_node(SewerNode::new(point, elevation, NodeKind::StreetVertex))
    })
}

/// Millimetre grid key merging vertices shared between street segments
#[allow(clippy::cast_possible_truncation)]
fn vertex_key(coord: Coord<f64>) -> (i64, i64) {
    (
        (coord.x * 1000.0).round() as i64,
        (coord.y * 1000.0).round() as i64,
    )
}

fn build_terrain_mesh(graph: &mut SewerGraph) -> usize {
    let mesh_nodes: Vec<NodeId> = graph
        .graph
        .node_indices()
        .filter(|node| {
            matches!(
                graph.graph[*node].kind,
                NodeKind::Terrain | NodeKind::StreetVertex
            )
        })
        .collect();

    let links = mesh_nodes
        .into_iter()
        .map(|node| graph.link_to_terrain(node))
        .sum();
    debug!("Terrain mesh links: {links}");
    links
}

fn validate_terrain(terrain: &[TerrainSample]) -> Result<(), Error> {
    if terrain.is_empty() {
        return Err(Error::malformed("terrain", "no terrain samples"));
    }
    for (idx, sample) in terrain.iter().enumerate() {
        if !(sample.position.x().is_finite()
            && sample.position.y().is_finite()
            && sample.elevation.is_finite())
        {
            return Err(Error::malformed(
                format!("terrain sample {idx}"),
                "non-finite coordinate or elevation",
            ));
        }
    }
    Ok(())
}

fn validate_streets(streets: &[StreetSegment]) -> Result<(), Error> {
    if streets.is_empty() {
        return Err(Error::malformed("streets", "no street segments"));
    }
    for street in streets {
        let entity = || format!("street {}", street.id);
        if street.geometry.0.len() < 2 {
            return Err(Error::malformed(entity(), "fewer than two vertices"));
        }
        if street
            .geometry
            .coords()
            .any(|c| !(c.x.is_finite() && c.y.is_finite()))
        {
            return Err(Error::malformed(entity(), "non-finite coordinate"));
        }
        if street
            .geometry
            .lines()
            .any(|line| line.dx().hypot(line.dy()) < SNAP_TOLERANCE)
        {
            return Err(Error::malformed(entity(), "zero-length segment"));
        }
    }
    Ok(())
}

fn validate_overlap(streets: &[StreetSegment], terrain: &[TerrainSample]) -> Result<(), Error> {
    let street_bounds = streets
        .iter()
        .filter_map(|street| street.geometry.bounding_rect())
        .reduce(merge_rects);
    let terrain_bounds = terrain
        .iter()
        .map(|sample| sample.position)
        .collect::<MultiPoint<f64>>()
        .bounding_rect();

    match (street_bounds, terrain_bounds) {
        (Some(streets), Some(terrain)) if streets.intersects(&terrain) => Ok(()),
        (Some(streets), Some(terrain)) => Err(Error::malformed(
            "streets/terrain",
            format!(
                "layers do not overlap: streets span {:?}-{:?}, terrain spans {:?}-{:?}",
                streets.min(),
                streets.max(),
                terrain.min(),
                terrain.max()
            ),
        )),
        _ => Err(Error::malformed("streets/terrain", "empty extent")),
    }
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}
