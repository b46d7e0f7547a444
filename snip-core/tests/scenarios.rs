use geo::{LineString, point};
use rstest::rstest;
use snip_core::prelude::*;

const FLAT: f64 = 100.0;

fn grid_terrain(
    (x_min, x_max): (f64, f64),
    (y_min, y_max): (f64, f64),
    spacing: f64,
    elevation: impl Fn(f64, f64) -> f64,
) -> Vec<TerrainSample> {
    let mut samples = Vec::new();
    let mut y = y_min;
    while y <= y_max + 1e-9 {
        let mut x = x_min;
        while x <= x_max + 1e-9 {
            samples.push(TerrainSample::new(x, y, elevation(x, y)));
            x += spacing;
        }
        y += spacing;
    }
    samples
}

fn street(id: &str, coords: Vec<(f64, f64)>) -> StreetSegment {
    StreetSegment::new(id, LineString::from(coords))
}

fn house(id: &str, x: f64, y: f64, population: f64) -> Building {
    Building::new(id, point!(x: x, y: y), population)
}

/// Routes stay on streets and nearby houses keep their own inlets
fn street_config() -> SnipConfig {
    let mut config = SnipConfig::default();
    config.algorithm.f_street = 1.0;
    config.algorithm.f_topo = 1.2;
    config.algorithm.f_merge = 1000.0;
    config.algorithm.aggregation_threshold = 6.0;
    config
}

struct Outcome {
    graph: SewerGraph,
    points: Vec<AggregatedPoint>,
    forest: Forest,
    summary: CostSummary,
}

fn plan(
    streets: &[StreetSegment],
    terrain: &[TerrainSample],
    buildings: &[Building],
    config: &SnipConfig,
    seed: Option<usize>,
) -> Outcome {
    let graph = build_graph(streets, terrain, &config.algorithm.routing_factors()).unwrap();
    let (points, graph) =
        aggregate(buildings, graph, config.algorithm.aggregation_threshold).unwrap();
    let seed = match seed {
        Some(idx) => points[idx].inlet,
        None => select_seed(&points, config.algorithm.tile_size).unwrap(),
    };
    let (forest, summary) = assemble_network(&graph, seed, &points, config).unwrap();
    Outcome {
        graph,
        points,
        forest,
        summary,
    }
}

fn assert_valid_forest(outcome: &Outcome, config: &SnipConfig) {
    let forest = &outcome.forest;
    let sewer = &config.sewer;

    // completeness
    for point in &outcome.points {
        let owners = forest
            .trees
            .iter()
            .filter(|tree| tree.inlets.contains(&point.inlet))
            .count();
        assert_eq!(owners, 1, "inlet {:?} drains into {owners} trees", point.inlet);
    }

    for tree in &forest.trees {
        // acyclicity
        assert_eq!(tree.nodes.len(), tree.pipes.len() + 1);
        for node in &tree.nodes {
            let path = tree.path_to_plant(node.id);
            assert_eq!(path.last(), Some(&tree.plant.node));
        }

        // constraint satisfaction
        for pipe in tree.pipes.iter().filter(|pipe| !pipe.pressurized) {
            assert!(pipe.upstream_depth >= sewer.min_trench_depth - 1e-9);
            assert!(pipe.upstream_depth <= sewer.max_trench_depth + 1e-9);
            assert!(pipe.downstream_depth >= sewer.min_trench_depth - 1e-9);
            assert!(pipe.downstream_depth <= sewer.max_trench_depth + 1e-9);
            assert!(pipe.slope >= sewer.min_slope_fraction() - 1e-9);
        }
        for pipe in tree.pipes.iter().filter(|pipe| pipe.pressurized) {
            assert!((pipe.downstream_depth - sewer.min_trench_depth).abs() < 1e-9);
        }

        let inflow: f64 = outcome
            .points
            .iter()
            .filter(|point| tree.inlets.contains(&point.inlet))
            .map(|point| point.population)
            .sum();
        assert!((tree.plant.flow - inflow).abs() < 1e-9);
    }
}

fn three_houses() -> (Vec<StreetSegment>, Vec<TerrainSample>, Vec<Building>) {
    let streets = vec![street("main", vec![(0.0, 0.0), (40.0, 0.0)])];
    let terrain = grid_terrain((0.0, 40.0), (-20.0, 20.0), 10.0, |_, _| FLAT);
    let buildings = vec![
        house("a", 10.0, 5.0, 800.0),
        house("b", 20.0, 5.0, 800.0),
        house("c", 30.0, 5.0, 800.0),
    ];
    (streets, terrain, buildings)
}

#[test]
fn collinear_houses_share_one_gravity_sewer() {
    let config = street_config();
    let (streets, terrain, buildings) = three_houses();
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(2));

    assert_eq!(outcome.points.len(), 3);
    assert_eq!(outcome.forest.plant_count(), 1);
    assert_eq!(outcome.forest.pump_count(), 0);
    assert_valid_forest(&outcome, &config);

    let tree = &outcome.forest.trees[0];
    let model = CostModel::new(&config);
    let mut previous = 0.0;
    let mut flow = 0.0;
    for node in tree.path_to_plant(outcome.points[0].inlet) {
        let Some(pipe) = tree.pipe_from(node) else {
            break;
        };
        assert!(pipe.flow > flow);
        let per_metre =
            model.pipe(pipe.length, pipe.flow, pipe.mean_depth(), pipe.slope).total() / pipe.length;
        assert!(per_metre >= previous);
        previous = per_metre;
        flow = pipe.flow;
    }
    assert!((flow - 1600.0).abs() < 1e-9);
}

#[test]
fn density_seed_yields_the_same_network() {
    let config = street_config();
    let (streets, terrain, buildings) = three_houses();
    let outcome = plan(&streets, &terrain, &buildings, &config, None);

    assert_eq!(outcome.forest.plant_count(), 1);
    assert_valid_forest(&outcome, &config);
}

/// Two hamlets 5 km apart with houses of 2 equivalent population each
fn two_hamlets(
    connected_terrain: bool,
) -> (Vec<StreetSegment>, Vec<TerrainSample>, Vec<Building>) {
    let streets = vec![
        street("west", vec![(0.0, 0.0), (60.0, 0.0)]),
        street("east", vec![(5000.0, 0.0), (5060.0, 0.0)]),
    ];
    let terrain = if connected_terrain {
        grid_terrain((0.0, 5060.0), (-20.0, 20.0), 20.0, |_, _| FLAT)
    } else {
        let mut terrain = grid_terrain((0.0, 60.0), (-20.0, 20.0), 20.0, |_, _| FLAT);
        terrain.extend(grid_terrain((5000.0, 5060.0), (-20.0, 20.0), 20.0, |_, _| FLAT));
        terrain
    };
    let buildings = vec![
        house("w1", 10.0, 5.0, 2.0),
        house("w2", 30.0, 5.0, 2.0),
        house("w3", 50.0, 5.0, 2.0),
        house("e1", 5010.0, 5.0, 2.0),
        house("e2", 5030.0, 5.0, 2.0),
    ];
    (streets, terrain, buildings)
}

#[test]
fn unreachable_hamlet_gets_its_own_plant() {
    let config = street_config();
    let (streets, terrain, buildings) = two_hamlets(false);
    let outcome = plan(&streets, &terrain, &buildings, &config, None);

    assert_eq!(outcome.forest.plant_count(), 2);
    let origins: Vec<PlantOrigin> = outcome.forest.plants().map(|plant| plant.origin).collect();
    assert_eq!(origins, vec![PlantOrigin::Seed, PlantOrigin::Unreachable]);
    assert_valid_forest(&outcome, &config);
}

#[test]
fn expensive_connection_splits_the_network() {
    let mut config = street_config();
    config.algorithm.f_merge = 2.4;
    config.algorithm.neighborhood = 10_000.0;
    let (streets, terrain, buildings) = two_hamlets(true);
    let outcome = plan(&streets, &terrain, &buildings, &config, None);

    assert_eq!(outcome.forest.plant_count(), 2);
    assert_eq!(
        outcome.forest.trees[1].plant.origin,
        PlantOrigin::Split,
        "the eastern hamlet was reachable"
    );
    assert_valid_forest(&outcome, &config);
}

/// Three street houses and a farm 75 m off the road
fn farmstead() -> (Vec<StreetSegment>, Vec<TerrainSample>, Vec<Building>) {
    let streets = vec![street("lane", vec![(0.0, 0.0), (60.0, 0.0)])];
    let terrain = grid_terrain((0.0, 60.0), (-20.0, 100.0), 20.0, |_, _| FLAT);
    let buildings = vec![
        house("h1", 10.0, 3.0, 4.0),
        house("h2", 30.0, 3.0, 4.0),
        house("h3", 50.0, 3.0, 4.0),
        house("farm", 40.0, 75.0, 6.0),
    ];
    (streets, terrain, buildings)
}

#[test]
fn far_building_drains_across_terrain() {
    let config = street_config();
    let (streets, terrain, buildings) = farmstead();
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(1));

    let farm = &outcome.points[3];
    assert!(farm.standalone);
    assert_eq!(outcome.forest.plant_count(), 1);
    assert_valid_forest(&outcome, &config);

    let tree = &outcome.forest.trees[0];
    let node = tree.nodes.iter().find(|node| node.id == farm.inlet).unwrap();
    assert_eq!(node.role, NetworkRole::Building);

    let first = tree.pipe_from(farm.inlet).unwrap();
    let edge = outcome
        .graph
        .edge_between(first.upstream, first.downstream)
        .unwrap();
    assert_eq!(edge.kind, EdgeKind::Terrain);
    assert!((tree.plant.flow - 18.0).abs() < 1e-9);
}

#[test]
fn far_building_outside_the_neighborhood_is_treated_on_site() {
    let mut config = street_config();
    config.algorithm.neighborhood = 50.0;
    let (streets, terrain, buildings) = farmstead();
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(1));

    let origins: Vec<PlantOrigin> = outcome.forest.plants().map(|plant| plant.origin).collect();
    assert_eq!(origins, vec![PlantOrigin::Seed, PlantOrigin::Unreachable]);
    assert_valid_forest(&outcome, &config);

    let farm = &outcome.points[3];
    let own = &outcome.forest.trees[1];
    assert_eq!(own.plant.node, farm.inlet);
    assert!(own.pipes.is_empty());
    assert!((own.plant.flow - 6.0).abs() < 1e-9);
}

#[test]
fn default_routing_keeps_sewers_on_streets() {
    let config = SnipConfig::default();
    let streets = vec![street("main", vec![(0.0, 0.0), (200.0, 0.0)])];
    let terrain = grid_terrain((0.0, 200.0), (-20.0, 20.0), 10.0, |_, _| FLAT);
    let buildings = vec![
        house("a", 20.0, 5.0, 800.0),
        house("b", 100.0, 5.0, 800.0),
        house("c", 180.0, 5.0, 800.0),
    ];
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(1));

    assert_eq!(outcome.points.len(), 3);
    assert_eq!(outcome.forest.plant_count(), 1);
    assert_valid_forest(&outcome, &config);
    for pipe in outcome.forest.pipes() {
        let edge = outcome
            .graph
            .edge_between(pipe.upstream, pipe.downstream)
            .unwrap();
        assert_eq!(edge.kind, EdgeKind::Street);
    }
}

#[test]
fn rising_street_gets_one_pump() {
    let config = street_config();
    let streets = vec![street("hill", vec![(0.0, 0.0), (50.0, 0.0)])];
    // ground rises 5 m over 50 m
    let terrain = grid_terrain((0.0, 50.0), (-10.0, 10.0), 10.0, |x, _| FLAT + x / 10.0);
    let buildings = vec![house("low", 0.0, 3.0, 10.0), house("high", 50.0, 3.0, 10.0)];
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(1));

    assert_eq!(outcome.forest.plant_count(), 1);
    assert_eq!(outcome.forest.pump_count(), 1);
    let pump = outcome.forest.pumps().next().unwrap();
    assert_eq!(pump.node, outcome.points[0].inlet);
    assert!(pump.lift_height > 0.0);

    let tree = &outcome.forest.trees[0];
    let main = tree.pipe_from(pump.node).unwrap();
    assert!(main.pressurized);
    assert!((main.downstream_depth - config.sewer.min_trench_depth).abs() < 1e-9);
    assert_valid_forest(&outcome, &config);
}

fn spaced_line() -> (Vec<StreetSegment>, Vec<TerrainSample>, Vec<Building>) {
    let streets = vec![street("long", vec![(0.0, 0.0), (720.0, 0.0)])];
    let terrain = grid_terrain((0.0, 720.0), (-40.0, 40.0), 40.0, |_, _| FLAT);
    // gaps of 100, 200 and 400 m
    let buildings = vec![
        house("a", 0.0, 5.0, 3.0),
        house("b", 100.0, 5.0, 3.0),
        house("c", 300.0, 5.0, 3.0),
        house("d", 700.0, 5.0, 3.0),
    ];
    (streets, terrain, buildings)
}

#[test]
fn merge_factor_never_adds_plants() {
    let (streets, terrain, buildings) = spaced_line();
    let mut previous = usize::MAX;
    for f_merge in [0.0, 0.1, 0.5, 1.0, 2.4, 10.0, 100.0, 10_000.0] {
        let mut config = street_config();
        config.algorithm.f_merge = f_merge;
        config.algorithm.neighborhood = 2000.0;
        let outcome = plan(&streets, &terrain, &buildings, &config, Some(0));

        let plants = outcome.forest.plant_count();
        assert!(plants <= previous, "f_merge {f_merge} opened {plants} plants");
        assert_valid_forest(&outcome, &config);
        previous = plants;
    }
    assert_eq!(previous, 1);
}

#[rstest]
#[case::default_costs(0.0, 0.0, 0.0)]
#[case::shifted_costs(0.2, -0.1, 0.3)]
fn costs_are_deterministic(#[case] sewer: f64, #[case] opex: f64, #[case] capex: f64) {
    let mut config = street_config();
    config.costs.fc_sewer_cost = sewer;
    config.costs.fc_wwtp_opex = opex;
    config.costs.fc_wwtp_capex = capex;
    let (streets, terrain, buildings) = spaced_line();
    let outcome = plan(&streets, &terrain, &buildings, &config, Some(0));

    let again = CostSummary::evaluate(&outcome.forest, &outcome.points, &config);
    assert_eq!(again, outcome.summary);
    assert_eq!(
        again.total_with_private().to_bits(),
        outcome.summary.total_with_private().to_bits()
    );

    let rerun = plan(&streets, &terrain, &buildings, &config, Some(0));
    assert_eq!(rerun.summary, outcome.summary);
}

#[test]
fn seed_is_deterministic() {
    let config = street_config();
    let (streets, terrain, buildings) = two_hamlets(false);
    let graph = build_graph(&streets, &terrain, &config.algorithm.routing_factors()).unwrap();
    let (points, _) = aggregate(&buildings, graph, 6.0).unwrap();

    let first = select_seed(&points, 50.0).unwrap();
    for _ in 0..10 {
        assert_eq!(select_seed(&points, 50.0).unwrap(), first);
    }
    assert!(points[..3].iter().any(|point| point.inlet == first));
}
