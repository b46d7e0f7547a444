//! Greedy, cost guided growth of the sewer forest
//!
//! Starting from a treatment plant at the seed, the globally cheapest pending
//! connection of an unassigned inlet is taken next, like Prim's algorithm.
//! Before it is committed the branch is laid out in the ground, inserting
//! pumps where the trench would get too deep, and its yearly cost is weighed
//! against a plant of its own.
//!
//! Sewers follow the streets. Inlets the street network never reaches, such as
//! standalone buildings, are connected across the terrain mesh afterwards, and
//! those that cannot reach any tree within the search radius get their own
//! plant.

mod frontier;
mod profile;

use std::collections::BTreeSet;

use fixedbitset::FixedBitSet;
use geo::{Euclidean, Line, line_measures::Distance};
use hashbrown::HashMap;
use log::{debug, info, warn};

use self::{
    frontier::Frontier,
    profile::{Descent, TrenchProfile},
};
use crate::{
    Error, NodeId, Population,
    config::SnipConfig,
    costs::{AnnualCost, CostModel, CostSummary},
    model::{
        AggregatedPoint, Forest, NetworkNode, NetworkRole, NetworkTree, NodeKind, PlantOrigin,
        Pump, SewerGraph, SewerPipe, TreatmentPlant,
    },
    routing::{SearchBounds, SolvedPath, cost_to_all, search_towards},
};

/// Grows the sewer forest over `graph` from the plant at `seed` until every
/// aggregated point drains into exactly one tree, then prices it.
///
/// # Errors
///
/// [`Error::InvalidParameter`] if `config` does not validate,
/// [`Error::NoPointsFound`] for an empty point set and
/// [`Error::InvalidNodeIndex`] if `seed` is not the inlet of a point or an
/// inlet is not part of `graph`.
pub fn assemble_network(
    graph: &SewerGraph,
    seed: NodeId,
    points: &[AggregatedPoint],
    config: &SnipConfig,
) -> Result<(Forest, CostSummary), Error> {
    config.validate()?;
    if points.is_empty() {
        return Err(Error::NoPointsFound);
    }
    if !points.iter().any(|point| point.inlet == seed) {
        return Err(Error::InvalidNodeIndex);
    }

    info!(
        "Assembling sewer network for {} inlets from seed {seed:?}",
        points.len()
    );
    let forest = Assembly::new(graph, points, config)?.run(seed);
    let summary = CostSummary::evaluate(&forest, points, config);

    info!(
        "Assembled {} trees with {} pumps, yearly cost {:.0} ({:.0} with private sewers)",
        forest.plant_count(),
        forest.pump_count(),
        summary.total_without_private(),
        summary.total_with_private()
    );
    Ok((forest, summary))
}

/// Membership of a graph node in one of the growing trees
#[derive(Debug, Clone)]
struct TreeSlot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Plant the node drains into
    root: NodeId,
    flow: Population,
    /// Lowest invert of the incoming pipes, infinite for leaves
    inflow_invert: f64,
    /// Pipe towards the parent, `None` for plants
    descent: Option<Descent>,
}

impl TreeSlot {
    fn new(parent: Option<NodeId>, root: NodeId) -> Self {
        Self {
            parent,
            children: Vec::new(),
            root,
            flow: 0.0,
            inflow_invert: f64::INFINITY,
            descent: None,
        }
    }

    fn is_pump(&self) -> bool {
        self.descent.is_some_and(|descent| descent.lift.is_some())
    }
}

/// Mutable state of one assembly run
struct Assembly<'a> {
    graph: &'a SewerGraph,
    config: &'a SnipConfig,
    costs: CostModel<'a>,
    profile: TrenchProfile<'a>,
    slots: HashMap<NodeId, TreeSlot>,
    in_tree: FixedBitSet,
    population: HashMap<NodeId, Population>,
    unassigned: BTreeSet<NodeId>,
    plants: Vec<(NodeId, PlantOrigin)>,
    frontier: Frontier,
}

impl<'a> Assembly<'a> {
    fn new(
        graph: &'a SewerGraph,
        points: &[AggregatedPoint],
        config: &'a SnipConfig,
    ) -> Result<Self, Error> {
        let mut population: HashMap<NodeId, Population> = HashMap::with_capacity(points.len());
        for point in points {
            if graph.node(point.inlet).is_none() {
                return Err(Error::InvalidNodeIndex);
            }
            *population.entry(point.inlet).or_default() += point.population;
        }

        Ok(Self {
            graph,
            config,
            costs: CostModel::new(config),
            profile: TrenchProfile::new(&config.sewer),
            slots: HashMap::new(),
            in_tree: FixedBitSet::with_capacity(graph.node_count()),
            unassigned: population.keys().copied().collect(),
            population,
            plants: Vec::new(),
            frontier: Frontier::default(),
        })
    }

    fn run(mut self, seed: NodeId) -> Forest {
        self.open_plant(seed, PlantOrigin::Seed);

        loop {
            while let Some((inlet, path)) = self.frontier.pop() {
                if self.unassigned.contains(&inlet) {
                    self.connect(inlet, path);
                }
            }
            let Some(stranded) = self.next_stranded() else {
                break;
            };
            self.rescue(stranded);
        }

        self.into_forest()
    }

    fn population(&self, node: NodeId) -> Population {
        self.population.get(&node).copied().unwrap_or_default()
    }

    fn neighborhood(&self) -> SearchBounds {
        SearchBounds::within(self.config.algorithm.neighborhood)
    }

    fn open_plant(&mut self, node: NodeId, origin: PlantOrigin) {
        let mut slot = TreeSlot::new(None, node);
        slot.flow = self.population(node);
        self.slots.insert(node, slot);
        self.in_tree.grow(node.index() + 1);
        self.in_tree.insert(node.index());
        self.unassigned.remove(&node);
        self.plants.push((node, origin));

        debug!(
            "Treatment plant {} at {node:?} ({origin:?})",
            self.plants.len()
        );
        self.grow(&[node]);
    }

    /// Offers paths from freshly added tree nodes to every unassigned inlet
    /// around them
    fn grow(&mut self, sources: &[NodeId]) {
        if sources.is_empty() || self.unassigned.is_empty() {
            return;
        }
        let paths = cost_to_all(self.graph, sources, self.neighborhood().on_streets());
        for inlet in &self.unassigned {
            if let Some(path) = paths.path_from(*inlet) {
                self.frontier.offer(*inlet, path);
            }
        }
    }

    /// Handles the cheapest pending connection of `inlet`
    fn connect(&mut self, inlet: NodeId, path: SolvedPath) {
        let attach = path
            .nodes
            .iter()
            .position(|node| self.in_tree.contains(node.index()));
        let Some(attach) = attach else {
            return;
        };
        if attach == 0 {
            self.join_tree(inlet);
            return;
        }

        // The tree may have grown into the path since it was found
        if attach + 1 < path.nodes.len() {
            let branch = path.nodes[..=attach].to_vec();
            if let Some(shorter) = SolvedPath::from_nodes(self.graph, branch) {
                if shorter.cost + 1e-9 < path.cost {
                    self.frontier.offer(inlet, shorter);
                    return;
                }
            }
        }
        let mut branch = path.nodes;
        branch.truncate(attach + 1);
        self.decide(inlet, branch);
    }

    /// Centralization test: connect the branch or treat the inlet on site
    fn decide(&mut self, inlet: NodeId, branch: Vec<NodeId>) {
        let population = self.population(inlet);
        let merge_cost = self.branch_cost(&branch, population).total();
        let standalone_cost = self.costs.plant(population).total();
        let f_merge = self.config.algorithm.f_merge;

        if f_merge * standalone_cost < merge_cost {
            debug!(
                "Inlet {inlet:?}: connection costs {merge_cost:.0}/a, own plant {standalone_cost:.0}/a x {f_merge}"
            );
            self.open_plant(inlet, PlantOrigin::Split);
        } else {
            self.commit(&branch, population);
        }
    }

    /// Yearly cost of laying `branch` as a new leaf carrying `population`
    fn branch_cost(&self, branch: &[NodeId], population: Population) -> AnnualCost {
        let mut inflow = f64::INFINITY;
        let mut cost = AnnualCost::default();
        for pair in branch.windows(2) {
            let (upstream, downstream) = (pair[0], pair[1]);
            let length = self.pipe_length(upstream, downstream);
            let descent = self.profile.descend(
                inflow,
                self.graph.elevation(upstream),
                self.graph.elevation(downstream),
                length,
                false,
            );
            let depth = (self.graph.elevation(upstream) - descent.outlet
                + self.graph.elevation(downstream)
                - descent.arrival)
                / 2.0;
            cost += self
                .costs
                .pipe(length, population, depth, descent.slope(length));
            if let Some(lift) = descent.lift {
                cost += self.costs.pump(lift, population);
            }
            inflow = descent.arrival;
        }
        cost
    }

    fn commit(&mut self, branch: &[NodeId], population: Population) {
        let (Some(&inlet), Some(&attach)) = (branch.first(), branch.last()) else {
            return;
        };
        let Some(root) = self.slots.get(&attach).map(|slot| slot.root) else {
            return;
        };

        for pair in branch.windows(2) {
            let (upstream, downstream) = (pair[0], pair[1]);
            self.slots
                .insert(upstream, TreeSlot::new(Some(downstream), root));
            self.in_tree.grow(upstream.index() + 1);
            self.in_tree.insert(upstream.index());
            if let Some(slot) = self.slots.get_mut(&downstream) {
                slot.children.push(upstream);
            }
        }
        self.unassigned.remove(&inlet);
        self.add_flow(inlet, population);
        self.settle(inlet);

        debug!(
            "Inlet {inlet:?} joins plant {root:?} at {attach:?} over {} pipes",
            branch.len() - 1
        );
        self.grow(&branch[..branch.len() - 1]);
    }

    /// Assigns an inlet the tree already runs through
    fn join_tree(&mut self, inlet: NodeId) {
        self.unassigned.remove(&inlet);
        self.add_flow(inlet, self.population(inlet));
        debug!("Inlet {inlet:?} already lies on the network");
    }

    fn add_flow(&mut self, from: NodeId, population: Population) {
        let mut current = Some(from);
        let mut steps = 0;
        while let Some(node) = current {
            let Some(slot) = self.slots.get_mut(&node) else {
                break;
            };
            slot.flow += population;
            current = slot.parent;
            steps += 1;
            if steps > self.slots.len() {
                break;
            }
        }
    }

    /// Re-lays every pipe from `from` down to its plant
    fn settle(&mut self, from: NodeId) {
        let mut current = from;
        for _ in 0..=self.slots.len() {
            let inflow = self.inflow_invert(current);
            let Some(slot) = self.slots.get(&current) else {
                break;
            };
            let (parent, pumped) = (slot.parent, slot.is_pump());

            let descent = parent.map(|parent| {
                self.profile.descend(
                    inflow,
                    self.graph.elevation(current),
                    self.graph.elevation(parent),
                    self.pipe_length(current, parent),
                    pumped,
                )
            });
            if let Some(slot) = self.slots.get_mut(&current) {
                slot.inflow_invert = inflow;
                slot.descent = descent;
            }
            if !pumped {
                if let Some(lift) = descent.and_then(|descent| descent.lift) {
                    debug!("Pump at {current:?} lifting {lift:.2} m");
                }
            }

            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    fn inflow_invert(&self, node: NodeId) -> f64 {
        self.slots.get(&node).map_or(f64::INFINITY, |slot| {
            slot.children
                .iter()
                .filter_map(|child| self.slots.get(child)?.descent)
                .map(|descent| descent.arrival)
                .fold(f64::INFINITY, f64::min)
        })
    }

    fn pipe_length(&self, a: NodeId, b: NodeId) -> f64 {
        self.graph.edge_between(a, b).map_or_else(
            || Euclidean.distance(&self.graph.position(a), &self.graph.position(b)),
            |edge| edge.length,
        )
    }

    /// Unassigned inlet with the largest population, lowest id on ties
    fn next_stranded(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, Population)> = None;
        for &inlet in &self.unassigned {
            let population = self.population(inlet);
            if best.is_none_or(|(_, top)| population > top) {
                best = Some((inlet, population));
            }
        }
        best.map(|(inlet, _)| inlet)
    }

    /// Connects an inlet the frontier never reached, across terrain if needed
    fn rescue(&mut self, inlet: NodeId) {
        if self.in_tree.contains(inlet.index()) {
            self.join_tree(inlet);
            return;
        }

        let in_tree = &self.in_tree;
        let found = search_towards(
            self.graph,
            inlet,
            |node| in_tree.contains(node.index()),
            self.neighborhood(),
        );
        match found {
            Ok(path) => self.decide(inlet, path.nodes),
            Err(err) => {
                warn!("{err}, treating it on site");
                self.open_plant(inlet, PlantOrigin::Unreachable);
            }
        }
    }

    fn into_forest(self) -> Forest {
        let mut members: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (node, slot) in &self.slots {
            members.entry(slot.root).or_default().push(*node);
        }

        let trees = self
            .plants
            .iter()
            .map(|&(plant, origin)| {
                let mut nodes = members.remove(&plant).unwrap_or_default();
                nodes.sort_unstable();
                self.build_tree(plant, origin, &nodes)
            })
            .collect();
        Forest { trees }
    }

    fn build_tree(&self, plant: NodeId, origin: PlantOrigin, members: &[NodeId]) -> NetworkTree {
        let mut nodes = Vec::with_capacity(members.len());
        let mut pipes = Vec::with_capacity(members.len().saturating_sub(1));
        let mut pumps = Vec::new();
        let mut inlets = Vec::new();

        for &id in members {
            let Some(slot) = self.slots.get(&id) else {
                continue;
            };
            let ground = self.graph.elevation(id);
            if self.population.contains_key(&id) {
                inlets.push(id);
            }

            let outlet = match slot.descent {
                Some(descent) => descent.outlet,
                None => slot.inflow_invert.min(self.profile.shallowest(ground)),
            };
            let role = if id == plant {
                NetworkRole::TreatmentPlant
            } else if slot.is_pump() {
                NetworkRole::Pump
            } else {
                match self.graph.graph[id].kind {
                    NodeKind::StreetVertex => NetworkRole::StreetVertex,
                    NodeKind::Terrain => NetworkRole::Terrain,
                    NodeKind::Building => NetworkRole::Building,
                    NodeKind::Inlet => NetworkRole::Inlet,
                }
            };
            nodes.push(NetworkNode {
                id,
                geometry: self.graph.position(id),
                elevation: ground,
                role,
                flow: slot.flow,
                trench_depth: ground - outlet,
                parent: slot.parent,
            });

            if let (Some(parent), Some(descent)) = (slot.parent, slot.descent) {
                let length = self.pipe_length(id, parent);
                pipes.push(SewerPipe {
                    upstream: id,
                    downstream: parent,
                    length,
                    flow: slot.flow,
                    upstream_depth: ground - descent.outlet,
                    downstream_depth: self.graph.elevation(parent) - descent.arrival,
                    slope: descent.slope(length),
                    pressurized: descent.lift.is_some(),
                    geometry: Line::new(self.graph.position(id), self.graph.position(parent)),
                });
                if let Some(lift) = descent.lift {
                    pumps.push(Pump {
                        node: id,
                        lift_height: lift,
                        flow: slot.flow,
                    });
                }
            }
        }

        let flow = self.slots.get(&plant).map_or(0.0, |slot| slot.flow);
        NetworkTree {
            plant: TreatmentPlant {
                node: plant,
                flow,
                origin,
            },
            nodes,
            pipes,
            pumps,
            inlets,
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point};

    use super::*;
    use crate::{
        aggregate, build_graph,
        model::{Building, EdgeKind, StreetSegment, TerrainSample},
    };

    fn flat_terrain(width: f64, spacing: f64) -> Vec<TerrainSample> {
        let mut samples = Vec::new();
        let mut x = 0.0;
        while x <= width {
            for y in [-spacing, 0.0, spacing] {
                samples.push(TerrainSample::new(x, y, 50.0));
            }
            x += spacing;
        }
        samples
    }

    fn street_config() -> SnipConfig {
        let mut config = SnipConfig::default();
        config.algorithm.f_street = 1.0;
        config.algorithm.f_merge = 1000.0;
        config.algorithm.aggregation_threshold = 6.0;
        config
    }

    fn street_town(xs: &[f64], config: &SnipConfig) -> (SewerGraph, Vec<AggregatedPoint>) {
        let width = xs.iter().copied().fold(0.0, f64::max) + 20.0;
        let streets = vec![StreetSegment::new(
            "main",
            line_string![(x: 0.0, y: 0.0), (x: width, y: 0.0)],
        )];
        let graph = build_graph(
            &streets,
            &flat_terrain(width, 10.0),
            &config.algorithm.routing_factors(),
        )
        .unwrap();
        let buildings: Vec<Building> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| Building::new(format!("b{i}"), point!(x: *x, y: 5.0), 4.0))
            .collect();
        let (points, graph) = aggregate(&buildings, graph, 6.0).unwrap();
        (graph, points)
    }

    #[test]
    fn every_inlet_drains_into_one_tree() {
        let config = street_config();
        let (graph, points) = street_town(&[15.0, 35.0, 55.0, 75.0, 95.0], &config);
        let (forest, _) = assemble_network(&graph, points[2].inlet, &points, &config).unwrap();

        assert_eq!(forest.plant_count(), 1);
        let tree = &forest.trees[0];
        assert_eq!(tree.inlets.len(), points.len());
        assert_eq!(tree.nodes.len(), tree.pipes.len() + 1);
        assert!((tree.plant.flow - 20.0).abs() < 1e-9);
        for point in &points {
            let path = tree.path_to_plant(point.inlet);
            assert_eq!(path.last(), Some(&tree.plant.node));
        }
    }

    #[test]
    fn default_factors_keep_pipes_on_streets() {
        let mut config = SnipConfig::default();
        config.algorithm.f_merge = 1000.0;
        config.algorithm.aggregation_threshold = 6.0;
        let (graph, points) = street_town(&[15.0, 55.0, 95.0, 135.0], &config);
        let (forest, _) = assemble_network(&graph, points[1].inlet, &points, &config).unwrap();

        assert_eq!(forest.plant_count(), 1);
        assert!(forest.pipes().next().is_some());
        for pipe in forest.pipes() {
            let edge = graph.edge_between(pipe.upstream, pipe.downstream).unwrap();
            assert_eq!(edge.kind, EdgeKind::Street);
        }
    }

    #[test]
    fn flow_accumulates_downstream() {
        let config = street_config();
        let (graph, points) = street_town(&[15.0, 35.0, 55.0], &config);
        let (forest, _) = assemble_network(&graph, points[2].inlet, &points, &config).unwrap();

        let tree = &forest.trees[0];
        let first = tree.pipe_from(points[0].inlet).unwrap();
        let second = tree.pipe_from(first.downstream).unwrap();
        assert!((first.flow - 4.0).abs() < 1e-9);
        assert!((second.flow - 8.0).abs() < 1e-9);
        assert!(second.upstream_depth >= first.downstream_depth - 1e-9);
    }

    #[test]
    fn zero_merge_factor_treats_every_inlet_on_site() {
        let mut config = street_config();
        config.algorithm.f_merge = 0.0;
        let (graph, points) = street_town(&[15.0, 35.0, 55.0], &config);
        let (forest, summary) =
            assemble_network(&graph, points[0].inlet, &points, &config).unwrap();

        assert_eq!(forest.plant_count(), 3);
        assert!(forest.pipes().next().is_none());
        assert!(forest
            .plants()
            .skip(1)
            .all(|plant| plant.origin == PlantOrigin::Split));
        assert_eq!(summary.trees.len(), 3);
    }

    #[test]
    fn seed_must_be_an_inlet() {
        let config = street_config();
        let (graph, points) = street_town(&[15.0, 35.0], &config);
        let not_an_inlet = graph
            .graph
            .node_indices()
            .find(|node| graph.graph[*node].kind == NodeKind::Terrain)
            .unwrap();

        let err = assemble_network(&graph, not_an_inlet, &points, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidNodeIndex));
    }

    #[test]
    fn invalid_configuration_fails_before_assembly() {
        let mut config = street_config();
        config.costs.wwtp_lifespan = 0;
        let (graph, points) = street_town(&[15.0, 35.0], &config);

        let err = assemble_network(&graph, points[0].inlet, &points, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
