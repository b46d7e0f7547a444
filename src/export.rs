//! Results sink: GeoJSON map layers and a JSON statistics report

use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};

use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::info;
use serde_json::json;
use snip_core::{
    algo::SeedSelection,
    config::SewerParameters,
    costs::hydraulics::{design_flow, pipe_diameter},
    model::{AggregatedPoint, Building, Forest, SewerGraph},
};

use crate::{Error, scenario::ScenarioResult};

fn point_geometry(point: &Point<f64>) -> Geometry {
    Geometry::new(GeoJsonValue::from(point))
}

fn line_geometry(from: Point<f64>, to: Point<f64>) -> Geometry {
    Geometry::new(GeoJsonValue::from(&LineString::from(vec![from, to])))
}

fn feature(value: serde_json::Value) -> Result<Feature, Error> {
    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJson(e.to_string()))
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Public pipes with their hydraulic dimensions
pub fn sewers_layer(forest: &Forest, sewer: &SewerParameters) -> Result<FeatureCollection, Error> {
    let mut features = Vec::new();
    for tree in &forest.trees {
        for pipe in &tree.pipes {
            let diameter = pipe_diameter(design_flow(pipe.flow, sewer), pipe.slope, sewer);
            features.push(feature(json!({
                "type": "Feature",
                "geometry": line_geometry(pipe.geometry.start_point(), pipe.geometry.end_point()),
                "properties": {
                    "plant": tree.plant.node.index(),
                    "upstream": pipe.upstream.index(),
                    "downstream": pipe.downstream.index(),
                    "length": pipe.length,
                    "flow": pipe.flow,
                    "diameter": diameter,
                    "upstream_depth": pipe.upstream_depth,
                    "downstream_depth": pipe.downstream_depth,
                    "slope": pipe.slope,
                    "pressurized": pipe.pressurized,
                }
            }))?);
        }
    }
    Ok(collection(features))
}

pub fn plants_layer(forest: &Forest) -> Result<FeatureCollection, Error> {
    let mut features = Vec::with_capacity(forest.plant_count());
    for tree in &forest.trees {
        let plant = &tree.plant;
        let node = tree.node(plant.node).ok_or(snip_core::Error::InvalidNodeIndex)?;
        features.push(feature(json!({
            "type": "Feature",
            "geometry": point_geometry(&node.geometry),
            "properties": {
                "node": plant.node.index(),
                "flow": plant.flow,
                "origin": plant.origin,
                "elevation": node.elevation,
            }
        }))?);
    }
    Ok(collection(features))
}

pub fn pumps_layer(forest: &Forest) -> Result<FeatureCollection, Error> {
    let mut features = Vec::with_capacity(forest.pump_count());
    for tree in &forest.trees {
        for pump in &tree.pumps {
            let node = tree.node(pump.node).ok_or(snip_core::Error::InvalidNodeIndex)?;
            features.push(feature(json!({
                "type": "Feature",
                "geometry": point_geometry(&node.geometry),
                "properties": {
                    "node": pump.node.index(),
                    "plant": tree.plant.node.index(),
                    "lift_height": pump.lift_height,
                    "flow": pump.flow,
                }
            }))?);
        }
    }
    Ok(collection(features))
}

/// Aggregated points with the plant they drain to
pub fn inlets_layer(points: &[AggregatedPoint], forest: &Forest) -> Result<FeatureCollection, Error> {
    let features = points
        .iter()
        .map(|point| {
            let plant = forest.tree_of(point.inlet).map(|tree| tree.plant.node.index());
            feature(json!({
                "type": "Feature",
                "geometry": point_geometry(&point.position),
                "properties": {
                    "node": point.inlet.index(),
                    "population": point.population,
                    "buildings": point.building_count(),
                    "standalone": point.standalone,
                    "aggregation_distance": point.aggregation_distance(),
                    "plant": plant,
                }
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection(features))
}

pub fn seed_layer(seed: &SeedSelection, graph: &SewerGraph) -> Result<FeatureCollection, Error> {
    let seed_feature = feature(json!({
        "type": "Feature",
        "geometry": point_geometry(&graph.position(seed.node)),
        "properties": {
            "node": seed.node.index(),
            "tile_row": seed.cell.row,
            "tile_col": seed.cell.col,
            "tile_points": seed.cell.count,
        }
    }))?;
    Ok(collection(vec![seed_feature]))
}

/// Private laterals from each building to its inlet
pub fn connections_layer(
    points: &[AggregatedPoint],
    buildings: &[Building],
) -> Result<FeatureCollection, Error> {
    let mut features = Vec::new();
    for point in points {
        for lateral in &point.laterals {
            let building = buildings
                .get(lateral.building)
                .ok_or_else(|| Error::attribute(lateral.building.to_string(), "unknown building"))?;
            features.push(feature(json!({
                "type": "Feature",
                "geometry": line_geometry(building.position, point.position),
                "properties": {
                    "building": building.id,
                    "inlet": point.inlet.index(),
                    "length": lateral.length,
                    "population": building.population,
                }
            }))?);
        }
    }
    Ok(collection(features))
}

fn write_layer(dir: &Path, name: &str, layer: &FeatureCollection) -> Result<(), Error> {
    fs::write(dir.join(format!("{name}.geojson")), layer.to_string())?;
    Ok(())
}

/// Writes every layer and `statistics.json` into `dir`, creating it if needed
pub fn write_results(
    dir: &Path,
    result: &ScenarioResult,
    sewer: &SewerParameters,
    include_connections: bool,
) -> Result<(), Error> {
    fs::create_dir_all(dir)?;

    write_layer(dir, "sewers", &sewers_layer(&result.forest, sewer)?)?;
    write_layer(dir, "plants", &plants_layer(&result.forest)?)?;
    write_layer(dir, "pumps", &pumps_layer(&result.forest)?)?;
    write_layer(dir, "inlets", &inlets_layer(&result.points, &result.forest)?)?;
    write_layer(dir, "seed", &seed_layer(&result.seed, &result.graph)?)?;
    if include_connections {
        write_layer(
            dir,
            "connections",
            &connections_layer(&result.points, &result.buildings)?,
        )?;
    }

    let writer = BufWriter::new(File::create(dir.join("statistics.json"))?);
    serde_json::to_writer_pretty(writer, &result.statistics)?;

    info!("Results written to {}", dir.display());
    Ok(())
}
