//! Layer readers: GeoJSON streets and buildings, CSV terrain samples
//!
//! All layers must already share one projected coordinate system in metres.

use std::{fs, io::Read, path::Path};

use geo::{Centroid, Geometry as GeoGeometry};
use geojson::{Feature, FeatureCollection};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use snip_core::model::{Building, StreetSegment, TerrainSample};

use crate::Error;

/// Attribute names looked up on input features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    /// Property holding a feature identifier, the feature index is used when absent
    pub id_property: String,
    /// Property holding the equivalent population of a building
    pub population_property: String,
    /// Population of buildings without the population property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_population: Option<f64>,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            id_property: "id".to_string(),
            population_property: "population".to_string(),
            default_population: None,
        }
    }
}

fn parse_collection(source: &str) -> Result<FeatureCollection, Error> {
    serde_json::from_str::<FeatureCollection>(source).map_err(|e| Error::GeoJson(e.to_string()))
}

fn feature_id(feature: &Feature, idx: usize, options: &InputOptions) -> String {
    match feature.property(&options.id_property) {
        Some(JsonValue::String(id)) => id.clone(),
        Some(JsonValue::Number(id)) => id.to_string(),
        _ => idx.to_string(),
    }
}

fn feature_geometry(feature: &Feature, id: &str) -> Result<GeoGeometry<f64>, Error> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| Error::attribute(id, "missing geometry"))?;
    GeoGeometry::<f64>::try_from(geometry.value.clone())
        .map_err(|e| Error::attribute(id, format!("unsupported geometry: {e}")))
}

/// Reads street centrelines from a GeoJSON `FeatureCollection`
///
/// Multi-part lines are split into one segment per part, suffixed `/<part>`.
pub fn streets_from_geojson(source: &str, options: &InputOptions) -> Result<Vec<StreetSegment>, Error> {
    let collection = parse_collection(source)?;
    let mut streets = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.iter().enumerate() {
        let id = feature_id(feature, idx, options);
        match feature_geometry(feature, &id)? {
            GeoGeometry::LineString(line) => streets.push(StreetSegment::new(id, line)),
            GeoGeometry::MultiLineString(lines) => {
                for (part, line) in lines.into_iter().enumerate() {
                    streets.push(StreetSegment::new(format!("{id}/{part}"), line));
                }
            }
            other => {
                return Err(Error::attribute(
                    id,
                    format!("expected a line, got {}", geometry_name(&other)),
                ));
            }
        }
    }

    info!("Read {} street segments", streets.len());
    Ok(streets)
}

/// Reads buildings from a GeoJSON `FeatureCollection`
///
/// Polygon footprints are reduced to their centroid.
pub fn buildings_from_geojson(source: &str, options: &InputOptions) -> Result<Vec<Building>, Error> {
    let collection = parse_collection(source)?;
    let mut buildings = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.iter().enumerate() {
        let id = feature_id(feature, idx, options);
        let geometry = feature_geometry(feature, &id)?;
        let position = match &geometry {
            GeoGeometry::Point(point) => Some(*point),
            GeoGeometry::Polygon(polygon) => polygon.centroid(),
            GeoGeometry::MultiPolygon(polygons) => polygons.centroid(),
            other => {
                return Err(Error::attribute(
                    id,
                    format!("expected a point or polygon, got {}", geometry_name(other)),
                ));
            }
        }
        .ok_or_else(|| Error::attribute(&id, "empty geometry"))?;

        let population = match feature.property(&options.population_property) {
            Some(value) => value.as_f64().ok_or_else(|| {
                Error::attribute(
                    &id,
                    format!("`{}` is not a number", options.population_property),
                )
            })?,
            None => options.default_population.ok_or_else(|| {
                Error::attribute(
                    &id,
                    format!("missing `{}`", options.population_property),
                )
            })?,
        };
        buildings.push(Building::new(id, position, population));
    }

    info!("Read {} buildings", buildings.len());
    Ok(buildings)
}

#[derive(Debug, Deserialize)]
struct TerrainRow {
    x: f64,
    y: f64,
    z: f64,
}

/// Reads terrain samples from CSV with the columns `x`, `y` and `z`
pub fn terrain_from_csv(reader: impl Read) -> Result<Vec<TerrainSample>, Error> {
    let mut terrain = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let TerrainRow { x, y, z } = row?;
        terrain.push(TerrainSample::new(x, y, z));
    }
    info!("Read {} terrain samples", terrain.len());
    Ok(terrain)
}

pub fn read_streets(path: &Path, options: &InputOptions) -> Result<Vec<StreetSegment>, Error> {
    debug!("Reading streets from {}", path.display());
    streets_from_geojson(&fs::read_to_string(path)?, options)
}

pub fn read_buildings(path: &Path, options: &InputOptions) -> Result<Vec<Building>, Error> {
    debug!("Reading buildings from {}", path.display());
    buildings_from_geojson(&fs::read_to_string(path)?, options)
}

pub fn read_terrain(path: &Path) -> Result<Vec<TerrainSample>, Error> {
    debug!("Reading terrain from {}", path.display());
    terrain_from_csv(fs::File::open(path)?)
}

fn geometry_name(geometry: &GeoGeometry<f64>) -> &'static str {
    match geometry {
        GeoGeometry::Point(_) => "Point",
        GeoGeometry::Line(_) => "Line",
        GeoGeometry::LineString(_) => "LineString",
        GeoGeometry::Polygon(_) => "Polygon",
        GeoGeometry::MultiPoint(_) => "MultiPoint",
        GeoGeometry::MultiLineString(_) => "MultiLineString",
        GeoGeometry::MultiPolygon(_) => "MultiPolygon",
        GeoGeometry::GeometryCollection(_) => "GeometryCollection",
        GeoGeometry::Rect(_) => "Rect",
        GeoGeometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREETS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"id": "main"},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0]]}},
            {"type": "Feature", "properties": {"id": 7},
             "geometry": {"type": "MultiLineString",
                          "coordinates": [[[0, 0], [0, 50]], [[100, 0], [100, 50]]]}}
        ]
    }"#;

    #[test]
    fn reads_streets_and_splits_parts() {
        let streets = streets_from_geojson(STREETS, &InputOptions::default()).unwrap();
        let ids: Vec<&str> = streets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "7/0", "7/1"]);
        assert_eq!(streets[0].geometry.0.len(), 2);
    }

    #[test]
    fn reads_points_and_footprints() {
        let source = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"population": 4},
                 "geometry": {"type": "Point", "coordinates": [10, 5]}},
                {"type": "Feature", "properties": {"id": "barn"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0, 0], [4, 0], [4, 2], [0, 2], [0, 0]]]}}
            ]
        }"#;
        let options = InputOptions {
            default_population: Some(2.5),
            ..InputOptions::default()
        };
        let buildings = buildings_from_geojson(source, &options).unwrap();

        assert_eq!(buildings[0].id, "0");
        assert!((buildings[0].population - 4.0).abs() < f64::EPSILON);
        assert_eq!(buildings[1].id, "barn");
        assert!((buildings[1].position.x() - 2.0).abs() < 1e-9);
        assert!((buildings[1].position.y() - 1.0).abs() < 1e-9);
        assert!((buildings[1].population - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_population_names_the_feature() {
        let source = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"id": "h1"},
             "geometry": {"type": "Point", "coordinates": [1, 1]}}]}"#;
        match buildings_from_geojson(source, &InputOptions::default()) {
            Err(Error::Attribute { feature, .. }) => assert_eq!(feature, "h1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_lines_as_buildings() {
        let err = buildings_from_geojson(STREETS, &InputOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Attribute { .. }));
    }

    #[test]
    fn reads_terrain_csv() {
        let csv = "x,y,z\n0,0,410.5\n25,0,411\n";
        let terrain = terrain_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(terrain.len(), 2);
        assert!((terrain[1].elevation - 411.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_terrain_row_fails() {
        let csv = "x,y,z\n0,0,high\n";
        assert!(matches!(terrain_from_csv(csv.as_bytes()), Err(Error::Csv(_))));
    }
}
