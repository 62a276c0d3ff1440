use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{Map, Value, json};

use crate::geom::multilinestring_of;
use crate::table::{Labels, RoadRecord, ZoneRecord};

/// One GeoJSON feature: its geometry and raw properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self { geometry: geometry.into(), properties: Map::new() }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Numeric property, if present and a number.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// String property, if present and a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Read every feature of a FeatureCollection file.
pub fn read_geojson_file(path: &Path) -> Result<Vec<Feature>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    read_geojson_bytes(&bytes).with_context(|| format!("Failed to parse GeoJSON file: {}", path.display()))
}

/// Read every feature of a FeatureCollection.  Features without geometry
/// are skipped; a bare geometry or a single Feature is accepted too.
pub fn read_geojson_bytes(bytes: &[u8]) -> Result<Vec<Feature>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    match value["type"].as_str() {
        Some("FeatureCollection") => {
            let features = value["features"].as_array().ok_or_else(|| anyhow!("FeatureCollection without features"))?;
            features
                .iter()
                .enumerate()
                .filter(|(_, f)| !f["geometry"].is_null())
                .map(|(i, f)| parse_feature(f).with_context(|| format!("feature {i}")))
                .collect()
        }
        Some("Feature") => Ok(vec![parse_feature(&value)?]),
        Some(_) => Ok(vec![Feature::new(parse_geometry(&value)?)]),
        None => bail!("GeoJSON object without a type"),
    }
}

fn parse_feature(feature: &Value) -> Result<Feature> {
    let geometry = parse_geometry(&feature["geometry"])?;
    let properties = feature["properties"].as_object().cloned().unwrap_or_default();
    Ok(Feature { geometry, properties })
}

fn parse_geometry(geometry: &Value) -> Result<Geometry<f64>> {
    let kind = geometry["type"].as_str().ok_or_else(|| anyhow!("geometry without a type"))?;
    let coords = &geometry["coordinates"];
    Ok(match kind {
        "Point" => Geometry::Point(Point(parse_coord(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            array(coords)?.iter().map(|c| parse_coord(c).map(Point)).collect::<Result<_>>()?,
        )),
        "LineString" => Geometry::LineString(parse_line(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            array(coords)?.iter().map(parse_line).collect::<Result<_>>()?,
        )),
        "Polygon" => Geometry::Polygon(parse_polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            array(coords)?.iter().map(parse_polygon).collect::<Result<_>>()?,
        )),
        other => bail!("Unsupported geometry type: {other}"),
    })
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| anyhow!("Expected a coordinate array, got {value}"))
}

fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pair = array(value)?;
    let get = |i: usize| pair.get(i).and_then(Value::as_f64).ok_or_else(|| anyhow!("Invalid coordinate: {value}"));
    Ok(Coord { x: get(0)?, y: get(1)? })
}

fn parse_line(value: &Value) -> Result<LineString<f64>> {
    Ok(LineString(array(value)?.iter().map(parse_coord).collect::<Result<_>>()?))
}

/// Rings are closed on construction by `Polygon::new`.
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value)?.iter().map(parse_line);
    let exterior = rings.next().ok_or_else(|| anyhow!("Polygon without an exterior ring"))??;
    Ok(Polygon::new(exterior, rings.collect::<Result<_>>()?))
}

/// Polygons of the polygonal features, multipolygons exploded.
pub fn polygons_of(features: &[Feature]) -> Vec<Polygon<f64>> {
    features
        .iter()
        .flat_map(|f| match &f.geometry {
            Geometry::Polygon(p) => vec![p.clone()],
            Geometry::MultiPolygon(mp) => mp.0.clone(),
            _ => vec![],
        })
        .collect()
}

fn coord_json(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn line_json(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(coord_json).collect())
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    Value::Array(std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(line_json).collect())
}

fn geometry_json(geometry: &Geometry<f64>) -> Result<Value> {
    Ok(match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": coord_json(&p.0) }),
        Geometry::MultiPoint(mp) => {
            json!({ "type": "MultiPoint", "coordinates": mp.0.iter().map(|p| coord_json(&p.0)).collect::<Vec<_>>() })
        }
        Geometry::LineString(l) => json!({ "type": "LineString", "coordinates": line_json(l) }),
        Geometry::MultiLineString(ml) => {
            json!({ "type": "MultiLineString", "coordinates": ml.0.iter().map(line_json).collect::<Vec<_>>() })
        }
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": polygon_json(p) }),
        Geometry::MultiPolygon(mp) => {
            json!({ "type": "MultiPolygon", "coordinates": mp.0.iter().map(polygon_json).collect::<Vec<_>>() })
        }
        other => bail!("Cannot write geometry {other:?} to GeoJSON"),
    })
}

/// A FeatureCollection value.
pub fn feature_collection(features: &[Feature]) -> Result<Value> {
    let features = features
        .iter()
        .map(|f| Ok(json!({ "type": "Feature", "geometry": geometry_json(&f.geometry)?, "properties": f.properties })))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "type": "FeatureCollection", "features": features }))
}

pub fn write_geojson_file(path: &Path, features: &[Feature]) -> Result<()> {
    let bytes = serde_json::to_vec(&feature_collection(features)?).context("Failed to serialize GeoJSON")?;
    fs::write(path, bytes).with_context(|| format!("Failed to write GeoJSON file: {}", path.display()))
}

fn labels_properties(id: usize, labels: &Labels) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("id".into(), id.into());
    for (key, label) in [
        ("gen_plan", &labels.gen_plan),
        ("func_zone", &labels.func_zone),
        ("territory_zone", &labels.territory_zone),
        ("zone", &labels.zone),
    ] {
        if let Some(label) = label {
            properties.insert(key.into(), label.clone().into());
        }
    }
    properties
}

/// Zone rows as features carrying their hierarchy labels.
pub fn zone_features(zones: &[ZoneRecord]) -> Vec<Feature> {
    zones
        .iter()
        .enumerate()
        .map(|(id, z)| Feature { geometry: z.geometry.clone().into(), properties: labels_properties(id, &z.labels) })
        .collect()
}

/// Zone outlines as line features carrying the zone labels.
pub fn outline_features(zones: &[ZoneRecord]) -> Vec<Feature> {
    zones
        .iter()
        .enumerate()
        .map(|(id, z)| {
            let outline = multilinestring_of(&MultiPolygon::new(vec![z.geometry.clone()]));
            Feature { geometry: outline.into(), properties: labels_properties(id, &z.labels) }
        })
        .collect()
}

/// Road rows as features with `road_lvl` and `roads_width`.
pub fn road_features(roads: &[RoadRecord]) -> Vec<Feature> {
    roads
        .iter()
        .enumerate()
        .map(|(id, r)| {
            Feature::new(r.geometry.clone())
                .with_property("id", id)
                .with_property("road_lvl", r.level.clone())
                .with_property("roads_width", r.width)
        })
        .collect()
}
