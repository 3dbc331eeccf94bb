//! District boundary polygons loaded from GeoJSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo::BoundingRect;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// A named district polygon (x = lon, y = lat)
#[derive(Debug, Clone)]
pub struct DistrictBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl DistrictBoundary {
    pub fn new(name: &str, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.to_string(),
            geometry,
        }
    }

    /// Single-ring boundary from `(lat, lon)` pairs
    pub fn from_lat_lon(name: &str, ring: &[(f64, f64)]) -> Self {
        let coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|(lat, lon)| Coord { x: *lon, y: *lat })
            .collect();
        let polygon = Polygon::new(LineString::new(coords), vec![]);
        Self::new(name, MultiPolygon::new(vec![polygon]))
    }

    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

#[derive(Debug, Deserialize)]
struct BoundaryCollection {
    features: Vec<BoundaryFeature>,
}

#[derive(Debug, Deserialize)]
struct BoundaryFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

type Ring = Vec<[f64; 2]>;

fn to_polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings
        .into_iter()
        .map(|ring| LineString::new(ring.into_iter().map(|[x, y]| Coord { x, y }).collect()));
    let exterior = rings.next()?;
    if exterior.0.len() < 3 {
        return None;
    }
    Some(Polygon::new(exterior, rings.collect()))
}

/// Polygons of a GeoJSON geometry object; anything but (Multi)Polygon is empty
fn polygons_of(mut geometry: Value) -> Vec<Polygon<f64>> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let coordinates = geometry
        .get_mut("coordinates")
        .map(Value::take)
        .unwrap_or(Value::Null);

    match kind.as_str() {
        "Polygon" => serde_json::from_value::<Vec<Ring>>(coordinates)
            .ok()
            .and_then(to_polygon)
            .into_iter()
            .collect(),
        "MultiPolygon" => serde_json::from_value::<Vec<Vec<Ring>>>(coordinates)
            .map(|parts| parts.into_iter().filter_map(to_polygon).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Parse a FeatureCollection of district polygons, keeping file order.
///
/// Features without a `name` property or without a (Multi)Polygon geometry
/// are skipped.
pub fn parse_district_boundaries(json: &str) -> Result<Vec<DistrictBoundary>> {
    let collection: BoundaryCollection =
        serde_json::from_str(json).context("Failed to parse district boundary GeoJSON")?;

    let mut boundaries = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let name = match name {
            Some(n) => n.to_string(),
            None => {
                debug!("Skipping boundary feature {} without a name", index);
                continue;
            }
        };

        let polygons = feature.geometry.map(polygons_of).unwrap_or_default();

        if polygons.is_empty() {
            debug!("Skipping boundary {} without polygon geometry", name);
            continue;
        }

        boundaries.push(DistrictBoundary {
            name,
            geometry: MultiPolygon::new(polygons),
        });
    }

    info!("Loaded {} district boundaries", boundaries.len());

    Ok(boundaries)
}

pub fn load_district_boundaries<P: AsRef<Path>>(path: P) -> Result<Vec<DistrictBoundary>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read district boundaries {}", path.display()))?;
    parse_district_boundaries(&content)
}
