//! Canonical mosque record produced by normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

impl FromStr for OsmType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "n" => Ok(OsmType::Node),
            "way" | "w" => Ok(OsmType::Way),
            "relation" | "r" => Ok(OsmType::Relation),
            _ => Err(()),
        }
    }
}

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point only if both components are finite and inside global bounds.
    pub fn checked(lat: f64, lon: f64) -> Option<Self> {
        let plausible = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        plausible.then_some(Self { lat, lon })
    }

    /// Bit pattern of the pair, used as the deduplication key.
    pub fn bits(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}

/// References to records in other systems, displayed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalRefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    /// Link to the source record (usually openstreetmap.org)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Descriptive fields only present in static extracts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Raw `wheelchair` classification (yes / limited / no / ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<String>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.architect.is_none()
            && self.capacity.is_none()
            && self.website.is_none()
            && self.image.is_none()
            && self.accessibility.is_none()
    }
}

/// A normalized mosque.
///
/// Built once by the normalizer and never mutated afterwards; enrichment
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mosque {
    /// OSM element ID (or the numeric part of a composite source id)
    pub id: i64,

    /// OSM object type, when the source states it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm_type: Option<OsmType>,

    /// Display name, never empty
    pub name: String,

    pub position: GeoPoint,

    /// Title-cased district, from tags or inferred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    #[serde(default)]
    pub refs: ExternalRefs,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl Mosque {
    /// Create a record with the required fields only
    pub fn new(id: i64, name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id,
            osm_type: None,
            name: name.into(),
            position,
            district: None,
            neighborhood: None,
            street: None,
            refs: ExternalRefs::default(),
            attributes: None,
        }
    }

    /// Same record with the district replaced
    pub fn with_district(self, district: Option<String>) -> Self {
        Self { district, ..self }
    }
}

/// `https://www.openstreetmap.org/{type}/{id}`
pub fn osm_url(osm_type: OsmType, id: i64) -> String {
    format!("https://www.openstreetmap.org/{}/{}", osm_type, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_point_bounds() {
        assert!(GeoPoint::checked(41.0, 29.0).is_some());
        assert!(GeoPoint::checked(91.0, 29.0).is_none());
        assert!(GeoPoint::checked(41.0, -180.5).is_none());
        assert!(GeoPoint::checked(f64::NAN, 29.0).is_none());
        assert!(GeoPoint::checked(41.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_osm_type_parse_and_url() {
        assert_eq!("Way".parse::<OsmType>(), Ok(OsmType::Way));
        assert!("area".parse::<OsmType>().is_err());
        assert_eq!(
            osm_url(OsmType::Node, 42),
            "https://www.openstreetmap.org/node/42"
        );
    }

    #[test]
    fn test_with_district_returns_new_record() {
        let original = Mosque::new(1, "Fatih Camii", GeoPoint::new(41.0195, 28.9497));
        let enriched = original.clone().with_district(Some("Fatih".to_string()));
        assert!(original.district.is_none());
        assert_eq!(enriched.district.as_deref(), Some("Fatih"));
        assert_eq!(enriched.id, original.id);
    }
}
