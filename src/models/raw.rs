//! Raw input shapes accepted by the normalizer.
//!
//! Every source is decoded into one [`RawRecord`] variant; coordinates are
//! kept as untyped JSON so a malformed record is rejected on its own instead
//! of failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form key/value bag (OSM tags or GeoJSON properties)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Tags(Map<String, Value>);

impl Tags {
    /// Value for `key` as text. Empty strings count as absent; numbers and
    /// booleans are rendered as text.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// First present key in priority order
    pub fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Nested center returned by `out center` for ways and relations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassCenter {
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
}

/// One element of an Overpass `elements` array
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    #[serde(default)]
    pub center: Option<OverpassCenter>,
    #[serde(default)]
    pub tags: Tags,
}

/// Overpass JSON response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Elements are decoded one by one so a single odd element is dropped
    /// rather than failing the response.
    pub elements: Vec<Value>,
}

impl OverpassResponse {
    pub fn into_records(self) -> Vec<RawRecord> {
        self.elements
            .into_iter()
            .filter_map(|v| serde_json::from_value::<OverpassElement>(v).ok())
            .map(RawRecord::Overpass)
            .collect()
    }
}

/// Flat row from a pre-fetched extract
#[derive(Debug, Clone, Deserialize)]
pub struct FlatRow {
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default)]
    pub osm_id: Option<Value>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub tags: Tags,
}

/// GeoJSON Point feature with a property bag
#[derive(Debug, Clone, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Tags,
}

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Value>,
}

/// Entry of a snapshot document written by the `snapshot` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub id: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub osm_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lat: Value,
    #[serde(default)]
    pub lon: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_url: Option<String>,
}

/// A record in one of the supported source shapes
#[derive(Debug, Clone)]
pub enum RawRecord {
    Overpass(OverpassElement),
    Flat(FlatRow),
    Feature(GeoJsonFeature),
    Snapshot(SnapshotEntry),
}

/// Strictly numeric JSON value. Numeric strings do not count.
pub fn as_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

/// Numeric id from a number, a numeric string or a composite id such as
/// `"node/123"`.
pub fn extract_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.rsplit('/').next()?.trim().parse().ok(),
        _ => None,
    }
}

/// Type prefix of a composite id (`"way/5"` -> `"way"`)
pub fn composite_type(value: &Value) -> Option<&str> {
    let (prefix, _) = value.as_str()?.split_once('/')?;
    Some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_treat_empty_as_absent() {
        let tags: Tags = serde_json::from_value(json!({
            "name:tr": "",
            "name": "Sokullu Mehmed Paşa Camii",
            "capacity": 800,
        }))
        .unwrap();
        assert_eq!(
            tags.first_of(&["name:tr", "name"]).as_deref(),
            Some("Sokullu Mehmed Paşa Camii")
        );
        assert_eq!(tags.get("capacity").as_deref(), Some("800"));
        assert_eq!(tags.get("missing"), None);
    }

    #[test]
    fn test_extract_id_variants() {
        assert_eq!(extract_id(&json!(17)), Some(17));
        assert_eq!(extract_id(&json!("node/123")), Some(123));
        assert_eq!(extract_id(&json!("456")), Some(456));
        assert_eq!(extract_id(&json!("node/abc")), None);
        assert_eq!(extract_id(&json!(null)), None);
        assert_eq!(composite_type(&json!("way/5")), Some("way"));
        assert_eq!(composite_type(&json!(5)), None);
    }

    #[test]
    fn test_numeric_strings_are_not_numbers() {
        assert_eq!(as_number(Some(&json!(41.5))), Some(41.5));
        assert_eq!(as_number(Some(&json!("41.5"))), None);
        assert_eq!(as_number(Some(&json!(null))), None);
        assert_eq!(as_number(None), None);
    }

    #[test]
    fn test_overpass_response_drops_undecodable_elements() {
        let response: OverpassResponse = serde_json::from_value(json!({
            "elements": [
                { "type": "node", "id": 1, "lat": 41.0, "lon": 29.0 },
                { "type": "node", "id": "not-a-number" },
                { "type": "way", "id": 2, "center": { "lat": 41.1, "lon": 29.1 } }
            ]
        }))
        .unwrap();
        assert_eq!(response.into_records().len(), 2);
    }
}
