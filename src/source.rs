//! Where the mosque list comes from: live Overpass or a static extract.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::fetch::{FetchPipeline, FetchReport, Transport};
use crate::models::raw::FeatureCollection;
use crate::models::{osm_url, FlatRow, GeoJsonFeature, Mosque, RawRecord, SnapshotEntry};
use crate::normalize::Normalizer;

/// Produces a complete, normalized mosque list
pub trait MosqueSource: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<Vec<Mosque>>> + Send;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Live data through the Overpass pipeline
pub struct OverpassSource<T> {
    pipeline: FetchPipeline<T>,
    query_body: String,
}

impl<T: Transport> OverpassSource<T> {
    pub fn new(pipeline: FetchPipeline<T>, query_body: impl Into<String>) -> Self {
        Self {
            pipeline,
            query_body: query_body.into(),
        }
    }

    /// Fetch with the full report (endpoint, attempts, backoffs)
    pub async fn fetch_report(&self) -> Result<FetchReport> {
        self.pipeline
            .fetch(&self.query_body)
            .await
            .context("Overpass fetch failed")
    }
}

impl<T: Transport> MosqueSource for OverpassSource<T> {
    async fn load(&self) -> Result<Vec<Mosque>> {
        Ok(self.fetch_report().await?.mosques)
    }

    fn describe(&self) -> String {
        format!("overpass ({} endpoints)", self.pipeline.endpoints().len())
    }
}

/// Layout of a static extract file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticShape {
    /// Document written by [`Snapshot`]
    #[default]
    Snapshot,
    /// Array of `{osm_type, osm_id, latitude, longitude, tags}` rows
    Flat,
    /// FeatureCollection of Point features
    GeoJson,
}

#[derive(Deserialize)]
struct SnapshotDocument {
    mosques: Vec<Value>,
}

fn decode_each<T, F>(values: Vec<Value>, wrap: F) -> Vec<RawRecord>
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> RawRecord,
{
    let total = values.len();
    let records: Vec<RawRecord> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value::<T>(v).ok())
        .map(wrap)
        .collect();
    if records.len() < total {
        debug!("Skipped {} undecodable entries", total - records.len());
    }
    records
}

/// Split a static document into raw records. A single malformed entry is
/// skipped; a malformed document is an error.
pub fn parse_static_records(content: &str, shape: StaticShape) -> Result<Vec<RawRecord>> {
    let records = match shape {
        StaticShape::Snapshot => {
            let doc: SnapshotDocument =
                serde_json::from_str(content).context("Failed to parse snapshot document")?;
            decode_each::<SnapshotEntry, _>(doc.mosques, RawRecord::Snapshot)
        }
        StaticShape::Flat => {
            let rows: Vec<Value> =
                serde_json::from_str(content).context("Failed to parse flat row array")?;
            decode_each::<FlatRow, _>(rows, RawRecord::Flat)
        }
        StaticShape::GeoJson => {
            let collection: FeatureCollection =
                serde_json::from_str(content).context("Failed to parse GeoJSON FeatureCollection")?;
            decode_each::<GeoJsonFeature, _>(collection.features, RawRecord::Feature)
        }
    };
    Ok(records)
}

/// Bundled or exported extract on disk
pub struct StaticSource {
    path: PathBuf,
    shape: StaticShape,
    normalizer: Normalizer,
}

impl StaticSource {
    pub fn new(path: impl Into<PathBuf>, shape: StaticShape, normalizer: Normalizer) -> Self {
        Self {
            path: path.into(),
            shape,
            normalizer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MosqueSource for StaticSource {
    async fn load(&self) -> Result<Vec<Mosque>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read static data {}", self.path.display()))?;
        let records = parse_static_records(&content, self.shape)?;
        let mosques = self.normalizer.normalize_batch(records);
        info!(
            "Loaded {} mosques from {}",
            mosques.len(),
            self.path.display()
        );
        Ok(mosques)
    }

    fn describe(&self) -> String {
        format!("static {:?} file {}", self.shape, self.path.display())
    }
}

/// Exportable extract of a fetched list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub total_count: usize,
    pub with_district: usize,
    pub without_district: usize,
    pub mosques: Vec<SnapshotEntry>,
}

impl SnapshotEntry {
    pub fn from_mosque(mosque: &Mosque) -> Self {
        let url = mosque
            .refs
            .source_url
            .clone()
            .or_else(|| mosque.osm_type.map(|t| osm_url(t, mosque.id)));
        Self {
            id: mosque.id,
            osm_type: mosque.osm_type.map(|t| t.to_string()),
            name: mosque.name.clone(),
            lat: Value::from(mosque.position.lat),
            lon: Value::from(mosque.position.lon),
            district: mosque.district.clone(),
            neighborhood: mosque.neighborhood.clone(),
            street: mosque.street.clone(),
            wikidata: mosque.refs.wikidata.clone(),
            wikipedia: mosque.refs.wikipedia.clone(),
            osm_url: url,
        }
    }
}

impl Snapshot {
    pub fn from_mosques(mosques: &[Mosque], fetched_at: DateTime<Utc>) -> Self {
        let with_district = mosques.iter().filter(|m| m.district.is_some()).count();
        Self {
            fetched_at,
            total_count: mosques.len(),
            with_district,
            without_district: mosques.len() - with_district,
            mosques: mosques.iter().map(SnapshotEntry::from_mosque).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::district::NoResolver;
    use crate::models::{GeoPoint, OsmType};
    use chrono::TimeZone;
    use std::io::Write;
    use std::sync::Arc;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(NoResolver))
    }

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_flat_rows_skips_bad_entries() {
        let content = r#"[
            {"osm_type":"node","osm_id":1,"latitude":41.0,"longitude":29.0,"tags":{"name":"A"}},
            "not a row",
            {"osm_type":"way","osm_id":"way/2","latitude":41.1,"longitude":29.1}
        ]"#;
        let records = parse_static_records(content, StaticShape::Flat).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_rejects_wrong_document() {
        assert!(parse_static_records("{}", StaticShape::Flat).is_err());
        assert!(parse_static_records("[]", StaticShape::GeoJson).is_err());
        assert!(parse_static_records("not json", StaticShape::Snapshot).is_err());
    }

    #[tokio::test]
    async fn test_static_geojson_source() {
        let file = temp_file(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","id":"node/10",
                 "geometry":{"type":"Point","coordinates":[29.0153,41.0255]},
                 "properties":{"name":"Yeni Valide Camii","addr:district":"ÜSKÜDAR","wheelchair":"limited"}},
                {"type":"Feature","id":"node/11","geometry":null,"properties":{"name":"Kayıp"}}
            ]}"#,
        );
        let source = StaticSource::new(file.path(), StaticShape::GeoJson, normalizer());
        let mosques = source.load().await.unwrap();

        assert_eq!(mosques.len(), 1);
        let m = &mosques[0];
        assert_eq!(m.id, 10);
        assert_eq!(m.osm_type, Some(OsmType::Node));
        assert_eq!(m.district.as_deref(), Some("Üsküdar"));
        assert_eq!(
            m.attributes.as_ref().and_then(|a| a.accessibility.as_deref()),
            Some("limited")
        );
    }

    #[tokio::test]
    async fn test_missing_static_file_is_error() {
        let source = StaticSource::new("/nonexistent/mosques.json", StaticShape::Snapshot, normalizer());
        let err = source.load().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read static data"));
    }

    #[tokio::test]
    async fn test_snapshot_written_then_loaded() {
        let mut fatih = Mosque::new(7, "Fatih Camii", GeoPoint::new(41.0193, 28.9497));
        fatih.osm_type = Some(OsmType::Way);
        fatih.district = Some("Fatih".into());
        fatih.street = Some("Fevzipaşa Caddesi".into());
        fatih.refs.wikipedia = Some("tr:Fatih Camii".into());
        let unnamed = Mosque::new(8, "İsimsiz Cami", GeoPoint::new(41.05, 29.0));

        let fetched_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::from_mosques(&[fatih.clone(), unnamed], fetched_at);
        assert_eq!(snapshot.total_count, 2);
        assert_eq!(snapshot.with_district, 1);
        assert_eq!(snapshot.without_district, 1);

        let json: Value = serde_json::from_str(&snapshot.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["fetchedAt"], "2024-05-01T12:00:00Z");
        assert_eq!(json["mosques"][0]["type"], "way");
        assert_eq!(
            json["mosques"][0]["osmUrl"],
            "https://www.openstreetmap.org/way/7"
        );
        assert!(json["mosques"][1].get("district").is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mosques.json");
        snapshot.write_to(&path).unwrap();

        let source = StaticSource::new(&path, StaticShape::Snapshot, normalizer());
        let loaded = source.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        let reloaded = loaded.iter().find(|m| m.id == 7).unwrap();
        assert_eq!(reloaded.position, fatih.position);
        assert_eq!(reloaded.district.as_deref(), Some("Fatih"));
        assert_eq!(reloaded.street.as_deref(), Some("Fevzipaşa Caddesi"));
        assert_eq!(reloaded.osm_type, Some(OsmType::Way));
        assert_eq!(reloaded.refs.wikipedia.as_deref(), Some("tr:Fatih Camii"));
    }
}
