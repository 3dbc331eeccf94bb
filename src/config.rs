//! TOML configuration. Every section has defaults, so an empty file is a
//! valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::district::{load_district_boundaries, DistrictResolver, PolygonResolver, ProximityResolver};
use crate::fetch::{
    FetchPipeline, ReqwestTransport, RetryPolicy, DEFAULT_OVERPASS_ENDPOINTS, DEFAULT_QUERY_BODY,
    DEFAULT_QUERY_TIMEOUT_SECS,
};
use crate::location::{LocationOptions, ISTANBUL_CENTER};
use crate::models::GeoPoint;
use crate::normalize::Normalizer;
use crate::source::{OverpassSource, StaticShape, StaticSource};
use crate::view::{clamp_list_limit, ViewState, LIST_LIMIT_DEFAULT};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub overpass: OverpassConfig,
    pub retry: RetryConfig,
    pub static_data: StaticDataConfig,
    pub districts: DistrictsConfig,
    pub location: LocationConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Overpass,
    Static,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoints: Vec<String>,
    /// Feature filter; blank means the default mosque query
    pub query: String,
    pub query_timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            query: DEFAULT_QUERY_BODY.to_string(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl OverpassConfig {
    /// Parsed endpoint list; fails on the first invalid URL
    pub fn endpoint_urls(&self) -> Result<Vec<Url>> {
        self.endpoints
            .iter()
            .map(|e| Url::parse(e).with_context(|| format!("Invalid Overpass endpoint: {e}")))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            attempt_timeout_secs: policy.attempt_timeout.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StaticDataConfig {
    pub path: Option<PathBuf>,
    pub shape: StaticShape,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistrictModel {
    #[default]
    Proximity,
    Polygon,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DistrictsConfig {
    pub model: DistrictModel,
    /// GeoJSON boundaries, required by the polygon model
    pub boundaries: Option<PathBuf>,
}

impl DistrictsConfig {
    pub fn build_resolver(&self) -> Result<Arc<dyn DistrictResolver>> {
        match self.model {
            DistrictModel::Proximity => Ok(Arc::new(ProximityResolver::istanbul())),
            DistrictModel::Polygon => {
                let Some(path) = &self.boundaries else {
                    bail!("districts.model = \"polygon\" requires districts.boundaries");
                };
                let boundaries = load_district_boundaries(path)?;
                Ok(Arc::new(PolygonResolver::build(boundaries)))
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LocationConfig {
    /// `[lat, lon]` used when no device position is available
    pub fallback: [f64; 2],
    pub timeout_ms: u64,
    pub high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        let options = LocationOptions::default();
        Self {
            fallback: [ISTANBUL_CENTER.lat, ISTANBUL_CENTER.lon],
            timeout_ms: options.timeout.as_millis() as u64,
            high_accuracy: options.high_accuracy,
        }
    }
}

impl LocationConfig {
    pub fn options(&self) -> LocationOptions {
        LocationOptions {
            high_accuracy: self.high_accuracy,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn fallback_point(&self) -> Result<GeoPoint> {
        let [lat, lon] = self.fallback;
        GeoPoint::checked(lat, lon)
            .with_context(|| format!("Invalid location.fallback: {lat}, {lon}"))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub list_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            list_limit: LIST_LIMIT_DEFAULT,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.source.kind == SourceKind::Overpass && self.overpass.endpoints.is_empty() {
            bail!("overpass.endpoints must not be empty");
        }
        self.overpass.endpoint_urls()?;
        if self.source.kind == SourceKind::Static && self.static_data.path.is_none() {
            bail!("source.kind = \"static\" requires static_data.path");
        }
        self.location.fallback_point()?;
        Ok(())
    }

    pub fn list_limit(&self) -> usize {
        clamp_list_limit(self.view.list_limit)
    }

    /// Initial view state: every district, the configured list limit
    pub fn view_state(&self) -> ViewState {
        ViewState::default().with_list_limit(self.list_limit())
    }

    pub fn normalizer(&self) -> Result<Normalizer> {
        Ok(Normalizer::new(self.districts.build_resolver()?))
    }

    /// Overpass source over HTTP with the configured endpoints and retries
    pub fn overpass_source(
        &self,
        normalizer: Normalizer,
    ) -> Result<OverpassSource<ReqwestTransport>> {
        let policy = self.retry.policy();
        let transport = ReqwestTransport::new(policy.attempt_timeout)
            .context("Failed to create HTTP client")?;
        let pipeline = FetchPipeline::new(transport, self.overpass.endpoint_urls()?, policy, normalizer)
            .with_query_timeout(self.overpass.query_timeout_secs);
        Ok(OverpassSource::new(pipeline, self.overpass.query.clone()))
    }

    pub fn static_source(&self, normalizer: Normalizer) -> Result<StaticSource> {
        let path = self
            .static_data
            .path
            .clone()
            .context("static_data.path is not set")?;
        Ok(StaticSource::new(path, self.static_data.shape, normalizer))
    }
}
