//! Resilient Overpass fetching.
//!
//! Endpoints are tried in order. Each one gets a bounded number of attempts
//! with exponential backoff between them, and the first endpoint that returns
//! a parseable response wins.

mod overpass;
mod pipeline;
mod retry;

pub use overpass::{
    build_query, query_body_or_default, ReqwestTransport, DEFAULT_OVERPASS_ENDPOINTS,
    DEFAULT_QUERY_BODY, DEFAULT_QUERY_TIMEOUT_SECS,
};
pub use pipeline::{FetchPipeline, FetchReport};
pub use retry::RetryPolicy;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint answered with HTTP {status}")]
    Status { status: u16 },

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("response could not be parsed: {0}")]
    Parse(String),

    #[error("all {endpoints} endpoint(s) failed after {attempts} attempt(s), last error: {last}")]
    Exhausted {
        endpoints: usize,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("no Overpass endpoints configured")]
    NoEndpoints,
}

impl FetchError {
    /// Whether another attempt against the same endpoint may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status { .. } | Self::Timeout(_)
        )
    }
}

/// Sends one Overpass query to one endpoint and returns the raw body.
///
/// Implemented over HTTP by [`ReqwestTransport`]; tests script it.
pub trait Transport: Send + Sync {
    fn post_query(
        &self,
        endpoint: &Url,
        query: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}
