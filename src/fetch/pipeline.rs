use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use super::{build_query, FetchError, RetryPolicy, Transport, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::models::{Mosque, OverpassResponse};
use crate::normalize::Normalizer;

/// Outcome of a successful fetch run
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub mosques: Vec<Mosque>,
    /// Endpoint whose response was used
    pub endpoint: Url,
    /// Attempts made across all endpoints, including the successful one
    pub attempts: u32,
    /// Backoff delays slept between retries, in order
    pub backoffs: Vec<Duration>,
}

/// Sequential endpoint fallback with per-endpoint retries
pub struct FetchPipeline<T> {
    transport: T,
    endpoints: Vec<Url>,
    policy: RetryPolicy,
    normalizer: Normalizer,
    query_timeout_secs: u64,
}

#[derive(Default)]
struct RunState {
    attempts: u32,
    backoffs: Vec<Duration>,
}

fn parse_response(body: &str) -> Result<OverpassResponse, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))
}

impl<T: Transport> FetchPipeline<T> {
    pub fn new(
        transport: T,
        endpoints: Vec<Url>,
        policy: RetryPolicy,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            transport,
            endpoints,
            policy,
            normalizer,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }

    /// Override the `[timeout:N]` written into the query header
    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the query body against the endpoints and normalize the first
    /// usable response.
    pub async fn fetch(&self, query_body: &str) -> Result<FetchReport, FetchError> {
        if self.endpoints.is_empty() {
            return Err(FetchError::NoEndpoints);
        }

        let query = build_query(query_body, self.query_timeout_secs);
        let mut state = RunState::default();
        let mut last_error = None;

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match self.fetch_endpoint(endpoint, &query, &mut state).await {
                Ok(response) => {
                    let mosques = self.normalizer.normalize_batch(response.into_records());
                    info!(
                        "Fetched {} mosques from {} after {} attempt(s)",
                        mosques.len(),
                        endpoint,
                        state.attempts
                    );
                    return Ok(FetchReport {
                        mosques,
                        endpoint: endpoint.clone(),
                        attempts: state.attempts,
                        backoffs: state.backoffs,
                    });
                }
                Err(e) => {
                    if index + 1 < self.endpoints.len() {
                        warn!("Endpoint {} failed ({}), falling back to next", endpoint, e);
                    } else {
                        warn!("Endpoint {} failed ({}), no endpoints left", endpoint, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(FetchError::Exhausted {
            endpoints: self.endpoints.len(),
            attempts: state.attempts,
            last: Box::new(last_error.unwrap_or(FetchError::NoEndpoints)),
        })
    }

    async fn fetch_endpoint(
        &self,
        endpoint: &Url,
        query: &str,
        state: &mut RunState,
    ) -> Result<OverpassResponse, FetchError> {
        let max_attempts = self.policy.attempts_per_endpoint();
        let mut attempt = 0;

        loop {
            attempt += 1;
            state.attempts += 1;

            let result = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.transport.post_query(endpoint, query),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.policy.attempt_timeout)),
            };

            let err = match result.and_then(|body| parse_response(&body)) {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            // Parse failures mean the endpoint answered; asking again won't help
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                "Attempt {}/{} against {} failed ({}), retrying in {:?}",
                attempt, max_attempts, endpoint, err, delay
            );
            state.backoffs.push(delay);
            tokio::time::sleep(delay).await;
        }
    }
}
