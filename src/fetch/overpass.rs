//! Overpass QL query construction and the HTTP transport.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{FetchError, Transport};

/// Public Overpass interpreters tried in order
pub const DEFAULT_OVERPASS_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

/// Feature filter selecting every mosque inside the Istanbul area
pub const DEFAULT_QUERY_BODY: &str = r#"nwr["amenity"="place_of_worship"]["religion"="muslim"](area.istanbul);
nwr["building"="mosque"](area.istanbul);"#;

/// Server-side evaluation limit written into the query header
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

const USER_AGENT: &str = concat!("minaret/", env!("CARGO_PKG_VERSION"));

/// The given body, or the default mosque filter when it is blank
pub fn query_body_or_default(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        DEFAULT_QUERY_BODY
    } else {
        trimmed
    }
}

/// Wrap a feature filter into a complete query scoped to Istanbul that
/// returns JSON with a center for ways and relations.
pub fn build_query(body: &str, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\n\
         area[\"name\"=\"İstanbul\"][\"admin_level\"=\"4\"]->.istanbul;\n\
         \n\
         (\n\
         {}\n\
         );\n\
         \n\
         out center tags;\n",
        query_body_or_default(body)
    )
}

/// Form-encoded POST over reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn form_body(query: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("data", query)
        .finish()
}

impl Transport for ReqwestTransport {
    async fn post_query(&self, endpoint: &Url, query: &str) -> Result<String, FetchError> {
        debug!("POST {} ({} byte query)", endpoint, query.len());

        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(query))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_body_falls_back_to_default() {
        assert_eq!(query_body_or_default(""), DEFAULT_QUERY_BODY);
        assert_eq!(query_body_or_default(" \n\t"), DEFAULT_QUERY_BODY);
        assert_eq!(
            query_body_or_default("  node[\"amenity\"=\"place_of_worship\"];  "),
            "node[\"amenity\"=\"place_of_worship\"];"
        );
    }

    #[test]
    fn test_build_query_wraps_body() {
        let query = build_query("node(1);", 25);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("area[\"name\"=\"İstanbul\"][\"admin_level\"=\"4\"]->.istanbul;"));
        assert!(query.contains("(\nnode(1);\n);"));
        assert!(query.trim_end().ends_with("out center tags;"));
    }

    #[test]
    fn test_build_query_default_body() {
        let query = build_query("", DEFAULT_QUERY_TIMEOUT_SECS);
        assert!(query.contains("[timeout:60]"));
        assert!(query.contains("nwr[\"building\"=\"mosque\"](area.istanbul);"));
    }

    #[test]
    fn test_form_body_encodes_query() {
        let body = form_body("[out:json];node(1);");
        assert_eq!(body, "data=%5Bout%3Ajson%5D%3Bnode%281%29%3B");
    }

    #[test]
    fn test_default_endpoints_are_urls() {
        for endpoint in DEFAULT_OVERPASS_ENDPOINTS {
            assert!(Url::parse(endpoint).is_ok(), "{endpoint}");
        }
    }
}
