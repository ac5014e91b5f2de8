//! Semantic Scholar Graph API client
//!
//! Rate limit: ~1 request/second unauthenticated, answered with HTTP 429
//! when exceeded. An API key (sent as `x-api-key`) raises the limit.
//! API docs: https://api.semanticscholar.org/api-docs/graph

use super::DoiLookup;
use crate::error::LookupError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("citeref/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default, Deserialize)]
struct PaperResponse {
    #[serde(rename = "externalIds", default)]
    external_ids: Option<ExternalIds>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

/// Blocking client for the paper lookup endpoints
pub struct SemanticScholarClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LookupError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str, fields: &str) -> Result<reqwest::blocking::Response, LookupError> {
        let url = format!("{}/paper/{}", self.base_url, path);
        let mut request = self.client.get(&url).query(&[("fields", fields)]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(LookupError::RateLimited),
            status if !status.is_success() => Err(LookupError::Status(status.as_u16())),
            _ => Ok(response),
        }
    }

    /// DOI for a Semantic Scholar corpus id, `None` if the paper has none
    ///
    /// API endpoint: {base}/paper/CorpusID:{id}?fields=externalIds,title
    pub fn fetch_doi(&self, corpus_id: &str) -> Result<Option<String>, LookupError> {
        let response = self.get(&format!("CorpusID:{}", corpus_id), "externalIds,title")?;
        let paper: PaperResponse = response
            .json()
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        tracing::debug!(
            corpus_id,
            title = paper.title.as_deref().unwrap_or(""),
            "Semantic Scholar paper fetched"
        );
        Ok(paper.external_ids.and_then(|ids| ids.doi).filter(|d| !d.is_empty()))
    }
}

impl DoiLookup for SemanticScholarClient {
    fn lookup_doi(&self, corpus_id: &str) -> Result<Option<String>, LookupError> {
        self.fetch_doi(corpus_id)
    }
}
