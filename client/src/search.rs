//! Cross-resource search with newest-query-wins supersession.
//!
//! A search fans out to the players, teams, and tournaments resources
//! concurrently. Each call claims a generation number; results are only
//! applied if no newer search has started since, so an older in-flight query
//! can never overwrite a newer one regardless of network resolution order.

#[cfg(test)]
#[path = "search_test.rs"]
mod search_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::sync::lock;

/// One search result row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Resource identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Aggregated results of the most recent completed search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// Query the results belong to.
    pub query: String,
    /// Player matches.
    pub players: Vec<SearchHit>,
    /// Team matches.
    pub teams: Vec<SearchHit>,
    /// Tournament matches.
    pub tournaments: Vec<SearchHit>,
    /// Whether a search is currently in flight.
    pub is_searching: bool,
}

/// Remote search surface, one call per resource type.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Search players.
    async fn players(&self, query: &str) -> Result<Vec<SearchHit>, ClientError>;
    /// Search teams.
    async fn teams(&self, query: &str) -> Result<Vec<SearchHit>, ClientError>;
    /// Search tournaments.
    async fn tournaments(&self, query: &str) -> Result<Vec<SearchHit>, ClientError>;
}

/// Fan-out search aggregator.
pub struct GlobalSearch {
    api: Arc<dyn SearchApi>,
    generation: AtomicU64,
    results: Mutex<SearchResults>,
}

impl GlobalSearch {
    /// Build an aggregator over an injected search client.
    #[must_use]
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        Self {
            api,
            generation: AtomicU64::new(0),
            results: Mutex::new(SearchResults::default()),
        }
    }

    /// Latest applied results.
    #[must_use]
    pub fn results(&self) -> SearchResults {
        lock(&self.results).clone()
    }

    /// Run a search. If another search starts before this one resolves, the
    /// late results are discarded.
    pub async fn search(&self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.results).is_searching = true;

        let (players, teams, tournaments) = tokio::join!(
            self.api.players(query),
            self.api.teams(query),
            self.api.tournaments(query),
        );

        let mut results = lock(&self.results);
        if self.generation.load(Ordering::SeqCst) != generation {
            // Superseded while in flight.
            return;
        }

        *results = SearchResults {
            query: query.to_owned(),
            players: section("players", players),
            teams: section("teams", teams),
            tournaments: section("tournaments", tournaments),
            is_searching: false,
        };
    }

    /// Discard results and invalidate any in-flight search.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.results) = SearchResults::default();
    }
}

/// A failed resource yields an empty section rather than failing the search.
fn section(resource: &'static str, result: Result<Vec<SearchHit>, ClientError>) -> Vec<SearchHit> {
    result.unwrap_or_else(|error| {
        tracing::warn!(error = %error, resource, "search resource failed");
        Vec::new()
    })
}

/// [`SearchApi`] implementation over the backend's REST surface.
#[derive(Clone, Debug)]
pub struct HttpSearchApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchApi {
    /// Build a client for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client: reqwest::Client::new(), base_url }
    }

    async fn fetch(
        &self,
        resource: &'static str,
        query: &str,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let url = format!("{}/search/{resource}", self.base_url);
        let response = self.client.get(&url).query(&[("q", query)]).send().await?;
        let status = response.status();
        let value = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Null);

        if !status.is_success() {
            return Err(ClientError::Api {
                operation: resource,
                message: format!("HTTP {}: {value}", status.as_u16()),
            });
        }

        let items = value.get("results").cloned().unwrap_or(value);
        Ok(serde_json::from_value(items).unwrap_or_default())
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn players(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.fetch("players", query).await
    }

    async fn teams(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.fetch("teams", query).await
    }

    async fn tournaments(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.fetch("tournaments", query).await
    }
}
