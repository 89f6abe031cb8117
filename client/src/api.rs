//! HTTP resource client for lobby CRUD.
//!
//! [`LobbyApi`] is the trait seam the sync layer depends on; tests inject
//! mocks, production wires in [`HttpLobbyApi`]. The backend wraps snapshots
//! inconsistently — sometimes inline, sometimes `{ "lobby": … }` — so every
//! snapshot response goes through [`lobby_protocol::snapshot_from_payload`].

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use lobby_protocol::{LobbySnapshot, snapshot_from_payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Parameters for creating a lobby. The server assigns the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateLobbyRequest {
    /// Player creating the lobby; becomes the host.
    pub creator_id: String,
    /// Minimum occupied slots required to start.
    pub min_players: u32,
    /// Whether every player must ready up before start.
    pub requires_ready_check: bool,
    /// Optional game mode label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<String>,
    /// Optional region preference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Aggregate lobby counters reported by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStats {
    /// Lobbies currently in a non-terminal status.
    #[serde(default)]
    pub active_lobbies: u64,
    /// Players sitting in non-terminal lobbies.
    #[serde(default)]
    pub players_waiting: u64,
}

/// Remote lobby resource, as seen by the sync layer.
#[async_trait]
pub trait LobbyApi: Send + Sync {
    /// Create a lobby and return the server-assigned snapshot.
    async fn create(&self, request: &CreateLobbyRequest) -> Result<LobbySnapshot, ClientError>;
    /// Fetch the current snapshot, or `None` if the lobby is unknown.
    async fn get(&self, lobby_id: &str) -> Result<Option<LobbySnapshot>, ClientError>;
    /// Join a lobby, optionally advertising a matchmaking rating.
    async fn join(
        &self,
        lobby_id: &str,
        player_id: &str,
        mmr: Option<u32>,
    ) -> Result<LobbySnapshot, ClientError>;
    /// Leave a lobby.
    async fn leave(&self, lobby_id: &str, player_id: &str) -> Result<(), ClientError>;
    /// Flip a player's ready flag and return the resulting snapshot.
    async fn set_ready(
        &self,
        lobby_id: &str,
        player_id: &str,
        ready: bool,
    ) -> Result<LobbySnapshot, ClientError>;
    /// Start the match (host-only on the server side).
    async fn start(&self, lobby_id: &str) -> Result<LobbySnapshot, ClientError>;
    /// Cancel the lobby.
    async fn cancel(&self, lobby_id: &str) -> Result<(), ClientError>;
    /// List open lobbies.
    async fn list(&self) -> Result<Vec<LobbySnapshot>, ClientError>;
    /// Fetch aggregate lobby counters.
    async fn stats(&self) -> Result<LobbyStats, ClientError>;
}

/// [`LobbyApi`] implementation over the backend's REST surface.
#[derive(Clone, Debug)]
pub struct HttpLobbyApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLobbyApi {
    /// Build a client for the given base URL (scheme + host, no trailing
    /// slash required).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client: reqwest::Client::new(), base_url }
    }

    async fn request(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let request = self.client.request(method, &url);
        let request = if let Some(json) = body {
            request.json(&json)
        } else {
            request
        };

        let response = request.send().await?;
        let status = response.status();
        let value = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Null);

        if !status.is_success() {
            return Err(ClientError::Api {
                operation,
                message: api_error_message(&value, status),
            });
        }

        Ok(value)
    }

    async fn snapshot_request(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<LobbySnapshot, ClientError> {
        let value = self.request(operation, method, path, body).await?;
        snapshot_from_payload(&value).ok_or(ClientError::MissingSnapshot(operation))
    }
}

#[async_trait]
impl LobbyApi for HttpLobbyApi {
    async fn create(&self, request: &CreateLobbyRequest) -> Result<LobbySnapshot, ClientError> {
        let body = serde_json::to_value(request).unwrap_or_default();
        self.snapshot_request("create lobby", reqwest::Method::POST, "/lobbies", Some(body))
            .await
    }

    async fn get(&self, lobby_id: &str) -> Result<Option<LobbySnapshot>, ClientError> {
        let url = format!("{}/lobbies/{lobby_id}", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let value = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Null);
        if !status.is_success() {
            return Err(ClientError::Api {
                operation: "get lobby",
                message: api_error_message(&value, status),
            });
        }

        Ok(snapshot_from_payload(&value))
    }

    async fn join(
        &self,
        lobby_id: &str,
        player_id: &str,
        mmr: Option<u32>,
    ) -> Result<LobbySnapshot, ClientError> {
        let mut body = serde_json::json!({ "player_id": player_id });
        if let (Some(map), Some(mmr)) = (body.as_object_mut(), mmr) {
            map.insert("mmr".to_owned(), Value::from(mmr));
        }
        let path = format!("/lobbies/{lobby_id}/join");
        self.snapshot_request("join lobby", reqwest::Method::POST, &path, Some(body))
            .await
    }

    async fn leave(&self, lobby_id: &str, player_id: &str) -> Result<(), ClientError> {
        let body = serde_json::json!({ "player_id": player_id });
        let path = format!("/lobbies/{lobby_id}/leave");
        self.request("leave lobby", reqwest::Method::POST, &path, Some(body))
            .await?;
        Ok(())
    }

    async fn set_ready(
        &self,
        lobby_id: &str,
        player_id: &str,
        ready: bool,
    ) -> Result<LobbySnapshot, ClientError> {
        let body = serde_json::json!({ "player_id": player_id, "is_ready": ready });
        let path = format!("/lobbies/{lobby_id}/ready");
        self.snapshot_request("set ready", reqwest::Method::POST, &path, Some(body))
            .await
    }

    async fn start(&self, lobby_id: &str) -> Result<LobbySnapshot, ClientError> {
        let path = format!("/lobbies/{lobby_id}/start");
        self.snapshot_request("start match", reqwest::Method::POST, &path, None)
            .await
    }

    async fn cancel(&self, lobby_id: &str) -> Result<(), ClientError> {
        let path = format!("/lobbies/{lobby_id}/cancel");
        self.request("cancel lobby", reqwest::Method::POST, &path, None)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LobbySnapshot>, ClientError> {
        let value = self
            .request("list lobbies", reqwest::Method::GET, "/lobbies", None)
            .await?;
        let items = value.get("lobbies").cloned().unwrap_or(value);
        Ok(serde_json::from_value(items).unwrap_or_default())
    }

    async fn stats(&self) -> Result<LobbyStats, ClientError> {
        let value = self
            .request("lobby stats", reqwest::Method::GET, "/lobbies/stats", None)
            .await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }
}

/// Rewrite an HTTP base URL into the WebSocket endpoint URL.
///
/// # Errors
///
/// Returns [`ClientError::InvalidBaseUrl`] when the scheme is neither
/// `http://` nor `https://`.
pub fn ws_url(base_url: &str) -> Result<String, ClientError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws"));
    }

    Err(ClientError::InvalidBaseUrl(base_url.to_owned()))
}

fn api_error_message(value: &Value, status: reqwest::StatusCode) -> String {
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map_or_else(
            || format!("HTTP {}: {value}", status.as_u16()),
            ToOwned::to_owned,
        )
}
