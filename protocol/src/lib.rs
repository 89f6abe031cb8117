//! Shared lobby wire model for the realtime sync client.
//!
//! This crate owns the JSON representation exchanged with the lobby backend:
//! the server-authoritative [`LobbySnapshot`], the closed set of inbound
//! [`ServerMessage`] variants, and the outbound [`ClientMessage`] subscription
//! commands. Decoding fails closed: anything that does not match a known
//! message shape becomes a [`DecodeError`] so the transport can log and drop
//! it without guessing.
//!
//! The backend emits message type tags in two casings (`lobby_update` vs
//! `LOBBY_UPDATED`). Both are matched as literal strings and mapped onto the
//! same variants; no normalization is attempted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error returned by [`decode_message`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The raw text could not be parsed as JSON.
    #[error("failed to parse message JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The message object has no string `type` field.
    #[error("message has no `type` field")]
    MissingType,
    /// The `type` tag does not belong to the known message set.
    #[error("unrecognized message type `{0}`")]
    UnknownType(String),
    /// A snapshot-bearing message carried no decodable lobby payload.
    #[error("message `{0}` carries no lobby snapshot")]
    MissingSnapshot(String),
}

/// Lifecycle status of a lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    /// Open and accepting players.
    WaitingForPlayers,
    /// Enough players gathered; waiting on ready confirmations.
    ReadyCheck,
    /// Match launch in progress.
    Starting,
    /// Match underway.
    InProgress,
    /// Match finished normally.
    Completed,
    /// Lobby cancelled before start.
    Cancelled,
    /// Lobby timed out.
    Expired,
}

impl LobbyStatus {
    /// Whether no further transitions can occur from this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Whether the lobby is still live (pre-terminal).
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// One position in a lobby, either empty (`player_id: null`) or occupied.
///
/// Slot order is meaningful and preserved across snapshot updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Occupying player, if any.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Ready flag; only meaningful while the slot is occupied.
    #[serde(default)]
    pub is_ready: bool,
}

impl PlayerSlot {
    /// An unoccupied slot.
    #[must_use]
    pub fn empty() -> Self {
        Self { player_id: None, is_ready: false }
    }

    /// A slot occupied by `player_id`, not yet ready.
    #[must_use]
    pub fn occupied(player_id: impl Into<String>) -> Self {
        Self { player_id: Some(player_id.into()), is_ready: false }
    }
}

/// Full server-authoritative state of one lobby.
///
/// Snapshots always replace prior local state wholesale; they are never
/// merged field-by-field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    /// Opaque identifier, stable for the lobby lifetime.
    pub id: String,
    /// Current lifecycle status.
    pub status: LobbyStatus,
    /// Player allowed to issue host-only actions.
    pub creator_id: String,
    /// Minimum occupied slots required to start. Immutable after creation.
    pub min_players: u32,
    /// Whether every player must ready up before start. Immutable.
    #[serde(default)]
    pub requires_ready_check: bool,
    /// Ordered slot sequence.
    pub player_slots: Vec<PlayerSlot>,
}

impl LobbySnapshot {
    /// Count of occupied slots.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_slots
            .iter()
            .filter(|slot| slot.player_id.is_some())
            .count()
    }

    /// Count of occupied slots whose player is ready.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.player_slots
            .iter()
            .filter(|slot| slot.player_id.is_some() && slot.is_ready)
            .count()
    }
}

/// Inbound server message, decoded from a literal `type` tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Fresh authoritative snapshot (`lobby_update`, `LOBBY_UPDATED`,
    /// `LOBBY_CREATED`).
    LobbyUpdate(LobbySnapshot),
    /// A player joined; wraps the post-join snapshot (`player_joined`).
    PlayerJoined(LobbySnapshot),
    /// A player left; wraps the post-leave snapshot (`player_left`).
    PlayerLeft(LobbySnapshot),
    /// A ready flag flipped; wraps the resulting snapshot
    /// (`ready_status_changed`).
    ReadyStatusChanged(LobbySnapshot),
    /// Match launch announced; wraps the starting snapshot
    /// (`match_starting`).
    MatchStarting(LobbySnapshot),
    /// Readiness achieved (`LOBBY_READY`). The snapshot is optional; without
    /// one the client applies a synthetic `ready_check` transition.
    LobbyReady(Option<LobbySnapshot>),
    /// Lobby cancelled (`LOBBY_CANCELLED`). Snapshot optional, as above.
    LobbyCancelled(Option<LobbySnapshot>),
    /// Prize pool changed (`prize_pool_update`). Recognized but irrelevant
    /// to lobby sync.
    PrizePoolUpdate,
}

/// Outbound subscription command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the server to push updates for one lobby.
    SubscribeLobby {
        /// Lobby to follow.
        lobby_id: String,
    },
    /// Stop pushing lobby updates.
    UnsubscribeLobby,
}

impl ClientMessage {
    /// Serialize to the wire text form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serializing a unit/struct enum over infallible writers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decode an inbound text frame into a [`ServerMessage`].
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for unparseable text,
/// [`DecodeError::MissingType`] when the `type` tag is absent,
/// [`DecodeError::UnknownType`] for tags outside the known set, and
/// [`DecodeError::MissingSnapshot`] when a snapshot-bearing message has no
/// decodable lobby payload.
pub fn decode_message(text: &str) -> Result<ServerMessage, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Err(DecodeError::MissingType);
    };

    match tag {
        "lobby_update" | "LOBBY_UPDATED" | "LOBBY_CREATED" => {
            Ok(ServerMessage::LobbyUpdate(require_snapshot(tag, &value)?))
        }
        "player_joined" => Ok(ServerMessage::PlayerJoined(require_snapshot(tag, &value)?)),
        "player_left" => Ok(ServerMessage::PlayerLeft(require_snapshot(tag, &value)?)),
        "ready_status_changed" => Ok(ServerMessage::ReadyStatusChanged(require_snapshot(
            tag, &value,
        )?)),
        "match_starting" => Ok(ServerMessage::MatchStarting(require_snapshot(tag, &value)?)),
        "LOBBY_READY" => Ok(ServerMessage::LobbyReady(snapshot_from_payload(&value))),
        "LOBBY_CANCELLED" => Ok(ServerMessage::LobbyCancelled(snapshot_from_payload(&value))),
        "prize_pool_update" => Ok(ServerMessage::PrizePoolUpdate),
        other => Err(DecodeError::UnknownType(other.to_owned())),
    }
}

/// Extract a lobby snapshot from a message payload.
///
/// Accepts either the `{ "lobby": … }` envelope or a snapshot inlined into
/// the message object itself (the backend uses both shapes).
#[must_use]
pub fn snapshot_from_payload(value: &Value) -> Option<LobbySnapshot> {
    if let Some(wrapped) = value.get("lobby") {
        return serde_json::from_value(wrapped.clone()).ok();
    }

    let mut inline = value.clone();
    if let Some(map) = inline.as_object_mut() {
        map.remove("type");
    }
    serde_json::from_value(inline).ok()
}

fn require_snapshot(tag: &str, value: &Value) -> Result<LobbySnapshot, DecodeError> {
    snapshot_from_payload(value).ok_or_else(|| DecodeError::MissingSnapshot(tag.to_owned()))
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
