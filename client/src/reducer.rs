//! Message-to-snapshot transition rules.
//!
//! The local snapshot is server-authoritative: any message that carries a
//! snapshot replaces the whole local copy, never merging field-by-field.
//! Two signals without an embedded snapshot apply a synthetic status
//! transition instead; both are best-effort and are overwritten by the next
//! authoritative snapshot.

#[cfg(test)]
#[path = "reducer_test.rs"]
mod reducer_test;

use lobby_protocol::{LobbySnapshot, LobbyStatus, ServerMessage};

/// Compute the next snapshot from an inbound push message.
#[must_use]
pub fn apply_message(
    current: Option<LobbySnapshot>,
    message: &ServerMessage,
) -> Option<LobbySnapshot> {
    match message {
        ServerMessage::LobbyUpdate(snapshot)
        | ServerMessage::PlayerJoined(snapshot)
        | ServerMessage::PlayerLeft(snapshot)
        | ServerMessage::ReadyStatusChanged(snapshot)
        | ServerMessage::MatchStarting(snapshot)
        | ServerMessage::LobbyReady(Some(snapshot))
        | ServerMessage::LobbyCancelled(Some(snapshot)) => Some(snapshot.clone()),
        ServerMessage::LobbyReady(None) => synthetic_status(current, LobbyStatus::ReadyCheck),
        ServerMessage::LobbyCancelled(None) => synthetic_status(current, LobbyStatus::Cancelled),
        ServerMessage::PrizePoolUpdate => current,
    }
}

/// Force only the status field; a no-op without an existing snapshot.
fn synthetic_status(
    current: Option<LobbySnapshot>,
    status: LobbyStatus,
) -> Option<LobbySnapshot> {
    current.map(|mut snapshot| {
        snapshot.status = status;
        snapshot
    })
}
