//! Derived lobby view state.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use lobby_protocol::{LobbySnapshot, LobbyStatus};

/// Values derived from the current snapshot and the local player identity.
///
/// Always recomputed from the snapshot on read, never stored or cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LobbyView {
    /// A snapshot is present and its status is non-terminal.
    pub is_in_lobby: bool,
    /// The local player created the lobby.
    pub is_host: bool,
    /// Occupied slot count.
    pub player_count: usize,
    /// Occupied-and-ready slot count.
    pub ready_count: usize,
    /// Host may start: waiting status, enough players, everyone ready when
    /// a ready check is required.
    pub can_start: bool,
}

impl LobbyView {
    /// Project the view for `player_id` from an optional snapshot.
    #[must_use]
    pub fn project(snapshot: Option<&LobbySnapshot>, player_id: &str) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };

        let player_count = snapshot.player_count();
        let ready_count = snapshot.ready_count();
        let is_host = snapshot.creator_id == player_id;
        let everyone_ready = !snapshot.requires_ready_check || ready_count == player_count;
        let can_start = is_host
            && snapshot.status == LobbyStatus::WaitingForPlayers
            && player_count >= snapshot.min_players as usize
            && everyone_ready;

        Self {
            is_in_lobby: snapshot.status.is_active(),
            is_host,
            player_count,
            ready_count,
            can_start,
        }
    }
}
