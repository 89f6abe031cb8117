//! Lobby sync core: action dispatch plus the polling backstop.
//!
//! [`LobbySync`] mirrors one server-authoritative lobby. Actions call the
//! injected [`LobbyApi`] and adopt the returned snapshot; the poller re-fetches
//! on a fixed cadence and self-cancels once the lobby reaches a terminal
//! status. Push messages are folded in through [`crate::reducer`].
//!
//! ERROR HANDLING
//! ==============
//! No action propagates an error to the caller. Failures are reduced to the
//! single readable `error` slot (refresh logs silently instead); the consumer
//! decides whether to retry.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lobby_protocol::{LobbySnapshot, ServerMessage};

use crate::api::{CreateLobbyRequest, LobbyApi};
use crate::error::ClientError;
use crate::reducer::apply_message;
use crate::task::ScheduledTask;
use crate::view::LobbyView;

/// Fixed polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Settings for [`LobbySync::new`].
#[derive(Clone, Debug)]
pub struct LobbySyncConfig {
    /// Local player identity; used for host/readiness projection and leave.
    pub player_id: String,
    /// Poll cadence for the pull channel.
    pub poll_interval: Duration,
}

impl LobbySyncConfig {
    /// Defaults: 2000 ms poll interval.
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        Self { player_id: player_id.into(), poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

#[derive(Debug, Default)]
struct SyncState {
    snapshot: Option<LobbySnapshot>,
    error: Option<String>,
    is_loading: bool,
}

/// Client-side mirror of one lobby.
pub struct LobbySync {
    api: Arc<dyn LobbyApi>,
    player_id: String,
    poll_interval: Duration,
    state: Arc<Mutex<SyncState>>,
    poller: Mutex<ScheduledTask>,
}

impl LobbySync {
    /// Build a sync instance over an injected API client.
    #[must_use]
    pub fn new(api: Arc<dyn LobbyApi>, config: LobbySyncConfig) -> Self {
        Self {
            api,
            player_id: config.player_id,
            poll_interval: config.poll_interval,
            state: Arc::new(Mutex::new(SyncState::default())),
            poller: Mutex::new(ScheduledTask::idle()),
        }
    }

    /// Current snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<LobbySnapshot> {
        lock(&self.state).snapshot.clone()
    }

    /// Derived view for the local player, recomputed on every call.
    #[must_use]
    pub fn view(&self) -> LobbyView {
        LobbyView::project(lock(&self.state).snapshot.as_ref(), &self.player_id)
    }

    /// Last action failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Whether an action is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        lock(&self.state).is_loading
    }

    /// Clear the action failure slot.
    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    /// Local player identity.
    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Create a lobby, adopt the returned snapshot, and begin polling it.
    pub async fn create_lobby(&self, request: CreateLobbyRequest) {
        self.begin_action();
        match self.api.create(&request).await {
            Ok(snapshot) => {
                let lobby_id = snapshot.id.clone();
                self.adopt(snapshot);
                self.start_polling(lobby_id);
            }
            Err(error) => self.fail_action("create lobby", &error),
        }
        self.end_action();
    }

    /// Join a lobby, adopt the returned snapshot, and begin polling it.
    pub async fn join_lobby(&self, lobby_id: &str, player_id: &str, mmr: Option<u32>) {
        self.begin_action();
        match self.api.join(lobby_id, player_id, mmr).await {
            Ok(snapshot) => {
                let lobby_id = snapshot.id.clone();
                self.adopt(snapshot);
                self.start_polling(lobby_id);
            }
            Err(error) => self.fail_action("join lobby", &error),
        }
        self.end_action();
    }

    /// Leave the lobby; on success polling stops and the local mirror is
    /// destroyed (the server resource outlives it).
    pub async fn leave_lobby(&self, lobby_id: &str) {
        self.begin_action();
        match self.api.leave(lobby_id, &self.player_id).await {
            Ok(()) => {
                self.stop_polling();
                lock(&self.state).snapshot = None;
            }
            Err(error) => self.fail_action("leave lobby", &error),
        }
        self.end_action();
    }

    /// Flip a ready flag and adopt the returned snapshot.
    pub async fn set_ready(&self, lobby_id: &str, player_id: &str, ready: bool) {
        self.begin_action();
        match self.api.set_ready(lobby_id, player_id, ready).await {
            Ok(snapshot) => self.adopt(snapshot),
            Err(error) => self.fail_action("set ready", &error),
        }
        self.end_action();
    }

    /// Start the match. Host-only; the caller checks [`LobbyView::can_start`],
    /// the server enforces.
    pub async fn start_match(&self, lobby_id: &str) {
        self.begin_action();
        match self.api.start(lobby_id).await {
            Ok(snapshot) => self.adopt(snapshot),
            Err(error) => self.fail_action("start match", &error),
        }
        self.end_action();
    }

    /// Cancel the lobby; on success polling stops and the mirror is
    /// destroyed.
    pub async fn cancel_lobby(&self, lobby_id: &str) {
        self.begin_action();
        match self.api.cancel(lobby_id).await {
            Ok(()) => {
                self.stop_polling();
                lock(&self.state).snapshot = None;
            }
            Err(error) => self.fail_action("cancel lobby", &error),
        }
        self.end_action();
    }

    /// One-off refresh. Failures are logged, never surfaced to the error
    /// slot.
    pub async fn refresh_lobby(&self, lobby_id: &str) {
        match self.api.get(lobby_id).await {
            Ok(Some(snapshot)) => self.adopt(snapshot),
            Ok(None) => {}
            Err(error) => {
                tracing::debug!(error = %error, lobby_id, "lobby refresh failed");
            }
        }
    }

    /// Begin mirroring `lobby_id`: one immediate fetch, then the fixed
    /// cadence until the lobby goes terminal.
    pub fn subscribe(&self, lobby_id: impl Into<String>) {
        self.start_polling(lobby_id.into());
    }

    /// Stop polling and destroy the local mirror.
    pub fn unsubscribe(&self) {
        self.stop_polling();
        lock(&self.state).snapshot = None;
    }

    /// Fold a push message into the mirror.
    pub fn apply_push(&self, message: &ServerMessage) {
        let mut state = lock(&self.state);
        state.snapshot = apply_message(state.snapshot.take(), message);
    }

    fn start_polling(&self, lobby_id: String) {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let poll_interval = self.poll_interval;

        lock(&self.poller).spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                // First tick fires immediately.
                ticker.tick().await;
                match api.get(&lobby_id).await {
                    Ok(Some(snapshot)) => {
                        let terminal = snapshot.status.is_terminal();
                        lock(&state).snapshot = Some(snapshot);
                        if terminal {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        // Keep cadence; the next poll may succeed.
                        tracing::warn!(error = %error, lobby_id = %lobby_id, "lobby poll failed");
                    }
                }
            }
        });
    }

    fn stop_polling(&self) {
        lock(&self.poller).stop();
    }

    fn adopt(&self, snapshot: LobbySnapshot) {
        lock(&self.state).snapshot = Some(snapshot);
    }

    fn begin_action(&self) {
        let mut state = lock(&self.state);
        state.is_loading = true;
        state.error = None;
    }

    fn end_action(&self) {
        lock(&self.state).is_loading = false;
    }

    fn fail_action(&self, operation: &'static str, error: &ClientError) {
        tracing::warn!(error = %error, operation, "lobby action failed");
        lock(&self.state).error = Some(format!("{operation} failed: {error}"));
    }
}

/// Lock a mutex, recovering from poisoning. Snapshots are replaced
/// wholesale, so a poisoned cell still holds a consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
