use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use lobby_protocol::{LobbyStatus, PlayerSlot};

use super::*;
use crate::api::LobbyStats;

#[derive(Default)]
struct MockApi {
    lobby: Mutex<Option<LobbySnapshot>>,
    fail_mutations: AtomicBool,
    fail_get: AtomicBool,
    get_calls: AtomicUsize,
}

impl MockApi {
    fn with_lobby(snapshot: LobbySnapshot) -> Arc<Self> {
        let api = Self::default();
        *lock(&api.lobby) = Some(snapshot);
        Arc::new(api)
    }

    fn set_lobby(&self, snapshot: LobbySnapshot) {
        *lock(&self.lobby) = Some(snapshot);
    }

    fn current(&self) -> Option<LobbySnapshot> {
        lock(&self.lobby).clone()
    }

    fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn rejection(operation: &'static str) -> ClientError {
        ClientError::Api { operation, message: "lobby is full".to_owned() }
    }

    fn mutation(&self, operation: &'static str) -> Result<LobbySnapshot, ClientError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejection(operation));
        }
        self.current().ok_or(Self::rejection(operation))
    }
}

#[async_trait]
impl LobbyApi for MockApi {
    async fn create(&self, _request: &CreateLobbyRequest) -> Result<LobbySnapshot, ClientError> {
        self.mutation("create lobby")
    }

    async fn get(&self, _lobby_id: &str) -> Result<Option<LobbySnapshot>, ClientError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::rejection("get lobby"));
        }
        Ok(self.current())
    }

    async fn join(
        &self,
        _lobby_id: &str,
        _player_id: &str,
        _mmr: Option<u32>,
    ) -> Result<LobbySnapshot, ClientError> {
        self.mutation("join lobby")
    }

    async fn leave(&self, _lobby_id: &str, _player_id: &str) -> Result<(), ClientError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejection("leave lobby"));
        }
        Ok(())
    }

    async fn set_ready(
        &self,
        _lobby_id: &str,
        _player_id: &str,
        _ready: bool,
    ) -> Result<LobbySnapshot, ClientError> {
        self.mutation("set ready")
    }

    async fn start(&self, _lobby_id: &str) -> Result<LobbySnapshot, ClientError> {
        self.mutation("start match")
    }

    async fn cancel(&self, _lobby_id: &str) -> Result<(), ClientError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejection("cancel lobby"));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LobbySnapshot>, ClientError> {
        Ok(self.current().into_iter().collect())
    }

    async fn stats(&self) -> Result<LobbyStats, ClientError> {
        Ok(LobbyStats::default())
    }
}

fn sync_for(api: &Arc<MockApi>, player_id: &str) -> LobbySync {
    let api: Arc<dyn LobbyApi> = Arc::clone(api) as Arc<dyn LobbyApi>;
    LobbySync::new(api, LobbySyncConfig::new(player_id))
}

fn waiting_snapshot() -> LobbySnapshot {
    LobbySnapshot {
        id: "L1".to_owned(),
        status: LobbyStatus::WaitingForPlayers,
        creator_id: "p1".to_owned(),
        min_players: 2,
        requires_ready_check: true,
        player_slots: vec![
            PlayerSlot { player_id: Some("p1".to_owned()), is_ready: false },
            PlayerSlot::empty(),
        ],
    }
}

fn both_ready_snapshot() -> LobbySnapshot {
    LobbySnapshot {
        player_slots: vec![
            PlayerSlot { player_id: Some("p1".to_owned()), is_ready: true },
            PlayerSlot { player_id: Some("p2".to_owned()), is_ready: true },
        ],
        ..waiting_snapshot()
    }
}

fn create_request() -> CreateLobbyRequest {
    CreateLobbyRequest {
        creator_id: "p1".to_owned(),
        min_players: 2,
        requires_ready_check: true,
        game_mode: None,
        region: None,
    }
}

#[tokio::test(start_paused = true)]
async fn create_then_poll_until_can_start() {
    let api = MockApi::with_lobby(waiting_snapshot());
    let sync = sync_for(&api, "p1");

    sync.create_lobby(create_request()).await;
    assert_eq!(sync.snapshot(), Some(waiting_snapshot()));
    assert!(sync.error().is_none());
    assert!(!sync.is_loading());
    assert!(!sync.view().can_start);

    // Second player joins and both ready up between polls.
    api.set_lobby(both_ready_snapshot());
    tokio::time::sleep(Duration::from_millis(4500)).await;

    let view = sync.view();
    assert!(view.is_host);
    assert_eq!(view.player_count, 2);
    assert_eq!(view.ready_count, 2);
    assert!(view.can_start);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_on_terminal_status() {
    let api = MockApi::with_lobby(LobbySnapshot {
        status: LobbyStatus::Completed,
        ..waiting_snapshot()
    });
    let sync = sync_for(&api, "p1");

    sync.subscribe("L1");
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(api.get_calls(), 1);
    let snapshot = sync.snapshot().expect("snapshot");
    assert_eq!(snapshot.status, LobbyStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn poll_failures_keep_the_cadence() {
    let api = MockApi::with_lobby(waiting_snapshot());
    api.fail_get.store(true, Ordering::SeqCst);
    let sync = sync_for(&api, "p1");

    sync.subscribe("L1");
    tokio::time::sleep(Duration::from_millis(4500)).await;

    assert!(api.get_calls() >= 3);
    assert!(sync.snapshot().is_none());
}

#[tokio::test]
async fn rejected_join_preserves_snapshot_and_sets_error() {
    let api = Arc::new(MockApi::default());
    api.fail_mutations.store(true, Ordering::SeqCst);
    let sync = sync_for(&api, "p1");

    let existing = waiting_snapshot();
    sync.apply_push(&ServerMessage::LobbyUpdate(existing.clone()));

    sync.join_lobby("L2", "p1", Some(1200)).await;

    assert_eq!(sync.snapshot(), Some(existing));
    let error = sync.error().expect("error should be set");
    assert!(!error.is_empty());
    assert!(!sync.is_loading());

    sync.clear_error();
    assert!(sync.error().is_none());
}

#[tokio::test]
async fn failed_create_leaves_mirror_empty() {
    let api = Arc::new(MockApi::default());
    api.fail_mutations.store(true, Ordering::SeqCst);
    let sync = sync_for(&api, "p1");

    sync.create_lobby(create_request()).await;

    assert!(sync.snapshot().is_none());
    assert!(sync.error().is_some());
}

#[tokio::test(start_paused = true)]
async fn leave_stops_polling_and_destroys_mirror() {
    let api = MockApi::with_lobby(waiting_snapshot());
    let sync = sync_for(&api, "p1");

    sync.subscribe("L1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sync.snapshot().is_some());

    sync.leave_lobby("L1").await;
    assert!(sync.snapshot().is_none());

    let calls = api.get_calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.get_calls(), calls);
}

#[tokio::test]
async fn set_ready_adopts_returned_snapshot() {
    let api = MockApi::with_lobby(both_ready_snapshot());
    let sync = sync_for(&api, "p2");

    sync.set_ready("L1", "p2", true).await;

    assert_eq!(sync.snapshot(), Some(both_ready_snapshot()));
    assert!(sync.error().is_none());
}

#[tokio::test]
async fn refresh_failure_is_silent() {
    let api = Arc::new(MockApi::default());
    api.fail_get.store(true, Ordering::SeqCst);
    let sync = sync_for(&api, "p1");

    sync.refresh_lobby("L1").await;

    assert!(sync.error().is_none());
    assert!(sync.snapshot().is_none());
}

#[tokio::test]
async fn refresh_adopts_present_snapshot() {
    let api = MockApi::with_lobby(waiting_snapshot());
    let sync = sync_for(&api, "p1");

    sync.refresh_lobby("L1").await;

    assert_eq!(sync.snapshot(), Some(waiting_snapshot()));
}

#[tokio::test]
async fn push_ready_signal_applies_synthetic_transition() {
    let api = Arc::new(MockApi::default());
    let sync = sync_for(&api, "p1");

    sync.apply_push(&ServerMessage::LobbyUpdate(waiting_snapshot()));
    sync.apply_push(&ServerMessage::LobbyReady(None));

    let snapshot = sync.snapshot().expect("snapshot");
    assert_eq!(snapshot.status, LobbyStatus::ReadyCheck);
    assert_eq!(snapshot.player_slots, waiting_snapshot().player_slots);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_destroys_mirror() {
    let api = MockApi::with_lobby(waiting_snapshot());
    let sync = sync_for(&api, "p1");

    sync.subscribe("L1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sync.snapshot().is_some());

    sync.unsubscribe();
    assert!(sync.snapshot().is_none());
}
