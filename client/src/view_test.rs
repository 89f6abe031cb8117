use lobby_protocol::PlayerSlot;

use super::*;

fn slots(occupied: usize, ready: usize, total: usize) -> Vec<PlayerSlot> {
    (0..total)
        .map(|index| {
            if index < occupied {
                PlayerSlot {
                    player_id: Some(format!("p{}", index + 1)),
                    is_ready: index < ready,
                }
            } else {
                PlayerSlot::empty()
            }
        })
        .collect()
}

fn snapshot(
    status: LobbyStatus,
    min_players: u32,
    requires_ready_check: bool,
    player_slots: Vec<PlayerSlot>,
) -> LobbySnapshot {
    LobbySnapshot {
        id: "lobby-1".to_owned(),
        status,
        creator_id: "p1".to_owned(),
        min_players,
        requires_ready_check,
        player_slots,
    }
}

#[test]
fn empty_state_projects_defaults() {
    let view = LobbyView::project(None, "p1");
    assert_eq!(view, LobbyView::default());
}

#[test]
fn can_start_when_full_and_all_ready_as_host() {
    let snapshot = snapshot(LobbyStatus::WaitingForPlayers, 5, true, slots(5, 5, 5));
    let view = LobbyView::project(Some(&snapshot), "p1");

    assert!(view.is_in_lobby);
    assert!(view.is_host);
    assert_eq!(view.player_count, 5);
    assert_eq!(view.ready_count, 5);
    assert!(view.can_start);
}

#[test]
fn cannot_start_with_one_player_not_ready() {
    let snapshot = snapshot(LobbyStatus::WaitingForPlayers, 5, true, slots(5, 4, 5));
    let view = LobbyView::project(Some(&snapshot), "p1");
    assert!(!view.can_start);
}

#[test]
fn cannot_start_as_non_host() {
    let snapshot = snapshot(LobbyStatus::WaitingForPlayers, 5, true, slots(5, 5, 5));
    let view = LobbyView::project(Some(&snapshot), "p2");
    assert!(view.is_in_lobby);
    assert!(!view.is_host);
    assert!(!view.can_start);
}

#[test]
fn cannot_start_outside_waiting_status() {
    let snapshot = snapshot(LobbyStatus::InProgress, 5, true, slots(5, 5, 5));
    let view = LobbyView::project(Some(&snapshot), "p1");
    assert!(view.is_host);
    assert!(!view.can_start);
}

#[test]
fn cannot_start_below_min_players() {
    let snapshot = snapshot(LobbyStatus::WaitingForPlayers, 5, true, slots(4, 4, 5));
    let view = LobbyView::project(Some(&snapshot), "p1");
    assert!(!view.can_start);
}

#[test]
fn ready_check_disabled_waives_readiness() {
    let snapshot = snapshot(LobbyStatus::WaitingForPlayers, 2, false, slots(2, 0, 2));
    let view = LobbyView::project(Some(&snapshot), "p1");
    assert!(view.can_start);
}

#[test]
fn terminal_status_means_not_in_lobby() {
    let snapshot = snapshot(LobbyStatus::Completed, 2, false, slots(2, 0, 2));
    let view = LobbyView::project(Some(&snapshot), "p1");
    assert!(!view.is_in_lobby);
    assert!(!view.can_start);
}
