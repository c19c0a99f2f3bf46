use super::*;
use crate::game::constants::{
    CAPTURE_DURATION_SECS, PLAYER_RADIUS, RESCUE_DURATION_SECS, SHIELD_DURATION_SECS,
};
use serde_json::Value;
use tokio::sync::mpsc;

fn join_player(room: &Arc<Room>, nickname: &str) -> (String, mpsc::Receiver<String>) {
    let (client, outbound) = Client::new();
    let player = Player::new(nickname);
    let id = player.id.clone();
    room.add_player(player, client).expect("room should accept the player");
    (id, outbound)
}

fn drain_frames(outbound: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = outbound.try_recv() {
        frames.push(serde_json::from_str(&frame).expect("frame should be valid json"));
    }
    frames
}

async fn next_frame(outbound: &mut mpsc::Receiver<String>) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), outbound.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection queue closed");
    serde_json::from_str(&frame).expect("frame should be valid json")
}

fn set_position(room: &Room, player_id: &str, x: f64, y: f64) {
    let mut inner = room.inner.write().unwrap();
    let player = inner.players.get_mut(player_id).unwrap();
    player.set_position(x, y);
}

fn force_playing(room: &Room) {
    let mut inner = room.inner.write().unwrap();
    inner.phase = Phase::Playing;
    inner.layout = layout::generate_layout();
}

fn jail_of(room: &Room) -> (f64, f64) {
    let inner = room.inner.read().unwrap();
    layout::jail_position(&inner.layout).expect("playing room should have a jail")
}

fn message_type(frame: &Value) -> &str {
    frame["type"].as_str().unwrap_or_default()
}

#[test]
fn first_player_becomes_host_and_capacity_is_enforced() {
    let room = Room::new("HOST".to_string());
    let (first, _first_rx) = join_player(&room, "first");

    let mut receivers = Vec::new();
    for n in 1..MAX_PLAYERS {
        let (_, rx) = join_player(&room, &format!("p{n}"));
        receivers.push(rx);
    }
    assert_eq!(room.player_count(), MAX_PLAYERS);
    assert_eq!(room.host_id().as_deref(), Some(first.as_str()));

    let (overflow_client, _overflow_rx) = Client::new();
    let result = room.add_player(Player::new("overflow"), overflow_client);
    assert_eq!(result, Err(RoomError::Full));
    assert_eq!(room.player_count(), MAX_PLAYERS);
}

#[test]
fn host_reassigns_when_the_host_leaves() {
    let room = Room::new("HOST".to_string());
    let (first, _rx1) = join_player(&room, "first");
    let (second, _rx2) = join_player(&room, "second");

    let outcome = room.remove_player(&first);
    assert!(outcome.removed);
    assert!(!outcome.now_empty);
    assert_eq!(room.host_id().as_deref(), Some(second.as_str()));

    let outcome = room.remove_player(&second);
    assert!(outcome.removed);
    assert!(outcome.now_empty);
    assert_eq!(room.host_id(), None);

    let outcome = room.remove_player("missing");
    assert!(!outcome.removed);
}

#[test]
fn chaser_slots_are_capped_at_two() {
    let room = Room::new("TEAM".to_string());
    let (a, _ra) = join_player(&room, "a");
    let (b, _rb) = join_player(&room, "b");
    let (c, _rc) = join_player(&room, "c");

    assert_eq!(room.select_team(&a, Team::Chasers), Ok(()));
    assert_eq!(room.select_team(&b, Team::Chasers), Ok(()));
    assert_eq!(room.select_team(&c, Team::Chasers), Err(RoomError::TeamFull));

    // Re-picking your own team does not count against the cap.
    assert_eq!(room.select_team(&a, Team::Chasers), Ok(()));

    // Freeing a slot opens it up again.
    assert_eq!(room.select_team(&a, Team::Runners), Ok(()));
    assert_eq!(room.select_team(&c, Team::Chasers), Ok(()));
}

#[test]
fn ready_verdict_requires_both_teams_populated() {
    let room = Room::new("REDY".to_string());
    let (a, _ra) = join_player(&room, "a");

    // Too few players, and no team picked yet.
    assert!(!room.set_ready(&a, true));

    let (b, _rb) = join_player(&room, "b");
    room.select_team(&a, Team::Chasers).unwrap();
    room.select_team(&b, Team::Chasers).unwrap();
    room.set_ready(&a, true);
    assert!(!room.set_ready(&b, true));

    // Splitting the teams makes the same roster startable.
    room.select_team(&b, Team::Runners).unwrap();
    assert!(room.set_ready(&b, true));

    // Any player backing out revokes the verdict.
    assert!(!room.set_ready(&a, false));
    assert!(room.set_ready(&a, true));
}

#[tokio::test]
async fn start_game_assigns_halves_and_broadcasts_once() {
    let room = Room::new("STRT".to_string());
    let (chaser, mut chaser_rx) = join_player(&room, "chaser");
    let (runner_a, _ra) = join_player(&room, "runner-a");
    let (runner_b, _rb) = join_player(&room, "runner-b");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner_a, Team::Runners).unwrap();
    room.select_team(&runner_b, Team::Runners).unwrap();

    assert!(room.start_game());
    assert_eq!(room.phase(), Phase::Playing);
    assert!(!room.start_game());

    let frames = drain_frames(&mut chaser_rx);
    assert_eq!(frames.len(), 1);
    let start = &frames[0];
    assert_eq!(message_type(start), "game_start");
    assert_eq!(start["data"]["players"].as_array().unwrap().len(), 3);
    let layout = start["data"]["layout"].as_array().unwrap();
    assert_eq!(layout.len(), 13);
    assert_eq!(layout[0]["kind"], "jail");

    // Chasers spawn in the upper half, runners in the lower half.
    let chaser_y = room.player(&chaser).unwrap().y;
    assert!(chaser_y < MAP_HEIGHT / 2.0);
    for id in [&runner_a, &runner_b] {
        let y = room.player(id).unwrap().y;
        assert!(y > MAP_HEIGHT / 2.0);
    }

    room.stop(Winner::None);
}

#[tokio::test(start_paused = true)]
async fn stop_emits_game_over_exactly_once() {
    let room = Room::new("STOP".to_string());
    let (chaser, mut outbound) = join_player(&room, "chaser");
    let (runner, _runner_rx) = join_player(&room, "runner");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner, Team::Runners).unwrap();
    assert!(room.start_game());

    assert!(room.stop(Winner::Chasers));
    assert!(!room.stop(Winner::Runners));
    assert_eq!(room.phase(), Phase::Ended);

    let frames = drain_frames(&mut outbound);
    let game_overs: Vec<&Value> = frames
        .iter()
        .filter(|frame| message_type(frame) == "game_over")
        .collect();
    assert_eq!(game_overs.len(), 1);
    assert_eq!(game_overs[0]["data"]["winner"], "chasers");
}

#[test]
fn sustained_contact_detains_and_hands_chasers_the_win() {
    let room = Room::new("CTCH".to_string());
    let (chaser, mut chaser_rx) = join_player(&room, "chaser");
    let (runner, _runner_rx) = join_player(&room, "runner");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner, Team::Runners).unwrap();
    force_playing(&room);
    set_position(&room, &chaser, 1000.0, 1000.0);
    set_position(&room, &runner, 1050.0, 1000.0);
    drain_frames(&mut chaser_rx);

    let ticks = (CAPTURE_DURATION_SECS / TICK_SECS).ceil() as usize;
    for n in 1..ticks {
        let outcome = room.advance_tick();
        assert_eq!(outcome.winner, None, "no winner expected on tick {n}");
        assert_eq!(outcome.messages.len(), 1);
        assert!(matches!(outcome.messages[0], ServerMessage::GameState(_)));
    }

    let outcome = room.advance_tick();
    assert_eq!(outcome.winner, Some(Winner::Chasers));
    assert!(matches!(outcome.messages[0], ServerMessage::PlayerCaught(_)));
    assert!(matches!(
        outcome.messages.last(),
        Some(ServerMessage::GameState(_))
    ));

    let detained = room.player(&runner).unwrap();
    assert!(detained.is_caught());
    let (jail_x, jail_y) = jail_of(&room);
    assert_eq!((detained.x, detained.y), (jail_x, jail_y));
}

#[test]
fn jailbreak_releases_every_detainee_behind_a_shield() {
    let room = Room::new("FREE".to_string());
    let (caught_a, _ra) = join_player(&room, "caught-a");
    let (caught_b, _rb) = join_player(&room, "caught-b");
    let (rescuer, _rr) = join_player(&room, "rescuer");
    for id in [&caught_a, &caught_b, &rescuer] {
        room.select_team(id, Team::Runners).unwrap();
    }
    force_playing(&room);
    let (jail_x, jail_y) = jail_of(&room);
    {
        let mut inner = room.inner.write().unwrap();
        inner.players.get_mut(&caught_a).unwrap().detain(jail_x, jail_y);
        inner.players.get_mut(&caught_b).unwrap().detain(jail_x, jail_y);
        inner.players.get_mut(&rescuer).unwrap().set_position(jail_x, jail_y);
    }

    let ticks = (RESCUE_DURATION_SECS / TICK_SECS).ceil() as usize;
    for _ in 1..ticks {
        let outcome = room.advance_tick();
        assert_eq!(outcome.messages.len(), 1);
    }

    let outcome = room.advance_tick();
    let released = outcome
        .messages
        .iter()
        .find_map(|message| match message {
            ServerMessage::PlayersReleased(event) => Some(event),
            _ => None,
        })
        .expect("expected a release event");
    assert_eq!(released.rescuer_id, rescuer);
    assert_eq!(released.released.len(), 2);

    for id in [&caught_a, &caught_b] {
        let player = room.player(id).unwrap();
        assert_eq!(player.status, Status::Shielded);
        assert_eq!(player.shield_remaining, SHIELD_DURATION_SECS);
    }
    assert_eq!(room.player(&rescuer).unwrap().rescue_progress, 0.0);

    // Shields tick down and expire back to free.
    let shield_ticks = (SHIELD_DURATION_SECS / TICK_SECS).ceil() as usize;
    for _ in 0..shield_ticks {
        room.advance_tick();
    }
    assert_eq!(room.player(&caught_a).unwrap().status, Status::Shielded);
    room.advance_tick();
    for id in [&caught_a, &caught_b] {
        let player = room.player(id).unwrap();
        assert_eq!(player.status, Status::Free);
        assert_eq!(player.shield_remaining, 0.0);
    }
}

#[test]
fn rescue_gauge_resets_when_jail_range_is_left() {
    let room = Room::new("GAGE".to_string());
    let (caught, _rc) = join_player(&room, "caught");
    let (rescuer, _rr) = join_player(&room, "rescuer");
    room.select_team(&caught, Team::Runners).unwrap();
    room.select_team(&rescuer, Team::Runners).unwrap();
    force_playing(&room);
    let (jail_x, jail_y) = jail_of(&room);
    {
        let mut inner = room.inner.write().unwrap();
        inner.players.get_mut(&caught).unwrap().detain(jail_x, jail_y);
        inner.players.get_mut(&rescuer).unwrap().set_position(jail_x, jail_y);
    }

    for _ in 0..10 {
        room.advance_tick();
    }
    assert!(room.player(&rescuer).unwrap().rescue_progress > 0.0);

    // Step well outside jail range: the gauge zeroes on the next tick.
    let far_x = if jail_x < MAP_WIDTH / 2.0 {
        MAP_WIDTH - PLAYER_RADIUS
    } else {
        PLAYER_RADIUS
    };
    set_position(&room, &rescuer, far_x, jail_y);
    room.advance_tick();
    assert_eq!(room.player(&rescuer).unwrap().rescue_progress, 0.0);
    assert!(room.player(&caught).unwrap().is_caught());
}

#[test]
fn moves_are_clamped_and_speed_checked() {
    let room = Room::new("MOVE".to_string());
    let (runner, _rx) = join_player(&room, "runner");
    room.select_team(&runner, Team::Runners).unwrap();

    let base = Instant::now();
    assert_eq!(
        room.apply_move(&runner, 100.0, 100.0, base),
        Err(MoveError::NotPlaying)
    );

    force_playing(&room);
    set_position(&room, &runner, 500.0, 500.0);

    // First update has no prior timestamp; one tick of travel is allowed.
    assert_eq!(
        room.apply_move(&runner, 520.0, 500.0, base),
        Ok(Some((520.0, 500.0)))
    );

    // A teleport 16 ms later is far beyond the speed budget.
    let shortly = base + Duration::from_millis(16);
    assert_eq!(
        room.apply_move(&runner, 10_500.0, 500.0, shortly),
        Err(MoveError::TooFast)
    );
    let player = room.player(&runner).unwrap();
    assert_eq!((player.x, player.y), (520.0, 500.0));

    // The same distance is fine once enough time has passed, and the
    // target is clamped to the playable bounds.
    let later = base + Duration::from_secs(30);
    assert_eq!(
        room.apply_move(&runner, 10_500.0, 500.0, later),
        Ok(Some((MAP_WIDTH - PLAYER_RADIUS, 500.0)))
    );

    // Detained players cannot move at all.
    {
        let mut inner = room.inner.write().unwrap();
        inner.players.get_mut(&runner).unwrap().status = Status::Caught;
    }
    let much_later = base + Duration::from_secs(60);
    assert_eq!(room.apply_move(&runner, 600.0, 500.0, much_later), Ok(None));

    // Unknown participants are ignored rather than errored.
    assert_eq!(room.apply_move("missing", 1.0, 1.0, much_later), Ok(None));
}

#[test]
fn clock_expiry_hands_runners_the_win() {
    let room = Room::new("TIME".to_string());
    let (chaser, _rc) = join_player(&room, "chaser");
    let (runner, _rr) = join_player(&room, "runner");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner, Team::Runners).unwrap();
    force_playing(&room);
    set_position(&room, &chaser, 200.0, 200.0);
    set_position(&room, &runner, 3000.0, 5000.0);
    {
        let mut inner = room.inner.write().unwrap();
        inner.remaining = Duration::from_millis(2 * TICK_MS);
    }

    let outcome = room.advance_tick();
    assert_eq!(outcome.winner, None);

    let outcome = room.advance_tick();
    assert_eq!(outcome.winner, Some(Winner::Runners));
    match outcome.messages.last() {
        Some(ServerMessage::GameState(snapshot)) => {
            assert_eq!(snapshot.remaining_time, 0.0);
        }
        other => panic!("expected a snapshot, got {other:?}"),
    }
}

#[test]
fn reset_returns_the_room_to_a_fresh_lobby() {
    let room = Room::new("RSET".to_string());
    let (chaser, _rc) = join_player(&room, "chaser");
    let (runner, _rr) = join_player(&room, "runner");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner, Team::Runners).unwrap();

    assert!(!room.reset_to_lobby());

    force_playing(&room);
    {
        let mut inner = room.inner.write().unwrap();
        inner.phase = Phase::Ended;
        let runner = inner.players.get_mut(&runner).unwrap();
        runner.status = Status::Caught;
        runner.ready = true;
        runner.capture_progress = 1.0;
    }

    assert!(room.reset_to_lobby());
    assert_eq!(room.phase(), Phase::Waiting);
    let player = room.player(&runner).unwrap();
    assert_eq!(player.status, Status::Free);
    assert!(!player.ready);
    assert_eq!(player.capture_progress, 0.0);
    assert_eq!(player.team, Team::Runners);
    assert!(room.inner.read().unwrap().layout.is_empty());
}

#[tokio::test(start_paused = true)]
async fn live_session_streams_snapshots_until_game_over() {
    let room = Room::new("LIVE".to_string());
    let (chaser, mut chaser_rx) = join_player(&room, "chaser");
    let (runner, mut runner_rx) = join_player(&room, "runner");
    room.select_team(&chaser, Team::Chasers).unwrap();
    room.select_team(&runner, Team::Runners).unwrap();
    assert!(!room.set_ready(&chaser, true));
    assert!(room.set_ready(&runner, true));
    assert!(room.start_game());

    for outbound in [&mut chaser_rx, &mut runner_rx] {
        let start = next_frame(outbound).await;
        assert_eq!(message_type(&start), "game_start");
    }

    let snapshot = next_frame(&mut runner_rx).await;
    assert_eq!(message_type(&snapshot), "game_state");
    let players = snapshot["data"]["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert!(snapshot["data"]["remaining_time"].as_f64().unwrap() < GAME_DURATION_SECS);

    room.stop(Winner::None);
    let mut saw_game_over = false;
    for _ in 0..64 {
        let frame = next_frame(&mut runner_rx).await;
        if message_type(&frame) == "game_over" {
            assert_eq!(frame["data"]["winner"], "none");
            saw_game_over = true;
            break;
        }
        assert_eq!(message_type(&frame), "game_state");
    }
    assert!(saw_game_over);
    assert_eq!(room.phase(), Phase::Ended);
}

#[test]
fn directory_codes_are_unique_and_removable() {
    let directory = Directory::new();
    let mut codes = std::collections::HashSet::new();
    for _ in 0..32 {
        let room = directory.create_room();
        assert!(codes.insert(room.code.clone()));
    }
    assert_eq!(directory.len(), 32);

    let code = codes.iter().next().unwrap().clone();
    assert!(directory.get(&code).is_some());
    assert!(directory.remove(&code).is_some());
    assert!(directory.get(&code).is_none());
    assert_eq!(directory.len(), 31);
}

#[test]
fn directory_reverse_lookup_scans_rooms() {
    let directory = Directory::new();
    let first = directory.create_room();
    let second = directory.create_room();
    let (_id_a, _ra) = join_player(&first, "a");
    let (id_b, _rb) = join_player(&second, "b");

    let found = directory.find_by_player(&id_b).expect("player should be found");
    assert_eq!(found.code, second.code);
    assert!(directory.find_by_player("missing").is_none());
}
