pub mod code;
pub mod directory;
#[cfg(test)]
mod tests;

pub use directory::Directory;

use crate::game::capture;
use crate::game::constants::{
    GAME_DURATION_SECS, MAP_HEIGHT, MAP_WIDTH, MAX_CHASERS, MAX_PLAYERS, MIN_PLAYERS, MOVE_SPEED,
    SPEED_TOLERANCE, TICK_MS, TICK_SECS,
};
use crate::game::geometry;
use crate::game::layout::{self, MapFeature};
use crate::game::outcome;
use crate::game::player::{Phase, Player, Status, Team, Winner};
use crate::game::rescue;
use crate::game::spawn;
use crate::protocol::{
    GameOver, GameSnapshot, GameStart, PlayerCaught, PlayerSnapshot, PlayersReleased, RoomInfo,
    ServerMessage,
};
use crate::transport::client::Client;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is full")]
    Full,
    #[error("team is full")]
    TeamFull,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("game is not in progress")]
    NotPlaying,
    #[error("movement too fast")]
    TooFast,
}

#[derive(Debug, Clone, Copy)]
pub struct RemovalOutcome {
    pub removed: bool,
    pub now_empty: bool,
}

/// Everything a tick changes, drained in one write-lock critical section.
/// Broadcasts happen after the lock is released, in vec order.
struct TickOutcome {
    messages: Vec<ServerMessage>,
    winner: Option<Winner>,
}

struct RoomInner {
    phase: Phase,
    players: HashMap<String, Player>,
    clients: HashMap<String, Arc<Client>>,
    host_id: Option<String>,
    remaining: Duration,
    layout: Vec<MapFeature>,
    stop: Option<watch::Sender<bool>>,
}

/// One game session. The simulation task, the connection tasks and the
/// dispatch loop all funnel through the inner lock; no method holds it
/// across an await or a send.
pub struct Room {
    pub code: String,
    inner: RwLock<RoomInner>,
}

impl Room {
    pub fn new(code: String) -> Arc<Self> {
        Arc::new(Self {
            code,
            inner: RwLock::new(RoomInner {
                phase: Phase::Waiting,
                players: HashMap::new(),
                clients: HashMap::new(),
                host_id: None,
                remaining: Duration::from_secs_f64(GAME_DURATION_SECS),
                layout: Vec::new(),
                stop: None,
            }),
        })
    }

    /// Adds a participant together with their connection. The first
    /// participant becomes host.
    pub fn add_player(&self, player: Player, client: Arc<Client>) -> Result<(), RoomError> {
        let mut inner = self.inner.write().unwrap();
        if inner.players.len() >= MAX_PLAYERS {
            return Err(RoomError::Full);
        }
        if inner.host_id.is_none() {
            inner.host_id = Some(player.id.clone());
        }
        inner.clients.insert(player.id.clone(), client);
        inner.players.insert(player.id.clone(), player);
        Ok(())
    }

    /// Removes a participant, reassigning the host role if it was theirs.
    pub fn remove_player(&self, player_id: &str) -> RemovalOutcome {
        let mut inner = self.inner.write().unwrap();
        let removed = inner.players.remove(player_id).is_some();
        inner.clients.remove(player_id);
        if removed && inner.host_id.as_deref() == Some(player_id) {
            inner.host_id = inner.players.keys().next().cloned();
        }
        RemovalOutcome {
            removed,
            now_empty: inner.players.is_empty(),
        }
    }

    pub fn select_team(&self, player_id: &str, team: Team) -> Result<(), RoomError> {
        let mut inner = self.inner.write().unwrap();
        if team == Team::Chasers {
            let chasers = inner
                .players
                .values()
                .filter(|p| p.id != player_id && p.team == Team::Chasers)
                .count();
            if chasers >= MAX_CHASERS {
                return Err(RoomError::TeamFull);
            }
        }
        if let Some(player) = inner.players.get_mut(player_id) {
            player.team = team;
        }
        Ok(())
    }

    /// Records the ready flag and reports, from the same lock acquisition,
    /// whether the room can start.
    pub fn set_ready(&self, player_id: &str, ready: bool) -> bool {
        let mut inner = self.inner.write().unwrap();
        if let Some(player) = inner.players.get_mut(player_id) {
            player.ready = ready;
        }
        all_ready(&inner.players)
    }

    /// Waiting -> Playing: assigns spawns, generates the session layout,
    /// arms the stop signal, broadcasts `game_start` and launches the
    /// simulation task. Returns false if the room already left Waiting.
    pub fn start_game(self: &Arc<Self>) -> bool {
        let (message, stop_rx) = {
            let mut inner = self.inner.write().unwrap();
            if inner.phase != Phase::Waiting {
                return false;
            }
            inner.phase = Phase::Playing;
            inner.remaining = Duration::from_secs_f64(GAME_DURATION_SECS);
            spawn::assign_spawn_positions(&mut inner.players);
            inner.layout = layout::generate_layout();
            let (stop_tx, stop_rx) = watch::channel(false);
            inner.stop = Some(stop_tx);

            let mut players: Vec<Player> = inner.players.values().cloned().collect();
            players.sort_by(|a, b| a.id.cmp(&b.id));
            let message = ServerMessage::GameStart(GameStart {
                players,
                layout: inner.layout.clone(),
            });
            (message, stop_rx)
        };

        tracing::info!(room = %self.code, "game started");
        self.broadcast(&message);
        self.spawn_tick_loop(stop_rx);
        true
    }

    fn spawn_tick_loop(self: &Arc<Self>, mut stopped: watch::Receiver<bool>) {
        let room = self.clone();
        tokio::spawn(async move {
            let period = Duration::from_millis(TICK_MS);
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = room.advance_tick();
                        for message in &outcome.messages {
                            room.broadcast(message);
                        }
                        if let Some(winner) = outcome.winner {
                            room.stop(winner);
                            break;
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            tracing::debug!(room = %room.code, "simulation task ended");
        });
    }

    /// One 20 Hz step. Re-checks the phase under the lock so a tick racing
    /// an external stop becomes a no-op.
    fn advance_tick(&self) -> TickOutcome {
        let mut messages = Vec::new();
        let mut winner = None;

        let mut inner = self.inner.write().unwrap();
        if inner.phase != Phase::Playing {
            return TickOutcome { messages, winner };
        }
        let dt = TICK_SECS;

        inner.remaining = inner.remaining.saturating_sub(Duration::from_millis(TICK_MS));
        let timer_expired = inner.remaining.is_zero();

        for player in inner.players.values_mut() {
            if player.status == Status::Shielded {
                player.shield_remaining -= dt;
                if player.shield_remaining <= 0.0 {
                    player.shield_remaining = 0.0;
                    player.status = Status::Free;
                }
            }
        }

        let (jail_x, jail_y) = layout::jail_position(&inner.layout)
            .unwrap_or((MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0));

        for event in capture::process_captures(&mut inner.players, jail_x, jail_y, dt) {
            messages.push(ServerMessage::PlayerCaught(PlayerCaught {
                player_id: event.player_id,
                by: event.by,
            }));
        }
        for event in rescue::process_rescues(&mut inner.players, jail_x, jail_y, dt) {
            messages.push(ServerMessage::PlayersReleased(PlayersReleased {
                rescuer_id: event.rescuer_id,
                released: event.released,
            }));
        }

        let mut players: Vec<PlayerSnapshot> =
            inner.players.values().map(PlayerSnapshot::of).collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        messages.push(ServerMessage::GameState(GameSnapshot {
            remaining_time: inner.remaining.as_secs_f64(),
            players,
        }));

        if outcome::chasers_win(&inner.players) {
            winner = Some(Winner::Chasers);
        } else if outcome::runners_win(&inner.players, timer_expired) {
            winner = Some(Winner::Runners);
        }

        TickOutcome { messages, winner }
    }

    /// Playing -> Ended. The stop sender is taken exactly once, so the
    /// simulation task exits and `game_over` goes out exactly once no
    /// matter how many callers race here.
    pub fn stop(&self, winner: Winner) -> bool {
        {
            let mut inner = self.inner.write().unwrap();
            if inner.phase != Phase::Playing {
                return false;
            }
            inner.phase = Phase::Ended;
            if let Some(stop) = inner.stop.take() {
                let _ = stop.send(true);
            }
        }
        tracing::info!(room = %self.code, winner = winner.as_str(), "game over");
        self.broadcast(&ServerMessage::GameOver(GameOver { winner }));
        true
    }

    /// Anti-cheat move acceptance: clamp to bounds, then phase and speed
    /// checks. `Ok(None)` means the move was silently ignored (unknown or
    /// detained participant).
    pub fn apply_move(
        &self,
        player_id: &str,
        x: f64,
        y: f64,
        now: Instant,
    ) -> Result<Option<(f64, f64)>, MoveError> {
        let mut inner = self.inner.write().unwrap();
        let (x, y) = geometry::clamp_position(x, y);
        if inner.phase != Phase::Playing {
            return Err(MoveError::NotPlaying);
        }
        let Some(player) = inner.players.get_mut(player_id) else {
            return Ok(None);
        };
        if player.is_caught() {
            return Ok(None);
        }
        let elapsed = match player.last_move_at {
            Some(last) => now.saturating_duration_since(last).as_secs_f64(),
            None => TICK_SECS,
        };
        let max_distance = MOVE_SPEED * elapsed * SPEED_TOLERANCE;
        if geometry::distance(player.x, player.y, x, y) > max_distance {
            return Err(MoveError::TooFast);
        }
        player.set_position(x, y);
        player.last_move_at = Some(now);
        Ok(Some((x, y)))
    }

    /// Ended -> Waiting: clears the session layout and returns every
    /// participant to lobby defaults. Teams survive for the rematch.
    pub fn reset_to_lobby(&self) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.phase != Phase::Ended {
            return false;
        }
        inner.phase = Phase::Waiting;
        inner.remaining = Duration::from_secs_f64(GAME_DURATION_SECS);
        inner.layout.clear();
        for player in inner.players.values_mut() {
            player.reset_for_lobby();
        }
        true
    }

    pub fn room_info(&self) -> ServerMessage {
        let inner = self.inner.read().unwrap();
        let mut players: Vec<Player> = inner.players.values().cloned().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        ServerMessage::RoomInfo(RoomInfo {
            code: self.code.clone(),
            state: inner.phase,
            players,
            host_id: inner.host_id.clone().unwrap_or_default(),
        })
    }

    /// Fans a message out to every connection. Encoding happens once; the
    /// per-connection sends are non-blocking.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Some(payload) = message.encode() else { return };
        let clients: Vec<Arc<Client>> = {
            let inner = self.inner.read().unwrap();
            inner.clients.values().cloned().collect()
        };
        for client in clients {
            client.send_raw(payload.clone());
        }
    }

    pub fn contains_player(&self, player_id: &str) -> bool {
        self.inner.read().unwrap().players.contains_key(player_id)
    }
}

#[allow(dead_code)]
impl Room {
    pub fn player(&self, player_id: &str) -> Option<Player> {
        self.inner.read().unwrap().players.get(player_id).cloned()
    }

    pub fn phase(&self) -> Phase {
        self.inner.read().unwrap().phase
    }

    pub fn host_id(&self) -> Option<String> {
        self.inner.read().unwrap().host_id.clone()
    }

    pub fn player_count(&self) -> usize {
        self.inner.read().unwrap().players.len()
    }
}

/// Start conditions, checked under the caller's lock: enough players,
/// everyone ready on a real team, both teams populated.
fn all_ready(players: &HashMap<String, Player>) -> bool {
    if players.len() < MIN_PLAYERS {
        return false;
    }
    if players.values().any(|p| !p.ready || p.team == Team::None) {
        return false;
    }
    let chasers = players.values().filter(|p| p.team == Team::Chasers).count();
    chasers >= 1 && chasers < players.len()
}
