use super::constants::RESCUE_DURATION_SECS;
use super::contact::rescue_candidates;
use super::player::{Player, Team};
use std::collections::{HashMap, HashSet};

/// A completed jailbreak: one rescuer, every detainee released at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEvent {
    pub rescuer_id: String,
    pub released: Vec<String>,
}

/// Advances rescue gauges for one tick and performs jailbreaks for gauges
/// that reach the rescue duration.
///
/// The gauge is continuous, not cumulative: a free runner outside jail
/// range has their gauge forced back to zero this tick. A completed gauge
/// releases every currently caught runner, not just one.
pub fn process_rescues(
    players: &mut HashMap<String, Player>,
    jail_x: f64,
    jail_y: f64,
    dt: f64,
) -> Vec<ReleaseEvent> {
    let candidates: HashSet<String> = rescue_candidates(players, jail_x, jail_y)
        .into_iter()
        .collect();

    for player in players.values_mut() {
        if player.team == Team::Runners && player.is_free() && !candidates.contains(&player.id) {
            player.rescue_progress = 0.0;
        }
    }

    let mut completed = Vec::new();
    for id in &candidates {
        let Some(rescuer) = players.get_mut(id) else { continue };
        rescuer.rescue_progress += dt;
        if rescuer.rescue_progress >= RESCUE_DURATION_SECS {
            rescuer.rescue_progress = 0.0;
            completed.push(id.clone());
        }
    }

    let mut events = Vec::new();
    for rescuer_id in completed {
        let mut released = Vec::new();
        for player in players.values_mut() {
            if player.team == Team::Runners && player.is_caught() {
                player.release();
                released.push(player.id.clone());
            }
        }
        if !released.is_empty() {
            released.sort();
            events.push(ReleaseEvent {
                rescuer_id,
                released,
            });
        }
    }
    events
}
