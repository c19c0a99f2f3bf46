use super::player::{Player, Team};
use std::collections::HashMap;

/// Chasers win once every runner is caught. An empty runner roster is not
/// a win; somebody must actually have been hunted.
pub fn chasers_win(players: &HashMap<String, Player>) -> bool {
    let mut runners = 0;
    let mut caught = 0;
    for player in players.values() {
        if player.team == Team::Runners {
            runners += 1;
            if player.is_caught() {
                caught += 1;
            }
        }
    }
    runners > 0 && runners == caught
}

/// Runners win when the clock runs out with at least one of them still
/// uncaught (shielded counts as uncaught).
pub fn runners_win(players: &HashMap<String, Player>, timer_expired: bool) -> bool {
    if !timer_expired {
        return false;
    }
    players
        .values()
        .any(|player| player.team == Team::Runners && !player.is_caught())
}
