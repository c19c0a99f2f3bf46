use super::constants::{CAPTURE_RANGE, JAIL_RANGE};
use super::geometry::distance;
use super::player::{Player, Team};
use std::collections::HashMap;

/// One chaser in capture range of one free runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePair {
    pub chaser_id: String,
    pub runner_id: String,
}

pub fn in_capture_range(chaser: &Player, runner: &Player) -> bool {
    distance(chaser.x, chaser.y, runner.x, runner.y) <= CAPTURE_RANGE
}

pub fn in_jail_range(player: &Player, jail_x: f64, jail_y: f64) -> bool {
    distance(player.x, player.y, jail_x, jail_y) <= JAIL_RANGE
}

/// Returns every (chaser, runner) pair currently in capture contact.
/// Caught and shielded runners are not capturable and are left out.
pub fn capture_pairs(players: &HashMap<String, Player>) -> Vec<CapturePair> {
    let chasers: Vec<&Player> = players
        .values()
        .filter(|player| player.team == Team::Chasers)
        .collect();
    let runners: Vec<&Player> = players
        .values()
        .filter(|player| player.team == Team::Runners && player.is_free())
        .collect();

    let mut pairs = Vec::new();
    for chaser in &chasers {
        for runner in &runners {
            if in_capture_range(chaser, runner) {
                pairs.push(CapturePair {
                    chaser_id: chaser.id.clone(),
                    runner_id: runner.id.clone(),
                });
            }
        }
    }
    pairs
}

/// Returns the ids of free runners close enough to the jail to work on a
/// rescue this tick.
pub fn rescue_candidates(
    players: &HashMap<String, Player>,
    jail_x: f64,
    jail_y: f64,
) -> Vec<String> {
    players
        .values()
        .filter(|player| {
            player.team == Team::Runners && player.is_free() && in_jail_range(player, jail_x, jail_y)
        })
        .map(|player| player.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Status;

    fn make_player(id: &str, team: Team, x: f64, y: f64) -> Player {
        let mut player = Player::new(id);
        player.id = id.to_string();
        player.team = team;
        player.set_position(x, y);
        player
    }

    fn roster(players: Vec<Player>) -> HashMap<String, Player> {
        players
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect()
    }

    #[test]
    fn pairs_only_form_within_capture_range() {
        let players = roster(vec![
            make_player("c1", Team::Chasers, 0.0, 0.0),
            make_player("r1", Team::Runners, 50.0, 0.0),
            make_player("r2", Team::Runners, 500.0, 0.0),
        ]);

        let pairs = capture_pairs(&players);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].chaser_id, "c1");
        assert_eq!(pairs[0].runner_id, "r1");
    }

    #[test]
    fn caught_and_shielded_runners_are_not_capturable() {
        let mut caught = make_player("r1", Team::Runners, 10.0, 0.0);
        caught.status = Status::Caught;
        let mut shielded = make_player("r2", Team::Runners, 20.0, 0.0);
        shielded.status = Status::Shielded;
        let players = roster(vec![
            make_player("c1", Team::Chasers, 0.0, 0.0),
            caught,
            shielded,
        ]);

        assert!(capture_pairs(&players).is_empty());
    }

    #[test]
    fn two_chasers_on_one_runner_form_two_pairs() {
        let players = roster(vec![
            make_player("c1", Team::Chasers, 0.0, 0.0),
            make_player("c2", Team::Chasers, 100.0, 0.0),
            make_player("r1", Team::Runners, 50.0, 0.0),
        ]);

        assert_eq!(capture_pairs(&players).len(), 2);
    }

    #[test]
    fn rescue_candidates_require_free_status_and_range() {
        let mut caught = make_player("r2", Team::Runners, 1000.0, 1010.0);
        caught.status = Status::Caught;
        let players = roster(vec![
            make_player("r1", Team::Runners, 1000.0, 1100.0),
            make_player("r3", Team::Runners, 1000.0, 2000.0),
            make_player("c1", Team::Chasers, 1000.0, 1000.0),
            caught,
        ]);

        let candidates = rescue_candidates(&players, 1000.0, 1000.0);

        assert_eq!(candidates, vec!["r1".to_string()]);
    }
}
