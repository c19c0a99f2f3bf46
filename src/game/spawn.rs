use super::constants::{
    MAP_HEIGHT, MAP_WIDTH, MAX_SPAWN_ATTEMPTS, MIN_SPAWN_SEPARATION,
};
use super::geometry::distance;
use super::player::{Player, Team};
use rand::Rng;
use std::collections::HashMap;

/// Assigns every player a spawn position in their team's half of the map:
/// chasers in the upper half, runners in the lower half. Positions keep a
/// minimum separation from one another via rejection sampling, with an
/// unconstrained fallback inside the half once the attempt budget runs out.
pub fn assign_spawn_positions(players: &mut HashMap<String, Player>) {
    let mut placed: Vec<(f64, f64)> = Vec::with_capacity(players.len());

    for player in players.values_mut() {
        let (min_y, max_y) = match player.team {
            Team::Chasers => (0.0, MAP_HEIGHT / 2.0),
            _ => (MAP_HEIGHT / 2.0, MAP_HEIGHT),
        };
        let position = sample_position(0.0, MAP_WIDTH, min_y, max_y, &placed);
        player.set_position(position.0, position.1);
        placed.push(position);
    }
}

fn sample_position(
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    existing: &[(f64, f64)],
) -> (f64, f64) {
    let mut rng = rand::thread_rng();

    // Margins keep spawns off the exact map and half boundaries.
    let low_x = min_x + MIN_SPAWN_SEPARATION;
    let span_x = (max_x - MIN_SPAWN_SEPARATION) - low_x;
    let low_y = min_y + MIN_SPAWN_SEPARATION;
    let span_y = (max_y - MIN_SPAWN_SEPARATION) - low_y;

    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let x = low_x + rng.gen::<f64>() * span_x;
        let y = low_y + rng.gen::<f64>() * span_y;
        if far_enough(x, y, existing) {
            return (x, y);
        }
    }

    (
        low_x + rng.gen::<f64>() * span_x,
        low_y + rng.gen::<f64>() * span_y,
    )
}

fn far_enough(x: f64, y: f64, existing: &[(f64, f64)]) -> bool {
    existing
        .iter()
        .all(|(ex, ey)| distance(x, y, *ex, *ey) >= MIN_SPAWN_SEPARATION)
}
