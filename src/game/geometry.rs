use super::constants::{MAP_HEIGHT, MAP_WIDTH, PLAYER_RADIUS};

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

/// Clamps a position into map bounds, keeping the whole player sprite on
/// the map rather than just its centre.
pub fn clamp_position(x: f64, y: f64) -> (f64, f64) {
    let clamped_x = x.clamp(PLAYER_RADIUS, MAP_WIDTH - PLAYER_RADIUS);
    let clamped_y = y.clamp(PLAYER_RADIUS, MAP_HEIGHT - PLAYER_RADIUS);
    (clamped_x, clamped_y)
}
