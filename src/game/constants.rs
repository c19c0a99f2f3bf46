// Session parameters shared with the client. Values are a fixed contract:
// the client simulates against the same numbers, so changing any of them
// requires a matching client release.

pub const MAP_WIDTH: f64 = 3240.0;
pub const MAP_HEIGHT: f64 = 5760.0;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;
pub const MAX_CHASERS: usize = 2;

pub const MOVE_SPEED: f64 = 400.0;
pub const PLAYER_RADIUS: f64 = 50.0;
pub const SPEED_TOLERANCE: f64 = 1.5;

pub const CAPTURE_RANGE: f64 = 100.0;
pub const CAPTURE_DURATION_SECS: f64 = 1.5;

pub const JAIL_RANGE: f64 = 150.0;
pub const RESCUE_DURATION_SECS: f64 = 2.0;
pub const SHIELD_DURATION_SECS: f64 = 3.0;

pub const GAME_DURATION_SECS: f64 = 180.0;
pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;
pub const TICK_SECS: f64 = TICK_MS as f64 / 1000.0;

pub const MIN_SPAWN_SEPARATION: f64 = 200.0;
pub const MAX_SPAWN_ATTEMPTS: usize = 100;

pub const TREE_COUNT: usize = 10;
pub const LAKE_COUNT: usize = 2;
pub const FEATURE_MIN_SEPARATION: f64 = 300.0;
pub const CENTER_EXCLUSION_RADIUS: f64 = 300.0;
