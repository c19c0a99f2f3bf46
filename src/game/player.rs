use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Instant;
use uuid::Uuid;

/// Team assignment. `Chasers` is capped at two members per room; everyone
/// starts out unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    None,
    Chasers,
    Runners,
}

impl Team {
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Chasers => "chasers",
            Team::Runners => "runners",
            Team::None => "none",
        }
    }

    /// Decodes a wire value. Unknown strings fall back to `None` so a bad
    /// client value can never invent a third team.
    pub fn parse(value: &str) -> Team {
        match value {
            "chasers" => Team::Chasers,
            "runners" => Team::Runners,
            _ => Team::None,
        }
    }
}

impl Serialize for Team {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Team::parse(&value))
    }
}

/// In-game status. `Shielded` is the brief immunity granted on release from
/// jail; it decays back to `Free` on the tick timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Free,
    Caught,
    Shielded,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Free => "free",
            Status::Caught => "caught",
            Status::Shielded => "shielded",
        }
    }

    pub fn parse(value: &str) -> Status {
        match value {
            "caught" => Status::Caught,
            "shielded" => Status::Shielded,
            _ => Status::Free,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Status::parse(&value))
    }
}

/// Room lifecycle phase. Transitions are monotonic:
/// Waiting -> Playing -> Ended -> (explicit reset) -> Waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Playing,
    Ended,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Playing => "playing",
            Phase::Ended => "ended",
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    None,
    Chasers,
    Runners,
}

impl Winner {
    pub fn as_str(self) -> &'static str {
        match self {
            Winner::Chasers => "chasers",
            Winner::Runners => "runners",
            Winner::None => "none",
        }
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: String,
    pub nickname: String,
    pub team: Team,
    pub status: Status,
    pub x: f64,
    pub y: f64,
    pub ready: bool,
    #[serde(skip)]
    pub last_move_at: Option<Instant>,
    #[serde(skip)]
    pub capture_progress: f64,
    #[serde(skip)]
    pub rescue_progress: f64,
    #[serde(skip)]
    pub shield_remaining: f64,
}

impl Player {
    pub fn new(nickname: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            nickname: nickname.to_string(),
            team: Team::None,
            status: Status::Free,
            x: 0.0,
            y: 0.0,
            ready: false,
            last_move_at: None,
            capture_progress: 0.0,
            rescue_progress: 0.0,
            shield_remaining: 0.0,
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn is_free(&self) -> bool {
        self.status == Status::Free
    }

    pub fn is_caught(&self) -> bool {
        self.status == Status::Caught
    }

    /// Detains the player at the given jail position. The capture gauge is
    /// spent by the detainment, so a later release starts from zero.
    pub fn detain(&mut self, jail_x: f64, jail_y: f64) {
        self.status = Status::Caught;
        self.capture_progress = 0.0;
        self.rescue_progress = 0.0;
        self.x = jail_x;
        self.y = jail_y;
    }

    /// Releases the player from jail with a fresh shield timer.
    pub fn release(&mut self) {
        self.status = Status::Shielded;
        self.shield_remaining = super::constants::SHIELD_DURATION_SECS;
    }

    /// Returns the player to lobby defaults, preserving the team choice.
    pub fn reset_for_lobby(&mut self) {
        self.status = Status::Free;
        self.ready = false;
        self.x = 0.0;
        self.y = 0.0;
        self.last_move_at = None;
        self.capture_progress = 0.0;
        self.rescue_progress = 0.0;
        self.shield_remaining = 0.0;
    }
}
