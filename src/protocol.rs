use crate::game::layout::MapFeature;
use crate::game::player::{Phase, Player, Status, Team, Winner};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Client -> server frame types.
pub const TYPE_AUTHENTICATE: &str = "authenticate";
pub const TYPE_CREATE_ROOM: &str = "create_room";
pub const TYPE_JOIN_ROOM: &str = "join_room";
pub const TYPE_LEAVE_ROOM: &str = "leave_room";
pub const TYPE_SELECT_TEAM: &str = "select_team";
pub const TYPE_PLAYER_READY: &str = "player_ready";
pub const TYPE_PLAYER_MOVE: &str = "player_move";
pub const TYPE_RETURN_TO_LOBBY: &str = "return_to_lobby";

/// Every frame in either direction is `{"type": ..., "data": ...}`.
/// Inbound frames decode in two phases: the envelope first, then the
/// payload once the type is known, so an unknown type can still be
/// reported back by name.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub method: String,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectTeamRequest {
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayerReadyRequest {
    #[serde(default = "default_ready")]
    pub ready: bool,
}

fn default_ready() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PlayerMoveRequest {
    pub x: f64,
    pub y: f64,
}

/// Server -> client frames. Adjacent tagging produces the same
/// `{"type", "data"}` envelope the client sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "create_room")]
    RoomCreated(RoomReply),
    #[serde(rename = "join_room")]
    RoomJoined(RoomReply),
    #[serde(rename = "room_info")]
    RoomInfo(RoomInfo),
    #[serde(rename = "game_start")]
    GameStart(GameStart),
    #[serde(rename = "game_state")]
    GameState(GameSnapshot),
    #[serde(rename = "player_caught")]
    PlayerCaught(PlayerCaught),
    #[serde(rename = "players_released")]
    PlayersReleased(PlayersReleased),
    #[serde(rename = "player_move")]
    PlayerMoved(PlayerMoved),
    #[serde(rename = "game_over")]
    GameOver(GameOver),
    #[serde(rename = "auth_result")]
    AuthResult(AuthResult),
    #[serde(rename = "error")]
    Error(ErrorReply),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorReply {
            message: message.into(),
        })
    }

    /// Encodes to the wire string. `None` only if a payload fails to
    /// serialize, which is logged rather than crashed on.
    pub fn encode(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(payload) => Some(payload),
            Err(error) => {
                tracing::error!(?error, "failed to encode server message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomReply {
    pub code: String,
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub code: String,
    pub state: Phase,
    pub players: Vec<Player>,
    pub host_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStart {
    pub players: Vec<Player>,
    pub layout: Vec<MapFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub remaining_time: f64,
    pub players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub team: Team,
    pub status: Status,
    pub capture_progress: f64,
    pub rescue_progress: f64,
}

impl PlayerSnapshot {
    pub fn of(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            x: player.x,
            y: player.y,
            team: player.team,
            status: player.status,
            capture_progress: player.capture_progress,
            rescue_progress: player.rescue_progress,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerCaught {
    pub player_id: String,
    pub by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayersReleased {
    pub rescuer_id: String,
    pub released: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerMoved {
    pub player_id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOver {
    pub winner: Winner,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResult {
    pub fn success(account_id: String, nickname: String) -> Self {
        Self {
            success: true,
            account_id: Some(account_id),
            nickname: Some(nickname),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            account_id: None,
            nickname: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub message: String,
}
