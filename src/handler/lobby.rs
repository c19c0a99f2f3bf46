use super::{decode, Router};
use crate::game::player::{Player, Team, Winner};
use crate::protocol::{
    CreateRoomRequest, JoinRoomRequest, PlayerReadyRequest, RoomReply, SelectTeamRequest,
    ServerMessage,
};
use crate::shared::names::sanitize_nickname;
use crate::transport::client::Client;
use serde_json::Value;
use std::sync::Arc;

impl Router {
    pub(super) fn handle_create_room(&self, client: &Arc<Client>, data: Value) {
        let Some(request) = decode::<CreateRoomRequest>(client, data) else {
            return;
        };
        let Some(nickname) = sanitize_nickname(&request.nickname) else {
            client.send(&ServerMessage::error("nickname is required"));
            return;
        };
        self.leave_current_room(client);

        let room = self.directory.create_room();
        let player = Player::new(&nickname);
        let player_id = player.id.clone();
        if let Err(error) = room.add_player(player, client.clone()) {
            client.send(&ServerMessage::error(error.to_string()));
            return;
        }
        self.players.insert(client.id.clone(), player_id.clone());

        tracing::info!(room = %room.code, player = %player_id, "room created");
        client.send(&ServerMessage::RoomCreated(RoomReply {
            code: room.code.clone(),
            player_id,
        }));
        room.broadcast(&room.room_info());
    }

    pub(super) fn handle_join_room(&self, client: &Arc<Client>, data: Value) {
        let Some(request) = decode::<JoinRoomRequest>(client, data) else {
            return;
        };
        let code = request.code.trim().to_uppercase();
        let nickname = sanitize_nickname(&request.nickname);
        let (code, nickname) = match (code.is_empty(), nickname) {
            (false, Some(nickname)) => (code, nickname),
            _ => {
                client.send(&ServerMessage::error("code and nickname are required"));
                return;
            }
        };
        self.leave_current_room(client);

        let Some(room) = self.directory.get(&code) else {
            client.send(&ServerMessage::error("room not found"));
            return;
        };
        let player = Player::new(&nickname);
        let player_id = player.id.clone();
        if let Err(error) = room.add_player(player, client.clone()) {
            client.send(&ServerMessage::error(error.to_string()));
            return;
        }
        self.players.insert(client.id.clone(), player_id.clone());

        tracing::info!(room = %room.code, player = %player_id, "player joined");
        client.send(&ServerMessage::RoomJoined(RoomReply {
            code: room.code.clone(),
            player_id,
        }));
        room.broadcast(&room.room_info());
    }

    pub(super) fn handle_leave_room(&self, client: &Arc<Client>) {
        let Some(player_id) = self.player_id(client) else {
            client.send(&ServerMessage::error("not in a room"));
            return;
        };
        self.remove_from_room(client, &player_id);
    }

    pub(super) fn handle_select_team(&self, client: &Arc<Client>, data: Value) {
        let Some(request) = decode::<SelectTeamRequest>(client, data) else {
            return;
        };
        let Some((player_id, room)) = self.room_of(client) else {
            client.send(&ServerMessage::error("not in a room"));
            return;
        };
        let team = match request.team.as_str() {
            "chasers" => Team::Chasers,
            "runners" => Team::Runners,
            _ => {
                client.send(&ServerMessage::error("invalid team selection"));
                return;
            }
        };
        match room.select_team(&player_id, team) {
            Ok(()) => room.broadcast(&room.room_info()),
            Err(error) => client.send(&ServerMessage::error(error.to_string())),
        }
    }

    pub(super) fn handle_player_ready(&self, client: &Arc<Client>, data: Value) {
        let Some(request) = decode::<PlayerReadyRequest>(client, data) else {
            return;
        };
        let Some((player_id, room)) = self.room_of(client) else {
            client.send(&ServerMessage::error("not in a room"));
            return;
        };
        let can_start = room.set_ready(&player_id, request.ready);
        room.broadcast(&room.room_info());
        if can_start && room.start_game() {
            tracing::info!(room = %room.code, "all players ready");
        }
    }

    pub(super) fn handle_return_to_lobby(&self, client: &Arc<Client>) {
        let Some((_, room)) = self.room_of(client) else {
            client.send(&ServerMessage::error("not in a room"));
            return;
        };
        if room.reset_to_lobby() {
            tracing::info!(room = %room.code, "room returned to lobby");
            room.broadcast(&room.room_info());
        } else {
            client.send(&ServerMessage::error("game is not over"));
        }
    }

    /// Silent variant of leaving, used before entering another room so a
    /// connection never sits in two rooms at once.
    fn leave_current_room(&self, client: &Client) {
        if let Some(player_id) = self.player_id(client) {
            self.remove_from_room(client, &player_id);
        }
    }

    /// Shared tail of leave and disconnect: drop the mapping, pull the
    /// participant out, stop and delete the room if it emptied.
    pub(super) fn remove_from_room(&self, client: &Client, player_id: &str) {
        self.players.remove(&client.id);
        let Some(room) = self.directory.find_by_player(player_id) else {
            return;
        };
        let outcome = room.remove_player(player_id);
        if !outcome.removed {
            return;
        }
        tracing::info!(room = %room.code, player = %player_id, "player left");
        if outcome.now_empty {
            // Harmless unless a game is still running.
            room.stop(Winner::None);
            self.directory.remove(&room.code);
            tracing::info!(room = %room.code, "empty room removed");
        } else {
            room.broadcast(&room.room_info());
        }
    }
}
