use super::{decode, Router};
use crate::protocol::{PlayerMoveRequest, PlayerMoved, ServerMessage};
use crate::room::MoveError;
use crate::transport::client::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

impl Router {
    pub(super) fn handle_player_move(&self, client: &Arc<Client>, data: Value) {
        let Some(request) = decode::<PlayerMoveRequest>(client, data) else {
            return;
        };
        let Some((player_id, room)) = self.room_of(client) else {
            client.send(&ServerMessage::error("not in a room"));
            return;
        };

        match room.apply_move(&player_id, request.x, request.y, Instant::now()) {
            Ok(Some((x, y))) => {
                room.broadcast(&ServerMessage::PlayerMoved(PlayerMoved { player_id, x, y }));
            }
            // Unknown or detained participants are ignored, not errored.
            Ok(None) => {}
            Err(error) => {
                if error == MoveError::TooFast {
                    tracing::warn!(room = %room.code, player = %player_id, "rejected speed violation");
                }
                client.send(&ServerMessage::error(error.to_string()));
            }
        }
    }
}
