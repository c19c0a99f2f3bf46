mod auth;
mod gameplay;
mod lobby;

pub use auth::AUTH_TIMEOUT;

use crate::auth::TicketVerifier;
use crate::protocol::{self, Envelope, ServerMessage};
use crate::room::{Directory, Room};
use crate::store::AccountStore;
use crate::transport::client::Client;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Decodes every inbound frame, applies the auth gate and routes by type.
/// Runs inside the hub loop, so handlers never race each other.
pub struct Router {
    directory: Directory,
    verifier: TicketVerifier,
    store: AccountStore,
    /// client id -> participant id, for connections currently in a room.
    players: DashMap<String, String>,
}

impl Router {
    pub fn new(directory: Directory, verifier: TicketVerifier, store: AccountStore) -> Self {
        Self {
            directory,
            verifier,
            store,
            players: DashMap::new(),
        }
    }

    pub async fn dispatch(&self, client: Arc<Client>, text: String) {
        let envelope: Envelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) => {
                client.send(&ServerMessage::error("invalid message format"));
                return;
            }
        };

        // The only thing an unauthenticated connection may do is
        // authenticate.
        if envelope.kind == protocol::TYPE_AUTHENTICATE {
            self.handle_authenticate(&client, envelope.data).await;
            return;
        }
        if !client.is_authenticated() {
            client.send(&ServerMessage::error("authentication required"));
            return;
        }

        match envelope.kind.as_str() {
            protocol::TYPE_CREATE_ROOM => self.handle_create_room(&client, envelope.data),
            protocol::TYPE_JOIN_ROOM => self.handle_join_room(&client, envelope.data),
            protocol::TYPE_LEAVE_ROOM => self.handle_leave_room(&client),
            protocol::TYPE_SELECT_TEAM => self.handle_select_team(&client, envelope.data),
            protocol::TYPE_PLAYER_READY => self.handle_player_ready(&client, envelope.data),
            protocol::TYPE_PLAYER_MOVE => self.handle_player_move(&client, envelope.data),
            protocol::TYPE_RETURN_TO_LOBBY => self.handle_return_to_lobby(&client),
            other => {
                client.send(&ServerMessage::error(format!("unknown message type: {other}")));
            }
        }
    }

    /// Invoked by the hub once per connection, after it left the registry.
    pub async fn handle_disconnect(&self, client: Arc<Client>) {
        let Some(player_id) = self.player_id(&client) else {
            return;
        };
        tracing::debug!(client = %client.id, player = %player_id, "disconnect cleanup");
        self.remove_from_room(&client, &player_id);
    }

    fn player_id(&self, client: &Client) -> Option<String> {
        self.players.get(&client.id).map(|entry| entry.value().clone())
    }

    fn room_of(&self, client: &Client) -> Option<(String, Arc<Room>)> {
        let player_id = self.player_id(client)?;
        let room = self.directory.find_by_player(&player_id)?;
        Some((player_id, room))
    }
}

/// Per-type payload decode; the envelope itself was already parsed.
fn decode<T: DeserializeOwned>(client: &Client, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(request) => Some(request),
        Err(_) => {
            client.send(&ServerMessage::error("invalid message format"));
            None
        }
    }
}
