use crate::handler::Router;
use crate::protocol::ServerMessage;
use crate::transport::client::{self, Client};
use crate::transport::hub::Hub;
use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::time::timeout;

pub async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, router: Arc<Router>) {
    let (sender, mut receiver) = socket.split();
    let (client, outbound) = Client::new();

    hub.register(client.clone()).await;
    router.start_auth_timeout(client.clone());

    let send_task = tokio::spawn(client::write_loop(outbound, sender));

    loop {
        let frame = match timeout(client::READ_TIMEOUT, receiver.next()).await {
            Ok(Some(Ok(message))) => message,
            // Socket error, peer gone, or liveness deadline passed.
            Ok(Some(Err(_))) | Ok(None) | Err(_) => break,
        };
        match frame {
            Message::Text(text) => {
                hub.inbound(client.clone(), text).await;
            }
            Message::Binary(_) => {
                client.send(&ServerMessage::error("invalid message format"));
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.unregister(client.clone()).await;
    // Ends the writer even if the hub loop is behind on the unregister.
    client.close_outbound();
    let _ = send_task.await;
}
