use crate::protocol::ServerMessage;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound messages queued per connection before the writer loop drains
/// them. A full queue drops the message; a slow consumer never stalls a
/// broadcasting room.
pub const OUTBOUND_QUEUE_SIZE: usize = 256;

pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const PING_PERIOD: Duration = Duration::from_secs(54);
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_FRAME_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub account_id: String,
    pub nickname: String,
}

/// One live connection. The socket itself lives in the reader/writer
/// tasks; everything else talks to the connection through this handle and
/// its bounded outbound queue.
#[derive(Debug)]
pub struct Client {
    pub id: String,
    outbound: StdMutex<Option<mpsc::Sender<String>>>,
    authenticated: AtomicBool,
    account: StdMutex<Option<AccountInfo>>,
}

impl Client {
    pub fn new() -> (std::sync::Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let client = std::sync::Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            outbound: StdMutex::new(Some(tx)),
            authenticated: AtomicBool::new(false),
            account: StdMutex::new(None),
        });
        (client, rx)
    }

    pub fn send(&self, message: &ServerMessage) {
        let Some(payload) = message.encode() else { return };
        self.send_raw(payload);
    }

    /// Non-blocking enqueue. Messages to a full or closed queue are
    /// dropped; full queues are logged since they mean a consumer is not
    /// keeping up.
    pub fn send_raw(&self, payload: String) {
        let sender = self.outbound.lock().unwrap().clone();
        let Some(sender) = sender else { return };
        if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(payload) {
            tracing::warn!(client = %self.id, "outbound queue full, dropping message");
        }
    }

    /// Ends the writer loop, which then performs the close handshake.
    /// Safe to call any number of times.
    pub fn close_outbound(&self) {
        self.outbound.lock().unwrap().take();
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn set_account(&self, account_id: String, nickname: String) {
        *self.account.lock().unwrap() = Some(AccountInfo {
            account_id,
            nickname,
        });
        self.authenticated.store(true, Ordering::SeqCst);
    }

    pub fn account(&self) -> Option<AccountInfo> {
        self.account.lock().unwrap().clone()
    }
}

/// Drains the outbound queue into the socket, pinging on a fixed period.
/// Exits on write failure or once the queue is closed, after sending the
/// close frame.
pub async fn write_loop(
    mut outbound: mpsc::Receiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    let start = tokio::time::Instant::now() + PING_PERIOD;
    let mut ping = tokio::time::interval_at(start, PING_PERIOD);

    loop {
        tokio::select! {
            maybe_payload = outbound.recv() => {
                match maybe_payload {
                    Some(payload) => {
                        if !send_with_deadline(&mut sink, Message::Text(payload)).await {
                            return;
                        }
                    }
                    None => {
                        send_with_deadline(&mut sink, Message::Close(None)).await;
                        return;
                    }
                }
            }
            _ = ping.tick() => {
                if !send_with_deadline(&mut sink, Message::Ping(Vec::new())).await {
                    return;
                }
            }
        }
    }
}

async fn send_with_deadline(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
) -> bool {
    matches!(
        tokio::time::timeout(WRITE_TIMEOUT, sink.send(message)).await,
        Ok(Ok(()))
    )
}
