use crate::transport::client::Client;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::mpsc;

const CONTROL_QUEUE_SIZE: usize = 64;
const INBOUND_QUEUE_SIZE: usize = 256;

struct InboundFrame {
    client: Arc<Client>,
    text: String,
}

struct HubQueues {
    register_rx: mpsc::Receiver<Arc<Client>>,
    unregister_rx: mpsc::Receiver<Arc<Client>>,
    inbound_rx: mpsc::Receiver<InboundFrame>,
}

/// Serializes every connection event onto one loop. Handlers run one at a
/// time, so they can touch rooms and the player index without racing each
/// other.
pub struct Hub {
    register_tx: mpsc::Sender<Arc<Client>>,
    unregister_tx: mpsc::Sender<Arc<Client>>,
    inbound_tx: mpsc::Sender<InboundFrame>,
    queues: StdMutex<Option<HubQueues>>,
}

impl Hub {
    pub fn new() -> Self {
        let (register_tx, register_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let (unregister_tx, unregister_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
        Self {
            register_tx,
            unregister_tx,
            inbound_tx,
            queues: StdMutex::new(Some(HubQueues {
                register_rx,
                unregister_rx,
                inbound_rx,
            })),
        }
    }

    pub async fn register(&self, client: Arc<Client>) {
        let _ = self.register_tx.send(client).await;
    }

    pub async fn unregister(&self, client: Arc<Client>) {
        let _ = self.unregister_tx.send(client).await;
    }

    pub async fn inbound(&self, client: Arc<Client>, text: String) {
        let _ = self.inbound_tx.send(InboundFrame { client, text }).await;
    }

    /// Runs the event loop. `on_frame` sees every inbound text frame;
    /// `on_disconnect` fires once per tracked client, on the first
    /// unregister that actually removes it.
    pub async fn run<FrameFn, FrameFut, DisconnectFn, DisconnectFut>(
        &self,
        on_frame: FrameFn,
        on_disconnect: DisconnectFn,
    ) where
        FrameFn: Fn(Arc<Client>, String) -> FrameFut,
        FrameFut: Future<Output = ()>,
        DisconnectFn: Fn(Arc<Client>) -> DisconnectFut,
        DisconnectFut: Future<Output = ()>,
    {
        let queues = self.queues.lock().unwrap().take();
        let Some(queues) = queues else {
            tracing::error!("hub event loop started twice");
            return;
        };
        let HubQueues {
            mut register_rx,
            mut unregister_rx,
            mut inbound_rx,
        } = queues;

        let mut clients: HashMap<String, Arc<Client>> = HashMap::new();
        loop {
            tokio::select! {
                Some(client) = register_rx.recv() => {
                    tracing::debug!(client = %client.id, "client registered");
                    clients.insert(client.id.clone(), client);
                }
                Some(client) = unregister_rx.recv() => {
                    if clients.remove(&client.id).is_some() {
                        tracing::debug!(client = %client.id, "client unregistered");
                        client.close_outbound();
                        on_disconnect(client).await;
                    }
                }
                Some(frame) = inbound_rx.recv() => {
                    on_frame(frame.client, frame.text).await;
                }
                else => break,
            }
        }
    }
}
