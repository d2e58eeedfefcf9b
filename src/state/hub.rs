use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{dao::models::RoomId, dto::ws::RoomMessage};

/// Identifier of a viewer registered with a hub.
pub type ClientId = Uuid;
/// JSON-encoded message as queued for viewers.
pub type HubPayload = Arc<str>;

/// Viewer endpoint: the hub pushes payloads into `tx` and drops it to close the channel.
pub struct HubClient {
    pub id: ClientId,
    pub tx: mpsc::Sender<HubPayload>,
}

/// Receiving half handed to the transport after [`RoomHub::subscribe`].
pub struct Subscription {
    pub id: ClientId,
    pub receiver: mpsc::Receiver<HubPayload>,
}

/// Handle to a room's event loop. Cloning is cheap; all clones feed the same loop.
///
/// The loop alone owns the client set. Producers only enqueue, so publishing never blocks on a
/// slow viewer: a viewer whose queue is full is dropped instead.
#[derive(Clone)]
pub struct RoomHub {
    room_id: RoomId,
    client_capacity: usize,
    register_tx: mpsc::UnboundedSender<HubClient>,
    unregister_tx: mpsc::UnboundedSender<ClientId>,
    broadcast_tx: mpsc::UnboundedSender<HubPayload>,
}

impl RoomHub {
    /// Start the event loop for `room_id` on the current runtime.
    pub fn spawn(room_id: RoomId, client_capacity: usize) -> Self {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_hub(room_id, register_rx, unregister_rx, broadcast_rx));
        debug!(room_id, "room hub started");

        Self {
            room_id,
            client_capacity,
            register_tx,
            unregister_tx,
            broadcast_tx,
        }
    }

    /// Room this hub serves.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Create a bounded viewer channel and register its sending half.
    pub fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.client_capacity);
        let id = Uuid::new_v4();
        self.register(HubClient { id, tx });
        Subscription { id, receiver }
    }

    /// Add an already built client to the fan-out set.
    pub fn register(&self, client: HubClient) {
        let _ = self.register_tx.send(client);
    }

    /// Remove a viewer; its channel closes once the loop drops the sender.
    pub fn unregister(&self, id: ClientId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Encode `message` and queue it for every viewer registered when the loop handles it.
    pub fn publish(&self, message: &RoomMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => {
                let _ = self.broadcast_tx.send(Arc::from(payload));
            }
            Err(err) => warn!(
                room_id = self.room_id,
                error = %err,
                "failed to serialize room message"
            ),
        }
    }
}

async fn run_hub(
    room_id: RoomId,
    mut register_rx: mpsc::UnboundedReceiver<HubClient>,
    mut unregister_rx: mpsc::UnboundedReceiver<ClientId>,
    mut broadcast_rx: mpsc::UnboundedReceiver<HubPayload>,
) {
    let mut clients: HashMap<ClientId, mpsc::Sender<HubPayload>> = HashMap::new();

    loop {
        tokio::select! {
            // Membership changes go first so a register followed by a publish from the same
            // producer always reaches the new viewer.
            biased;
            Some(client) = register_rx.recv() => {
                clients.insert(client.id, client.tx);
                debug!(room_id, client_id = %client.id, viewers = clients.len(), "viewer registered");
            }
            Some(id) = unregister_rx.recv() => {
                if clients.remove(&id).is_some() {
                    debug!(room_id, client_id = %id, viewers = clients.len(), "viewer unregistered");
                }
            }
            Some(payload) = broadcast_rx.recv() => {
                clients.retain(|id, tx| match tx.try_send(payload.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(room_id, client_id = %id, "viewer queue full; dropping viewer");
                        false
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
            }
            else => break,
        }
    }

    info!(room_id, "room hub stopped");
}

/// Process-wide map of room hubs, created on first use.
pub struct HubRegistry {
    hubs: DashMap<RoomId, RoomHub>,
    client_capacity: usize,
}

impl HubRegistry {
    /// Empty registry; hubs give each viewer `client_capacity` queued messages.
    pub fn new(client_capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            client_capacity,
        }
    }

    /// Return the hub for `room_id`, starting it if this is the first request for the room.
    pub fn obtain(&self, room_id: RoomId) -> RoomHub {
        self.hubs
            .entry(room_id)
            .or_insert_with(|| RoomHub::spawn(room_id, self.client_capacity))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio::time::timeout;

    use super::*;

    async fn next_type(subscription: &mut Subscription) -> Option<String> {
        let payload = timeout(Duration::from_secs(1), subscription.receiver.recv())
            .await
            .ok()??;
        let value: Value = serde_json::from_str(&payload).ok()?;
        value["type"].as_str().map(str::to_owned)
    }

    #[tokio::test]
    async fn publish_reaches_every_viewer_in_order() {
        let hub = RoomHub::spawn(1, 8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish(&RoomMessage::room_updated(1));
        hub.publish(&RoomMessage::BlindtestFinished);

        for viewer in [&mut first, &mut second] {
            assert_eq!(next_type(viewer).await.as_deref(), Some("room_updated"));
            assert_eq!(next_type(viewer).await.as_deref(), Some("blindtest_finished"));
        }
    }

    #[tokio::test]
    async fn unregister_closes_the_viewer_channel() {
        let hub = RoomHub::spawn(1, 8);
        let mut viewer = hub.subscribe();

        hub.unregister(viewer.id);
        hub.publish(&RoomMessage::room_updated(1));

        let closed = timeout(Duration::from_secs(1), viewer.receiver.recv()).await;
        assert!(matches!(closed, Ok(None)));
    }

    #[tokio::test]
    async fn stalled_viewer_is_dropped_without_blocking_others() {
        let hub = RoomHub::spawn(1, 1);
        let mut stalled = hub.subscribe();
        let mut active = hub.subscribe();

        hub.publish(&RoomMessage::room_updated(1));
        assert_eq!(next_type(&mut active).await.as_deref(), Some("room_updated"));

        // The stalled viewer never drains, so the second publish overflows its queue.
        hub.publish(&RoomMessage::room_updated(1));
        assert_eq!(next_type(&mut active).await.as_deref(), Some("room_updated"));

        assert_eq!(next_type(&mut stalled).await.as_deref(), Some("room_updated"));
        let after = timeout(Duration::from_secs(1), stalled.receiver.recv()).await;
        assert!(matches!(after, Ok(None)));
    }

    #[tokio::test]
    async fn registry_reuses_hubs_per_room() {
        let registry = HubRegistry::new(8);
        let hub = registry.obtain(7);
        let mut viewer = hub.subscribe();

        registry.obtain(7).publish(&RoomMessage::room_updated(7));
        assert_eq!(next_type(&mut viewer).await.as_deref(), Some("room_updated"));
        assert_eq!(registry.obtain(8).room_id(), 8);
    }
}
