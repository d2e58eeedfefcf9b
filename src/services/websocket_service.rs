use std::time::Duration;

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
    dao::models::{RoomId, UserId},
    dto::{
        room::PlayerSummary,
        ws::{RoomMessage, RoomSnapshotPayload},
    },
    error::ServiceError,
    services::room_service::{require_member, require_room, scoreboard},
    state::{SharedState, hub::RoomHub},
};

/// Keep-alive ping cadence for idle viewer sockets.
pub const PING_INTERVAL: Duration = Duration::from_secs(54);

/// Everything a viewer socket needs once the upgrade is accepted.
pub struct ViewerSession {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub hub: RoomHub,
    /// First message sent on the socket.
    pub snapshot: RoomMessage,
}

/// Check membership and capture the room snapshot before the connection is upgraded.
pub async fn prepare_viewer(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<ViewerSession, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;
    let players = scoreboard(&store, &room).await?;

    Ok(ViewerSession {
        room_id: room.id,
        user_id,
        hub: state.hub(room.id),
        snapshot: RoomMessage::RoomSnapshot(RoomSnapshotPayload {
            room: room.into(),
            players: players.into_iter().map(PlayerSummary::from).collect(),
        }),
    })
}

/// Handle the full lifecycle of a room viewer WebSocket connection.
pub async fn handle_socket(session: ViewerSession, socket: WebSocket) {
    let ViewerSession {
        room_id,
        user_id,
        hub,
        snapshot,
    } = session;
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let subscription = hub.subscribe();
    let viewer_id = subscription.id;
    let mut hub_rx = subscription.receiver;

    if send_message_to_websocket(&outbound_tx, &snapshot).is_err() {
        hub.unregister(viewer_id);
        return;
    }

    // Dedicated writer task keeps hub traffic and pings flowing while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
        loop {
            let message = tokio::select! {
                biased;
                outbound = outbound_rx.recv() => match outbound {
                    Some(message) => message,
                    None => break,
                },
                payload = hub_rx.recv() => match payload {
                    Some(payload) => Message::Text(payload.to_string().into()),
                    None => {
                        debug!(room_id, user_id, "hub closed viewer channel");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    info!(room_id, user_id, viewer_id = %viewer_id, "room viewer connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(room_id, user_id, payload = %text, "ignoring inbound viewer message");
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(room_id, user_id, error = %err, "websocket error");
                break;
            }
        }
    }

    hub.unregister(viewer_id);
    info!(room_id, user_id, viewer_id = %viewer_id, "room viewer disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a message and push it onto the socket's writer queue.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
fn send_message_to_websocket(
    tx: &mpsc::UnboundedSender<Message>,
    message: &RoomMessage,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize viewer message");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into())).map_err(|_| ())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
