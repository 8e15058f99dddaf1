use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AppState;
use crate::dispatcher::ChannelEvent;
use crate::protocol::ReceiverMessage;
use crate::registry::{ChannelHandle, OUTBOUND_QUEUE_DEPTH};

/// Drive one sender connection end to end: register the channel, pump frames
/// both ways, and emit Opened / Message / Closed events in connection order.
pub async fn handle_channel_socket(socket: WebSocket, state: AppState) {
    let channel_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ReceiverMessage>(OUTBOUND_QUEUE_DEPTH);

    let channel = ChannelHandle::new(channel_id.clone(), tx);

    // Register before announcing, so the open callback's channel count
    // already includes this channel.
    state.registry.insert(channel.clone());
    state.metrics.channel_opened();
    let opened = ChannelEvent::Opened {
        channel: channel.clone(),
    };
    if state.events.send(opened).await.is_err() {
        // Event loop is gone, so nothing will ever answer this socket.
        state.registry.remove(&channel_id);
        state.metrics.channel_closed();
        return;
    }

    // Outbound: queued replies become websocket text frames.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    warn!("failed to encode outbound message: {}", err);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound: websocket text frames become channel message events.
    let events = state.events.clone();
    let metrics = state.metrics.clone();
    let inbound_channel = channel.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                Message::Text(text) => {
                    let payload: Value = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(
                                channel = %inbound_channel.id(),
                                "discarding non-JSON frame: {}",
                                err
                            );
                            continue;
                        }
                    };
                    metrics.message_received();
                    let event = ChannelEvent::Message {
                        channel: inbound_channel.clone(),
                        payload,
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Message::Binary(_) => {
                    debug!(channel = %inbound_channel.id(), "binary frames not supported");
                }
                Message::Close(_) => break,
                // Axum answers pings itself.
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!(channel = %channel_id, "socket closed");

    // Deregister before announcing, so the close callback's channel count
    // no longer includes this channel.
    state.registry.remove(&channel_id);
    state.metrics.channel_closed();
    let _ = state.events.send(ChannelEvent::Closed { channel_id }).await;
}
