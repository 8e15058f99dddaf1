//! The receiver's message dispatcher.
//!
//! One dispatcher instance handles every channel event for the application.
//! Events arrive on a single queue and are delivered one at a time, so the
//! callbacks run strictly in arrival order with nothing interleaved. That is
//! the same delivery model the channels themselves assume.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::display::Display;
use crate::metrics::ReceiverMetrics;
use crate::protocol::{self, ReceiverMessage, TITLE_CHANGED_RESPONSE};
use crate::registry::{ChannelHandle, ChannelId, ChannelRegistry};

/// Lifecycle and traffic events produced by the transport layer.
///
/// Message events carry the originating channel so replies have somewhere to
/// go without consulting the registry.
#[derive(Debug)]
pub enum ChannelEvent {
    Opened { channel: ChannelHandle },
    Closed { channel_id: ChannelId },
    Message { channel: ChannelHandle, payload: Value },
}

/// Callback set a channel-event consumer registers with the delivery loop.
pub trait ChannelEvents {
    fn on_open(&mut self, channel: &ChannelHandle);
    fn on_close(&mut self, channel_id: &str);
    fn on_message(&mut self, channel: &ChannelHandle, payload: &Value);
}

/// Deliver queued events to the registered handler until every producer has
/// hung up. One event at a time, in arrival order.
pub async fn drive_events<H: ChannelEvents>(
    mut handler: H,
    mut events: mpsc::Receiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Opened { channel } => handler.on_open(&channel),
            ChannelEvent::Closed { channel_id } => handler.on_close(&channel_id),
            ChannelEvent::Message { channel, payload } => handler.on_message(&channel, &payload),
        }
    }
    debug!("event queue closed, dispatcher stopped");
}

/// The demo receiver behavior: mirror sender requests onto the display,
/// acknowledge every open channel, and shut the application down when the
/// last channel closes.
pub struct MessageDispatcher {
    registry: Arc<ChannelRegistry>,
    display: Arc<Display>,
    metrics: Arc<ReceiverMetrics>,
    shutdown: CancellationToken,
}

impl MessageDispatcher {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        display: Arc<Display>,
        metrics: Arc<ReceiverMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            display,
            metrics,
            shutdown,
        }
    }

    /// Queue a message on every open channel, in open order. Senders that
    /// cannot take the message right now lose it; nobody else is affected.
    fn broadcast(&self, message: ReceiverMessage) {
        for channel in self.registry.channels() {
            if !channel.try_send(message.clone()) {
                self.metrics.message_dropped();
            }
        }
    }

    fn send_error(&self, channel: &ChannelHandle, text: String) {
        self.metrics.error_sent();
        if !channel.try_send(ReceiverMessage::Error { error: text }) {
            self.metrics.message_dropped();
        }
    }

    /// Ask the bootstrap to terminate the process. Idempotent; only the first
    /// request does (and logs) anything.
    fn request_shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        info!("last channel closed, shutting down receiver");
        self.shutdown.cancel();
    }
}

impl ChannelEvents for MessageDispatcher {
    fn on_open(&mut self, channel: &ChannelHandle) {
        let open = self.registry.channel_count();
        info!(channel = %channel.id(), open, "channel opened");
    }

    fn on_close(&mut self, channel_id: &str) {
        let open = self.registry.channel_count();
        info!(channel = %channel_id, open, "channel closed");
        if open == 0 {
            self.request_shutdown();
        }
    }

    fn on_message(&mut self, channel: &ChannelHandle, payload: &Value) {
        debug!(channel = %channel.id(), %payload, "channel message");
        match protocol::request_field(payload) {
            Some(request) => {
                self.display.set_title(request);
                self.metrics.title_changed();
                self.broadcast(ReceiverMessage::Response {
                    response: TITLE_CHANGED_RESPONSE.to_string(),
                });
                self.metrics.response_broadcast();
            }
            None => {
                // Historical quirk kept on purpose: the error names a
                // `command` field the recognized shape never defines.
                let text = format!(
                    "Invalid message command: {}",
                    protocol::command_label(payload)
                );
                error!(channel = %channel.id(), "{}", text);
                self.send_error(channel, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_dispatcher() -> (
        MessageDispatcher,
        Arc<ChannelRegistry>,
        Arc<Display>,
        Arc<ReceiverMetrics>,
        CancellationToken,
    ) {
        let registry = Arc::new(ChannelRegistry::new());
        let display = Arc::new(Display::new("Ready"));
        let metrics = Arc::new(ReceiverMetrics::new());
        let shutdown = CancellationToken::new();
        let dispatcher = MessageDispatcher::new(
            registry.clone(),
            display.clone(),
            metrics.clone(),
            shutdown.clone(),
        );
        (dispatcher, registry, display, metrics, shutdown)
    }

    fn open_channel(
        registry: &ChannelRegistry,
        id: &str,
    ) -> (ChannelHandle, mpsc::Receiver<ReceiverMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = ChannelHandle::new(id, tx);
        registry.insert(handle.clone());
        (handle, rx)
    }

    #[test]
    fn test_request_updates_title_and_broadcasts() {
        let (mut dispatcher, registry, display, metrics, _shutdown) = make_test_dispatcher();
        let (a, mut rx_a) = open_channel(&registry, "a");
        let (_b, mut rx_b) = open_channel(&registry, "b");

        dispatcher.on_message(&a, &json!({"request": "Fireplace Video"}));

        assert_eq!(display.title(), "Fireplace Video");
        let expected = ReceiverMessage::Response {
            response: "title changed.".to_string(),
        };
        // Both channels get the acknowledgement, the originator included.
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
        assert_eq!(metrics.snapshot().dispatch.title_changes, 1);
        assert_eq!(metrics.snapshot().dispatch.responses_broadcast, 1);
    }

    #[test]
    fn test_invalid_message_replies_to_source_only() {
        let (mut dispatcher, registry, display, metrics, _shutdown) = make_test_dispatcher();
        let (a, mut rx_a) = open_channel(&registry, "a");
        let (_b, mut rx_b) = open_channel(&registry, "b");

        dispatcher.on_message(&a, &json!({"volume": 11}));

        assert_eq!(display.title(), "Ready");
        match rx_a.try_recv().unwrap() {
            ReceiverMessage::Error { error } => {
                assert_eq!(error, "Invalid message command: none");
            }
            other => panic!("expected error reply, got {other:?}"),
        }
        assert!(rx_b.try_recv().is_err());
        assert_eq!(metrics.snapshot().dispatch.errors_sent, 1);
        assert_eq!(metrics.snapshot().dispatch.title_changes, 0);
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let (mut dispatcher, registry, display, _metrics, _shutdown) = make_test_dispatcher();
        let (a, mut rx_a) = open_channel(&registry, "a");

        dispatcher.on_message(&a, &json!({"request": ""}));

        assert_eq!(display.title(), "Ready");
        assert!(matches!(
            rx_a.try_recv().unwrap(),
            ReceiverMessage::Error { .. }
        ));
    }

    #[test]
    fn test_error_text_renders_present_command() {
        let (mut dispatcher, registry, _display, _metrics, _shutdown) = make_test_dispatcher();
        let (a, mut rx_a) = open_channel(&registry, "a");

        dispatcher.on_message(&a, &json!({"command": "play"}));

        match rx_a.try_recv().unwrap() {
            ReceiverMessage::Error { error } => {
                assert_eq!(error, r#"Invalid message command: "play""#);
            }
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[test]
    fn test_close_to_zero_requests_shutdown_once() {
        let (mut dispatcher, registry, _display, _metrics, shutdown) = make_test_dispatcher();
        let (_a, _rx_a) = open_channel(&registry, "a");
        let (_b, _rx_b) = open_channel(&registry, "b");

        registry.remove("a");
        dispatcher.on_close("a");
        assert!(!shutdown.is_cancelled());

        registry.remove("b");
        dispatcher.on_close("b");
        assert!(shutdown.is_cancelled());

        // A straggling close event after shutdown must stay a no-op.
        dispatcher.on_close("b");
        assert!(shutdown.is_cancelled());
    }

    #[test]
    fn test_open_never_requests_shutdown() {
        let (mut dispatcher, registry, _display, _metrics, shutdown) = make_test_dispatcher();
        let (a, _rx_a) = open_channel(&registry, "a");

        dispatcher.on_open(&a);
        assert!(!shutdown.is_cancelled());
    }

    #[test]
    fn test_broadcast_skips_closed_channel() {
        let (mut dispatcher, registry, _display, _metrics, _shutdown) = make_test_dispatcher();
        let (a, mut rx_a) = open_channel(&registry, "a");
        let (_b, mut rx_b) = open_channel(&registry, "b");

        // b's close has been observed: it is out of the registry before the
        // next message dispatches.
        registry.remove("b");
        dispatcher.on_message(&a, &json!({"request": "Evening Playlist"}));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_are_counted() {
        let (mut dispatcher, registry, _display, metrics, _shutdown) = make_test_dispatcher();
        let (tx, mut rx) = mpsc::channel(1);
        let cramped = ChannelHandle::new("cramped", tx);
        registry.insert(cramped.clone());

        dispatcher.on_message(&cramped, &json!({"request": "First"}));
        // Queue now holds the first acknowledgement; the next one drops.
        dispatcher.on_message(&cramped, &json!({"request": "Second"}));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.snapshot().messages.dropped, 1);
    }

    #[tokio::test]
    async fn test_drive_events_delivers_in_order() {
        let (dispatcher, registry, display, _metrics, shutdown) = make_test_dispatcher();
        let (events_tx, events_rx) = mpsc::channel(8);

        let (a, mut rx_a) = open_channel(&registry, "a");
        events_tx
            .send(ChannelEvent::Opened { channel: a.clone() })
            .await
            .unwrap();
        events_tx
            .send(ChannelEvent::Message {
                channel: a.clone(),
                payload: json!({"request": "Window Seat"}),
            })
            .await
            .unwrap();
        registry.remove("a");
        events_tx
            .send(ChannelEvent::Closed {
                channel_id: "a".to_string(),
            })
            .await
            .unwrap();
        drop(events_tx);

        drive_events(dispatcher, events_rx).await;

        assert_eq!(display.title(), "Window Seat");
        assert!(shutdown.is_cancelled());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }
}
