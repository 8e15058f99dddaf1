//! Receiver metrics for observability
//!
//! Runtime counters for channel traffic and dispatch outcomes, served as a
//! JSON snapshot at `/metrics`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Receiver-wide metrics
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    // Channel metrics
    /// Channels opened since start
    pub channels_opened: AtomicU64,
    /// Channels closed since start
    pub channels_closed: AtomicU64,

    // Message metrics
    /// Messages received from senders
    pub messages_received: AtomicU64,
    /// Outbound messages dropped (full queue or dead connection)
    pub messages_dropped: AtomicU64,

    // Dispatch metrics
    /// Valid requests that changed the title
    pub title_changes: AtomicU64,
    /// Acknowledgement broadcasts performed
    pub responses_broadcast: AtomicU64,
    /// Error replies queued to senders
    pub errors_sent: AtomicU64,

    /// Receiver start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ReceiverMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Channel tracking
    pub fn channel_opened(&self) {
        self.channels_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn channel_closed(&self) {
        self.channels_closed.fetch_add(1, Ordering::Relaxed);
    }

    // Message tracking
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Dispatch tracking
    pub fn title_changed(&self) {
        self.title_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn response_broadcast(&self) {
        self.responses_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_sent(&self) {
        self.errors_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            channels: ChannelMetrics {
                opened_total: self.channels_opened.load(Ordering::Relaxed),
                closed_total: self.channels_closed.load(Ordering::Relaxed),
            },
            messages: MessageMetrics {
                received: self.messages_received.load(Ordering::Relaxed),
                dropped: self.messages_dropped.load(Ordering::Relaxed),
            },
            dispatch: DispatchMetrics {
                title_changes: self.title_changes.load(Ordering::Relaxed),
                responses_broadcast: self.responses_broadcast.load(Ordering::Relaxed),
                errors_sent: self.errors_sent.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub channels: ChannelMetrics,
    pub messages: MessageMetrics,
    pub dispatch: DispatchMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub opened_total: u64,
    pub closed_total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub received: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMetrics {
    pub title_changes: u64,
    pub responses_broadcast: u64,
    pub errors_sent: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub open_channels: u64,
    pub uptime_secs: u64,
}
