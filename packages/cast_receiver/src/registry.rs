//! The live set of open channels.
//!
//! One `ChannelHandle` per connected sender. The WebSocket layer inserts a
//! channel before queueing its Opened event and removes it before queueing
//! Closed, so counts observed by the dispatcher always match the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

use crate::protocol::ReceiverMessage;

/// Unique id for one channel (uuid v4, assigned at upgrade time).
pub type ChannelId = String;

/// Outbound queue depth per channel. A sender that stops reading loses
/// messages past this point instead of stalling the dispatcher.
pub const OUTBOUND_QUEUE_DEPTH: usize = 100;

/// Send-capable reference to one open channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    opened_at: DateTime<Utc>,
    tx: mpsc::Sender<ReceiverMessage>,
}

impl ChannelHandle {
    pub fn new(id: impl Into<ChannelId>, tx: mpsc::Sender<ReceiverMessage>) -> Self {
        Self {
            id: id.into(),
            opened_at: Utc::now(),
            tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a message for this sender. Returns false when the queue is full
    /// or the connection is gone; the message is dropped either way.
    pub fn try_send(&self, message: ReceiverMessage) -> bool {
        self.tx.try_send(message).is_ok()
    }

    pub fn summary(&self) -> ChannelSummary {
        ChannelSummary {
            id: self.id.clone(),
            opened_at: self.opened_at,
        }
    }
}

/// Serializable channel info for the status page and display endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub opened_at: DateTime<Utc>,
}

/// All currently open channels, keyed by id.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelId, ChannelHandle>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: ChannelHandle) {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels.insert(handle.id.clone(), handle);
    }

    pub fn remove(&self, id: &str) -> Option<ChannelHandle> {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels.remove(id)
    }

    pub fn channel_count(&self) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels.len()
    }

    /// Snapshot of every open channel in open order (opened_at, then id, so
    /// broadcast order is deterministic).
    pub fn channels(&self) -> Vec<ChannelHandle> {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        let mut snapshot: Vec<ChannelHandle> = channels.values().cloned().collect();
        snapshot.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.id.cmp(&b.id)));
        snapshot
    }

    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.channels().iter().map(ChannelHandle::summary).collect()
    }
}
