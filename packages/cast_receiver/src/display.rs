//! The receiver's display surface: one title string, shown on the status
//! page and mirrored by `GET /api/display`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Debug)]
struct DisplayInner {
    title: String,
    updated_at: Option<DateTime<Utc>>,
}

/// Shared title state. The dispatcher writes it on a valid request; the HTTP
/// layer reads it.
#[derive(Debug)]
pub struct Display {
    inner: RwLock<DisplayInner>,
}

impl Display {
    pub fn new(initial_title: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(DisplayInner {
                title: initial_title.into(),
                updated_at: None,
            }),
        }
    }

    pub fn set_title(&self, title: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.title = title.to_string();
        inner.updated_at = Some(Utc::now());
    }

    pub fn title(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.title.clone()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        DisplaySnapshot {
            title: inner.title.clone(),
            updated_at: inner.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
}
