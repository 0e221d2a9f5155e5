// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient user notifications.
//!
//! At most one [`Notice`] is current at a time. Showing a new notice replaces
//! the old one and restarts the dismiss timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::debug;

use crate::debounce::Debouncer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Monotonic sequence number, unique per toaster.
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

/// Publishes the current notice and dismisses it after a fixed delay.
#[derive(Debug)]
pub struct Toaster {
    current: watch::Sender<Option<Notice>>,
    dismiss: Debouncer,
    next_id: AtomicU64,
}

impl Toaster {
    pub fn new(dismiss_after: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            dismiss: Debouncer::new(dismiss_after),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(NoticeKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(NoticeKind::Error, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(NoticeKind::Info, message.into());
    }

    /// Replaces the current notice. Must be called inside a tokio runtime.
    pub fn show(&self, kind: NoticeKind, message: String) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(notice_id = id, %kind, %message, "notice shown");
        self.current.send_replace(Some(Notice {
            id,
            kind,
            message,
            shown_at: Utc::now(),
        }));

        let current = self.current.clone();
        self.dismiss.schedule(async move {
            // A newer notice owns the slot now; leave it alone.
            current.send_if_modified(|slot| match slot {
                Some(notice) if notice.id == id => {
                    *slot = None;
                    true
                }
                _ => false,
            });
        });
    }

    pub fn dismiss(&self) {
        self.dismiss.cancel();
        self.current.send_replace(None);
    }

    pub fn current(&self) -> Option<Notice> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.current.subscribe()
    }
}
