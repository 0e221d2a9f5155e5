// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording stand-ins for the credential prompt and cache purge channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use vidra_core::{CachePurger, CredentialPrompt, VidraError};

/// Credential prompt that records the instant of every invocation.
#[derive(Debug, Default)]
pub struct CountingPrompt {
    shown_at: Mutex<Vec<Instant>>,
}

impl CountingPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.shown_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Instants (on the tokio clock) at which the dialog was shown.
    pub fn shown_at(&self) -> Vec<Instant> {
        self.shown_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialPrompt for CountingPrompt {
    async fn show_key_dialog(&self) {
        self.shown_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
    }
}

/// Cache purger that counts signals and can be told to fail.
#[derive(Debug, Default)]
pub struct CountingPurger {
    purges: AtomicUsize,
    fail: AtomicBool,
}

impl CountingPurger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A purger whose every signal fails after being counted.
    pub fn failing() -> Self {
        let purger = Self::default();
        purger.fail.store(true, Ordering::SeqCst);
        purger
    }

    pub fn count(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }
}

impl CachePurger for CountingPurger {
    fn purge(&self) -> Result<(), VidraError> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VidraError::Cache("purge channel closed".into()));
        }
        Ok(())
    }
}
