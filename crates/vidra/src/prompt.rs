// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal API key prompt.
//!
//! Reads a replacement key with `rpassword` and installs it on the shared
//! Gemini client, so later requests from every clone pick it up.

use std::io::IsTerminal;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};
use vidra_core::CredentialPrompt;
use vidra_gemini::GeminiClient;

/// [`CredentialPrompt`] that asks on the controlling terminal.
#[derive(Debug)]
pub struct TerminalKeyPrompt {
    client: GeminiClient,
    completed: watch::Sender<u64>,
}

impl TerminalKeyPrompt {
    pub fn new(client: GeminiClient) -> Self {
        let (completed, _) = watch::channel(0);
        Self { client, completed }
    }

    /// Waits up to `timeout` for the next dialog to finish.
    ///
    /// Returns `true` if one finished in time.
    pub async fn wait_for_dialog(&self, timeout: Duration) -> bool {
        let mut rx = self.completed.subscribe();
        matches!(tokio::time::timeout(timeout, rx.changed()).await, Ok(Ok(())))
    }

    pub fn dialogs_completed(&self) -> u64 {
        *self.completed.borrow()
    }

    /// Installs `input` as the API key. Blank input leaves the key unchanged.
    pub fn apply_key(&self, input: &str) -> bool {
        let key = input.trim();
        if key.is_empty() {
            return false;
        }
        self.client.set_api_key(key);
        true
    }

    fn finish(&self) {
        self.completed.send_modify(|n| *n += 1);
    }
}

#[async_trait]
impl CredentialPrompt for TerminalKeyPrompt {
    async fn show_key_dialog(&self) {
        if !std::io::stdin().is_terminal() {
            warn!("API key rejected and no terminal to prompt on; set GEMINI_API_KEY");
            self.finish();
            return;
        }

        let read = tokio::task::spawn_blocking(|| {
            eprint!("Gemini API key: ");
            rpassword::read_password()
        })
        .await;

        match read {
            Ok(Ok(input)) => {
                if self.apply_key(&input) {
                    info!("API key replaced from terminal prompt");
                } else {
                    warn!("empty API key entered, keeping the previous key");
                }
            }
            Ok(Err(e)) => warn!(error = %e, "failed to read API key"),
            Err(e) => warn!(error = %e, "API key prompt task failed"),
        }
        self.finish();
    }
}
