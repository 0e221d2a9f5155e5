// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential prompt trait.

use async_trait::async_trait;

/// The affordance that asks the user for a new API key.
///
/// The studio only decides when to call it; rendering and storing the key
/// belong to the implementation.
#[async_trait]
pub trait CredentialPrompt: Send + Sync + 'static {
    async fn show_key_dialog(&self);
}
