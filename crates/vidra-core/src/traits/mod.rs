// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the studio depends on.
//!
//! Networked and stateful adapters extend the [`PluginAdapter`] base trait
//! and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cache;
pub mod credentials;
pub mod generator;
pub mod persistence;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use cache::CachePurger;
pub use credentials::CredentialPrompt;
pub use generator::{GeneratorAdapter, ProgressFn};
pub use persistence::PersistenceAdapter;
