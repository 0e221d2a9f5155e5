// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Vidra integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests without
//! the Gemini API or a database.
//!
//! # Components
//!
//! - [`MockGenerator`] - Generator with scripted outcomes and call capture
//! - [`MockStore`] - In-memory persistence with injectable failures
//! - [`CountingPrompt`] - Credential prompt that records when it was shown
//! - [`CountingPurger`] - Cache purger that counts purge signals

pub mod mock_generator;
pub mod mock_store;
pub mod signals;

pub use mock_generator::{GeneratorCall, MockGenerator};
pub use mock_store::{LoggedEvent, MockStore};
pub use signals::{CountingPrompt, CountingPurger};
