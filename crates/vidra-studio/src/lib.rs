// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation lifecycle controller for the Vidra studio.
//!
//! The [`StudioController`] owns the ordered feed of generation jobs. Each
//! submission:
//! - Prepends a `Generating` job and returns its id immediately
//! - Dispatches to the generator on a spawned task according to its mode
//! - Resolves the job to `Success` or a classified `Error` exactly once
//! - Persists terminal states and reports failures to the health monitor
//!
//! Consumers observe jobs through feed snapshots and a [`JobUpdate`]
//! broadcast, transient [`Notice`]s through a `watch` channel, and live
//! preview stills through another.

pub mod controller;
pub mod debounce;
pub mod notice;
pub mod registry;

pub use controller::{JobUpdate, StudioController, StudioOptions};
pub use debounce::Debouncer;
pub use notice::{Notice, NoticeKind, Toaster};
pub use registry::JobRegistry;
