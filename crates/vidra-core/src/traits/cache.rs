// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media cache purge channel.

use crate::error::VidraError;

/// A channel to a background worker that drops cached media.
///
/// `purge` only signals; the work happens asynchronously on the worker.
pub trait CachePurger: Send + Sync + 'static {
    fn purge(&self) -> Result<(), VidraError>;
}
