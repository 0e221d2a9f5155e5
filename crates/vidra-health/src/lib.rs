// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health monitor for the Vidra studio.
//!
//! [`HealthMonitor`] turns reported errors into a coarse
//! [`HealthStatus`](vidra_core::HealthStatus), lets observers subscribe to
//! changes, runs a best-effort heal protocol when error pressure crosses a
//! threshold, and decays pressure on every [`HeartbeatRunner`] tick.
//!
//! The monitor is an explicitly constructed service: build one at startup
//! and hand clones of it to every consumer.

pub mod heartbeat;
pub mod log;
pub mod memory;
pub mod monitor;

pub use heartbeat::HeartbeatRunner;
pub use log::{HealthLog, HealthLogEntry};
pub use monitor::{HealthMonitor, HealthSnapshot, Subscription};
