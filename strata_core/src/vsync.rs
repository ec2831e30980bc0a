// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync delivery contract.
//!
//! A backend runs one long-lived notifier task that turns hardware vsync
//! pulses into `(display, timestamp)` events. Each event is delivered to the
//! registered [`VsyncHandler`] at most once; while no handler is registered,
//! events are dropped on the floor. There is no buffering and no replay.

use crate::output::DisplayId;

/// Receives vsync pulses from a backend notifier task.
///
/// Invoked asynchronously from the notifier thread, at most once per
/// hardware pulse. Implementations should hand the timestamp off quickly;
/// the notifier does not pace itself around slow handlers.
pub trait VsyncHandler: Send + Sync {
    /// Called with the panel's hardware timestamp for one vsync pulse.
    fn on_vsync(&self, display: DisplayId, timestamp_nanos: u64);
}
