// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The overlay window slot arena.
//!
//! The hardware exposes a small fixed pool of overlay windows. This module
//! models the pool as an arena of exactly [`WINDOW_COUNT`] slots with
//! bounds-checked access through [`WindowId`]; there is deliberately no way
//! to reach a slot by raw index arithmetic.
//!
//! A slot's status follows one life cycle per frame:
//!
//! ```text
//!   FREE ──(classify reserves)──► RESERVED ──(commit presents)──► FREE
//!                                    │
//!                                    └──(error / unsupported)──► hidden, FREE
//! ```

use core::fmt;

use crate::geometry::WindowRect;

/// Number of hardware overlay windows in the pool.
pub const WINDOW_COUNT: usize = 2;

/// Multi-buffering depth of each window.
///
/// Buffer addresses are precomputed as `base + size * index` by the backend.
pub const BUFFER_COUNT: usize = 3;

/// Identifies one overlay window slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WindowId(pub u32);

impl WindowId {
    /// Returns the slot index this id addresses.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({})", self.0)
    }
}

/// Whether a slot currently carries a layer assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum WindowStatus {
    /// Unassigned.
    #[default]
    Free,
    /// Reserved during classification for the layer at `layer`.
    Reserved {
        /// Index into the frame's layer list.
        layer: usize,
    },
}

impl WindowStatus {
    /// Returns `true` for [`WindowStatus::Free`].
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    /// Returns `true` for [`WindowStatus::Reserved`].
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// Software state of one overlay window.
///
/// Device-side state (file descriptor, power, buffer addresses) lives in the
/// backend; the slot tracks only what classification and commit decide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct WindowSlot {
    /// Assignment status for the current frame.
    pub status: WindowStatus,
    /// Index of the buffer last panned to (0..[`BUFFER_COUNT`]).
    pub buf_index: usize,
    /// Geometry last programmed, zero while parked.
    pub frame: WindowRect,
}

/// Fixed arena of [`WINDOW_COUNT`] window slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WindowArena {
    slots: [WindowSlot; WINDOW_COUNT],
}

impl WindowArena {
    /// Creates an arena with every slot free.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [WindowSlot {
                status: WindowStatus::Free,
                buf_index: 0,
                frame: WindowRect::ZERO,
            }; WINDOW_COUNT],
        }
    }

    /// Returns the slot for `id`, or `None` when the id is out of range.
    #[must_use]
    pub fn get(&self, id: WindowId) -> Option<&WindowSlot> {
        self.slots.get(id.index())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowSlot> {
        self.slots.get_mut(id.index())
    }

    /// Iterates all slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &WindowSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (WindowId(i as u32), slot))
    }

    /// Frees every slot and rewinds its buffer index.
    pub(crate) fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.status = WindowStatus::Free;
            slot.buf_index = 0;
        }
    }
}
