// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types and composition state machine for overlay/framebuffer frame
//! splitting.
//!
//! `strata_core` decides, once per refresh cycle, how a caller-supplied list
//! of visual layers is turned into pixels: each layer either claims one of a
//! fixed pool of hardware overlay windows or falls back to GPU framebuffer
//! composition. The crate is `no_std` and performs no platform calls;
//! hardware effects flow through the traits in [`backend`], which platform
//! backends and test doubles implement.
//!
//! # Architecture
//!
//! The compositing framework drives two entry points per frame:
//!
//! ```text
//!   Framework (one call in flight at a time)
//!       │
//!       ├─► Compositor::classify() ── OverlayPolicy ──► layer kinds,
//!       │                                               WindowArena slots
//!       └─► Compositor::commit() ──► FrameSurface (clear / swap)
//!                                ──► WindowOutput (hide / present)
//!                                ──► VideoOutput  (auxiliary mirror)
//! ```
//!
//! **[`layer`]** — Caller-owned layer records. Classification rewrites each
//! layer's composition kind in place; everything else is read-only to us.
//!
//! **[`window`]** — A bounds-checked arena of exactly [`WINDOW_COUNT`]
//! overlay window slots with a FREE/RESERVED life cycle.
//!
//! **[`policy`]** — The [`OverlayPolicy`] capability predicate deciding
//! which layers may claim an overlay window.
//!
//! **[`compose`]** — The [`Compositor`] per-frame state machine:
//! classification, mode-transition clearing, buffer swap, teardown,
//! degraded-window skipping, and single-layer mirroring.
//!
//! **[`backend`]** — Traits platform backends implement to apply the
//! machine's decisions to real hardware.
//!
//! **[`vsync`]** — The [`VsyncHandler`] callback contract fed by a backend's
//! vsync notifier thread.
//!
//! [`WINDOW_COUNT`]: window::WINDOW_COUNT
//! [`OverlayPolicy`]: policy::OverlayPolicy
//! [`Compositor`]: compose::Compositor
//! [`VsyncHandler`]: vsync::VsyncHandler

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(test)]
extern crate alloc;

pub mod backend;
pub mod compose;
pub mod geometry;
pub mod layer;
pub mod output;
pub mod policy;
pub mod vsync;
pub mod window;
