// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Samsung SoC framebuffer (`s3cfb`) backend for strata.
//!
//! This crate binds the composition state machine from [`strata_core`] to
//! the s3cfb display driver's fbdev interface:
//!
//! - [`DisplayDevice`]: the composer device — open validation, window-pool
//!   bring-up, per-frame `prepare`/`set`, queries, blanking, vsync event
//!   control, deterministic teardown
//! - [`WindowDevice`]: one overlay window's device node and ioctl surface
//! - Vsync notifier thread with two compile-time timestamp sources: kernel
//!   uevents (default) or the driver's gated blocking wait ioctl
//!   (`vsync-ioctl` feature)
//!
//! The two timestamp sources are not runtime-switchable; pick one when
//! building for a board.

#![expect(
    unsafe_code,
    reason = "the fbdev driver surface requires raw ioctl calls"
)]

mod device;
mod ioctl;
mod screen;
mod uevent;
mod vsync;
mod window;

pub use device::{
    AllocatorModule, COMPOSER_DEVICE_NAME, CloseError, DisplayDevice, EXPECTED_ALLOCATOR_AUTHOR,
    EventKind, FrameList, OpenError, Query,
};
pub use screen::{
    DEFAULT_LCD_BPP, DEFAULT_LCD_HEIGHT, DEFAULT_LCD_WIDTH, FbBitfield, FbFixScreenInfo,
    FbVarScreenInfo, PanelInfo,
};
pub use strata_core::backend::{FrameSurface, VideoOutput, WindowOutput};
pub use strata_core::vsync::VsyncHandler;
pub use window::{DEVICE_COUNT, PANEL_WINDOW_ID, WindowDevice, WindowError, device_node_index};
