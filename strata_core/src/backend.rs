// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! The composition state machine in [`compose`](crate::compose) is pure
//! decision logic; everything that touches hardware flows through the traits
//! here. A platform backend implements them over real device handles, and
//! tests implement them as lightweight doubles, enabling the same machine to
//! run in both worlds.
//!
//! - **[`WindowOutput`]** — overlay window operations (hide, present).
//! - **[`FrameSurface`]** — the GPU-composited target surface (clear, swap).
//! - **[`VideoOutput`]** — best-effort mirroring blits to an auxiliary
//!   display device.

use core::fmt;

use crate::layer::{Layer, PixelFormat};
use crate::window::WindowId;

/// Error from a window-level backend operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowOpError {
    /// The backend does not implement this operation for its hardware.
    Unsupported,
    /// The display driver rejected the operation (raw OS error code).
    Driver(i32),
}

impl fmt::Display for WindowOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "operation not supported by this backend"),
            Self::Driver(code) => write!(f, "driver error ({code})"),
        }
    }
}

impl core::error::Error for WindowOpError {}

/// Applies overlay window decisions to hardware.
///
/// Failures are degradation, not aborts: the state machine hides the
/// affected window and completes the frame, tolerating a visual artifact.
pub trait WindowOutput {
    /// Powers the window off. Idempotent.
    fn hide(&mut self, id: WindowId) -> Result<(), WindowOpError>;

    /// Shows `layer` through the window using buffer slot `buf_index`.
    fn present(&mut self, id: WindowId, layer: &Layer, buf_index: usize)
    -> Result<(), WindowOpError>;
}

/// Buffer swap failure on the GPU-composited surface.
///
/// Fatal for the frame: the swap is never retried and the error propagates
/// to the caller unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapError;

impl fmt::Display for SwapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer swap failed")
    }
}

impl core::error::Error for SwapError {}

/// The GPU-composited target surface.
///
/// Stands in for the framework's native display/surface handle pair; `None`
/// at commit time means both handles were null.
pub trait FrameSurface {
    /// Paints the entire surface opaque black.
    ///
    /// The framework assumes an implicit black backdrop beneath the layer
    /// list; this realizes it when overlay windows alone cover the panel.
    fn clear_to_black(&mut self);

    /// Presents the GPU-composited buffer.
    fn swap_buffers(&mut self) -> Result<(), SwapError>;
}

/// Target mode of an auxiliary output blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlitMode {
    /// Graphics/UI content.
    Ui,
    /// Video content.
    Video,
}

/// One mirroring blit to an auxiliary video output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlitRequest {
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Source pixel layout.
    pub format: PixelFormat,
    /// Physical luma plane address.
    pub luma: u64,
    /// Physical first-chroma plane address.
    pub chroma_b: u64,
    /// Physical second-chroma plane address.
    pub chroma_r: u64,
    /// Destination x origin.
    pub x: u32,
    /// Destination y origin.
    pub y: u32,
    /// Content mode.
    pub mode: BlitMode,
    /// Number of overlay layers active this frame.
    pub active_layers: usize,
}

/// Auxiliary video output (secondary display) sink.
///
/// Strictly best-effort: implementations log their own failures and the
/// frame never depends on the blit having happened.
pub trait VideoOutput {
    /// Forwards one frame's buffer to the auxiliary output.
    fn blit(&mut self, request: &BlitRequest);
}
