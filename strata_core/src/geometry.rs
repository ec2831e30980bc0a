// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangles for layers and windows.
//!
//! Two rectangle flavors coexist because the two sides of the system speak
//! different conventions: the compositing framework describes layer regions
//! as left/top/right/bottom edges, while the framebuffer driver programs a
//! window as an origin plus a size.

use core::fmt;

/// An edge-based rectangle in layer coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge, inclusive.
    pub left: i32,
    /// Top edge, inclusive.
    pub top: i32,
    /// Right edge, exclusive.
    pub right: i32,
    /// Bottom edge, exclusive.
    pub bottom: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Creates a rectangle from its four edges.
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels; zero when the edges are inverted.
    #[must_use]
    pub const fn width(self) -> u32 {
        if self.right > self.left {
            (self.right - self.left) as u32
        } else {
            0
        }
    }

    /// Height in pixels; zero when the edges are inverted.
    #[must_use]
    pub const fn height(self) -> u32 {
        if self.bottom > self.top {
            (self.bottom - self.top) as u32
        } else {
            0
        }
    }

    /// Returns `true` when the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// An origin-plus-size rectangle in the framebuffer driver's window
/// programming model.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowRect {
    /// Horizontal origin on the panel.
    pub x: u32,
    /// Vertical origin on the panel.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

impl WindowRect {
    /// The zero-sized rectangle at the origin, used to park idle windows.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        w: 0,
        h: 0,
    };

    /// Returns `true` when position and size are all zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0 && self.w == 0 && self.h == 0
    }

    /// Converts a layer's destination rectangle into window geometry.
    ///
    /// Negative edges are clamped to the panel origin; the driver cannot
    /// place a window off-screen.
    #[must_use]
    pub const fn from_layer_frame(frame: Rect) -> Self {
        let x = if frame.left > 0 { frame.left as u32 } else { 0 };
        let y = if frame.top > 0 { frame.top as u32 } else { 0 };
        Self {
            x,
            y,
            w: frame.width(),
            h: frame.height(),
        }
    }
}

impl fmt::Debug for WindowRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}
