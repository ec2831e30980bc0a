// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller-owned layer records.
//!
//! The compositing framework supplies a fresh ordered layer list every
//! frame. Layers are owned by the caller for the duration of one call;
//! classification rewrites only the [`kind`](Layer::kind) field in place and
//! treats everything else as read-only.

use crate::geometry::Rect;

/// Where a layer's pixels are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CompositionKind {
    /// Blended by the GPU into the shared framebuffer, then swapped.
    #[default]
    Framebuffer,
    /// Shown directly through a hardware overlay window.
    Overlay,
}

/// Per-layer framework flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct LayerFlags(pub u32);

impl LayerFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The framework asks for this layer to be ignored this frame.
    pub const SKIP: Self = Self(1 << 0);

    /// Returns `true` when all bits of `other` are set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Rotation/mirroring applied when the layer is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Transform {
    /// No rotation or mirroring.
    #[default]
    None,
    /// 90° clockwise rotation.
    Rot90,
    /// 180° rotation.
    Rot180,
    /// 270° clockwise rotation.
    Rot270,
    /// Horizontal mirror.
    FlipH,
    /// Vertical mirror.
    FlipV,
}

/// How the layer blends with what is beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Fully opaque; no blending.
    #[default]
    None,
    /// Alpha-blended with premultiplied source.
    Premultiplied,
    /// Alpha-blended with straight (coverage) alpha.
    Coverage,
}

/// Pixel layout of a layer's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit RGBA.
    Rgba8888,
    /// 32-bit RGB with ignored alpha byte.
    Rgbx8888,
    /// 16-bit RGB.
    Rgb565,
    /// 4:2:0 semi-planar, interleaved CbCr chroma plane.
    Ycbcr420Sp,
    /// 4:2:0 semi-planar, interleaved CrCb chroma plane.
    Ycrcb420Sp,
    /// 4:2:0 fully planar.
    Ycbcr420P,
    /// 4:2:0 planar with Cr before Cb.
    Yv12,
    /// Vendor macro-tiled 4:2:0 semi-planar.
    Ycbcr420SpTiled,
}

impl PixelFormat {
    /// Returns `true` for the planar/tiled YUV layouts the auxiliary video
    /// output can consume directly.
    #[must_use]
    pub const fn is_yuv(self) -> bool {
        matches!(
            self,
            Self::Ycbcr420Sp
                | Self::Ycrcb420Sp
                | Self::Ycbcr420P
                | Self::Yv12
                | Self::Ycbcr420SpTiled
        )
    }
}

/// Physical plane addresses of one multi-planar buffer.
///
/// Semi-planar layouts carry the interleaved chroma plane in both chroma
/// fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PlaneAddrs {
    /// Luma (Y) plane.
    pub luma: u64,
    /// First chroma plane (Cb, or interleaved CbCr).
    pub chroma_b: u64,
    /// Second chroma plane (Cr, or interleaved CrCb).
    pub chroma_r: u64,
}

/// Handle to one layer's pixel buffer.
///
/// The buffer contents are produced elsewhere; the composition machine only
/// forwards addresses and layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    /// Pixel layout of the buffer.
    pub format: PixelFormat,
    /// Buffer width in pixels.
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
    /// Physical plane addresses.
    pub planes: PlaneAddrs,
}

/// One entry of the per-frame layer list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Layer {
    /// Composition route. The only field classification writes.
    pub kind: CompositionKind,
    /// Framework flags.
    pub flags: LayerFlags,
    /// Pixel buffer, absent for layers the framework has not bound yet.
    pub buffer: Option<BufferHandle>,
    /// Rotation/mirroring to apply.
    pub transform: Transform,
    /// Blending against underlying content.
    pub blend: BlendMode,
    /// Region of the buffer to read.
    pub source_crop: Rect,
    /// Region of the panel to cover.
    pub display_frame: Rect,
}

#[cfg(test)]
mod tests {
    use super::{LayerFlags, PixelFormat};

    #[test]
    fn flag_containment() {
        let flags = LayerFlags(LayerFlags::SKIP.0 | 1 << 4);
        assert!(flags.contains(LayerFlags::SKIP));
        assert!(flags.contains(LayerFlags::NONE));
        assert!(!LayerFlags::NONE.contains(flags));
    }

    #[test]
    fn yuv_formats_are_recognized() {
        assert!(PixelFormat::Ycbcr420SpTiled.is_yuv());
        assert!(PixelFormat::Yv12.is_yuv());
        assert!(!PixelFormat::Rgba8888.is_yuv());
        assert!(!PixelFormat::Rgb565.is_yuv());
    }
}
