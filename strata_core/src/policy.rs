// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay eligibility policies.
//!
//! Whether a layer *may* claim an overlay window is a board-level capability
//! question (pixel format, scaler limits, rotation support), not a property
//! of the composition state machine. The machine consults an
//! [`OverlayPolicy`] and otherwise stays policy-agnostic.

use crate::layer::{Layer, LayerFlags, Transform};

/// Capability predicate for overlay assignment.
///
/// Consulted once per layer, in list order, while the window budget lasts.
pub trait OverlayPolicy {
    /// Returns `true` when `layer` can be shown through an overlay window.
    fn supports_overlay(&self, layer: &Layer) -> bool;
}

/// Policy that routes every layer through GPU composition.
///
/// This is the shipping configuration for boards without a blit engine to
/// fill window buffers: reserving a window would display whatever the
/// buffer last held.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuOnly;

impl OverlayPolicy for GpuOnly {
    fn supports_overlay(&self, _layer: &Layer) -> bool {
        false
    }
}

/// Policy that accepts unrotated video layers.
///
/// Accepts layers whose buffer is a planar/tiled YUV layout, carries no
/// rotation and is not flagged for skipping. UI layers stay on the GPU
/// path, which handles arbitrary formats and transforms.
#[derive(Clone, Copy, Debug, Default)]
pub struct VideoOnly;

impl OverlayPolicy for VideoOnly {
    fn supports_overlay(&self, layer: &Layer) -> bool {
        if layer.flags.contains(LayerFlags::SKIP) || layer.transform != Transform::None {
            return false;
        }
        layer.buffer.is_some_and(|buffer| buffer.format.is_yuv())
    }
}

#[cfg(test)]
mod tests {
    use super::{GpuOnly, OverlayPolicy, VideoOnly};
    use crate::layer::{
        BufferHandle, Layer, LayerFlags, PixelFormat, PlaneAddrs, Transform,
    };

    fn video_layer(format: PixelFormat) -> Layer {
        Layer {
            buffer: Some(BufferHandle {
                format,
                width: 1280,
                height: 720,
                planes: PlaneAddrs::default(),
            }),
            ..Layer::default()
        }
    }

    #[test]
    fn gpu_only_rejects_everything() {
        assert!(!GpuOnly.supports_overlay(&video_layer(PixelFormat::Ycbcr420Sp)));
        assert!(!GpuOnly.supports_overlay(&Layer::default()));
    }

    #[test]
    fn video_only_accepts_plain_yuv() {
        assert!(VideoOnly.supports_overlay(&video_layer(PixelFormat::Ycbcr420SpTiled)));
        assert!(!VideoOnly.supports_overlay(&video_layer(PixelFormat::Rgba8888)));
        assert!(!VideoOnly.supports_overlay(&Layer::default()));
    }

    #[test]
    fn video_only_rejects_rotated_or_skipped() {
        let mut rotated = video_layer(PixelFormat::Yv12);
        rotated.transform = Transform::Rot90;
        assert!(!VideoOnly.supports_overlay(&rotated));

        let mut skipped = video_layer(PixelFormat::Yv12);
        skipped.flags = LayerFlags::SKIP;
        assert!(!VideoOnly.supports_overlay(&skipped));
    }
}
