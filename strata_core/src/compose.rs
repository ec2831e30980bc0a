// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame composition state machine.
//!
//! [`Compositor`] owns the window arena and the frame counters and exposes
//! the two calls the compositing framework makes each frame, in order:
//!
//! 1. [`classify`](Compositor::classify) — decide, per layer, between GPU
//!    framebuffer composition and a hardware overlay window.
//! 2. [`commit`](Compositor::commit) — execute the decision: clear on
//!    composition-mode transitions, swap the GPU buffer, drive overlay
//!    windows, mirror to an auxiliary output.
//!
//! Both calls run on the framework's compositor thread, one in flight at a
//! time; the machine holds no locks.
//!
//! # Stale-content rules
//!
//! Two rules exist solely to keep yesterday's pixels off the panel:
//!
//! - Windows beyond the number used this frame are hidden and their
//!   geometry parked at zero during classification.
//! - When a frame uses only overlay windows but the previous frame had GPU
//!   content, the framebuffer is cleared to opaque black and swapped once,
//!   because the framework assumes an implicit black backdrop beneath the
//!   layer list.

use core::fmt;

use crate::backend::{BlitMode, BlitRequest, FrameSurface, VideoOutput, WindowOutput};
use crate::geometry::WindowRect;
use crate::layer::{CompositionKind, Layer, PixelFormat};
use crate::policy::OverlayPolicy;
use crate::window::{BUFFER_COUNT, WINDOW_COUNT, WindowArena, WindowId, WindowSlot, WindowStatus};

/// Fatal per-frame commit failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitError {
    /// The GPU buffer swap failed. Never retried; the caller decides
    /// whether to drop the frame or escalate.
    SwapFailed,
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwapFailed => write!(f, "GPU buffer swap failed"),
        }
    }
}

impl core::error::Error for CommitError {}

/// What classification observed, for the backend to log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifyReport {
    /// Layers routed to GPU composition this frame.
    pub fb_layers: usize,
    /// Layers routed to overlay windows this frame.
    pub overlay_layers: usize,
    /// The two counts did not sum to the list length. Logged, never
    /// corrected.
    pub count_mismatch: bool,
}

/// What a commit did, for the backend to log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CommitOutcome {
    /// The GPU buffer was swapped.
    pub swapped: bool,
    /// The framebuffer was cleared for a composition-mode transition.
    pub cleared: bool,
    /// Bitmask of overlay windows skipped (and hidden) this frame.
    pub skipped: u32,
    /// The single overlay layer was mirrored to the auxiliary output.
    pub mirrored: bool,
    /// Mirroring was wanted but the layer's format is not mirrorable.
    pub unmirrorable: Option<PixelFormat>,
}

/// Per-frame composition state: window arena, counters, budget.
#[derive(Debug)]
pub struct Compositor {
    arena: WindowArena,
    overlay_budget: usize,
    fb_layers: usize,
    overlay_layers: usize,
    fb_layers_prev: usize,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    /// Creates a compositor with the full window pool available.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arena: WindowArena::new(),
            overlay_budget: WINDOW_COUNT,
            fb_layers: 0,
            overlay_layers: 0,
            fb_layers_prev: 0,
        }
    }

    /// Limits how many overlay windows classification may hand out.
    ///
    /// Clamped to [`WINDOW_COUNT`]. A budget of zero disables the overlay
    /// path entirely; every layer then rides the GPU framebuffer, which is
    /// legal if degraded.
    pub fn set_overlay_budget(&mut self, budget: usize) {
        self.overlay_budget = budget.min(WINDOW_COUNT);
    }

    /// Current overlay window budget.
    #[must_use]
    pub const fn overlay_budget(&self) -> usize {
        self.overlay_budget
    }

    /// Layers routed to GPU composition this frame.
    #[must_use]
    pub const fn fb_layer_count(&self) -> usize {
        self.fb_layers
    }

    /// Layers routed to overlay windows this frame.
    #[must_use]
    pub const fn overlay_layer_count(&self) -> usize {
        self.overlay_layers
    }

    /// Read access to one window slot.
    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<&WindowSlot> {
        self.arena.get(id)
    }

    /// Forgets the previous frame's GPU content.
    ///
    /// Called when the screen blanks: the next unblanked frame must not
    /// trigger a mode-transition clear against a panel that was dark.
    pub fn forget_previous_frame(&mut self) {
        self.fb_layers_prev = 0;
    }

    /// Splits `layers` between overlay windows and GPU composition.
    ///
    /// With `geometry_changed == false` the previous frame's assignment is
    /// reused verbatim: no layer kind changes, no window state is touched.
    /// Geometry-stable frames are the common case and skip all work here.
    ///
    /// With `geometry_changed == true`, every slot is freed and the layer
    /// list is walked in order. While the overlay budget lasts, a layer the
    /// `policy` accepts reserves the next window and becomes
    /// [`CompositionKind::Overlay`]; everything else becomes
    /// [`CompositionKind::Framebuffer`]. Windows beyond the number used are
    /// hidden and their geometry parked so no stale overlay content
    /// survives the reshuffle.
    pub fn classify(
        &mut self,
        geometry_changed: bool,
        layers: &mut [Layer],
        policy: &dyn OverlayPolicy,
        windows: &mut dyn WindowOutput,
    ) -> ClassifyReport {
        if !geometry_changed {
            return ClassifyReport {
                fb_layers: self.fb_layers,
                overlay_layers: self.overlay_layers,
                count_mismatch: false,
            };
        }

        self.arena.release_all();
        self.fb_layers = 0;
        self.overlay_layers = 0;

        let budget = self.overlay_budget.min(WINDOW_COUNT);
        for (index, layer) in layers.iter_mut().enumerate() {
            if self.overlay_layers < budget && policy.supports_overlay(layer) {
                let id = WindowId(self.overlay_layers as u32);
                if let Some(slot) = self.arena.get_mut(id) {
                    slot.status = WindowStatus::Reserved { layer: index };
                    layer.kind = CompositionKind::Overlay;
                    self.overlay_layers += 1;
                    continue;
                }
            }
            layer.kind = CompositionKind::Framebuffer;
            self.fb_layers += 1;
        }

        // Park the windows this frame leaves unused. Hide failures are the
        // backend's to log; classification proceeds regardless.
        for index in self.overlay_layers..WINDOW_COUNT {
            let id = WindowId(index as u32);
            let _ = windows.hide(id);
            if let Some(slot) = self.arena.get_mut(id) {
                slot.frame = WindowRect::ZERO;
            }
        }

        ClassifyReport {
            fb_layers: self.fb_layers,
            overlay_layers: self.overlay_layers,
            count_mismatch: self.fb_layers + self.overlay_layers != layers.len(),
        }
    }

    /// Executes the current frame's assignment.
    ///
    /// `surface == None` means both native display handles were null: the
    /// screen is turning off. The previous-frame GPU count is reset so the
    /// next lit frame does not see a phantom transition, and nothing else
    /// is touched.
    ///
    /// `layers == None` with a live surface is the full-teardown signal:
    /// the GPU buffer is swapped, every window is hidden and parked, and
    /// the overlay counter drops to zero.
    ///
    /// # Errors
    ///
    /// [`CommitError::SwapFailed`] when the surface swap fails. The error
    /// is returned immediately and never retried; window state already
    /// changed this frame stays as it is.
    pub fn commit(
        &mut self,
        surface: Option<&mut dyn FrameSurface>,
        layers: Option<&[Layer]>,
        windows: &mut dyn WindowOutput,
        video_out: Option<&mut dyn VideoOutput>,
    ) -> Result<CommitOutcome, CommitError> {
        let mut outcome = CommitOutcome::default();

        let Some(surface) = surface else {
            self.forget_previous_frame();
            return Ok(outcome);
        };

        let mut need_swap = self.fb_layers > 0;

        if self.overlay_layers > 0 && self.fb_layers == 0 && self.fb_layers_prev > 0 {
            // All-overlay frame right after a GPU frame: erase the
            // framebuffer so stale GPU pixels cannot show through gaps the
            // windows leave uncovered.
            surface.clear_to_black();
            outcome.cleared = true;
            need_swap = true;
        }

        self.fb_layers_prev = self.fb_layers;

        if need_swap || layers.is_none() {
            surface
                .swap_buffers()
                .map_err(|_| CommitError::SwapFailed)?;
            outcome.swapped = true;
        }

        let Some(layers) = layers else {
            for index in 0..WINDOW_COUNT {
                let id = WindowId(index as u32);
                let _ = windows.hide(id);
                if let Some(slot) = self.arena.get_mut(id) {
                    slot.frame = WindowRect::ZERO;
                    slot.status = WindowStatus::Free;
                }
            }
            self.overlay_layers = 0;
            return Ok(outcome);
        };

        // Classification already bounds this; clamp anyway so a bad count
        // can never walk past the arena.
        if self.overlay_layers > WINDOW_COUNT {
            self.overlay_layers = WINDOW_COUNT;
        }

        for index in 0..self.overlay_layers {
            let id = WindowId(index as u32);
            let status = self.arena.get(id).map(|slot| slot.status);
            let Some(WindowStatus::Reserved { layer }) = status else {
                outcome.skipped |= 1 << index;
                continue;
            };
            let Some(layer) = layers.get(layer) else {
                outcome.skipped |= 1 << index;
                continue;
            };

            let next_buf = self
                .arena
                .get(id)
                .map_or(0, |slot| (slot.buf_index + 1) % BUFFER_COUNT);

            match windows.present(id, layer, next_buf) {
                Ok(()) => {
                    if let Some(slot) = self.arena.get_mut(id) {
                        slot.buf_index = next_buf;
                        slot.frame = WindowRect::from_layer_frame(layer.display_frame);
                        slot.status = WindowStatus::Free;
                    }
                }
                Err(_) => {
                    outcome.skipped |= 1 << index;
                }
            }
        }

        if outcome.skipped != 0 {
            // A skipped window may still be lit with last frame's content;
            // darken it now rather than show the wrong image.
            for index in 0..WINDOW_COUNT {
                if outcome.skipped & (1 << index) != 0 {
                    let id = WindowId(index as u32);
                    let _ = windows.hide(id);
                    if let Some(slot) = self.arena.get_mut(id) {
                        slot.status = WindowStatus::Free;
                    }
                }
            }
        }

        if self.overlay_layers == 1 {
            if let Some(video_out) = video_out {
                self.mirror_single_layer(layers, video_out, &mut outcome);
            }
        }

        Ok(outcome)
    }

    /// Forwards the frame's single overlay layer to the auxiliary output.
    fn mirror_single_layer(
        &self,
        layers: &[Layer],
        video_out: &mut dyn VideoOutput,
        outcome: &mut CommitOutcome,
    ) {
        let buffer = layers
            .iter()
            .find(|layer| layer.kind == CompositionKind::Overlay)
            .and_then(|layer| layer.buffer);
        let Some(buffer) = buffer else {
            return;
        };

        if !buffer.format.is_yuv() {
            outcome.unmirrorable = Some(buffer.format);
            return;
        }

        video_out.blit(&BlitRequest {
            width: buffer.width,
            height: buffer.height,
            format: buffer.format,
            luma: buffer.planes.luma,
            chroma_b: buffer.planes.chroma_b,
            chroma_r: buffer.planes.chroma_r,
            x: 0,
            y: 0,
            mode: BlitMode::Video,
            active_layers: self.overlay_layers,
        });
        outcome.mirrored = true;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{CommitError, Compositor};
    use crate::backend::{
        BlitRequest, FrameSurface, SwapError, VideoOutput, WindowOpError, WindowOutput,
    };
    use crate::geometry::{Rect, WindowRect};
    use crate::layer::{
        BufferHandle, CompositionKind, Layer, PixelFormat, PlaneAddrs,
    };
    use crate::policy::{GpuOnly, OverlayPolicy, VideoOnly};
    use crate::window::{WINDOW_COUNT, WindowId, WindowStatus};

    /// Accepts every layer; the budget alone limits assignment.
    struct Greedy;

    impl OverlayPolicy for Greedy {
        fn supports_overlay(&self, _layer: &Layer) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct FakeWindows {
        hidden: Vec<u32>,
        presented: Vec<(u32, usize)>,
        fail_present: bool,
    }

    impl WindowOutput for FakeWindows {
        fn hide(&mut self, id: WindowId) -> Result<(), WindowOpError> {
            self.hidden.push(id.0);
            Ok(())
        }

        fn present(
            &mut self,
            id: WindowId,
            _layer: &Layer,
            buf_index: usize,
        ) -> Result<(), WindowOpError> {
            if self.fail_present {
                return Err(WindowOpError::Unsupported);
            }
            self.presented.push((id.0, buf_index));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        cleared: usize,
        swapped: usize,
        fail_swap: bool,
    }

    impl FrameSurface for FakeSurface {
        fn clear_to_black(&mut self) {
            self.cleared += 1;
        }

        fn swap_buffers(&mut self) -> Result<(), SwapError> {
            if self.fail_swap {
                return Err(SwapError);
            }
            self.swapped += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeVideoOut {
        blits: Vec<BlitRequest>,
    }

    impl VideoOutput for FakeVideoOut {
        fn blit(&mut self, request: &BlitRequest) {
            self.blits.push(*request);
        }
    }

    fn gpu_layer() -> Layer {
        Layer {
            display_frame: Rect::new(0, 0, 480, 800),
            ..Layer::default()
        }
    }

    fn video_layer() -> Layer {
        Layer {
            buffer: Some(BufferHandle {
                format: PixelFormat::Ycbcr420SpTiled,
                width: 1280,
                height: 720,
                planes: PlaneAddrs {
                    luma: 0x4000_0000,
                    chroma_b: 0x4010_0000,
                    chroma_r: 0x4010_0000,
                },
            }),
            display_frame: Rect::new(0, 40, 480, 760),
            ..Layer::default()
        }
    }

    #[test]
    fn stable_geometry_reuses_previous_assignment() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut layers = [video_layer(), gpu_layer()];

        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let kinds: Vec<_> = layers.iter().map(|l| l.kind).collect();
        let statuses: Vec<_> = (0..WINDOW_COUNT)
            .map(|i| compositor.window(WindowId(i as u32)).map(|s| s.status))
            .collect();
        let hides_after_first = windows.hidden.len();

        for _ in 0..3 {
            compositor.classify(false, &mut layers, &VideoOnly, &mut windows);
        }

        let kinds_after: Vec<_> = layers.iter().map(|l| l.kind).collect();
        let statuses_after: Vec<_> = (0..WINDOW_COUNT)
            .map(|i| compositor.window(WindowId(i as u32)).map(|s| s.status))
            .collect();
        assert_eq!(kinds, kinds_after, "layer kinds must not change");
        assert_eq!(statuses, statuses_after, "window state must not change");
        assert_eq!(
            windows.hidden.len(),
            hides_after_first,
            "no window ops on stable-geometry frames"
        );
    }

    #[test]
    fn overlay_assignment_respects_window_budget() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut layers = [video_layer(); 6];

        let report = compositor.classify(true, &mut layers, &Greedy, &mut windows);

        assert_eq!(report.overlay_layers, WINDOW_COUNT);
        assert_eq!(report.fb_layers, layers.len() - WINDOW_COUNT);
        assert!(!report.count_mismatch);
        let overlay_kinds = layers
            .iter()
            .filter(|l| l.kind == CompositionKind::Overlay)
            .count();
        assert_eq!(overlay_kinds, WINDOW_COUNT);
    }

    #[test]
    fn zero_budget_routes_everything_to_gpu() {
        let mut compositor = Compositor::new();
        compositor.set_overlay_budget(0);
        let mut windows = FakeWindows::default();
        let mut layers = [video_layer(), video_layer()];

        let report = compositor.classify(true, &mut layers, &Greedy, &mut windows);

        assert_eq!(report.overlay_layers, 0);
        assert_eq!(report.fb_layers, 2);
        assert!(layers.iter().all(|l| l.kind == CompositionKind::Framebuffer));
        // Every window is unused and must be parked dark.
        assert_eq!(windows.hidden, [0, 1]);
    }

    #[test]
    fn gpu_only_policy_hides_all_windows() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut layers = [video_layer(), gpu_layer()];

        let report = compositor.classify(true, &mut layers, &GpuOnly, &mut windows);

        assert_eq!(report.overlay_layers, 0);
        assert_eq!(windows.hidden, [0, 1]);
        for i in 0..WINDOW_COUNT {
            let slot = compositor.window(WindowId(i as u32)).expect("slot exists");
            assert_eq!(slot.frame, WindowRect::ZERO);
        }
    }

    #[test]
    fn transition_to_all_overlay_clears_and_swaps() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();

        // Frame 1: one GPU layer.
        let mut layers = [gpu_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame 1 commits");
        assert!(outcome.swapped);
        assert!(!outcome.cleared);

        // Frame 2: pure overlay. Stale GPU pixels must be erased even
        // though no GPU layer asks for a swap.
        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame 2 commits");
        assert!(outcome.cleared, "transition must clear the framebuffer");
        assert!(outcome.swapped, "transition must force a swap");
        assert_eq!(surface.cleared, 1);
        assert_eq!(surface.swapped, 2);

        // Frame 3: still pure overlay; the transition fires only once.
        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame 3 commits");
        assert!(!outcome.cleared);
        assert!(!outcome.swapped);
    }

    #[test]
    fn screen_off_touches_nothing_and_succeeds() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();

        let mut layers = [video_layer(), gpu_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let statuses: Vec<_> = (0..WINDOW_COUNT)
            .map(|i| compositor.window(WindowId(i as u32)).map(|s| s.status))
            .collect();
        let hides = windows.hidden.len();

        let outcome = compositor
            .commit(None, Some(&layers), &mut windows, None)
            .expect("screen-off is always a success");

        assert!(!outcome.swapped, "no buffer operations occur");
        assert_eq!(windows.hidden.len(), hides, "no window is touched");
        assert_eq!(windows.presented.len(), 0);
        let statuses_after: Vec<_> = (0..WINDOW_COUNT)
            .map(|i| compositor.window(WindowId(i as u32)).map(|s| s.status))
            .collect();
        assert_eq!(statuses, statuses_after);
    }

    #[test]
    fn screen_off_resets_transition_history() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();

        let mut layers = [gpu_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("gpu frame commits");

        compositor
            .commit(None, None, &mut windows, None)
            .expect("screen-off succeeds");

        // Next all-overlay frame must not see a phantom GPU-to-overlay
        // transition.
        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("overlay frame commits");
        assert!(!outcome.cleared);
    }

    #[test]
    fn teardown_hides_and_parks_every_window() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();

        let mut layers = [video_layer(), video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        windows.hidden.clear();

        let outcome = compositor
            .commit(Some(&mut surface), None, &mut windows, None)
            .expect("teardown succeeds");

        assert!(outcome.swapped, "teardown still presents the GPU buffer");
        assert_eq!(windows.hidden, [0, 1], "every window goes dark");
        assert_eq!(compositor.overlay_layer_count(), 0);
        for i in 0..WINDOW_COUNT {
            let slot = compositor.window(WindowId(i as u32)).expect("slot exists");
            assert_eq!(slot.frame, WindowRect::ZERO);
            assert!(slot.status.is_free());
        }
    }

    #[test]
    fn swap_failure_is_fatal_and_not_retried() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface {
            fail_swap: true,
            ..FakeSurface::default()
        };

        let mut layers = [gpu_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let err = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect_err("swap failure must surface");

        assert_eq!(err, CommitError::SwapFailed);
        assert_eq!(surface.swapped, 0, "no retry");
    }

    #[test]
    fn successful_present_consumes_reservation_and_advances_buffer() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();

        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        assert!(
            compositor
                .window(WindowId(0))
                .expect("slot exists")
                .status
                .is_reserved()
        );

        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame commits");

        assert_eq!(outcome.skipped, 0);
        assert_eq!(windows.presented, [(0, 1)], "first flip lands on buffer 1");
        let slot = compositor.window(WindowId(0)).expect("slot exists");
        assert!(slot.status.is_free(), "reservation is consumed");
        assert_eq!(slot.buf_index, 1);
        assert_eq!(
            slot.frame,
            WindowRect {
                x: 0,
                y: 40,
                w: 480,
                h: 720
            }
        );
    }

    #[test]
    fn failed_present_skips_and_hides_the_window() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows {
            fail_present: true,
            ..FakeWindows::default()
        };
        let mut surface = FakeSurface::default();

        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        windows.hidden.clear();

        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame completes despite the degraded window");

        assert_eq!(outcome.skipped, 0b01);
        assert!(windows.hidden.contains(&0), "skipped window goes dark");
        let slot = compositor.window(WindowId(0)).expect("slot exists");
        assert!(slot.status.is_free());
        assert_eq!(slot.buf_index, 0, "failed flip does not advance");
    }

    #[test]
    fn unreserved_window_in_overlay_range_is_skipped() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();

        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        // Sabotage: something freed the slot between classify and commit.
        compositor
            .arena
            .get_mut(WindowId(0))
            .expect("slot exists")
            .status = WindowStatus::Free;
        windows.hidden.clear();

        let outcome = compositor
            .commit(Some(&mut surface), Some(&layers), &mut windows, None)
            .expect("frame completes");

        assert_eq!(outcome.skipped, 0b01);
        assert_eq!(windows.presented.len(), 0);
        assert!(windows.hidden.contains(&0));
    }

    #[test]
    fn single_yuv_layer_is_mirrored() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();
        let mut video_out = FakeVideoOut::default();

        let mut layers = [video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(
                Some(&mut surface),
                Some(&layers),
                &mut windows,
                Some(&mut video_out),
            )
            .expect("frame commits");

        assert!(outcome.mirrored);
        assert_eq!(video_out.blits.len(), 1);
        let blit = &video_out.blits[0];
        assert_eq!(blit.width, 1280);
        assert_eq!(blit.height, 720);
        assert_eq!(blit.luma, 0x4000_0000);
        assert_eq!(blit.active_layers, 1);
    }

    #[test]
    fn mirroring_rejects_non_yuv_formats() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();
        let mut video_out = FakeVideoOut::default();

        let mut rgb_video = video_layer();
        if let Some(buffer) = rgb_video.buffer.as_mut() {
            buffer.format = PixelFormat::Rgba8888;
        }
        let mut layers = [rgb_video];
        compositor.classify(true, &mut layers, &Greedy, &mut windows);
        let outcome = compositor
            .commit(
                Some(&mut surface),
                Some(&layers),
                &mut windows,
                Some(&mut video_out),
            )
            .expect("frame commits");

        assert!(!outcome.mirrored);
        assert_eq!(outcome.unmirrorable, Some(PixelFormat::Rgba8888));
        assert!(video_out.blits.is_empty());
    }

    #[test]
    fn two_overlay_layers_do_not_mirror() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        let mut surface = FakeSurface::default();
        let mut video_out = FakeVideoOut::default();

        let mut layers = [video_layer(), video_layer()];
        compositor.classify(true, &mut layers, &VideoOnly, &mut windows);
        let outcome = compositor
            .commit(
                Some(&mut surface),
                Some(&layers),
                &mut windows,
                Some(&mut video_out),
            )
            .expect("frame commits");

        assert!(!outcome.mirrored);
        assert!(video_out.blits.is_empty());
    }

    #[test]
    fn count_mismatch_is_reported_not_corrected() {
        let mut compositor = Compositor::new();
        let mut windows = FakeWindows::default();
        // An empty list cannot mismatch; a normal list sums correctly.
        let mut layers = [gpu_layer(), gpu_layer()];
        let report = compositor.classify(true, &mut layers, &GpuOnly, &mut windows);
        assert!(!report.count_mismatch);
        assert_eq!(report.fb_layers + report.overlay_layers, layers.len());
    }
}
