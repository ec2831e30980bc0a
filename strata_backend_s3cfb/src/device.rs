// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composer device.
//!
//! [`DisplayDevice`] is the process-wide handle the compositing framework
//! opens once and drives per frame. Opening validates the platform
//! allocator module and the requested device name, brings up the overlay
//! window pool, queries the panel, and spawns the vsync notifier; closing
//! stops the notifier and tears the pool down, aggregating but never
//! short-circuiting per-window failures.
//!
//! The framework serializes all per-frame calls (`prepare`, `set`,
//! `query`, `blank`, `event_control`); the device therefore holds no locks
//! around layer or window state. Only the vsync notifier runs concurrently,
//! and everything it shares lives behind its own synchronization.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info};
use rustix::io::Errno;

use strata_core::backend::{FrameSurface, VideoOutput, WindowOpError, WindowOutput};
use strata_core::compose::{CommitError, CommitOutcome, Compositor};
use strata_core::geometry::WindowRect;
use strata_core::layer::Layer;
use strata_core::output::DisplayId;
use strata_core::policy::{GpuOnly, OverlayPolicy};
use strata_core::vsync::VsyncHandler;
use strata_core::window::{BUFFER_COUNT, WINDOW_COUNT, WindowId};

use crate::ioctl;
use crate::screen::{self, PanelInfo};
use crate::vsync::{SpawnError, VsyncNotifier};
use crate::window::{PANEL_WINDOW_ID, WindowDevice, WindowError};

/// Device name the framework must request.
pub const COMPOSER_DEVICE_NAME: &str = "composer";

/// Author the platform allocator module must report.
pub const EXPECTED_ALLOCATOR_AUTHOR: &str = "Imagination Technologies";

/// Description of the platform's graphics memory allocator module.
///
/// The composer depends on buffers placed by this specific allocator;
/// opening against any other vendor's module would hand the overlay engine
/// addresses it cannot scan out.
#[derive(Clone, Debug)]
pub struct AllocatorModule {
    /// Vendor string the module reports.
    pub author: String,
    /// Panel refresh rate the module's framebuffer device reports.
    pub frame_rate_hz: f32,
}

/// One frame's worth of input to [`DisplayDevice::prepare`].
#[derive(Debug)]
pub struct FrameList<'a> {
    /// The framework observed a change in the layer list's shape since the
    /// previous frame.
    pub geometry_changed: bool,
    /// Caller-owned layers; classification rewrites their composition
    /// kinds in place.
    pub layers: &'a mut [Layer],
}

/// Capability and configuration queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Query {
    /// Whether a dedicated background layer is composited by the device.
    BackgroundLayerSupported,
    /// The panel's vsync period in nanoseconds.
    VsyncPeriodNanos,
}

/// Event kinds controllable through [`DisplayDevice::event_control`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// Per-vblank timestamp delivery.
    Vsync,
}

/// Failure while opening the composer device.
#[derive(Debug)]
pub enum OpenError {
    /// The allocator module is missing or from the wrong vendor.
    AllocatorMismatch,
    /// The requested device name is not the composer.
    UnknownDevice,
    /// A window could not be opened or probed.
    Window(WindowError),
    /// Programming a window's initial geometry failed.
    WindowSetup {
        /// Window id being set up.
        id: u32,
        /// Driver error.
        errno: Errno,
    },
    /// Querying the panel geometry failed.
    PanelQuery(Errno),
    /// Creating the vsync notifier's wake handle failed.
    VsyncSetup(Errno),
    /// Spawning the vsync notifier thread failed.
    VsyncThread(std::io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocatorMismatch => {
                write!(f, "graphics allocator module missing or from the wrong vendor")
            }
            Self::UnknownDevice => write!(f, "unknown device name"),
            Self::Window(err) => write!(f, "{err}"),
            Self::WindowSetup { id, errno } => {
                write!(f, "initial setup of window {id} failed ({errno})")
            }
            Self::PanelQuery(errno) => write!(f, "panel geometry query failed ({errno})"),
            Self::VsyncSetup(errno) => write!(f, "vsync notifier setup failed ({errno})"),
            Self::VsyncThread(err) => write!(f, "vsync notifier thread failed ({err})"),
        }
    }
}

impl std::error::Error for OpenError {}

/// Aggregate teardown failure from [`DisplayDevice::close`].
///
/// Every window is attempted regardless of earlier failures; this carries
/// whatever went wrong along the way.
#[derive(Debug)]
pub struct CloseError {
    /// `(window id, driver error)` per failed teardown.
    pub failures: Vec<(u32, Errno)>,
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "closing {} window(s) failed", self.failures.len())
    }
}

impl std::error::Error for CloseError {}

/// The overlay window pool as seen by the composition state machine.
struct WindowBank {
    devices: Vec<WindowDevice>,
}

fn driver_error(errno: Errno) -> WindowOpError {
    WindowOpError::Driver(errno.raw_os_error())
}

impl WindowOutput for WindowBank {
    fn hide(&mut self, id: WindowId) -> Result<(), WindowOpError> {
        let window = self
            .devices
            .get_mut(id.index())
            .ok_or(driver_error(Errno::INVAL))?;
        window.hide().map_err(driver_error)
    }

    fn present(
        &mut self,
        id: WindowId,
        layer: &Layer,
        buf_index: usize,
    ) -> Result<(), WindowOpError> {
        let window = self
            .devices
            .get_mut(id.index())
            .ok_or(driver_error(Errno::INVAL))?;

        window
            .set_position(WindowRect::from_layer_frame(layer.display_frame))
            .map_err(driver_error)?;
        window.pan_to_buffer(buf_index).map_err(driver_error)?;
        window.show().map_err(driver_error)
    }
}

/// The composer device.
pub struct DisplayDevice {
    windows: WindowBank,
    panel_window: WindowDevice,
    panel: PanelInfo,
    compositor: Compositor,
    policy: Box<dyn OverlayPolicy + Send>,
    video_out: Option<Box<dyn VideoOutput + Send>>,
    vsync: VsyncNotifier,
    frame_rate_hz: f32,
}

impl fmt::Debug for DisplayDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayDevice")
            .field("panel", &self.panel)
            .finish_non_exhaustive()
    }
}

impl DisplayDevice {
    /// Opens the composer device.
    ///
    /// Validates the allocator module and device name, opens overlay
    /// windows 0 and 1 plus the panel-geometry window, programs each
    /// window full-screen, precomputes buffer addresses, and spawns the
    /// vsync notifier. On any failure, windows already opened are released
    /// before returning.
    ///
    /// # Errors
    ///
    /// See [`OpenError`]; all of them amount to an invalid-argument answer
    /// to the framework.
    pub fn open(allocator: &AllocatorModule, name: &str) -> Result<Self, OpenError> {
        if allocator.author != EXPECTED_ALLOCATOR_AUTHOR {
            return Err(OpenError::AllocatorMismatch);
        }
        if name != COMPOSER_DEVICE_NAME {
            return Err(OpenError::UnknownDevice);
        }

        let mut devices = Vec::with_capacity(WINDOW_COUNT);
        for id in 0..WINDOW_COUNT as u32 {
            devices.push(WindowDevice::open(id).map_err(OpenError::Window)?);
        }
        let panel_window = WindowDevice::open(PANEL_WINDOW_ID).map_err(OpenError::Window)?;

        let mut lcd = panel_window
            .read_var_screeninfo()
            .map_err(OpenError::PanelQuery)?;
        screen::apply_panel_defaults(&mut lcd);
        lcd.yres_virtual = lcd.yres * BUFFER_COUNT as u32;

        for window in &mut devices {
            window.apply_panel_template(&lcd);
            window
                .set_position(WindowRect {
                    x: 0,
                    y: 0,
                    w: lcd.xres,
                    h: lcd.yres,
                })
                .map_err(|errno| OpenError::WindowSetup {
                    id: window.id(),
                    errno,
                })?;
            window.refresh_fixed_info().map_err(OpenError::Window)?;
        }

        let panel_fd = panel_window
            .duplicate_fd()
            .map_err(OpenError::VsyncThread)?;
        let vsync = VsyncNotifier::spawn(panel_fd).map_err(|err| match err {
            SpawnError::Event(errno) => OpenError::VsyncSetup(errno),
            SpawnError::Thread(err) => OpenError::VsyncThread(err),
        })?;

        info!(
            "composer open: {}x{} at {} bpp, {} overlay windows",
            lcd.xres, lcd.yres, lcd.bits_per_pixel, WINDOW_COUNT
        );

        Ok(Self {
            windows: WindowBank { devices },
            panel_window,
            panel: PanelInfo::from_var(&lcd),
            compositor: Compositor::new(),
            policy: Box::new(GpuOnly),
            video_out: None,
            vsync,
            frame_rate_hz: allocator.frame_rate_hz,
        })
    }

    /// The panel description as queried (and defaulted) at open.
    #[must_use]
    pub const fn panel(&self) -> PanelInfo {
        self.panel
    }

    /// Replaces the overlay eligibility policy.
    ///
    /// The default [`GpuOnly`] policy keeps every layer on the GPU path.
    pub fn set_overlay_policy(&mut self, policy: Box<dyn OverlayPolicy + Send>) {
        self.policy = policy;
    }

    /// Attaches an auxiliary video output for single-layer mirroring.
    pub fn set_video_output(&mut self, output: Box<dyn VideoOutput + Send>) {
        self.video_out = Some(output);
    }

    /// Classifies the frame's layers in place.
    ///
    /// A `None` list or unchanged geometry leaves the previous assignment
    /// untouched.
    pub fn prepare(&mut self, list: Option<FrameList<'_>>) {
        let Some(list) = list else { return };

        let report = self.compositor.classify(
            list.geometry_changed,
            list.layers,
            &*self.policy,
            &mut self.windows,
        );
        if report.count_mismatch {
            debug!(
                "layer counts diverge: {} fb + {} overlay != {} total",
                report.fb_layers,
                report.overlay_layers,
                list.layers.len()
            );
        }
    }

    /// Executes the frame classified by the last [`prepare`](Self::prepare).
    ///
    /// `surface == None` signals screen-off; `layers == None` signals full
    /// teardown of the overlay windows.
    ///
    /// # Errors
    ///
    /// [`CommitError::SwapFailed`] when presenting the GPU buffer fails.
    /// The frame is abandoned, never retried.
    pub fn set(
        &mut self,
        surface: Option<&mut dyn FrameSurface>,
        layers: Option<&[Layer]>,
    ) -> Result<CommitOutcome, CommitError> {
        let outcome = self.compositor.commit(
            surface,
            layers,
            &mut self.windows,
            self.video_out
                .as_deref_mut()
                .map(|out| -> &mut dyn VideoOutput { out }),
        )?;

        if outcome.skipped != 0 {
            error!(
                "overlay windows skipped this frame (mask {:#b})",
                outcome.skipped
            );
        }
        if let Some(format) = outcome.unmirrorable {
            error!("video output cannot mirror {format:?} buffers");
        }
        Ok(outcome)
    }

    /// Answers a capability/configuration query.
    #[must_use]
    pub fn query(&self, what: Query) -> i32 {
        match what {
            // No dedicated background layer on this hardware.
            Query::BackgroundLayerSupported => 0,
            Query::VsyncPeriodNanos => vsync_period_nanos(self.frame_rate_hz),
        }
    }

    /// Notes a blank/unblank of the display.
    ///
    /// Blanking only resets frame bookkeeping; the vsync notifier keeps
    /// running. Unblanking needs no work, the next frame lights the panel
    /// on its own.
    pub fn blank(&mut self, _display: DisplayId, blank: bool) {
        if blank {
            self.compositor.forget_previous_frame();
        }
    }

    /// Enables or disables delivery of `event`.
    ///
    /// For vsync this toggles the driver's interrupt and, in gated mode,
    /// parks or wakes the notifier thread.
    ///
    /// # Errors
    ///
    /// The driver's error code from the interrupt toggle.
    pub fn event_control(&mut self, event: EventKind, enabled: bool) -> Result<(), Errno> {
        match event {
            EventKind::Vsync => {
                ioctl::set_vsync_interrupt(self.panel_window.fd(), enabled)?;
                self.vsync.set_gate_enabled(enabled);
                Ok(())
            }
        }
    }

    /// Registers the callback vsync pulses are delivered to.
    ///
    /// Registration may happen at any time; pulses produced while no
    /// handler is registered are dropped, never replayed.
    pub fn register_vsync_handler(&self, handler: Arc<dyn VsyncHandler>) {
        self.vsync.register(handler);
    }

    /// Stops the vsync notifier and releases every window.
    ///
    /// Teardown failures are aggregated: each window is attempted even
    /// after an earlier one fails.
    ///
    /// # Errors
    ///
    /// [`CloseError`] listing the windows whose teardown failed.
    pub fn close(mut self) -> Result<(), CloseError> {
        self.vsync.shutdown();

        let mut failures = Vec::new();
        if let Err(errno) = self.panel_window.close() {
            failures.push((PANEL_WINDOW_ID, errno));
        }
        for window in self.windows.devices {
            let id = window.id();
            if let Err(errno) = window.close() {
                failures.push((id, errno));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }
}

/// Vsync period for a reported refresh rate; zero-rate reports fall back
/// to 60 Hz like the panel defaults do.
#[expect(
    clippy::cast_possible_truncation,
    reason = "periods for any plausible refresh rate fit an i32 nanosecond count"
)]
fn vsync_period_nanos(frame_rate_hz: f32) -> i32 {
    let rate = if frame_rate_hz > 0.0 { frame_rate_hz } else { 60.0 };
    (1_000_000_000.0 / f64::from(rate)) as i32
}

#[cfg(test)]
mod tests {
    use super::{
        AllocatorModule, COMPOSER_DEVICE_NAME, DisplayDevice, EXPECTED_ALLOCATOR_AUTHOR,
        OpenError, vsync_period_nanos,
    };

    #[test]
    fn wrong_allocator_vendor_is_rejected() {
        let allocator = AllocatorModule {
            author: "Someone Else".into(),
            frame_rate_hz: 60.0,
        };
        let err = DisplayDevice::open(&allocator, COMPOSER_DEVICE_NAME)
            .expect_err("foreign allocator must be rejected");
        assert!(matches!(err, OpenError::AllocatorMismatch));
    }

    #[test]
    fn wrong_device_name_is_rejected() {
        let allocator = AllocatorModule {
            author: EXPECTED_ALLOCATOR_AUTHOR.into(),
            frame_rate_hz: 60.0,
        };
        let err = DisplayDevice::open(&allocator, "gralloc")
            .expect_err("only the composer name is served");
        assert!(matches!(err, OpenError::UnknownDevice));
    }

    #[test]
    fn vsync_period_matches_refresh_rate() {
        assert_eq!(vsync_period_nanos(60.0), 16_666_666);
        assert_eq!(vsync_period_nanos(56.0), 17_857_142);
    }

    #[test]
    fn zero_refresh_rate_falls_back_to_sixty_hertz() {
        assert_eq!(vsync_period_nanos(0.0), 16_666_666);
    }
}
