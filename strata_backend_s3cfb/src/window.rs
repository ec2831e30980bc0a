// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One overlay window's device node and driver operations.
//!
//! The SoC exposes five framebuffer nodes whose numbering does not follow
//! window ids:
//!
//! ```text
//!   fb0 → window 2 (panel timing/geometry)
//!   fb1 → window 3
//!   fb2 → window 4
//!   fb3 → window 0
//!   fb4 → window 1
//! ```
//!
//! hence the `(id + 3) % 5` mapping in [`device_node_index`]. Only windows
//! 0 and 1 carry overlay content; window 2 is opened solely to query the
//! panel.

use log::error;
use rustix::fd::{AsFd, BorrowedFd, OwnedFd};
use rustix::fs::{Mode, OFlags};
use rustix::io::Errno;

use strata_core::geometry::WindowRect;
use strata_core::window::BUFFER_COUNT;

use crate::ioctl;
use crate::screen::{
    FB_ACTIVATE_FORCE, FB_ACTIVATE_MASK, FB_BLANK_POWERDOWN, FB_BLANK_UNBLANK, FbFixScreenInfo,
    FbVarScreenInfo,
};

/// Number of framebuffer device nodes the SoC exposes.
pub const DEVICE_COUNT: u32 = 5;

/// Window id opened only to query the panel's geometry and timing.
pub const PANEL_WINDOW_ID: u32 = 2;

const DEVICE_TEMPLATE: &str = "/dev/graphics/fb";

/// Errors from opening or probing a window device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowError {
    /// Ids above [`PANEL_WINDOW_ID`] do not map to usable windows.
    InvalidId(u32),
    /// Opening the device node failed.
    Open {
        /// Window id being opened.
        id: u32,
        /// Driver error.
        errno: Errno,
    },
    /// A driver call failed.
    Driver {
        /// Window id the call targeted.
        id: u32,
        /// Driver error.
        errno: Errno,
    },
    /// The driver reports no reserved framebuffer memory for this window.
    NoReservedMemory {
        /// Window id without memory.
        id: u32,
    },
}

impl core::fmt::Display for WindowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "window id {id} is out of range"),
            Self::Open { id, errno } => write!(f, "opening window {id} failed ({errno})"),
            Self::Driver { id, errno } => write!(f, "driver call on window {id} failed ({errno})"),
            Self::NoReservedMemory { id } => {
                write!(f, "window {id} has no reserved framebuffer memory")
            }
        }
    }
}

impl core::error::Error for WindowError {}

/// Maps a window id to its framebuffer device node number.
///
/// # Errors
///
/// [`WindowError::InvalidId`] for ids above [`PANEL_WINDOW_ID`].
pub fn device_node_index(id: u32) -> Result<u32, WindowError> {
    if id > PANEL_WINDOW_ID {
        return Err(WindowError::InvalidId(id));
    }
    Ok((id + 3) % DEVICE_COUNT)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Power {
    Off,
    On,
}

/// An open overlay window device.
///
/// Holds the file descriptor, the window's screen-info programming copies,
/// and the precomputed per-buffer physical addresses. All operations run on
/// the compositor thread; the vsync notifier only ever sees a duplicated
/// panel fd.
#[derive(Debug)]
pub struct WindowDevice {
    id: u32,
    fd: OwnedFd,
    power: Power,
    /// Programming copy sent on geometry changes.
    var: FbVarScreenInfo,
    /// Panel template used for pan offsets.
    lcd: FbVarScreenInfo,
    fix: FbFixScreenInfo,
    size: u32,
    addrs: [u64; BUFFER_COUNT],
}

impl WindowDevice {
    /// Opens the device node for window `id`.
    ///
    /// The window starts powered down with no geometry programmed; callers
    /// follow up with [`apply_panel_template`](Self::apply_panel_template)
    /// and [`set_position`](Self::set_position).
    ///
    /// # Errors
    ///
    /// [`WindowError::InvalidId`] or [`WindowError::Open`].
    pub fn open(id: u32) -> Result<Self, WindowError> {
        let node = device_node_index(id)?;
        let path = format!("{DEVICE_TEMPLATE}{node}");
        let fd = rustix::fs::open(&path, OFlags::RDWR | OFlags::CLOEXEC, Mode::empty())
            .map_err(|errno| {
                error!("opening window {id} device ({path}) failed: {errno}");
                WindowError::Open { id, errno }
            })?;

        Ok(Self {
            id,
            fd,
            power: Power::Off,
            var: FbVarScreenInfo::default(),
            lcd: FbVarScreenInfo::default(),
            fix: FbFixScreenInfo::default(),
            size: 0,
            addrs: [0; BUFFER_COUNT],
        })
    }

    /// This window's id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Borrows the underlying file descriptor.
    #[must_use]
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Duplicates the file descriptor for use on another thread.
    pub(crate) fn duplicate_fd(&self) -> std::io::Result<OwnedFd> {
        self.fd.try_clone()
    }

    /// Reads the driver's current variable screen info.
    ///
    /// # Errors
    ///
    /// The driver's error code.
    pub fn read_var_screeninfo(&self) -> Result<FbVarScreenInfo, Errno> {
        ioctl::get_var_screeninfo(self.fd()).inspect_err(|errno| {
            error!("reading screen info of window {} failed: {errno}", self.id);
        })
    }

    /// Adopts the panel's screen info as this window's programming template.
    pub(crate) fn apply_panel_template(&mut self, lcd: &FbVarScreenInfo) {
        self.var = *lcd;
        self.lcd = *lcd;
    }

    /// Powers the window down, then commits new geometry and position in
    /// one driver transaction.
    ///
    /// The power-down comes first: the engine scans out continuously, and
    /// reprogramming a lit window tears.
    ///
    /// # Errors
    ///
    /// The driver's error code.
    pub fn set_position(&mut self, rect: WindowRect) -> Result<(), Errno> {
        self.hide()?;

        self.var.xres = rect.w;
        self.var.yres = rect.h;
        self.var.activate &= !FB_ACTIVATE_MASK;
        self.var.activate |= FB_ACTIVATE_FORCE;

        ioctl::put_var_screeninfo(self.fd(), &self.var).inspect_err(|errno| {
            error!(
                "programming window {} geometry {}x{} failed: {errno}",
                self.id, rect.w, rect.h
            );
        })?;

        ioctl::set_window_position(self.fd(), rect.x as i32, rect.y as i32).inspect_err(
            |errno| {
                error!(
                    "positioning window {} at ({}, {}) failed: {errno}",
                    self.id, rect.x, rect.y
                );
            },
        )
    }

    /// Refreshes the fixed buffer layout and precomputes buffer addresses.
    ///
    /// # Errors
    ///
    /// [`WindowError::Driver`] when the query fails,
    /// [`WindowError::NoReservedMemory`] when the driver reports no
    /// framebuffer memory behind this window.
    pub fn refresh_fixed_info(&mut self) -> Result<(), WindowError> {
        self.fix = ioctl::get_fix_screeninfo(self.fd()).map_err(|errno| {
            error!("reading fixed info of window {} failed: {errno}", self.id);
            WindowError::Driver { id: self.id, errno }
        })?;

        if self.fix.smem_start == 0 {
            error!("window {} has no reserved framebuffer memory", self.id);
            return Err(WindowError::NoReservedMemory { id: self.id });
        }

        self.size = self.fix.line_length * self.var.yres;
        for (index, addr) in self.addrs.iter_mut().enumerate() {
            *addr = self.fix.smem_start as u64 + u64::from(self.size) * index as u64;
        }
        Ok(())
    }

    /// Flips the visible region to buffer `buf_index`.
    ///
    /// # Errors
    ///
    /// The driver's error code.
    pub fn pan_to_buffer(&mut self, buf_index: usize) -> Result<(), Errno> {
        self.lcd.yoffset = self.lcd.yres * buf_index as u32;
        ioctl::pan_display(self.fd(), &self.lcd).inspect_err(|errno| {
            error!(
                "panning window {} to buffer {buf_index} (yres {}, virtual {}) failed: {errno}",
                self.id, self.lcd.yres, self.lcd.yres_virtual
            );
        })
    }

    /// Powers the window on. No-op when already lit.
    ///
    /// # Errors
    ///
    /// The driver's error code.
    pub fn show(&mut self) -> Result<(), Errno> {
        if self.power == Power::Off {
            ioctl::blank(self.fd(), FB_BLANK_UNBLANK).inspect_err(|errno| {
                error!("unblanking window {} failed: {errno}", self.id);
            })?;
            self.power = Power::On;
        }
        Ok(())
    }

    /// Powers the window off. No-op when already dark.
    ///
    /// # Errors
    ///
    /// The driver's error code.
    pub fn hide(&mut self) -> Result<(), Errno> {
        if self.power == Power::On {
            ioctl::blank(self.fd(), FB_BLANK_POWERDOWN).inspect_err(|errno| {
                error!("blanking window {} failed: {errno}", self.id);
            })?;
            self.power = Power::Off;
        }
        Ok(())
    }

    /// Powers the window down and releases the device node.
    ///
    /// The descriptor close itself cannot fail observably (it is released
    /// on drop); the failure-bearing part of teardown is the power-down.
    ///
    /// # Errors
    ///
    /// The driver's error code from the power-down.
    pub fn close(mut self) -> Result<(), Errno> {
        self.hide()
    }

    /// Physical address of buffer `index`, if in range.
    #[must_use]
    pub fn buffer_address(&self, index: usize) -> Option<u64> {
        self.addrs.get(index).copied()
    }

    /// Bytes per buffer, as last computed from stride and height.
    #[must_use]
    pub const fn buffer_size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::{DEVICE_COUNT, WindowError, device_node_index};

    #[test]
    fn window_to_device_node_mapping() {
        assert_eq!(device_node_index(0), Ok(3));
        assert_eq!(device_node_index(1), Ok(4));
        assert_eq!(device_node_index(2), Ok(0));
    }

    #[test]
    fn ids_beyond_panel_window_are_rejected() {
        assert_eq!(device_node_index(3), Err(WindowError::InvalidId(3)));
        assert_eq!(
            device_node_index(DEVICE_COUNT),
            Err(WindowError::InvalidId(DEVICE_COUNT))
        );
    }
}
