// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fbdev ioctl surface consumed from the s3cfb driver.
//!
//! Every call is a synchronous request on one window's file descriptor.
//! Errors are the driver's raw [`Errno`](rustix::io::Errno), propagated
//! unchanged to the caller.

use core::ffi::c_void;
use core::mem::MaybeUninit;

use rustix::fd::BorrowedFd;
use rustix::io;
use rustix::ioctl::{self, Ioctl, IoctlOutput, Opcode};

use crate::screen::{FbFixScreenInfo, FbVarScreenInfo};

// Legacy fbdev opcodes predate the directional _IOC encoding; raw values
// from <linux/fb.h>.
const FBIOGET_VSCREENINFO: Opcode = 0x4600;
const FBIOPUT_VSCREENINFO: Opcode = 0x4601;
const FBIOGET_FSCREENINFO: Opcode = 0x4602;
const FBIOPAN_DISPLAY: Opcode = 0x4606;
const FBIOBLANK: Opcode = 0x4611;

// Driver-private window controls use the conventional encoding.
const S3CFB_WIN_POSITION: Opcode = ioctl::opcode::write::<UserWindow>(b'F', 203);
const S3CFB_SET_VSYNC_INT: Opcode = ioctl::opcode::write::<u32>(b'F', 206);
#[cfg(feature = "vsync-ioctl")]
const S3CFB_WAIT_FOR_VSYNC: Opcode = ioctl::opcode::read::<u64>(b'F', 207);

/// `struct s3c_fb_user_window`: a window's origin on the panel.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct UserWindow {
    x: i32,
    y: i32,
}

/// Reads one `T` out of the driver.
struct Get<T> {
    opcode: Opcode,
    value: MaybeUninit<T>,
}

impl<T> Get<T> {
    const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            value: MaybeUninit::uninit(),
        }
    }
}

// SAFETY: `as_ptr` hands the driver a buffer of exactly `size_of::<T>()`
// bytes matching the opcode's declared transfer size.
unsafe impl<T> Ioctl for Get<T> {
    type Output = T;
    const IS_MUTATING: bool = true;

    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn as_ptr(&mut self) -> *mut c_void {
        self.value.as_mut_ptr().cast()
    }

    unsafe fn output_from_ptr(_: IoctlOutput, extract_output: *mut c_void) -> io::Result<T> {
        // SAFETY: on success the driver fully initialized the buffer we
        // handed out in `as_ptr`.
        Ok(unsafe { extract_output.cast::<T>().read() })
    }
}

/// Passes one `T` to the driver by pointer.
struct Set<T> {
    opcode: Opcode,
    value: T,
}

impl<T> Set<T> {
    const fn new(opcode: Opcode, value: T) -> Self {
        Self { opcode, value }
    }
}

// SAFETY: `as_ptr` points at a `T` matching the opcode's declared transfer
// size, valid for the duration of the call.
unsafe impl<T> Ioctl for Set<T> {
    type Output = ();
    const IS_MUTATING: bool = false;

    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn as_ptr(&mut self) -> *mut c_void {
        (&raw mut self.value).cast()
    }

    unsafe fn output_from_ptr(_: IoctlOutput, _: *mut c_void) -> io::Result<()> {
        Ok(())
    }
}

/// Passes a bare integer in the ioctl argument word itself.
struct SetInt {
    opcode: Opcode,
    value: i32,
}

// SAFETY: the opcode takes its argument by value, not by pointer; the
// "pointer" is the integer itself and is never dereferenced.
unsafe impl Ioctl for SetInt {
    type Output = ();
    const IS_MUTATING: bool = false;

    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn as_ptr(&mut self) -> *mut c_void {
        self.value as usize as *mut c_void
    }

    unsafe fn output_from_ptr(_: IoctlOutput, _: *mut c_void) -> io::Result<()> {
        Ok(())
    }
}

/// `FBIOGET_VSCREENINFO`: reads the current variable screen info.
pub(crate) fn get_var_screeninfo(fd: BorrowedFd<'_>) -> io::Result<FbVarScreenInfo> {
    // SAFETY: the opcode reads one struct fb_var_screeninfo.
    unsafe { ioctl::ioctl(fd, Get::<FbVarScreenInfo>::new(FBIOGET_VSCREENINFO)) }
}

/// `FBIOPUT_VSCREENINFO`: commits new variable screen info.
pub(crate) fn put_var_screeninfo(fd: BorrowedFd<'_>, var: &FbVarScreenInfo) -> io::Result<()> {
    // SAFETY: the opcode takes one struct fb_var_screeninfo.
    unsafe { ioctl::ioctl(fd, Set::new(FBIOPUT_VSCREENINFO, *var)) }
}

/// `FBIOGET_FSCREENINFO`: reads the fixed buffer layout.
pub(crate) fn get_fix_screeninfo(fd: BorrowedFd<'_>) -> io::Result<FbFixScreenInfo> {
    // SAFETY: the opcode reads one struct fb_fix_screeninfo.
    unsafe { ioctl::ioctl(fd, Get::<FbFixScreenInfo>::new(FBIOGET_FSCREENINFO)) }
}

/// `FBIOPAN_DISPLAY`: flips the visible region to the given offsets.
pub(crate) fn pan_display(fd: BorrowedFd<'_>, var: &FbVarScreenInfo) -> io::Result<()> {
    // SAFETY: the opcode takes one struct fb_var_screeninfo.
    unsafe { ioctl::ioctl(fd, Set::new(FBIOPAN_DISPLAY, *var)) }
}

/// `FBIOBLANK`: sets the window's power level.
pub(crate) fn blank(fd: BorrowedFd<'_>, level: i32) -> io::Result<()> {
    // SAFETY: FBIOBLANK carries the level in the argument word.
    unsafe { ioctl::ioctl(fd, SetInt { opcode: FBIOBLANK, value: level }) }
}

/// `S3CFB_WIN_POSITION`: moves the window's origin on the panel.
pub(crate) fn set_window_position(fd: BorrowedFd<'_>, x: i32, y: i32) -> io::Result<()> {
    // SAFETY: the opcode takes one struct s3c_fb_user_window.
    unsafe { ioctl::ioctl(fd, Set::new(S3CFB_WIN_POSITION, UserWindow { x, y })) }
}

/// `S3CFB_SET_VSYNC_INT`: enables or disables the vsync interrupt.
pub(crate) fn set_vsync_interrupt(fd: BorrowedFd<'_>, enabled: bool) -> io::Result<()> {
    // SAFETY: the opcode takes one int-sized flag.
    unsafe { ioctl::ioctl(fd, Set::new(S3CFB_SET_VSYNC_INT, u32::from(enabled))) }
}

/// `S3CFB_WAIT_FOR_VSYNC`: blocks until the next vertical blank.
///
/// Returns the interrupt timestamp the driver would otherwise broadcast as
/// a uevent. No timeout is applied; the call parks until the panel blanks.
#[cfg(feature = "vsync-ioctl")]
pub(crate) fn wait_for_vsync(fd: BorrowedFd<'_>) -> io::Result<u64> {
    // SAFETY: the opcode reads one u64 timestamp.
    unsafe { ioctl::ioctl(fd, Get::<u64>::new(S3CFB_WAIT_FOR_VSYNC)) }
}
