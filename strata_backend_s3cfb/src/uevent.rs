// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel uevent listening and vsync payload parsing.
//!
//! In event-stream mode the display driver broadcasts one kobject uevent
//! per vertical blank. A datagram is a NUL-separated sequence:
//!
//! ```text
//!   change@/devices/platform/s3cfb\0ACTION=change\0…\0VSYNC=1234567890\0
//! ```
//!
//! The first segment names the subject; the `VSYNC=` field carries the
//! interrupt timestamp in nanoseconds.

#![cfg_attr(
    feature = "vsync-ioctl",
    allow(dead_code, reason = "payload parsing stays testable in ioctl builds")
)]

#[cfg(not(feature = "vsync-ioctl"))]
use rustix::fd::OwnedFd;
#[cfg(not(feature = "vsync-ioctl"))]
use rustix::io::Errno;
#[cfg(not(feature = "vsync-ioctl"))]
use rustix::net::netlink::{self, SocketAddrNetlink};
#[cfg(not(feature = "vsync-ioctl"))]
use rustix::net::{AddressFamily, SocketFlags, SocketType, bind, socket_with};

/// Subject of the driver's per-vblank uevent.
pub(crate) const VSYNC_UEVENT_SUBJECT: &[u8] = b"change@/devices/platform/s3cfb";

/// Kernel-side broadcast group for uevents.
const UEVENT_GROUP_KERNEL: u32 = 1;

/// Opens a netlink socket subscribed to kernel uevent broadcasts.
#[cfg(not(feature = "vsync-ioctl"))]
pub(crate) fn open_uevent_socket() -> Result<OwnedFd, Errno> {
    let fd = socket_with(
        AddressFamily::NETLINK,
        SocketType::DGRAM,
        SocketFlags::CLOEXEC,
        Some(netlink::KOBJECT_UEVENT),
    )?;
    // Port id 0 lets the kernel assign one per socket.
    bind(&fd, &SocketAddrNetlink::new(0, UEVENT_GROUP_KERNEL))?;
    Ok(fd)
}

/// Extracts the vsync timestamp from one uevent datagram.
///
/// Returns `None` for events about anything other than the display
/// subsystem. A matching event whose `VSYNC=` field is missing or
/// unparsable yields timestamp 0, which is what the driver contract
/// promises for that case.
pub(crate) fn vsync_timestamp(datagram: &[u8]) -> Option<u64> {
    let mut segments = datagram.split(|&byte| byte == 0);
    if segments.next()? != VSYNC_UEVENT_SUBJECT {
        return None;
    }

    for segment in segments {
        if let Some(value) = segment.strip_prefix(b"VSYNC=") {
            return Some(parse_timestamp(value));
        }
    }
    Some(0)
}

/// Parses a timestamp the way `strtoull(s, NULL, 0)` would: `0x` prefix for
/// hex, leading zero for octal, decimal otherwise; garbage becomes 0.
fn parse_timestamp(bytes: &[u8]) -> u64 {
    let Ok(text) = core::str::from_utf8(bytes) else {
        return 0;
    };
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    };
    parsed.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::vsync_timestamp;

    fn datagram(segments: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in segments {
            out.extend_from_slice(segment);
            out.push(0);
        }
        out
    }

    #[test]
    fn display_event_yields_its_timestamp() {
        let data = datagram(&[
            b"change@/devices/platform/s3cfb",
            b"ACTION=change",
            b"SUBSYSTEM=platform",
            b"VSYNC=16666667",
        ]);
        assert_eq!(vsync_timestamp(&data), Some(16_666_667));
    }

    #[test]
    fn hex_timestamp_is_accepted() {
        let data = datagram(&[b"change@/devices/platform/s3cfb", b"VSYNC=0x1000"]);
        assert_eq!(vsync_timestamp(&data), Some(0x1000));
    }

    #[test]
    fn unrelated_subsystem_is_ignored() {
        let data = datagram(&[b"add@/devices/platform/usb", b"VSYNC=42"]);
        assert_eq!(vsync_timestamp(&data), None);
    }

    #[test]
    fn missing_vsync_field_defaults_to_zero() {
        let data = datagram(&[b"change@/devices/platform/s3cfb", b"ACTION=change"]);
        assert_eq!(vsync_timestamp(&data), Some(0));
    }

    #[test]
    fn garbage_value_defaults_to_zero() {
        let data = datagram(&[b"change@/devices/platform/s3cfb", b"VSYNC=banana"]);
        assert_eq!(vsync_timestamp(&data), Some(0));
    }

    #[test]
    fn empty_datagram_is_ignored() {
        assert_eq!(vsync_timestamp(&[]), None);
    }
}
