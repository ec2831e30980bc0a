// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The vsync notifier thread.
//!
//! One long-lived thread per device turns hardware vblank pulses into
//! [`VsyncHandler`] callbacks. The timestamp source is chosen at compile
//! time:
//!
//! - **Event-stream mode** (default): listen on a kernel uevent socket for
//!   the driver's per-vblank broadcast.
//! - **Gated blocking mode** (`vsync-ioctl` feature): park on [`VsyncGate`]
//!   while vsync events are disabled, otherwise block in the driver's
//!   wait-for-vsync ioctl. The gate keeps the thread from hammering the
//!   driver while the screen is off.
//!
//! All cross-thread state lives in one [`VsyncShared`] owned by the device
//! and handed to the thread at spawn. Shutdown is explicit: a stop flag
//! checked at every suspension point, a condvar wake for the gate, and an
//! eventfd wake for the socket poll, so [`VsyncNotifier::shutdown`] can
//! join deterministically. In gated mode an in-flight blocking wait bounds
//! shutdown by at most one refresh period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error};
use rustix::event::EventfdFlags;
use rustix::fd::OwnedFd;
use rustix::io::Errno;

use strata_core::output::DisplayId;
use strata_core::vsync::VsyncHandler;

#[cfg(not(feature = "vsync-ioctl"))]
use crate::uevent;

const URGENT_DISPLAY_NICENESS: i32 = -8;

/// Enable gate for the blocking-wait loop.
///
/// Owned by [`VsyncShared`]; flipped from the compositor thread by event
/// control, waited on by the notifier thread.
pub(crate) struct VsyncGate {
    enabled: Mutex<bool>,
    cond: Condvar,
}

impl VsyncGate {
    fn new() -> Self {
        Self {
            enabled: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Flips the gate and wakes any parked waiter.
    pub(crate) fn set_enabled(&self, enabled: bool) {
        let mut guard = self.enabled.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = enabled;
        drop(guard);
        self.cond.notify_all();
    }

    /// Wakes a parked waiter without changing the gate.
    fn wake(&self) {
        self.cond.notify_all();
    }

    /// Parks until the gate opens or `stop` is raised.
    ///
    /// Returns `false` when woken for shutdown.
    #[cfg(any(test, feature = "vsync-ioctl"))]
    fn wait_open(&self, stop: &AtomicBool) -> bool {
        let mut enabled = self.enabled.lock().unwrap_or_else(PoisonError::into_inner);
        while !*enabled {
            if stop.load(Ordering::Acquire) {
                return false;
            }
            enabled = self
                .cond
                .wait(enabled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !stop.load(Ordering::Acquire)
    }
}

/// State shared between the device and the notifier thread.
pub(crate) struct VsyncShared {
    gate: VsyncGate,
    handler: Mutex<Option<Arc<dyn VsyncHandler>>>,
    stop: AtomicBool,
    /// Eventfd tipping the socket poll over for shutdown.
    wake: OwnedFd,
}

impl VsyncShared {
    fn new() -> Result<Self, Errno> {
        let wake = rustix::event::eventfd(0, EventfdFlags::CLOEXEC | EventfdFlags::NONBLOCK)?;
        Ok(Self {
            gate: VsyncGate::new(),
            handler: Mutex::new(None),
            stop: AtomicBool::new(false),
            wake,
        })
    }

    /// Delivers one pulse to the registered handler, if any.
    ///
    /// With no handler registered the pulse is dropped; there is no
    /// buffering and no replay. The handler is cloned out of the lock and
    /// invoked outside it.
    fn deliver(&self, timestamp_nanos: u64) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler.on_vsync(DisplayId::PRIMARY, timestamp_nanos);
        }
    }
}

/// Failure while bringing the notifier up.
#[derive(Debug)]
pub(crate) enum SpawnError {
    /// Creating the shutdown eventfd failed.
    Event(Errno),
    /// Spawning the thread failed.
    Thread(std::io::Error),
}

/// Handle to the running notifier thread.
pub(crate) struct VsyncNotifier {
    shared: Arc<VsyncShared>,
    thread: Option<JoinHandle<()>>,
}

impl VsyncNotifier {
    /// Spawns the notifier. `panel_fd` is a duplicated panel-window
    /// descriptor the thread owns outright.
    pub(crate) fn spawn(panel_fd: OwnedFd) -> Result<Self, SpawnError> {
        let shared = Arc::new(VsyncShared::new().map_err(SpawnError::Event)?);
        let thread = thread::Builder::new()
            .name("strata-vsync".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(&shared, panel_fd)
            })
            .map_err(SpawnError::Thread)?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Installs the handler future pulses are delivered to.
    pub(crate) fn register(&self, handler: Arc<dyn VsyncHandler>) {
        *self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Opens or closes the blocking-wait gate.
    pub(crate) fn set_gate_enabled(&self, enabled: bool) {
        self.shared.gate.set_enabled(enabled);
    }

    /// Requests the thread to stop and joins it.
    pub(crate) fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.gate.wake();
        // One counter bump tips the poll over; failure only means the
        // thread is already gone.
        let _ = rustix::io::write(&self.shared.wake, &1_u64.to_ne_bytes());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for VsyncNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn raise_priority() {
    if let Err(errno) = rustix::process::setpriority_process(None, URGENT_DISPLAY_NICENESS) {
        debug!("raising vsync thread priority failed: {errno}");
    }
}

/// Gated blocking-wait loop.
#[cfg(feature = "vsync-ioctl")]
fn run(shared: &VsyncShared, panel_fd: OwnedFd) {
    use rustix::fd::AsFd;

    raise_priority();
    loop {
        // Park while events are disabled so the driver is not polled with
        // the screen off.
        if !shared.gate.wait_open(&shared.stop) {
            break;
        }
        match crate::ioctl::wait_for_vsync(panel_fd.as_fd()) {
            Ok(timestamp) => shared.deliver(timestamp),
            Err(errno) => error!("waiting for vsync failed: {errno}"),
        }
    }
}

/// Uevent-stream loop.
#[cfg(not(feature = "vsync-ioctl"))]
fn run(shared: &VsyncShared, _panel_fd: OwnedFd) {
    use rustix::event::{PollFd, PollFlags};
    use rustix::net::RecvFlags;

    raise_priority();

    let socket = match uevent::open_uevent_socket() {
        Ok(socket) => socket,
        Err(errno) => {
            error!("opening uevent socket failed: {errno}");
            return;
        }
    };
    let mut buf = [0_u8; 4096];

    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let mut fds = [
            PollFd::new(&socket, PollFlags::IN),
            PollFd::new(&shared.wake, PollFlags::IN),
        ];
        match rustix::event::poll(&mut fds, None) {
            Ok(_) => {}
            Err(Errno::INTR) => continue,
            Err(errno) => {
                error!("polling for uevents failed: {errno}");
                break;
            }
        }
        if fds[1].revents().contains(PollFlags::IN) {
            break;
        }
        if !fds[0].revents().contains(PollFlags::IN) {
            continue;
        }

        match rustix::net::recv(&socket, &mut buf, RecvFlags::empty()) {
            Ok((len, _)) => {
                if let Some(timestamp) = uevent::vsync_timestamp(&buf[..len]) {
                    shared.deliver(timestamp);
                }
            }
            Err(Errno::INTR) => {}
            Err(errno) => error!("reading uevent failed: {errno}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use strata_core::output::DisplayId;
    use strata_core::vsync::VsyncHandler;

    use super::VsyncShared;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
    }

    impl VsyncHandler for Recorder {
        fn on_vsync(&self, display: DisplayId, timestamp_nanos: u64) {
            assert_eq!(display, DisplayId::PRIMARY);
            self.seen
                .lock()
                .expect("recorder lock")
                .push(timestamp_nanos);
        }
    }

    #[test]
    fn pulse_without_handler_is_dropped_not_replayed() {
        let shared = VsyncShared::new().expect("eventfd");
        let recorder = Arc::new(Recorder::default());

        shared.deliver(111);

        *shared.handler.lock().expect("handler lock") = Some(recorder.clone());
        shared.deliver(222);

        assert_eq!(
            *recorder.seen.lock().expect("recorder lock"),
            [222],
            "the pre-registration pulse must not be buffered"
        );
    }

    #[test]
    fn closed_gate_with_stop_raised_does_not_block() {
        let shared = VsyncShared::new().expect("eventfd");
        let stop = AtomicBool::new(true);
        assert!(!shared.gate.wait_open(&stop), "stop must win over the gate");
    }

    #[test]
    fn open_gate_passes_the_waiter_through() {
        let shared = VsyncShared::new().expect("eventfd");
        shared.gate.set_enabled(true);
        let stop = AtomicBool::new(false);
        assert!(shared.gate.wait_open(&stop));
    }

    #[test]
    fn gate_wakes_a_parked_waiter() {
        let shared = Arc::new(VsyncShared::new().expect("eventfd"));
        let stop = Arc::new(AtomicBool::new(false));

        let waiter = std::thread::spawn({
            let shared = Arc::clone(&shared);
            let stop = Arc::clone(&stop);
            move || shared.gate.wait_open(&stop)
        });

        shared.gate.set_enabled(true);
        assert!(waiter.join().expect("waiter thread"));
    }
}
