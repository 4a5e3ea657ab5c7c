//! Core traits that decouple aerial from the concrete desktop it runs on.
//!
//! Every concrete backend (the Win32 shell, the in-memory
//! [`SimulatedDesktop`](crate::simulated::SimulatedDesktop), a test double, …)
//! implements these traits.  The reservation protocol in [`appbar`](crate::appbar),
//! the [`ReservationSession`](crate::session::ReservationSession) and the
//! supersession logic in [`supersede`](crate::supersede) only depend on these
//! abstractions.

use crate::appbar::{AppBarData, AppBarMessage};
use crate::geometry::{Monitor, MonitorId, Rect};
use std::fmt;
use std::time::Duration;

/// Opaque handle of a host window (an `HWND` on Windows).
///
/// The reservation service identifies each bar by the handle of the window
/// that registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(pub isize);

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Provider of invisible native windows used purely as handles.
pub trait WindowHost {
    /// The error type produced by this host.
    type Error: std::error::Error + Send + 'static;

    /// Create a new invisible, zero-size window and return its handle.
    fn create(&self) -> Result<HostHandle, Self::Error>;

    /// Destroy a window previously returned by [`create`](WindowHost::create).
    fn destroy(&self, handle: HostHandle) -> Result<(), Self::Error>;

    /// Move and resize the window so it occupies `rect` on screen.  The
    /// window stays fully transparent.
    fn move_to(&self, handle: HostHandle, rect: Rect) -> Result<(), Self::Error>;

    /// Process every pending window message, then return.
    ///
    /// The reservation service only observes the effect of a request after
    /// the owner's pending messages have been dispatched.
    fn pump_events(&self);
}

/// The platform's screen-edge reservation service.
pub trait ReservationService {
    /// Submit one protocol message.
    ///
    /// `data` is read by the service and, for
    /// [`QueryPos`](AppBarMessage::QueryPos) and
    /// [`SetPos`](AppBarMessage::SetPos), its rectangle is rewritten in place
    /// with the service's answer.  Returns the raw message result.
    fn send(&self, message: AppBarMessage, data: &mut AppBarData) -> Result<usize, ServiceError>;
}

/// A protocol message the service did not accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service answered but reported failure (e.g. `NEW` for a handle
    /// that is already registered).
    #[error("{0:?} rejected by the reservation service")]
    Rejected(AppBarMessage),
    /// The message could not be delivered at all.
    #[error("{message:?} failed: {reason}")]
    Failed {
        message: AppBarMessage,
        reason: String,
    },
}

/// Monitor enumeration and live work-area queries.
pub trait Displays {
    /// The error type produced by this display.
    type Error: std::error::Error + Send + 'static;

    /// Return every attached monitor, in platform enumeration order.
    fn monitors(&self) -> Result<Vec<Monitor>, Self::Error>;

    /// The monitor's current available area, or `None` if the monitor is
    /// gone.
    fn work_area(&self, monitor: MonitorId) -> Option<Rect>;
}

/// Everything the reservation session needs from a desktop.
///
/// Blanket-implemented for any type that provides all three capabilities.
pub trait Desktop: WindowHost + ReservationService + Displays {}

impl<T: WindowHost + ReservationService + Displays> Desktop for T {}

/// A running process as seen by a [`ProcessTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Executable file name, e.g. `aerial.exe`.
    pub name: String,
}

/// Process listing and termination.
pub trait ProcessTable {
    /// The error type produced by this table.
    type Error: std::error::Error + Send + 'static;

    /// Pid of the calling process.
    fn current_pid(&self) -> u32;

    /// Snapshot of all running processes.
    fn processes(&self) -> Result<Vec<ProcessInfo>, Self::Error>;

    /// Forcibly terminate `pid`.  The process gets no chance to clean up.
    fn terminate(&self, pid: u32) -> Result<(), Self::Error>;

    /// Block until `pid` has exited or `timeout` elapses.  Returns `true`
    /// if the process is gone.
    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> Result<bool, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appbar;
    use crate::geometry::Edge;
    use crate::simulated::SimulatedDesktop;

    /// Reserve and release through the `Desktop` bound alone.
    fn round_trip<D: Desktop>(desktop: &D) -> (Option<Rect>, Option<Rect>) {
        let monitor = desktop.monitors().unwrap().remove(0);
        let reservation = appbar::reserve(desktop, &monitor, Edge::Top, 30).unwrap();
        let during = desktop.work_area(monitor.id);
        appbar::release(desktop, &reservation);
        (during, desktop.work_area(monitor.id))
    }

    #[test]
    fn desktop_bound_drives_a_full_reservation() {
        let screen = Rect::new(0, 0, 1280, 720);
        let desktop = SimulatedDesktop::single(screen);
        let (during, after) = round_trip(&desktop);
        assert_eq!(during, Some(Rect::new(0, 30, 1280, 720)));
        assert_eq!(after, Some(screen));
    }

    fn lists_itself<T: ProcessTable>(table: &T) -> bool {
        let me = table.current_pid();
        table.processes().unwrap().iter().any(|p| p.pid == me)
    }

    #[test]
    fn process_table_lists_the_current_process() {
        let desktop = SimulatedDesktop::single(Rect::new(0, 0, 10, 10));
        assert!(lists_itself(&desktop));
        assert!(lists_itself(&desktop.spawn()));
    }

    #[test]
    fn handles_display_as_hex() {
        assert_eq!(HostHandle(0x1a2b).to_string(), "0x1a2b");
    }

    #[test]
    fn service_errors_name_the_message() {
        let e = ServiceError::Rejected(AppBarMessage::New);
        assert_eq!(e.to_string(), "New rejected by the reservation service");
        let e = ServiceError::Failed {
            message: AppBarMessage::SetPos,
            reason: "owner gone".into(),
        };
        assert_eq!(e.to_string(), "SetPos failed: owner gone");
    }
}
