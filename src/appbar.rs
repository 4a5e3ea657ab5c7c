//! The edge-reservation handshake with the shell's AppBar service.
//!
//! A reservation is claimed in four round trips, each followed by a full
//! drain of the owner's pending window messages:
//!
//! 1. `NEW` registers a freshly created host window as a bar owner.
//! 2. `QUERYPOS` proposes the monitor's work area on the chosen edge; the
//!    service shrinks it so it does not cover any bar committed earlier.
//! 3. The answer is clamped to exactly the requested thickness.
//! 4. `SETPOS` commits the clamped rectangle.  From here on the monitor's
//!    available area excludes the strip.
//!
//! `REMOVE` undoes the registration; see [`release`].

use crate::geometry::{Edge, InvalidEdge, MonitorId, Monitor, Rect};
use crate::traits::{HostHandle, ReservationService, ServiceError, WindowHost};
use log::{debug, warn};

/// Callback message id handed to the service for every host window.
///
/// `WM_APP + 1`.  Host windows ignore it; the service still requires one.
pub const HOST_CALLBACK_MESSAGE: u32 = 0x8000 + 1;

/// The protocol messages aerial uses, with their native codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AppBarMessage {
    New = 0,
    Remove = 1,
    QueryPos = 2,
    SetPos = 3,
}

impl AppBarMessage {
    /// The native message code.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// The registration record exchanged with the service.
///
/// Field order, widths and padding match the native `APPBARDATA` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AppBarData {
    /// Size of this record in bytes.
    pub size: u32,
    pub owner: isize,
    pub callback_message: u32,
    /// Native edge code, see [`Edge::code`].
    pub edge: u32,
    pub rect: Rect,
    pub param: isize,
}

impl AppBarData {
    /// Build a record for `owner` anchored to `edge`, proposing `rect`.
    pub fn new(owner: HostHandle, edge: Edge, rect: Rect) -> Self {
        Self {
            size: std::mem::size_of::<AppBarData>() as u32,
            owner: owner.0,
            callback_message: HOST_CALLBACK_MESSAGE,
            edge: edge.code(),
            rect,
            param: 0,
        }
    }

    pub fn owner(&self) -> HostHandle {
        HostHandle(self.owner)
    }

    /// Decode the edge code.
    pub fn edge(&self) -> Result<Edge, InvalidEdge> {
        Edge::from_code(self.edge)
    }
}

/// A strip of screen space claimed through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Window whose handle identifies the bar to the service.
    pub host: HostHandle,
    pub edge: Edge,
    pub monitor: MonitorId,
    /// The rectangle committed with `SETPOS`.
    pub rect: Rect,
    /// Whether the service acknowledged `NEW`.  An unacknowledged bar does
    /// not shrink the available area.
    pub registered: bool,
}

/// Errors that abort a single [`reserve`] call.
#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    /// A zero amount, or one that does not fit a screen coordinate.
    #[error("invalid reservation amount: {0}")]
    InvalidAmount(u32),
    /// No host window could be created.
    #[error("failed to create host window: {0}")]
    HostWindow(String),
}

/// Shrink `rect` to exactly `amount` pixels along `edge`'s axis, keeping the
/// side that touches `edge` fixed.  The free side saturates at the limits of
/// the coordinate space.
pub fn clamp_to_edge(rect: Rect, edge: Edge, amount: i32) -> Rect {
    let mut r = rect;
    match edge {
        Edge::Top => r.bottom = r.top.saturating_add(amount),
        Edge::Bottom => r.top = r.bottom.saturating_sub(amount),
        Edge::Left => r.right = r.left.saturating_add(amount),
        Edge::Right => r.left = r.right.saturating_sub(amount),
    }
    r
}

/// Submit one message and log the outcome.  Returns `true` on success.
///
/// The service's answer is advisory; callers continue either way.
fn submit<S: ReservationService + ?Sized>(
    service: &S,
    message: AppBarMessage,
    data: &mut AppBarData,
) -> bool {
    match service.send(message, data) {
        Ok(result) => {
            debug!(
                "{:?} for {} -> {} rect={}",
                message,
                data.owner(),
                result,
                data.rect
            );
            true
        }
        Err(ServiceError::Rejected(m)) => {
            warn!("{:?} rejected for host {}", m, data.owner());
            false
        }
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

/// Claim `amount` pixels along `edge` of `monitor`.
///
/// Only a failure to create the host window is an error; every protocol
/// message is best-effort and its outcome is reflected in
/// [`Reservation::registered`] and the warning log.
pub fn reserve<P>(
    platform: &P,
    monitor: &Monitor,
    edge: Edge,
    amount: u32,
) -> Result<Reservation, ReserveError>
where
    P: WindowHost + ReservationService + ?Sized,
{
    let thickness = i32::try_from(amount)
        .ok()
        .filter(|a| *a > 0)
        .ok_or(ReserveError::InvalidAmount(amount))?;

    let host = platform
        .create()
        .map_err(|e| ReserveError::HostWindow(e.to_string()))?;
    platform.pump_events();

    let mut data = AppBarData::new(host, edge, monitor.work_area);

    let registered = submit(platform, AppBarMessage::New, &mut data);
    platform.pump_events();

    submit(platform, AppBarMessage::QueryPos, &mut data);
    platform.pump_events();

    data.rect = clamp_to_edge(data.rect, edge, thickness);

    submit(platform, AppBarMessage::SetPos, &mut data);
    platform.pump_events();

    if let Err(e) = platform.move_to(host, data.rect) {
        warn!("failed to move host {} to {}: {}", host, data.rect, e);
    }
    platform.pump_events();

    Ok(Reservation {
        host,
        edge,
        monitor: monitor.id,
        rect: data.rect,
        registered,
    })
}

/// Unregister `reservation` and destroy its host window.
pub fn release<P>(platform: &P, reservation: &Reservation)
where
    P: WindowHost + ReservationService + ?Sized,
{
    let mut data = AppBarData::new(reservation.host, reservation.edge, reservation.rect);
    submit(platform, AppBarMessage::Remove, &mut data);
    platform.pump_events();

    if let Err(e) = platform.destroy(reservation.host) {
        warn!("failed to destroy host {}: {}", reservation.host, e);
    }
    platform.pump_events();
}
