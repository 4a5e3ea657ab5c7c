//! The reservation session: applies a whole [`PaddingConfig`] and owns the
//! resulting reservations.
//!
//! [`ReservationSession`] walks the configured monitors primary-first and,
//! within each monitor, the edges in [`Edge::RESERVATION_ORDER`], running the
//! [`appbar`] handshake once per non-zero amount.  Every live reservation is
//! tracked so that [`release_all`](ReservationSession::release_all) can hand
//! the space back in one pass.

use crate::appbar::{self, Reservation};
use crate::config::TimingConfig;
use crate::geometry::{Edge, MonitorId, Rect};
use crate::padding::PaddingConfig;
use crate::traits::Desktop;
use log::{debug, error, info};
use std::time::{Duration, Instant};

/// Owns every reservation made for one padding configuration.
///
/// The session is generic over any [`Desktop`], so the same sequencing runs
/// against the Win32 shell and the
/// [`SimulatedDesktop`](crate::simulated::SimulatedDesktop).
///
/// Dropping the session releases whatever is still live.
///
/// # Typical usage
///
/// ```ignore
/// let padding = PaddingConfig::from_args(desktop.monitors()?, std::env::args());
/// let mut session = ReservationSession::new(desktop, padding, TimingConfig::default());
/// session.apply();
/// // ... run until quit ...
/// session.release_all();
/// ```
pub struct ReservationSession<P: Desktop> {
    platform: P,
    padding: PaddingConfig,
    timing: TimingConfig,
    live: Vec<Reservation>,
}

impl<P: Desktop> ReservationSession<P> {
    /// Create a session.  Nothing is reserved until
    /// [`apply`](ReservationSession::apply) is called.
    pub fn new(platform: P, padding: PaddingConfig, timing: TimingConfig) -> Self {
        Self {
            platform,
            padding,
            timing,
            live: Vec::new(),
        }
    }

    /// Reserve every non-zero edge of the configuration.
    ///
    /// Reservations left over from an earlier call are released first.  A
    /// request whose host window cannot be created is logged and skipped.
    /// Returns the number of reservations created.
    pub fn apply(&mut self) -> usize {
        if !self.live.is_empty() {
            info!("releasing {} reservation(s) before re-applying", self.live.len());
            self.release_all();
        }

        for (monitor, edge, amount) in self.padding.requests() {
            let before = self.platform.work_area(monitor.id);
            match appbar::reserve(&self.platform, monitor, edge, amount) {
                Ok(reservation) => {
                    info!(
                        "reserved {}px on {} edge of {} at {}",
                        amount, edge, monitor.name, reservation.rect
                    );
                    if reservation.registered {
                        self.settle(monitor.id, before);
                    }
                    self.live.push(reservation);
                }
                Err(e) => {
                    error!(
                        "failed to reserve {}px on {} edge of {}: {}",
                        amount, edge, monitor.name, e
                    );
                }
            }
        }
        self.live.len()
    }

    /// Unregister every live reservation and destroy its host window.
    ///
    /// Calling this on an empty session does nothing.  Returns the number of
    /// reservations released.
    pub fn release_all(&mut self) -> usize {
        if self.live.is_empty() {
            return 0;
        }
        let released = self.live.len();
        for reservation in self.live.drain(..) {
            debug!(
                "releasing {} edge bar {} at {}",
                reservation.edge, reservation.host, reservation.rect
            );
            appbar::release(&self.platform, &reservation);
        }
        info!("released {} reservation(s)", released);
        released
    }

    /// The reservations currently held, in creation order.
    pub fn reservations(&self) -> &[Reservation] {
        &self.live
    }

    /// Live reservation on `edge` of `monitor`, if any.
    pub fn reservation(&self, monitor: MonitorId, edge: Edge) -> Option<&Reservation> {
        self.live
            .iter()
            .find(|r| r.monitor == monitor && r.edge == edge)
    }

    pub fn padding(&self) -> &PaddingConfig {
        &self.padding
    }

    /// Wait until the monitor's available area moves away from `before`,
    /// bounded by the commit settle timeout.
    fn settle(&self, monitor: MonitorId, before: Option<Rect>) {
        let timeout = self.timing.commit_settle();
        if timeout.is_zero() {
            return;
        }
        let changed = wait_until(timeout, self.timing.poll_interval(), || {
            self.platform.pump_events();
            self.platform.work_area(monitor) != before
        });
        if !changed {
            debug!("work area of monitor {} unchanged after {:?}", monitor, timeout);
        }
    }
}

impl<P: Desktop> Drop for ReservationSession<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Poll `condition` every `interval` until it holds or `timeout` elapses.
/// Returns whether the condition was met.
pub(crate) fn wait_until(
    timeout: Duration,
    interval: Duration,
    mut condition: impl FnMut() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appbar::{AppBarData, AppBarMessage};
    use crate::geometry::Monitor;
    use crate::simulated::{SimulatedDesktop, SimulatedError};
    use crate::traits::{Displays, HostHandle, ReservationService, ServiceError, WindowHost};
    use std::cell::Cell;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    fn session(desktop: &SimulatedDesktop, args: &[&str]) -> ReservationSession<SimulatedDesktop> {
        let padding = PaddingConfig::from_args(desktop.monitors().unwrap(), args);
        ReservationSession::new(desktop.clone(), padding, TimingConfig::immediate())
    }

    fn dual() -> SimulatedDesktop {
        SimulatedDesktop::new(vec![
            Monitor {
                id: MonitorId(2),
                name: "RIGHT".into(),
                primary: false,
                work_area: Rect::new(1920, 0, 3840, 1080),
            },
            Monitor {
                id: MonitorId(1),
                name: "MAIN".into(),
                primary: true,
                work_area: SCREEN,
            },
        ])
    }

    //  Failure-injecting desktop

    /// Wraps a simulated desktop, failing one host creation and optionally
    /// rejecting every registration.
    struct Flaky {
        desktop: SimulatedDesktop,
        creates: Cell<usize>,
        fail_create_at: Option<usize>,
        reject_new: bool,
    }

    impl Flaky {
        fn new(desktop: &SimulatedDesktop) -> Self {
            Self {
                desktop: desktop.clone(),
                creates: Cell::new(0),
                fail_create_at: None,
                reject_new: false,
            }
        }
    }

    impl WindowHost for Flaky {
        type Error = SimulatedError;

        fn create(&self) -> Result<HostHandle, SimulatedError> {
            let n = self.creates.get();
            self.creates.set(n + 1);
            if self.fail_create_at == Some(n) {
                return Err(SimulatedError::ProcessExited(self.desktop.pid()));
            }
            self.desktop.create()
        }

        fn destroy(&self, handle: HostHandle) -> Result<(), SimulatedError> {
            self.desktop.destroy(handle)
        }

        fn move_to(&self, handle: HostHandle, rect: Rect) -> Result<(), SimulatedError> {
            self.desktop.move_to(handle, rect)
        }

        fn pump_events(&self) {
            self.desktop.pump_events()
        }
    }

    impl ReservationService for Flaky {
        fn send(&self, message: AppBarMessage, data: &mut AppBarData) -> Result<usize, ServiceError> {
            if self.reject_new && message == AppBarMessage::New {
                return Err(ServiceError::Rejected(message));
            }
            self.desktop.send(message, data)
        }
    }

    impl Displays for Flaky {
        type Error = SimulatedError;

        fn monitors(&self) -> Result<Vec<Monitor>, SimulatedError> {
            self.desktop.monitors()
        }

        fn work_area(&self, monitor: MonitorId) -> Option<Rect> {
            self.desktop.work_area(monitor)
        }
    }

    #[test]
    fn single_top_reservation() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40"]);
        assert_eq!(s.apply(), 1);
        assert_eq!(s.reservations()[0].rect, Rect::new(0, 0, 1920, 40));
        assert_eq!(d.work_area(MonitorId(1)), Some(Rect::new(0, 40, 1920, 1080)));
    }

    #[test]
    fn top_and_bottom_do_not_overlap_and_restore() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40", "-pb=20"]);
        assert_eq!(s.apply(), 2);
        let top = s.reservation(MonitorId(1), Edge::Top).unwrap().rect;
        let bottom = s.reservation(MonitorId(1), Edge::Bottom).unwrap().rect;
        assert_eq!(top, Rect::new(0, 0, 1920, 40));
        assert_eq!(bottom, Rect::new(0, 1060, 1920, 1080));
        assert!(!top.overlaps(&bottom));
        assert_eq!(d.work_area(MonitorId(1)), Some(Rect::new(0, 40, 1920, 1060)));

        assert_eq!(s.release_all(), 2);
        assert_eq!(d.work_area(MonitorId(1)), Some(SCREEN));
    }

    #[test]
    fn every_edge_has_exact_thickness() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40", "-pb=20", "-pl=30", "-pr=10"]);
        assert_eq!(s.apply(), 4);
        for (edge, amount) in [(Edge::Top, 40), (Edge::Bottom, 20), (Edge::Left, 30), (Edge::Right, 10)] {
            let r = s.reservation(MonitorId(1), edge).unwrap();
            assert_eq!(r.rect.thickness(edge), amount, "{}", edge);
        }
        assert_eq!(d.work_area(MonitorId(1)), Some(Rect::new(30, 40, 1910, 1060)));

        let rects: Vec<Rect> = s.reservations().iter().map(|r| r.rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn side_bars_fit_between_top_and_bottom() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pa=10"]);
        s.apply();
        let left = s.reservation(MonitorId(1), Edge::Left).unwrap().rect;
        assert_eq!(left, Rect::new(0, 10, 10, 1070));
    }

    #[test]
    fn zero_amount_creates_nothing() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=0"]);
        assert_eq!(s.apply(), 0);
        assert_eq!(d.window_count(), 0);
        assert!(d.message_log().is_empty());
    }

    #[test]
    fn release_all_is_idempotent() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40"]);
        s.apply();
        assert_eq!(s.release_all(), 1);
        let calls = d.message_log().len();
        assert_eq!(s.release_all(), 0);
        assert_eq!(d.message_log().len(), calls);
        assert!(s.reservations().is_empty());
    }

    #[test]
    fn primary_is_reserved_first() {
        let d = dual();
        let mut s = session(&d, &["-at=25"]);
        assert_eq!(s.apply(), 2);
        let monitors: Vec<MonitorId> = s.reservations().iter().map(|r| r.monitor).collect();
        assert_eq!(monitors, vec![MonitorId(1), MonitorId(2)]);
        assert_eq!(d.work_area(MonitorId(2)), Some(Rect::new(1920, 25, 3840, 1080)));
    }

    #[test]
    fn messages_follow_handshake_order() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40", "-pl=5"]);
        s.apply();
        let kinds: Vec<AppBarMessage> = d.message_log().into_iter().map(|(_, m)| m).collect();
        use AppBarMessage::*;
        assert_eq!(kinds, vec![New, QueryPos, SetPos, New, QueryPos, SetPos]);
    }

    #[test]
    fn reapply_replaces_previous_reservations() {
        let d = SimulatedDesktop::single(SCREEN);
        let mut s = session(&d, &["-pt=40"]);
        s.apply();
        let first = s.reservations()[0].host;
        s.apply();
        assert_eq!(s.reservations().len(), 1);
        assert_ne!(s.reservations()[0].host, first);
        assert_eq!(d.bars().len(), 1);
        assert_eq!(d.window_count(), 1);
    }

    #[test]
    fn drop_releases() {
        let d = SimulatedDesktop::single(SCREEN);
        {
            let mut s = session(&d, &["-pb=30"]);
            s.apply();
            assert_eq!(d.window_count(), 1);
        }
        assert_eq!(d.window_count(), 0);
        assert_eq!(d.work_area(MonitorId(1)), Some(SCREEN));
    }

    #[test]
    fn settle_returns_once_area_changes() {
        let d = SimulatedDesktop::single(SCREEN);
        let padding = PaddingConfig::from_args(d.monitors().unwrap(), ["-pt=40"]);
        let timing = TimingConfig {
            commit_settle_ms: 5_000,
            ..TimingConfig::immediate()
        };
        let mut s = ReservationSession::new(d.clone(), padding, timing);
        let started = Instant::now();
        s.apply();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn failed_host_creation_is_skipped() {
        let d = SimulatedDesktop::single(SCREEN);
        let flaky = Flaky {
            fail_create_at: Some(1),
            ..Flaky::new(&d)
        };
        let padding = PaddingConfig::from_args(d.monitors().unwrap(), ["-pt=40", "-pb=20", "-pl=30"]);
        let mut s = ReservationSession::new(flaky, padding, TimingConfig::immediate());

        assert_eq!(s.apply(), 2);
        let edges: Vec<Edge> = s.reservations().iter().map(|r| r.edge).collect();
        assert_eq!(edges, vec![Edge::Top, Edge::Left]);
        assert!(s.reservation(MonitorId(1), Edge::Bottom).is_none());
        assert_eq!(d.window_count(), 2);
        assert_eq!(d.work_area(MonitorId(1)), Some(Rect::new(30, 40, 1920, 1080)));

        assert_eq!(s.release_all(), 2);
        assert_eq!(d.work_area(MonitorId(1)), Some(SCREEN));
    }

    #[test]
    fn unacknowledged_registration_skips_settle() {
        let d = SimulatedDesktop::single(SCREEN);
        let flaky = Flaky {
            reject_new: true,
            ..Flaky::new(&d)
        };
        let padding = PaddingConfig::from_args(d.monitors().unwrap(), ["-pt=40"]);
        let timing = TimingConfig {
            commit_settle_ms: 5_000,
            ..TimingConfig::immediate()
        };
        let mut s = ReservationSession::new(flaky, padding, timing);

        let started = Instant::now();
        assert_eq!(s.apply(), 1);
        // The area never changes, so settling would have run to its timeout.
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!s.reservations()[0].registered);
        assert_eq!(d.work_area(MonitorId(1)), Some(SCREEN));
        assert!(d.bars().is_empty());
    }

    #[test]
    fn huge_amount_on_offset_monitor_stays_on_that_monitor() {
        let d = dual();
        let mut s = session(&d, &["-sl=2147483647"]);
        assert_eq!(s.apply(), 1);
        let bar = s.reservation(MonitorId(2), Edge::Left).unwrap().rect;
        assert_eq!(bar, Rect::new(1920, 0, 3840, 1080));
        assert_eq!(d.work_area(MonitorId(1)), Some(SCREEN));
    }

    #[test]
    fn wait_until_times_out() {
        let mut polls = 0;
        let met = wait_until(Duration::from_millis(20), Duration::from_millis(1), || {
            polls += 1;
            false
        });
        assert!(!met);
        assert!(polls >= 2);
    }
}
