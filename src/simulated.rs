//! In-memory desktop that arbitrates screen-edge bars the way the shell does.
//!
//! [`SimulatedDesktop`] implements every platform trait, so the full
//! reservation flow can run on any OS: `--dry-run` uses it to preview a
//! padding configuration, and the test suites use it to observe how the
//! available area of each monitor changes.
//!
//! Several handles can share one desktop; each handle acts as a separate
//! process (see [`spawn`](SimulatedDesktop::spawn)).  Terminating a process
//! destroys its windows immediately, but its bars linger until the next time
//! any process drains its messages, mirroring the shell's asynchronous
//! cleanup of bars whose owner window is gone.

use crate::appbar::{AppBarData, AppBarMessage};
use crate::geometry::{Edge, Monitor, MonitorId, Rect};
use crate::traits::{
    Displays, HostHandle, ProcessInfo, ProcessTable, ReservationService, ServiceError, WindowHost,
};
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// Executable name every simulated process reports.
pub const PROCESS_NAME: &str = "aerial.exe";

/// Errors produced by the simulated desktop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatedError {
    #[error("unknown window {0}")]
    UnknownWindow(HostHandle),
    #[error("no such process: {0}")]
    NoSuchProcess(u32),
    #[error("process {0} has exited")]
    ProcessExited(u32),
}

#[derive(Debug)]
struct HostWindow {
    owner: u32,
    rect: Rect,
}

#[derive(Debug)]
struct Bar {
    edge: Edge,
    /// `None` until the first `SETPOS`.
    rect: Option<Rect>,
}

#[derive(Debug)]
struct DesktopState {
    /// Monitors with their full, unreserved work areas.
    monitors: Vec<Monitor>,
    next_handle: isize,
    next_pid: u32,
    /// pid -> alive
    processes: BTreeMap<u32, bool>,
    windows: BTreeMap<HostHandle, HostWindow>,
    bars: BTreeMap<HostHandle, Bar>,
    messages: Vec<(HostHandle, AppBarMessage)>,
}

impl DesktopState {
    fn monitor_for(&self, rect: &Rect) -> Option<&Monitor> {
        let (x, y) = rect.center();
        self.monitors
            .iter()
            .find(|m| m.work_area.contains(x, y))
            .or_else(|| self.monitors.iter().find(|m| m.work_area.overlaps(rect)))
    }

    /// Work area of `monitor` with every committed bar except `skip` carved
    /// out.
    fn available(&self, monitor: &Monitor, skip: Option<HostHandle>) -> Rect {
        let mut area = monitor.work_area;
        for (handle, bar) in &self.bars {
            if Some(*handle) == skip {
                continue;
            }
            let Some(rect) = bar.rect else { continue };
            if self.monitor_for(&rect).map(|m| m.id) != Some(monitor.id) {
                continue;
            }
            match bar.edge {
                Edge::Top => area.top = area.top.max(rect.bottom),
                Edge::Bottom => area.bottom = area.bottom.min(rect.top),
                Edge::Left => area.left = area.left.max(rect.right),
                Edge::Right => area.right = area.right.min(rect.left),
            }
        }
        area
    }

    /// Shrink `rect` so it stays inside the space not yet claimed by other
    /// bars on its monitor.
    fn arbitrate(&self, owner: HostHandle, rect: Rect) -> Rect {
        let Some(monitor) = self.monitor_for(&rect) else {
            return rect;
        };
        let avail = self.available(monitor, Some(owner));
        Rect::new(
            rect.left.max(avail.left),
            rect.top.max(avail.top),
            rect.right.min(avail.right),
            rect.bottom.min(avail.bottom),
        )
    }

    fn reap_orphans(&mut self) {
        let orphans: Vec<HostHandle> = self
            .bars
            .keys()
            .filter(|h| !self.windows.contains_key(h))
            .copied()
            .collect();
        for handle in orphans {
            debug!("reclaiming bar of destroyed window {}", handle);
            self.bars.remove(&handle);
        }
    }
}

/// A handle to a shared in-memory desktop, acting as one process.
#[derive(Debug, Clone)]
pub struct SimulatedDesktop {
    state: Rc<RefCell<DesktopState>>,
    pid: u32,
}

impl SimulatedDesktop {
    /// Create a desktop with the given monitors and return the handle of
    /// its first process.  Each monitor's `work_area` is taken as the
    /// unreserved area.
    pub fn new(monitors: Vec<Monitor>) -> Self {
        let pid = 1000;
        let mut processes = BTreeMap::new();
        processes.insert(pid, true);
        Self {
            state: Rc::new(RefCell::new(DesktopState {
                monitors,
                next_handle: 0x10000,
                next_pid: pid + 1,
                processes,
                windows: BTreeMap::new(),
                bars: BTreeMap::new(),
                messages: Vec::new(),
            })),
            pid,
        }
    }

    /// A desktop with one primary monitor whose work area is `area`.
    pub fn single(area: Rect) -> Self {
        Self::new(vec![Monitor {
            id: MonitorId(1),
            name: "SIM1".into(),
            primary: true,
            work_area: area,
        }])
    }

    /// Start another process on the same desktop.
    pub fn spawn(&self) -> Self {
        let mut state = self.state.borrow_mut();
        let pid = state.next_pid;
        state.next_pid += 1;
        state.processes.insert(pid, true);
        Self {
            state: Rc::clone(&self.state),
            pid,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Every committed bar as `(owner, edge, rect)`.
    pub fn bars(&self) -> Vec<(HostHandle, Edge, Rect)> {
        self.state
            .borrow()
            .bars
            .iter()
            .filter_map(|(h, b)| b.rect.map(|r| (*h, b.edge, r)))
            .collect()
    }

    /// Number of host windows currently alive across all processes.
    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    /// Current rectangle of a host window.
    pub fn window_rect(&self, handle: HostHandle) -> Option<Rect> {
        self.state.borrow().windows.get(&handle).map(|w| w.rect)
    }

    /// Every protocol message received so far, oldest first.
    pub fn message_log(&self) -> Vec<(HostHandle, AppBarMessage)> {
        self.state.borrow().messages.clone()
    }

    fn ensure_alive(&self) -> Result<(), SimulatedError> {
        match self.state.borrow().processes.get(&self.pid) {
            Some(true) => Ok(()),
            _ => Err(SimulatedError::ProcessExited(self.pid)),
        }
    }
}

impl WindowHost for SimulatedDesktop {
    type Error = SimulatedError;

    fn create(&self) -> Result<HostHandle, SimulatedError> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let handle = HostHandle(state.next_handle);
        state.next_handle += 0x10;
        state.windows.insert(
            handle,
            HostWindow {
                owner: self.pid,
                rect: Rect::default(),
            },
        );
        Ok(handle)
    }

    fn destroy(&self, handle: HostHandle) -> Result<(), SimulatedError> {
        self.ensure_alive()?;
        self.state
            .borrow_mut()
            .windows
            .remove(&handle)
            .map(|_| ())
            .ok_or(SimulatedError::UnknownWindow(handle))
    }

    fn move_to(&self, handle: HostHandle, rect: Rect) -> Result<(), SimulatedError> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let window = state
            .windows
            .get_mut(&handle)
            .ok_or(SimulatedError::UnknownWindow(handle))?;
        window.rect = rect;
        Ok(())
    }

    fn pump_events(&self) {
        self.state.borrow_mut().reap_orphans();
    }
}

impl ReservationService for SimulatedDesktop {
    fn send(&self, message: AppBarMessage, data: &mut AppBarData) -> Result<usize, ServiceError> {
        let failed = |reason: String| ServiceError::Failed { message, reason };

        self.ensure_alive().map_err(|e| failed(e.to_string()))?;
        let edge = data.edge().map_err(|e| failed(e.to_string()))?;
        let owner = data.owner();

        let mut state = self.state.borrow_mut();
        state.messages.push((owner, message));

        match message {
            AppBarMessage::New => {
                if !state.windows.contains_key(&owner) {
                    return Err(failed(format!("unknown window {}", owner)));
                }
                if state.bars.contains_key(&owner) {
                    return Err(ServiceError::Rejected(message));
                }
                state.bars.insert(owner, Bar { edge, rect: None });
                Ok(1)
            }
            AppBarMessage::QueryPos | AppBarMessage::SetPos => {
                if !state.bars.contains_key(&owner) {
                    return Err(ServiceError::Rejected(message));
                }
                data.rect = state.arbitrate(owner, data.rect);
                if message == AppBarMessage::SetPos {
                    if let Some(bar) = state.bars.get_mut(&owner) {
                        bar.edge = edge;
                        bar.rect = Some(data.rect);
                    }
                }
                Ok(1)
            }
            AppBarMessage::Remove => {
                state.bars.remove(&owner);
                Ok(1)
            }
        }
    }
}

impl Displays for SimulatedDesktop {
    type Error = SimulatedError;

    fn monitors(&self) -> Result<Vec<Monitor>, SimulatedError> {
        let state = self.state.borrow();
        Ok(state
            .monitors
            .iter()
            .map(|m| Monitor {
                work_area: state.available(m, None),
                ..m.clone()
            })
            .collect())
    }

    fn work_area(&self, monitor: MonitorId) -> Option<Rect> {
        let state = self.state.borrow();
        state
            .monitors
            .iter()
            .find(|m| m.id == monitor)
            .map(|m| state.available(m, None))
    }
}

impl ProcessTable for SimulatedDesktop {
    type Error = SimulatedError;

    fn current_pid(&self) -> u32 {
        self.pid
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, SimulatedError> {
        Ok(self
            .state
            .borrow()
            .processes
            .iter()
            .filter(|(_, alive)| **alive)
            .map(|(pid, _)| ProcessInfo {
                pid: *pid,
                name: PROCESS_NAME.into(),
            })
            .collect())
    }

    /// Kill `pid` and destroy its windows without unregistering its bars.
    fn terminate(&self, pid: u32) -> Result<(), SimulatedError> {
        let mut state = self.state.borrow_mut();
        match state.processes.get_mut(&pid) {
            Some(alive) if *alive => *alive = false,
            _ => return Err(SimulatedError::NoSuchProcess(pid)),
        }
        state.windows.retain(|_, w| w.owner != pid);
        Ok(())
    }

    fn wait_for_exit(&self, pid: u32, _timeout: Duration) -> Result<bool, SimulatedError> {
        Ok(!self
            .state
            .borrow()
            .processes
            .get(&pid)
            .copied()
            .unwrap_or(false))
    }
}
