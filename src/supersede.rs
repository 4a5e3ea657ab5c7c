//! Single-instance supersession.
//!
//! A new run replaces the previous one: every other process with the same
//! executable name is terminated before the new session claims any space.
//!
//! The termination is a hard kill, so the previous instance never unregisters
//! its own bars.  They are reclaimed by the shell once it notices the owner
//! windows are gone, which happens asynchronously and without a completion
//! signal.  After waiting for the killed processes to exit, a fixed settle
//! delay gives that cleanup a head start; if the shell is slower, the new
//! session's first position query can still see the old bars.
//!
//! Every failure here is logged and swallowed.

use crate::config::TimingConfig;
use crate::traits::ProcessTable;
use log::{debug, info, warn};
use std::path::Path;

/// Outcome of [`supersede_previous`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Supersession {
    /// Pids that were terminated.
    pub terminated: Vec<u32>,
    /// Terminated pids that had not exited when the wait timed out.
    pub lingering: Vec<u32>,
}

/// Normalise an executable name for comparison: file stem, lower case,
/// without a trailing `.exe`.
pub fn identity_of(exe_name: &str) -> String {
    let file = Path::new(exe_name)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| exe_name.to_string());
    let lower = file.to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Identity of the running executable, if it can be determined.
pub fn current_identity() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    let name = exe.file_name()?.to_string_lossy().into_owned();
    Some(identity_of(&name))
}

/// Terminate every other process whose identity matches `identity`, wait
/// for them to exit, then pause for the shell's cleanup.
pub fn supersede_previous<T: ProcessTable>(
    table: &T,
    identity: &str,
    timing: &TimingConfig,
) -> Supersession {
    let mut report = Supersession::default();

    let processes = match table.processes() {
        Ok(p) => p,
        Err(e) => {
            warn!("cannot list processes, skipping supersession: {}", e);
            return report;
        }
    };

    let me = table.current_pid();
    for process in processes {
        if process.pid == me || identity_of(&process.name) != identity {
            continue;
        }
        match table.terminate(process.pid) {
            Ok(()) => {
                info!("terminated previous instance (pid {})", process.pid);
                report.terminated.push(process.pid);
            }
            Err(e) => debug!("failed to terminate pid {}: {}", process.pid, e),
        }
    }

    if report.terminated.is_empty() {
        debug!("no previous instance running");
        return report;
    }

    for pid in &report.terminated {
        match table.wait_for_exit(*pid, timing.exit_timeout()) {
            Ok(true) => {}
            Ok(false) => {
                warn!("pid {} still running after {:?}", pid, timing.exit_timeout());
                report.lingering.push(*pid);
            }
            Err(e) => debug!("cannot wait for pid {}: {}", pid, e),
        }
    }

    let settle = timing.supersede_settle();
    if !settle.is_zero() {
        debug!("waiting {:?} for the shell to reclaim old bars", settle);
        std::thread::sleep(settle);
    }
    report
}
