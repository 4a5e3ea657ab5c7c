//! Win32 implementations.
//!
//! This module provides concrete backends for the
//! [`WindowHost`](crate::traits::WindowHost),
//! [`ReservationService`](crate::traits::ReservationService),
//! [`Displays`](crate::traits::Displays) and
//! [`ProcessTable`](crate::traits::ProcessTable) traits, plus the tray icon
//! and message loop that keep the process alive.
//!
//! Nothing outside this module should reference the `windows` crate.

pub mod desktop;
pub mod process;
pub mod tray;

/// A failed Win32 call.
#[derive(Debug, thiserror::Error)]
#[error("{call} failed: {source}")]
pub struct Win32Error {
    call: &'static str,
    #[source]
    source: windows::core::Error,
}

impl Win32Error {
    pub(crate) fn new(call: &'static str, source: windows::core::Error) -> Self {
        Self { call, source }
    }

    /// Wrap the calling thread's last-error code.
    pub(crate) fn last(call: &'static str) -> Self {
        Self::new(call, windows::core::Error::from_win32())
    }
}

/// Decode a nul-terminated UTF-16 buffer.
pub(crate) fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_wide_stops_at_nul() {
        let buf: Vec<u16> = "aerial.exe\0junk".encode_utf16().collect();
        assert_eq!(from_wide(&buf), "aerial.exe");
        let full: Vec<u16> = "abc".encode_utf16().collect();
        assert_eq!(from_wide(&full), "abc");
    }
}
