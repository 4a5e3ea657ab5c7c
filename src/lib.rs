//! **aerial**: reserve empty strips along the edges of your monitors.
//!
//! Each strip is registered with the Windows shell as an application bar, so
//! maximised windows and the desktop work area stop short of it.  The amounts
//! come from command-line tokens such as `-pt=40` (40 pixels at the top of
//! the primary monitor) or `-ab=20` (20 pixels at the bottom of every
//! monitor).  Starting a new instance replaces the running one.
//!
//! # Architecture
//!
//! The reservation logic is written against the traits in [`traits`]:
//!
//! * [`traits::WindowHost`] creates and positions the invisible window that
//!   owns each strip.
//! * [`traits::ReservationService`] carries the four-message registration
//!   protocol (see [`appbar`]).
//! * [`traits::Displays`] enumerates monitors and reports their available
//!   area.
//! * [`traits::ProcessTable`] lets [`supersede`] find and stop a previous
//!   instance.
//!
//! [`session::ReservationSession`] drives the handshake for a whole
//! [`padding::PaddingConfig`].  Concrete backends live in `win32` (Windows
//! only) and [`simulated`] (an in-memory desktop used by the tests and by
//! `--dry-run`).

pub mod appbar;
pub mod config;
pub mod geometry;
pub mod padding;
pub mod session;
pub mod simulated;
pub mod supersede;
pub mod traits;
#[cfg(windows)]
pub mod win32;
