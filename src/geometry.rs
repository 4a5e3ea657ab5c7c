//! Geometry and monitor types used throughout aerial.
//!
//! This module defines the vocabulary that all components share:
//! [`Rect`] is a screen rectangle in physical pixels, [`Edge`] names the side
//! of a monitor a reservation is anchored to, and [`Monitor`] describes one
//! display as reported by the platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A screen rectangle in pixels, `right` and `bottom` exclusive.
///
/// Laid out exactly like the native `RECT` so it can be embedded in
/// [`AppBarData`](crate::appbar::AppBarData).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Whether `self` and `other` share at least one pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Whether the point `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// The centre point, rounded towards the top-left.
    pub fn center(&self) -> (i32, i32) {
        (
            self.left.saturating_add(self.width() / 2),
            self.top.saturating_add(self.height() / 2),
        )
    }

    /// Extent of the rectangle along the axis perpendicular to `edge`, i.e.
    /// the height for horizontal edges and the width for vertical ones.
    pub fn thickness(&self, edge: Edge) -> i32 {
        if edge.is_horizontal() {
            self.height()
        } else {
            self.width()
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Side of a monitor a reservation is anchored to.
///
/// The discriminants are the shell's native edge codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Edge {
    Left = 0,
    Top = 1,
    Right = 2,
    Bottom = 3,
}

/// A native edge code outside the closed set `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid edge code: {0}")]
pub struct InvalidEdge(pub u32);

impl Edge {
    /// Order in which the edges of one monitor are reserved.
    ///
    /// Each query is answered relative to the bars committed before it, so
    /// changing this order changes the resulting geometry.
    pub const RESERVATION_ORDER: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    /// The native edge code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Map a native edge code back to an [`Edge`].
    pub fn from_code(code: u32) -> Result<Self, InvalidEdge> {
        match code {
            0 => Ok(Edge::Left),
            1 => Ok(Edge::Top),
            2 => Ok(Edge::Right),
            3 => Ok(Edge::Bottom),
            other => Err(InvalidEdge(other)),
        }
    }

    /// Parse the single-letter command-line form (`t`, `b`, `l`, `r`).
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            't' => Some(Edge::Top),
            'b' => Some(Edge::Bottom),
            'l' => Some(Edge::Left),
            'r' => Some(Edge::Right),
            _ => None,
        }
    }

    /// `true` for [`Top`](Edge::Top) and [`Bottom`](Edge::Bottom).
    pub fn is_horizontal(self) -> bool {
        matches!(self, Edge::Top | Edge::Bottom)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Left => write!(f, "left"),
            Edge::Top => write!(f, "top"),
            Edge::Right => write!(f, "right"),
            Edge::Bottom => write!(f, "bottom"),
        }
    }
}

/// Opaque platform identifier of a monitor (an `HMONITOR` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorId(pub isize);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A display as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    /// Human-readable device name, for logging only.
    pub name: String,
    pub primary: bool,
    /// The monitor's available area at the time it was enumerated.
    pub work_area: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_codes_follow_the_shell_convention() {
        assert_eq!(Edge::Left.code(), 0);
        assert_eq!(Edge::Top.code(), 1);
        assert_eq!(Edge::Right.code(), 2);
        assert_eq!(Edge::Bottom.code(), 3);
        for edge in Edge::RESERVATION_ORDER {
            assert_eq!(Edge::from_code(edge.code()), Ok(edge));
        }
    }

    #[test]
    fn unknown_edge_code_is_rejected() {
        assert_eq!(Edge::from_code(4), Err(InvalidEdge(4)));
    }

    #[test]
    fn edge_letters() {
        assert_eq!(Edge::from_letter('t'), Some(Edge::Top));
        assert_eq!(Edge::from_letter('b'), Some(Edge::Bottom));
        assert_eq!(Edge::from_letter('l'), Some(Edge::Left));
        assert_eq!(Edge::from_letter('r'), Some(Edge::Right));
        assert_eq!(Edge::from_letter('a'), None);
        assert_eq!(Edge::from_letter('T'), None);
    }

    #[test]
    fn thickness_follows_edge_axis() {
        let r = Rect::new(0, 0, 1920, 40);
        assert_eq!(r.thickness(Edge::Top), 40);
        assert_eq!(r.thickness(Edge::Bottom), 40);
        assert_eq!(r.thickness(Edge::Left), 1920);
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let top = Rect::new(0, 0, 1920, 40);
        let below = Rect::new(0, 40, 1920, 1080);
        assert!(!top.overlaps(&below));
        assert!(top.overlaps(&Rect::new(100, 39, 200, 41)));
    }

    #[test]
    fn empty_rect() {
        assert!(Rect::new(10, 10, 10, 20).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn extents_saturate_at_coordinate_limits() {
        let wide = Rect::new(i32::MIN, -10, i32::MAX, 10);
        assert_eq!(wide.width(), i32::MAX);
        assert_eq!(wide.height(), 20);
        let far = Rect::new(1920, 0, i32::MAX, 1080);
        assert_eq!(far.center(), (1920 + (i32::MAX - 1920) / 2, 540));
        assert_eq!(Rect::new(-5, 0, i32::MAX, 1).center().0, i32::MAX / 2 - 5);
    }
}
