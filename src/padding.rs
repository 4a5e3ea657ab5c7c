//! Per-monitor padding configuration and its command-line grammar.
//!
//! Each token has the form `-<monitor><edge>=<amount>`:
//!
//! | part        | values                                                      |
//! |-------------|-------------------------------------------------------------|
//! | `<monitor>` | `p` primary, `s` every secondary, `a` all, or a number      |
//! | `<edge>`    | `t`, `b`, `l`, `r`, or `a` for all four                     |
//! | `<amount>`  | pixels                                                      |
//!
//! The primary monitor answers to `1`.  Each secondary answers to its 0-based
//! position in platform enumeration order, so when the primary is enumerated
//! first the secondaries are `1`, `2`, ... and `1` selects both the primary
//! and the first secondary.  Tokens apply left to right, so a later token
//! wins.
//!
//! ```text
//! aerial -pt=40 -sb=20 -2l=8
//! ```

use crate::geometry::{Edge, Monitor};
use log::{debug, warn};
use std::fmt;

/// Pixel amounts for the four edges of one monitor.  `0` means no
/// reservation on that edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeAmounts {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl EdgeAmounts {
    pub fn get(&self, edge: Edge) -> u32 {
        match edge {
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
            Edge::Right => self.right,
        }
    }

    pub fn set(&mut self, edge: Edge, amount: u32) {
        match edge {
            Edge::Top => self.top = amount,
            Edge::Bottom => self.bottom = amount,
            Edge::Left => self.left = amount,
            Edge::Right => self.right = amount,
        }
    }

    /// Non-zero amounts in reservation order.
    pub fn iter(&self) -> impl Iterator<Item = (Edge, u32)> + '_ {
        Edge::RESERVATION_ORDER
            .into_iter()
            .map(|edge| (edge, self.get(edge)))
            .filter(|(_, amount)| *amount > 0)
    }
}

/// Which monitors a token targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSelector {
    Primary,
    Secondary,
    All,
    /// `1` for the primary, otherwise a secondary's enumeration index.
    Index(usize),
}

impl MonitorSelector {
    /// Whether the monitor at 0-based platform enumeration index
    /// `enumerated` is selected.
    pub fn matches(&self, enumerated: usize, primary: bool) -> bool {
        match self {
            MonitorSelector::Primary => primary,
            MonitorSelector::Secondary => !primary,
            MonitorSelector::All => true,
            MonitorSelector::Index(n) if primary => *n == 1,
            MonitorSelector::Index(n) => *n == enumerated,
        }
    }
}

/// Which edges a token targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSelector {
    One(Edge),
    All,
}

impl EdgeSelector {
    fn edges(&self) -> Vec<Edge> {
        match self {
            EdgeSelector::One(edge) => vec![*edge],
            EdgeSelector::All => Edge::RESERVATION_ORDER.to_vec(),
        }
    }
}

/// One parsed `-<monitor><edge>=<amount>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingToken {
    pub monitor: MonitorSelector,
    pub edges: EdgeSelector,
    pub amount: u32,
}

/// Why a token was not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("expected -<monitor><edge>=<amount>")]
    Shape,
    #[error("unknown monitor selector {0:?}")]
    Monitor(String),
    #[error("unknown edge {0:?}")]
    Edge(char),
    #[error("amount {0:?} is not a pixel count")]
    Amount(String),
}

impl PaddingToken {
    /// Parse a single command-line token.
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let body = token.strip_prefix('-').ok_or(TokenError::Shape)?;
        let (selector, amount) = body.split_once('=').ok_or(TokenError::Shape)?;

        let edge_char = selector.chars().last().ok_or(TokenError::Shape)?;
        let monitor = &selector[..selector.len() - edge_char.len_utf8()];

        let monitor = match monitor {
            "p" => MonitorSelector::Primary,
            "s" => MonitorSelector::Secondary,
            "a" => MonitorSelector::All,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                match digits.parse::<usize>() {
                    Ok(n) => MonitorSelector::Index(n),
                    Err(_) => return Err(TokenError::Monitor(digits.to_string())),
                }
            }
            other => return Err(TokenError::Monitor(other.to_string())),
        };

        let edges = match edge_char {
            'a' => EdgeSelector::All,
            c => EdgeSelector::One(Edge::from_letter(c).ok_or(TokenError::Edge(c))?),
        };

        if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenError::Amount(amount.to_string()));
        }
        let amount = amount
            .parse::<i32>()
            .ok()
            .and_then(|a| u32::try_from(a).ok())
            .ok_or_else(|| TokenError::Amount(amount.to_string()))?;

        Ok(Self {
            monitor,
            edges,
            amount,
        })
    }
}

/// The immutable padding configuration: every monitor with its requested
/// amounts, primary first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaddingConfig {
    screens: Vec<(Monitor, EdgeAmounts)>,
}

impl PaddingConfig {
    /// Order `monitors` primary-first and apply every recognised token in
    /// `args`.  Unrecognised arguments are logged and skipped.
    pub fn from_args<I, S>(monitors: Vec<Monitor>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<PaddingToken> = args
            .into_iter()
            .filter_map(|arg| {
                let arg = arg.as_ref();
                match PaddingToken::parse(arg) {
                    Ok(token) => {
                        debug!("padding token {:?}: {:?}", arg, token);
                        Some(token)
                    }
                    Err(e) => {
                        warn!("ignoring argument {:?}: {}", arg, e);
                        None
                    }
                }
            })
            .collect();
        Self::from_tokens(monitors, &tokens)
    }

    /// Order `monitors` primary-first and apply `tokens` in sequence.
    /// `monitors` must be in platform enumeration order.
    pub fn from_tokens(monitors: Vec<Monitor>, tokens: &[PaddingToken]) -> Self {
        let enumerated: Vec<(usize, Monitor)> = monitors.into_iter().enumerate().collect();
        let screens = primary_first(enumerated, |(_, m)| m.primary)
            .into_iter()
            .map(|(index, monitor)| {
                let mut amounts = EdgeAmounts::default();
                for token in tokens {
                    if token.monitor.matches(index, monitor.primary) {
                        for edge in token.edges.edges() {
                            amounts.set(edge, token.amount);
                        }
                    }
                }
                (monitor, amounts)
            })
            .collect();
        Self { screens }
    }

    /// Every monitor with its amounts, primary first.
    pub fn screens(&self) -> &[(Monitor, EdgeAmounts)] {
        &self.screens
    }

    /// Non-zero `(monitor, edge, amount)` triples in reservation order.
    pub fn requests(&self) -> impl Iterator<Item = (&Monitor, Edge, u32)> + '_ {
        self.screens
            .iter()
            .flat_map(|(monitor, amounts)| amounts.iter().map(move |(e, a)| (monitor, e, a)))
    }

    /// Whether no edge of any monitor asks for a reservation.
    pub fn is_empty(&self) -> bool {
        self.requests().next().is_none()
    }
}

impl fmt::Display for PaddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (monitor, amounts) in &self.screens {
            writeln!(
                f,
                "{}{}: top={} bottom={} left={} right={}",
                monitor.name,
                if monitor.primary { " (primary)" } else { "" },
                amounts.top,
                amounts.bottom,
                amounts.left,
                amounts.right
            )?;
        }
        Ok(())
    }
}

/// Move the first item `is_primary` accepts to the front, keeping the
/// relative order of the others.
fn primary_first<T>(mut items: Vec<T>, is_primary: impl Fn(&T) -> bool) -> Vec<T> {
    if let Some(i) = items.iter().position(is_primary) {
        let primary = items.remove(i);
        items.insert(0, primary);
    }
    items
}
