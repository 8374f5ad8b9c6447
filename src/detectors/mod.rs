//! Reversal candle detectors
//!
//! - **Single-bar**: Hammer, Shooting Star
//! - **Two-bar**: Engulfing (bullish and bearish)
//!
//! Detectors are defined over a slice and an index so they can run on any bar
//! of a series; the advisor only evaluates the latest one.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod two_bar;

pub use single_bar::*;
pub use two_bar::*;

use std::fmt;

use tracing::trace;

use crate::{Direction, OHLCV};

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    pub const HAMMER: Self = Self("HAMMER");
    pub const SHOOTING_STAR: Self = Self("SHOOTING_STAR");
    pub const ENGULFING: Self = Self("ENGULFING");
    pub const BULLISH_ENGULFING: Self = Self("BULLISH_ENGULFING");
    pub const BEARISH_ENGULFING: Self = Self("BEARISH_ENGULFING");

    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candle pattern recognised at a single bar index
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;

    /// Direction of the pattern ending at `index`, if it matches
    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<Direction>;
}

// ============================================================
// REVERSAL SET
// ============================================================

/// Reversal flags for one bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReversalPatterns {
    pub bullish_engulfing: bool,
    pub bearish_engulfing: bool,
    pub hammer: bool,
    pub shooting_star: bool,
}

impl ReversalPatterns {
    /// Bullish engulfing or hammer
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.bullish_engulfing || self.hammer
    }

    /// Bearish engulfing or shooting star
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.bearish_engulfing || self.shooting_star
    }

    /// Ids of every matched pattern
    pub fn matched(&self) -> Vec<PatternId> {
        [
            (self.bullish_engulfing, PatternId::BULLISH_ENGULFING),
            (self.bearish_engulfing, PatternId::BEARISH_ENGULFING),
            (self.hammer, PatternId::HAMMER),
            (self.shooting_star, PatternId::SHOOTING_STAR),
        ]
        .into_iter()
        .filter_map(|(hit, id)| hit.then_some(id))
        .collect()
    }
}

/// The three reversal detectors the advisor consults
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReversalDetector {
    pub engulfing: EngulfingDetector,
    pub hammer: HammerDetector,
    pub shooting_star: ShootingStarDetector,
}

impl ReversalDetector {
    /// Evaluate all reversal patterns at `index`.
    pub fn detect_at<T: OHLCV>(&self, bars: &[T], index: usize) -> ReversalPatterns {
        let engulfing = run(&self.engulfing, bars, index);
        ReversalPatterns {
            bullish_engulfing: engulfing.is_some_and(Direction::is_bullish),
            bearish_engulfing: engulfing.is_some_and(Direction::is_bearish),
            hammer: run(&self.hammer, bars, index).is_some(),
            shooting_star: run(&self.shooting_star, bars, index).is_some(),
        }
    }

    /// Evaluate all reversal patterns on `bar` given the bar before it.
    pub fn detect<T: OHLCV>(&self, bar: &T, prev_bar: &T) -> ReversalPatterns {
        self.detect_at(&[prev_bar, bar], 1)
    }
}

/// Run one detector, skipping indices without enough bars behind them.
fn run<D: PatternDetector, T: OHLCV>(detector: &D, bars: &[T], index: usize) -> Option<Direction> {
    if index >= bars.len() || index + 1 < detector.min_bars() {
        trace!(pattern = %detector.id(), index, "not enough bars");
        return None;
    }
    let direction = detector.detect(bars, index);
    if let Some(direction) = direction {
        trace!(pattern = %detector.id(), index, ?direction, "pattern matched");
    }
    direction
}

/// Reversal patterns of `bar` with default thresholds.
pub fn detect_reversal_patterns<T: OHLCV>(bar: &T, prev_bar: &T) -> ReversalPatterns {
    ReversalDetector::default().detect(bar, prev_bar)
}
