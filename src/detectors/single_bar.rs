//! Single-bar reversal detectors: Hammer and Shooting Star.
//!
//! Both compare body and wicks against the bar's own high-low range, so a bar
//! with zero range never matches.

use super::{
    helpers::{self, is_long_tail},
    PatternDetector, PatternId,
};
use crate::{Direction, OHLCVExt, Ratio, OHLCV};

impl_with_defaults!(HammerDetector, ShootingStarDetector);

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Hammer - small body near the top of the range, long lower wick
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HammerDetector {
    /// Minimum lower wick as a fraction of range
    pub tail_ratio: Ratio,
    /// Maximum body as a fraction of range
    pub max_body_ratio: Ratio,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            tail_ratio: Ratio::new_const(helpers::TAIL_RATIO),
            max_body_ratio: Ratio::new_const(helpers::MAX_BODY_RATIO),
        }
    }
}

impl PatternDetector for HammerDetector {
    fn id(&self) -> PatternId {
        PatternId::HAMMER
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<Direction> {
        let bar = bars.get(index)?;
        let body = bar.body_ratio()?;
        let upper = bar.upper_shadow_ratio()?;
        let lower = bar.lower_shadow_ratio()?;

        is_long_tail(
            body,
            lower,
            upper,
            self.tail_ratio.get(),
            self.max_body_ratio.get(),
        )
        .then_some(Direction::Bullish)
    }
}

/// Shooting Star - small body near the bottom of the range, long upper wick
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShootingStarDetector {
    /// Minimum upper wick as a fraction of range
    pub tail_ratio: Ratio,
    /// Maximum body as a fraction of range
    pub max_body_ratio: Ratio,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            tail_ratio: Ratio::new_const(helpers::TAIL_RATIO),
            max_body_ratio: Ratio::new_const(helpers::MAX_BODY_RATIO),
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn id(&self) -> PatternId {
        PatternId::SHOOTING_STAR
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<Direction> {
        let bar = bars.get(index)?;
        let body = bar.body_ratio()?;
        let upper = bar.upper_shadow_ratio()?;
        let lower = bar.lower_shadow_ratio()?;

        is_long_tail(
            body,
            upper,
            lower,
            self.tail_ratio.get(),
            self.max_body_ratio.get(),
        )
        .then_some(Direction::Bearish)
    }
}
