//! Two-bar reversal detectors: Engulfing (bullish and bearish).

use super::{helpers::body_covers, PatternDetector, PatternId};
use crate::{Direction, OHLCVExt, OHLCV};

impl_with_defaults!(EngulfingDetector);

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Engulfing Pattern (bullish and bearish)
///
/// The current body must cover the previous body in the opposite colour.
/// Touching edges count as covering.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn id(&self) -> PatternId {
        PatternId::ENGULFING
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<Direction> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        // Bullish: white engulfs black
        if prev.is_bearish()
            && curr.is_bullish()
            && body_covers(curr.open(), curr.close(), prev.close(), prev.open())
        {
            return Some(Direction::Bullish);
        }

        // Bearish: black engulfs white
        if prev.is_bullish()
            && curr.is_bearish()
            && body_covers(curr.close(), curr.open(), prev.open(), prev.close())
        {
            return Some(Direction::Bearish);
        }

        None
    }
}
