//! Trend classification from EMA ordering, EMA slope and price vs. the slow EMA.

use std::fmt;

use crate::indicators::IndicatorSet;

/// Market trend at a bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Trend {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
    #[default]
    #[serde(rename = "none")]
    Sideways,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::Up)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::Down)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Sideways => "none",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the trend at `index`.
///
/// - `Up`: close above the slow EMA, fast EMA above the mid EMA, both slopes positive.
/// - `Down`: the mirror image, both slopes negative.
/// - `Sideways` otherwise. Undefined slopes or an index past the end never qualify.
pub fn classify_trend(indicators: &IndicatorSet, index: usize) -> Trend {
    let (Some(&close), Some(&fast), Some(&mid), Some(&slow)) = (
        indicators.close.get(index),
        indicators.ema_fast.get(index),
        indicators.ema_mid.get(index),
        indicators.ema_slow.get(index),
    ) else {
        return Trend::Sideways;
    };
    let (Some(slope_fast), Some(slope_mid)) = (
        indicators.slope_fast.get(index).copied().flatten(),
        indicators.slope_mid.get(index).copied().flatten(),
    ) else {
        return Trend::Sideways;
    };

    // NaN compares false on both sides and falls through to Sideways
    if close > slow && fast > mid && slope_fast > 0.0 && slope_mid > 0.0 {
        Trend::Up
    } else if close < slow && fast < mid && slope_fast < 0.0 && slope_mid < 0.0 {
        Trend::Down
    } else {
        Trend::Sideways
    }
}
