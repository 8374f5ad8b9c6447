//! # candle-advisor
//!
//! Daily trading advisor for closed OHLCV candles: a trend filter built on
//! exponential moving averages, reversal candle recognition and ATR-sized
//! stop-loss / take-profit levels, folded into one discrete recommendation.
//!
//! ## Quick Start
//!
//! ```rust
//! use candle_advisor::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let bars: Vec<PriceBar> = (0..30)
//!     .map(|i| {
//!         let base = 100.0 + i as f64;
//!         PriceBar::new(start + chrono::Duration::days(i), base, base + 1.0, base - 1.0, base + 0.5, 1000.0)
//!     })
//!     .collect();
//! let series = PriceSeries::new(bars).unwrap();
//!
//! let advisor = Advisor::new(AdvisorConfig::default()).unwrap();
//! let rec = advisor.advise(series.bars()).unwrap();
//!
//! // 30 bars are not enough history for the 200-period trend filter
//! assert_eq!(rec.action, Action::Wait);
//! assert!(rec.levels.is_none());
//! ```

pub mod advisor;
pub mod detectors;
pub mod indicators;
pub mod job;
pub mod params;
pub mod trend;

#[cfg(test)]
mod test_util;

pub mod prelude {
    pub use crate::{
        // Decision
        advisor::{advise, Action, Advisor, Recommendation, RiskLevels},
        // Detectors
        detectors::{
            detect_reversal_patterns, EngulfingDetector, HammerDetector, ReversalDetector,
            ReversalPatterns, ShootingStarDetector,
        },
        // Indicators
        indicators::{compute_indicators, IndicatorSet},
        // Orchestration
        job::{Advice, BarSource, DailyJob, JobError, JobOutcome, Notifier, SeenStore},
        // Parameters
        params::{AdvisorConfig, ParamMeta, ParamType},
        // Parallel
        advise_parallel,
        // Trend
        trend::{classify_trend, Trend},
        // Errors
        AdviceError,
        AdviceResult,
        AdvisorError,
        // Types
        Direction,
        Multiplier,
        OHLCVExt,
        Period,
        PriceBar,
        PriceSeries,
        Ratio,
        RawBar,
        Result,
        ValidationError,
        OHLCV,
    };
}

use chrono::{DateTime, Utc};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Malformed input series. Always surfaced to the caller, never corrected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("bar {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("bar {index}: `{field}` is not a finite number")]
    NonFinite { index: usize, field: &'static str },

    #[error("bar {index}: `{field}` must be positive")]
    NonPositivePrice { index: usize, field: &'static str },

    #[error("bar {index}: volume must not be negative")]
    NegativeVolume { index: usize },

    #[error("bar {index}: low <= min(open, close) <= max(open, close) <= high does not hold")]
    InconsistentRange { index: usize },

    #[error("bar {index}: timestamp does not increase over the previous bar")]
    NonIncreasingTimestamp { index: usize },
}

/// Errors produced by the advisor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdvisorError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AdvisorError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AdvisorError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Strictly positive, finite scale factor (ATR multiples, reward/risk, volume multiples)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Multiplier(f64);

impl Multiplier {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AdvisorError::InvalidValue(
                "Multiplier cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 {
            return Err(AdvisorError::InvalidValue("Multiplier must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AdvisorError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

macro_rules! impl_serde_validated {
    ($($ty:ident($inner:ty)),* $(,)?) => {
        $(
            impl serde::Serialize for $ty {
                fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
                    self.0.serialize(s)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                    let value = <$inner>::deserialize(d)?;
                    $ty::new(value).map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

impl_serde_validated!(Ratio(f64), Multiplier(f64), Period(usize));

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Candle open time, when the source carries one
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl<T: OHLCV> OHLCV for &T {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range is zero
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.body() / range)
    }

    #[inline]
    fn upper_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.upper_shadow() / range)
    }

    #[inline]
    fn lower_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.lower_shadow() / range)
    }

    /// Check a single bar's values. `index` is reported back in the error.
    fn validate(&self, index: usize) -> std::result::Result<(), ValidationError> {
        let prices = [
            ("open", self.open()),
            ("high", self.high()),
            ("low", self.low()),
            ("close", self.close()),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { index, field });
            }
            if value <= 0.0 {
                return Err(ValidationError::NonPositivePrice { index, field });
            }
        }
        if !self.volume().is_finite() {
            return Err(ValidationError::NonFinite {
                index,
                field: "volume",
            });
        }
        if self.volume() < 0.0 {
            return Err(ValidationError::NegativeVolume { index });
        }
        let body_low = self.open().min(self.close());
        let body_high = self.open().max(self.close());
        if self.low() > body_low || body_high > self.high() {
            return Err(ValidationError::InconsistentRange { index });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Validate every bar and the ordering of timestamps.
///
/// Timestamps are only compared when both neighbours carry one.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> std::result::Result<(), ValidationError> {
    let mut prev_ts: Option<DateTime<Utc>> = None;
    for (index, bar) in bars.iter().enumerate() {
        bar.validate(index)?;
        let ts = bar.timestamp();
        if let (Some(prev), Some(curr)) = (prev_ts, ts) {
            if curr <= prev {
                return Err(ValidationError::NonIncreasingTimestamp { index });
            }
        }
        prev_ts = ts;
    }
    Ok(())
}

/// Direction/bias of a reversal candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

// ============================================================
// PRICE BARS
// ============================================================

/// One closed trading-period candle
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.timestamp)
    }
}

/// A loader record where any column may be absent
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct RawBar {
    pub timestamp: Option<DateTime<Utc>>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    /// Convert into a [`PriceBar`], naming the first missing column.
    pub fn into_bar(self, index: usize) -> std::result::Result<PriceBar, ValidationError> {
        let missing = |field| ValidationError::MissingField { index, field };
        Ok(PriceBar {
            timestamp: self.timestamp.ok_or_else(|| missing("timestamp"))?,
            open: self.open.ok_or_else(|| missing("open"))?,
            high: self.high.ok_or_else(|| missing("high"))?,
            low: self.low.ok_or_else(|| missing("low"))?,
            close: self.close.ok_or_else(|| missing("close"))?,
            volume: self.volume.ok_or_else(|| missing("volume"))?,
        })
    }
}

/// Validated series of closed bars, strictly increasing by timestamp
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> std::result::Result<Self, ValidationError> {
        validate_bars(&bars)?;
        Ok(Self { bars })
    }

    /// Build from loader records, rejecting any record with a missing column
    pub fn from_raw(
        raw: impl IntoIterator<Item = RawBar>,
    ) -> std::result::Result<Self, ValidationError> {
        let bars = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_bar(i))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::new(bars)
    }

    #[inline]
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Keep only the most recent `n` bars
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(n);
        PriceSeries {
            bars: self.bars[start..].to_vec(),
        }
    }

    pub fn into_inner(self) -> Vec<PriceBar> {
        self.bars
    }
}

impl AsRef<[PriceBar]> for PriceSeries {
    fn as_ref(&self) -> &[PriceBar] {
        &self.bars
    }
}

impl<'de> serde::Deserialize<'de> for PriceSeries {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let bars = Vec::<PriceBar>::deserialize(d)?;
        PriceSeries::new(bars).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// PARALLEL ADVICE
// ============================================================

use rayon::{iter::Either, prelude::*};
use tracing::{debug, warn};

use crate::advisor::{Advisor, Recommendation};

/// Advice for a single instrument
#[derive(Debug)]
pub struct AdviceResult {
    pub symbol: String,
    pub recommendation: Recommendation,
}

/// Error from advising a single instrument
#[derive(Debug)]
pub struct AdviceError {
    pub symbol: String,
    pub error: AdvisorError,
}

/// Advise many independent instruments in parallel
pub fn advise_parallel<'a, T, I>(
    advisor: &Advisor,
    instruments: I,
) -> (Vec<AdviceResult>, Vec<AdviceError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let (advice, errors): (Vec<_>, Vec<_>) = instruments
        .into_par_iter()
        .partition_map(|(symbol, bars)| match advisor.advise(bars) {
            Ok(recommendation) => Either::Left(AdviceResult {
                symbol: symbol.to_string(),
                recommendation,
            }),
            Err(error) => {
                warn!(symbol, %error, "instrument rejected");
                Either::Right(AdviceError {
                    symbol: symbol.to_string(),
                    error,
                })
            }
        });

    let entries = advice.iter().filter(|r| r.recommendation.action.is_entry()).count();
    debug!(
        advised = advice.len(),
        entries,
        rejected = errors.len(),
        "parallel advice finished"
    );
    (advice, errors)
}

// ============================================================
// TESTS
// ============================================================
