//! Indicator engine
//!
//! Whole-series computations over closed bars: exponential moving averages,
//! Average True Range, normalized slope and a simple volume average.
//!
//! Every returned vector has the same length as the input. Positions inside an
//! indicator's warm-up are `None`, never zero.

use crate::{Period, OHLCV};

// ============================================================
// PARAMETERS
// ============================================================

/// Window lengths used by [`compute_indicators_with`]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ema_fast: Period,
    pub ema_mid: Period,
    pub ema_slow: Period,
    pub atr: Period,
    pub slope_lookback: Period,
    pub volume_ma: Period,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_fast: Period::new_const(20),
            ema_mid: Period::new_const(50),
            ema_slow: Period::new_const(200),
            atr: Period::new_const(14),
            slope_lookback: Period::new_const(5),
            volume_ma: Period::new_const(20),
        }
    }
}

impl IndicatorParams {
    /// Bars needed before the slow EMA has spanned its own window and then
    /// moved far enough to measure a slope, and before ATR is defined.
    pub fn warm_up(&self) -> usize {
        (self.ema_slow.get() + self.slope_lookback.get()).max(self.atr.get() + 1)
    }
}

// ============================================================
// INDICATOR SET
// ============================================================

/// Derived per-bar values for one series
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub close: Vec<f64>,
    pub ema_fast: Vec<f64>,
    pub ema_mid: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub atr: Vec<Option<f64>>,
    pub slope_fast: Vec<Option<f64>>,
    pub slope_mid: Vec<Option<f64>>,
    /// Only present when volume confirmation was requested
    pub volume_ma: Option<Vec<Option<f64>>>,
}

impl IndicatorSet {
    #[inline]
    pub fn len(&self) -> usize {
        self.close.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Index of the most recent bar
    #[inline]
    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    /// ATR at `index`, `None` during warm-up or past the end
    #[inline]
    pub fn atr_at(&self, index: usize) -> Option<f64> {
        self.atr.get(index).copied().flatten()
    }

    /// Volume average at `index`. `None` when not computed or still warming up.
    #[inline]
    pub fn volume_ma_at(&self, index: usize) -> Option<f64> {
        self.volume_ma
            .as_ref()
            .and_then(|v| v.get(index).copied().flatten())
    }
}

/// Compute indicators with the default windows (20/50/200 EMA, ATR 14, slope 5, volume 20).
pub fn compute_indicators<T: OHLCV>(bars: &[T], volume_confirmation: bool) -> IndicatorSet {
    compute_indicators_with(bars, &IndicatorParams::default(), volume_confirmation)
}

/// Compute indicators with explicit windows.
///
/// Does not validate the bars; callers check the series first.
pub fn compute_indicators_with<T: OHLCV>(
    bars: &[T],
    params: &IndicatorParams,
    volume_confirmation: bool,
) -> IndicatorSet {
    let close: Vec<f64> = bars.iter().map(|b| b.close()).collect();

    let ema_fast = ema(&close, params.ema_fast);
    let ema_mid = ema(&close, params.ema_mid);
    let ema_slow = ema(&close, params.ema_slow);

    let slope_fast = slope(&ema_fast, params.slope_lookback);
    let slope_mid = slope(&ema_mid, params.slope_lookback);

    let atr = atr(bars, params.atr);

    let volume_ma = volume_confirmation.then(|| {
        let volume: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume())).collect();
        rolling_mean(&volume, params.volume_ma)
    });

    IndicatorSet {
        close,
        ema_fast,
        ema_mid,
        ema_slow,
        atr,
        slope_fast,
        slope_mid,
        volume_ma,
    }
}

// ============================================================
// PRIMITIVES
// ============================================================

/// Recursive EMA seeded with the first value: `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: Period) -> Vec<f64> {
    let k = 2.0 / (period.get() as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => v * k + p * (1.0 - k),
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// True range per bar. The first bar has no previous close and is `None`.
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            out.push(None);
            continue;
        }
        let prev_close = bars[i - 1].close();
        let tr = (bar.high() - bar.low())
            .max((bar.high() - prev_close).abs())
            .max((bar.low() - prev_close).abs());
        out.push(Some(tr));
    }
    out
}

/// Average True Range: simple mean of the last `period` true ranges.
///
/// Defined from index `period` onwards.
pub fn atr<T: OHLCV>(bars: &[T], period: Period) -> Vec<Option<f64>> {
    rolling_mean(&true_range(bars), period)
}

/// Simple rolling mean. A window holding any undefined value is undefined.
pub fn rolling_mean(values: &[Option<f64>], period: Period) -> Vec<Option<f64>> {
    let n = period.get();
    (0..values.len())
        .map(|i| {
            if i + 1 < n {
                return None;
            }
            let sum: Option<f64> = values[i + 1 - n..=i].iter().copied().sum();
            sum.map(|s| s / n as f64)
        })
        .collect()
}

/// Relative change over `lookback` bars: `(v[i] - v[i-n]) / v[i-n]`.
///
/// `None` before the lookback exists or when the base is exactly zero.
pub fn slope(values: &[f64], lookback: Period) -> Vec<Option<f64>> {
    let n = lookback.get();
    (0..values.len())
        .map(|i| {
            let base = *values.get(i.checked_sub(n)?)?;
            (base != 0.0).then(|| (values[i] - base) / base)
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
