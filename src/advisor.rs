//! Decision function
//!
//! Folds trend, reversal candles and volume on the latest bar into one
//! [`Recommendation`]. Trend is classified first; a pattern pointing against
//! the trend is ignored, so a bullish engulfing inside a confirmed downtrend
//! still yields [`Action::ReduceOrExit`].
//!
//! | Latest bar | Action |
//! |---|---|
//! | fewer than `min_history` bars (at least the indicator warm-up), or ATR undefined | `wait` |
//! | uptrend + bullish pattern + volume | `buy` |
//! | downtrend + bearish pattern + volume | `sell` |
//! | downtrend, no bearish pattern | `reduce_or_exit` |
//! | uptrend, no bullish pattern | `wait_pullback` |
//! | anything else | `wait` |

use std::fmt;

use tracing::debug;

use crate::{
    detectors::PatternId,
    indicators::{compute_indicators_with, IndicatorSet},
    params::AdvisorConfig,
    trend::{classify_trend, Trend},
    validate_bars, Result, OHLCV,
};

pub const REASON_INSUFFICIENT_DATA: &str = "not enough data for a reliable signal";
pub const REASON_NO_SIGNAL: &str = "no combined signal";
const REASON_BUY: &str = "uptrend + bullish pattern";
const REASON_SELL: &str = "downtrend + bearish pattern";
const REASON_VOLUME: &str = " + volume";
const REASON_REDUCE: &str = "persistent downtrend, no candle confirmation";
const REASON_PULLBACK: &str = "uptrend, awaiting confirmation";

// ============================================================
// RECOMMENDATION
// ============================================================

/// Discrete advice for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
    ReduceOrExit,
    WaitPullback,
    Wait,
}

impl Action {
    /// `buy` and `sell` carry risk levels
    #[inline]
    pub fn is_entry(self) -> bool {
        matches!(self, Action::Buy | Action::Sell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::ReduceOrExit => "reduce_or_exit",
            Action::WaitPullback => "wait_pullback",
            Action::Wait => "wait",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry, stop-loss and take-profit for an entry signal
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskLevels {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: f64,
}

impl RiskLevels {
    /// Stop below entry by `sl_atr_mult` ATRs, target `rr` risks above it
    pub fn long(entry: f64, atr: f64, sl_atr_mult: f64, rr: f64) -> Self {
        let stop_loss = entry - sl_atr_mult * atr;
        Self {
            entry_price: entry,
            stop_loss,
            take_profit: entry + rr * (entry - stop_loss),
            risk_reward_ratio: rr,
        }
    }

    /// Stop above entry by `sl_atr_mult` ATRs, target `rr` risks below it
    pub fn short(entry: f64, atr: f64, sl_atr_mult: f64, rr: f64) -> Self {
        let stop_loss = entry + sl_atr_mult * atr;
        Self {
            entry_price: entry,
            stop_loss,
            take_profit: entry - rr * (stop_loss - entry),
            risk_reward_ratio: rr,
        }
    }

    /// Distance between entry and stop
    #[inline]
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }
}

/// Advisor output for one series
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub trend: Trend,
    pub reason: String,
    /// Only set for `buy` and `sell`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<RiskLevels>,
}

impl Recommendation {
    fn new(action: Action, trend: Trend, reason: impl Into<String>) -> Self {
        Self {
            action,
            trend,
            reason: reason.into(),
            levels: None,
        }
    }

    fn insufficient_data() -> Self {
        Self::new(Action::Wait, Trend::Sideways, REASON_INSUFFICIENT_DATA)
    }

    /// `wait` because history was too short, as opposed to a confident no-signal
    pub fn is_insufficient_data(&self) -> bool {
        self.action == Action::Wait && self.reason == REASON_INSUFFICIENT_DATA
    }
}

// ============================================================
// ADVISOR
// ============================================================

/// Stateless advisor holding a validated configuration
#[derive(Debug, Clone, Default)]
pub struct Advisor {
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Advise on the latest bar of `bars`.
    ///
    /// Fails only on malformed bars; short or warming-up series produce `wait`.
    pub fn advise<T: OHLCV>(&self, bars: &[T]) -> Result<Recommendation> {
        validate_bars(bars)?;
        let rec = self.decide(bars);
        debug!(
            bars = bars.len(),
            action = %rec.action,
            trend = %rec.trend,
            reason = %rec.reason,
            "advice computed"
        );
        Ok(rec)
    }

    fn decide<T: OHLCV>(&self, bars: &[T]) -> Recommendation {
        let cfg = &self.config;
        if bars.len() < cfg.min_history.get().max(cfg.indicators.warm_up()) {
            return Recommendation::insufficient_data();
        }

        let indicators = compute_indicators_with(bars, &cfg.indicators, cfg.use_volume);
        let Some(i) = indicators.last_index() else {
            return Recommendation::insufficient_data();
        };
        let Some(atr) = indicators.atr_at(i) else {
            return Recommendation::insufficient_data();
        };

        let trend = classify_trend(&indicators, i);
        let patterns = cfg.patterns.detect_at(bars, i);
        let volume_ok = self.volume_confirmed(&indicators, bars[i].volume(), i);
        let matched: Vec<&str> = patterns.matched().iter().map(PatternId::as_str).collect();
        debug!(trend = %trend, patterns = ?matched, volume_ok, "latest bar evaluated");

        let bullish = patterns.is_bullish();
        let bearish = patterns.is_bearish();
        let volume_note = if cfg.use_volume { REASON_VOLUME } else { "" };
        let entry = indicators.close[i];
        let (sl_mult, rr) = (cfg.sl_atr_mult.get(), cfg.reward_risk_ratio.get());

        if trend.is_up() && bullish && volume_ok {
            let mut rec = Recommendation::new(Action::Buy, trend, format!("{REASON_BUY}{volume_note}"));
            rec.levels = Some(RiskLevels::long(entry, atr, sl_mult, rr));
            return rec;
        }

        if trend.is_down() && bearish && volume_ok {
            let mut rec = Recommendation::new(Action::Sell, trend, format!("{REASON_SELL}{volume_note}"));
            rec.levels = Some(RiskLevels::short(entry, atr, sl_mult, rr));
            return rec;
        }

        if trend.is_down() && !bearish {
            return Recommendation::new(Action::ReduceOrExit, trend, REASON_REDUCE);
        }

        if trend.is_up() && !bullish {
            return Recommendation::new(Action::WaitPullback, trend, REASON_PULLBACK);
        }

        Recommendation::new(Action::Wait, trend, REASON_NO_SIGNAL)
    }

    /// Volume above `vol_mult` times its average. Passes when confirmation is
    /// off or the average is still warming up.
    fn volume_confirmed(&self, indicators: &IndicatorSet, volume: f64, index: usize) -> bool {
        if !self.config.use_volume {
            return true;
        }
        match indicators.volume_ma_at(index) {
            Some(avg) => volume > self.config.vol_mult.get() * avg,
            None => true,
        }
    }
}

/// Advise on `bars` with `config`.
///
/// Validates the configuration, then the bars.
pub fn advise<T: OHLCV>(bars: &[T], config: &AdvisorConfig) -> Result<Recommendation> {
    Advisor::new(config.clone())?.advise(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        indicators::compute_indicators,
        test_util::{self, assert_approx},
        AdvisorError, Multiplier, Period, ValidationError,
    };

    fn no_volume() -> AdvisorConfig {
        AdvisorConfig {
            use_volume: false,
            ..AdvisorConfig::default()
        }
    }

    #[test]
    fn test_short_series_waits() {
        let bars = test_util::rising(50);
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert_eq!(rec.action, Action::Wait);
        assert_eq!(rec.trend, Trend::Sideways);
        assert!(rec.is_insufficient_data());
        assert!(rec.levels.is_none());
    }

    #[test]
    fn test_empty_series_waits() {
        let bars: Vec<crate::PriceBar> = Vec::new();
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert!(rec.is_insufficient_data());
    }

    #[test]
    fn test_history_boundary() {
        let config = AdvisorConfig::default();
        let rec = advise(&test_util::rising(209), &config).unwrap();
        assert!(rec.is_insufficient_data());
        let rec = advise(&test_util::rising(210), &config).unwrap();
        assert!(!rec.is_insufficient_data());
    }

    #[test]
    fn test_buy_levels() {
        let bars = test_util::rising_with_bullish_engulfing(2000.0);
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert_eq!(rec.action, Action::Buy);
        assert_eq!(rec.trend, Trend::Up);
        assert_eq!(rec.reason, "uptrend + bullish pattern + volume");

        let atr = compute_indicators(&bars, true).atr_at(249).unwrap();
        let levels = rec.levels.unwrap();
        assert_eq!(levels.entry_price, 224.8);
        assert_approx!(levels.stop_loss, 224.8 - 1.5 * atr);
        assert_approx!(levels.take_profit, 224.8 + 3.0 * (224.8 - levels.stop_loss));
        assert_eq!(levels.risk_reward_ratio, 3.0);
    }

    #[test]
    fn test_weak_volume_blocks_entry() {
        let bars = test_util::rising_with_bullish_engulfing(1000.0);
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert_eq!(rec.action, Action::Wait);
        assert_eq!(rec.trend, Trend::Up);
        assert_eq!(rec.reason, REASON_NO_SIGNAL);
        assert!(!rec.is_insufficient_data());
        assert!(rec.levels.is_none());
    }

    #[test]
    fn test_volume_off_drops_suffix() {
        let bars = test_util::rising_with_bullish_engulfing(1000.0);
        let rec = advise(&bars, &no_volume()).unwrap();
        assert_eq!(rec.action, Action::Buy);
        assert_eq!(rec.reason, "uptrend + bullish pattern");
    }

    #[test]
    fn test_volume_warm_up_passes() {
        let config = AdvisorConfig {
            indicators: crate::indicators::IndicatorParams {
                volume_ma: Period::new(50).unwrap(),
                ..Default::default()
            },
            ..AdvisorConfig::default()
        };
        let advisor = Advisor::new(config).unwrap();
        let bars = test_util::rising(60);
        let indicators = compute_indicators_with(&bars, &advisor.config().indicators, true);

        // volume average undefined before bar 49
        assert!(advisor.volume_confirmed(&indicators, 0.0, 10));
        assert!(!advisor.volume_confirmed(&indicators, 0.0, 55));
        assert!(advisor.volume_confirmed(&indicators, 1500.0, 55));
    }

    #[test]
    fn test_sell_levels() {
        let bars = test_util::falling_with_shooting_star(2000.0);
        let config = AdvisorConfig {
            sl_atr_mult: Multiplier::new(2.0).unwrap(),
            reward_risk_ratio: Multiplier::new(2.0).unwrap(),
            ..AdvisorConfig::default()
        };
        let rec = advise(&bars, &config).unwrap();
        assert_eq!(rec.action, Action::Sell);
        assert_eq!(rec.trend, Trend::Down);

        let atr = compute_indicators(&bars, true).atr_at(249).unwrap();
        let levels = rec.levels.unwrap();
        assert_approx!(levels.stop_loss, 175.4 + 2.0 * atr);
        assert_approx!(levels.take_profit, 175.4 - 2.0 * (levels.stop_loss - 175.4));
    }

    #[test]
    fn test_plain_downtrend_reduces() {
        let rec = advise(&test_util::falling(250), &AdvisorConfig::default()).unwrap();
        assert_eq!(rec.action, Action::ReduceOrExit);
        assert_eq!(rec.reason, REASON_REDUCE);
        assert!(rec.levels.is_none());
    }

    #[test]
    fn test_counter_trend_pattern_ignored() {
        let mut bars = test_util::falling(249);
        // bullish engulfing of bar 248 (176.2 -> 175.8)
        bars.push(test_util::bar(249, 175.7, 176.4, 175.6, 176.3, 5000.0));
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert_eq!(rec.trend, Trend::Down);
        assert_eq!(rec.action, Action::ReduceOrExit);
    }

    #[test]
    fn test_malformed_bar_is_an_error() {
        let mut bars = test_util::rising(250);
        bars[100].low = bars[100].high + 1.0;
        let err = advise(&bars, &AdvisorConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AdvisorError::Validation(ValidationError::InconsistentRange { index: 100 })
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AdvisorConfig {
            sl_atr_mult: Multiplier::new_const(-1.0),
            ..AdvisorConfig::default()
        };
        assert!(Advisor::new(config).is_err());

        // wide stops are unusual but legal
        let config = AdvisorConfig {
            sl_atr_mult: Multiplier::new(100.0).unwrap(),
            ..AdvisorConfig::default()
        };
        assert!(Advisor::new(config).is_ok());
    }

    #[test]
    fn test_short_min_history_cannot_force_a_signal() {
        let config = AdvisorConfig {
            min_history: Period::new_const(50),
            ..AdvisorConfig::default()
        };
        assert!(matches!(Advisor::new(config.clone()), Err(AdvisorError::InvalidConfig(_))));

        let mut bars = test_util::rising(58);
        bars.push(test_util::bar(58, 129.3, 129.6, 128.6, 128.9, 1000.0));
        bars.push(test_util::bar(59, 128.8, 130.0, 128.7, 129.8, 3000.0));
        assert!(advise(&bars, &config).is_err());

        // the default advisor waits on the same 60 bars
        let rec = advise(&bars, &AdvisorConfig::default()).unwrap();
        assert!(rec.is_insufficient_data());
        assert!(rec.levels.is_none());
    }

    #[test]
    fn test_risk_levels_symmetry() {
        let long = RiskLevels::long(100.0, 2.0, 1.5, 3.0);
        assert_eq!(long.stop_loss, 97.0);
        assert_eq!(long.take_profit, 109.0);
        assert_eq!(long.risk(), 3.0);

        let short = RiskLevels::short(100.0, 2.0, 1.5, 3.0);
        assert_eq!(short.stop_loss, 103.0);
        assert_eq!(short.take_profit, 91.0);
        assert_eq!(short.risk(), 3.0);
    }

    #[test]
    fn test_action_codes() {
        assert_eq!(Action::ReduceOrExit.to_string(), "reduce_or_exit");
        assert_eq!(
            serde_json::to_string(&Action::WaitPullback).unwrap(),
            "\"wait_pullback\""
        );
        assert!(Action::Buy.is_entry());
        assert!(!Action::Wait.is_entry());
    }

    #[test]
    fn test_recommendation_json_omits_levels() {
        let rec = advise(&test_util::rising(20), &AdvisorConfig::default()).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["action"], "wait");
        assert_eq!(json["trend"], "none");
        assert!(json.get("levels").is_none());
    }
}
