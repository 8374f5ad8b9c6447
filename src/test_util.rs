// src/test_util.rs

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::PriceBar;

/// Asserts that two `f64` values are approximately equal using a
/// relative epsilon of `4 * f64::EPSILON`.
macro_rules! assert_approx {
    ($actual:expr, $expected:expr) => {{
        let (a, e) = ($actual, $expected);
        assert!(
            (a - e).abs() <= e.abs() * 4.0 * f64::EPSILON,
            "assert_approx failed: actual={a}, expected={e}, diff={}",
            (a - e).abs(),
        );
    }};
}

pub(crate) use assert_approx;

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> PriceBar {
    PriceBar::new(day(i), open, high, low, close, volume)
}

/// Steady climb of 0.5 per bar, small bullish candles
pub fn rising(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + i as f64 * 0.5;
            bar(i, base - 0.2, base + 0.5, base - 0.5, base + 0.2, 1000.0)
        })
        .collect()
}

/// Steady decline of 0.5 per bar, small bearish candles
pub fn falling(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let base = 300.0 - i as f64 * 0.5;
            bar(i, base + 0.2, base + 0.5, base - 0.5, base - 0.2, 1000.0)
        })
        .collect()
}

/// 250 rising bars ending in a bearish candle engulfed by a bullish one
pub fn rising_with_bullish_engulfing(last_volume: f64) -> Vec<PriceBar> {
    let mut bars = rising(248);
    bars.push(bar(248, 224.3, 224.6, 223.6, 223.9, 1000.0));
    bars.push(bar(249, 223.8, 225.0, 223.7, 224.8, last_volume));
    bars
}

/// 250 falling bars ending in a shooting star
pub fn falling_with_shooting_star(last_volume: f64) -> Vec<PriceBar> {
    let mut bars = falling(249);
    bars.push(bar(249, 175.6, 177.0, 175.3, 175.4, last_volume));
    bars
}
