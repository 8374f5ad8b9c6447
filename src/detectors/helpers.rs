//! Thresholds and range-relative comparisons shared by the detectors.

/// Long wick of a hammer / shooting star: wick >= range * TAIL_RATIO
pub const TAIL_RATIO: f64 = 0.6;
/// Small body of a hammer / shooting star: body <= range * MAX_BODY_RATIO
pub const MAX_BODY_RATIO: f64 = 0.4;

/// Small body with a long `tail` wick and a short `opposite` wick.
///
/// All three arguments are fractions of the bar's range. The opposite wick may
/// be at most `1 - tail_ratio`.
#[inline]
pub fn is_long_tail(
    body: f64,
    tail: f64,
    opposite: f64,
    tail_ratio: f64,
    max_body_ratio: f64,
) -> bool {
    tail >= tail_ratio && opposite <= 1.0 - tail_ratio && body <= max_body_ratio
}

/// Current body covers the previous body: `lower <= prev_lower_edge` and
/// `upper >= prev_upper_edge`.
#[inline]
pub fn body_covers(lower: f64, upper: f64, prev_lower_edge: f64, prev_upper_edge: f64) -> bool {
    lower <= prev_lower_edge && upper >= prev_upper_edge
}
