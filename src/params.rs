//! Advisor configuration and parameter metadata
//!
//! This module provides the validated [`AdvisorConfig`] plus metadata about each
//! tunable parameter, enabling:
//! - Loading from a parameter map or a TOML document
//! - Validation of each value and of the settings against each other
//! - Grid search over the risk and trend settings
//!
//! # Example
//!
//! ```rust
//! use candle_advisor::params::{AdvisorConfig, ADVISOR_PARAMS};
//!
//! let config = AdvisorConfig::from_toml_str("sl_atr_mult = 2.0\n[indicators]\natr = 10\n").unwrap();
//! assert_eq!(config.sl_atr_mult.get(), 2.0);
//! assert_eq!(config.indicators.atr.get(), 10);
//!
//! for param in ADVISOR_PARAMS {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{
  detectors::ReversalDetector, indicators::IndicatorParams, AdvisorError, Multiplier, Period,
  Ratio, Result,
};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction of a bar's range (0.0..=1.0)
  Ratio,
  /// Window length in bars (positive integer)
  Period,
  /// Positive scale factor
  Multiplier,
}

/// Metadata for a single advisor parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "sl_atr_mult")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step). Not a validity bound.
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn multiplier(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Multiplier, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value against its parameter type
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(AdvisorError::InvalidConfig(format!("{} must be finite, got {value}", self.name)));
    }
    match self.param_type {
      ParamType::Ratio if !(0.0..=1.0).contains(&value) => {
        Err(AdvisorError::OutOfRange { field: self.name, value, min: 0.0, max: 1.0 })
      }
      ParamType::Period if value < 1.0 || value.fract() != 0.0 => Err(AdvisorError::InvalidConfig(
        format!("{} must be a positive integer, got {value}", self.name),
      )),
      ParamType::Multiplier if value <= 0.0 => {
        Err(AdvisorError::InvalidConfig(format!("{} must be positive, got {value}", self.name)))
      }
      _ => Ok(()),
    }
  }
}

/// Every tunable numeric parameter of [`AdvisorConfig`]
pub static ADVISOR_PARAMS: &[ParamMeta] = &[
  ParamMeta::multiplier("vol_mult", 1.2, (1.0, 3.0, 0.1), "Volume must exceed this multiple of its average"),
  ParamMeta::multiplier("sl_atr_mult", 1.5, (0.5, 4.0, 0.25), "Stop-loss distance in ATR units"),
  ParamMeta::multiplier("reward_risk_ratio", 3.0, (1.0, 6.0, 0.5), "Take-profit distance as a multiple of risk"),
  ParamMeta::period("min_history", 210.0, (50.0, 500.0, 10.0), "Bars required before any signal"),
  ParamMeta::period("ema_fast", 20.0, (5.0, 50.0, 5.0), "Fast EMA span"),
  ParamMeta::period("ema_mid", 50.0, (20.0, 100.0, 10.0), "Mid EMA span"),
  ParamMeta::period("ema_slow", 200.0, (100.0, 300.0, 50.0), "Slow EMA span"),
  ParamMeta::period("atr", 14.0, (5.0, 30.0, 1.0), "ATR window"),
  ParamMeta::period("slope_lookback", 5.0, (1.0, 20.0, 1.0), "Bars back for EMA slope"),
  ParamMeta::period("volume_ma", 20.0, (5.0, 50.0, 5.0), "Volume average window"),
  ParamMeta::ratio("tail_ratio", 0.6, (0.5, 0.9, 0.05), "Minimum hammer / shooting star wick as share of range"),
  ParamMeta::ratio("max_body_ratio", 0.4, (0.1, 0.5, 0.05), "Maximum hammer / shooting star body as share of range"),
];

// ============================================================
// ADVISOR CONFIG
// ============================================================

/// Settings for [`crate::advisor::Advisor`]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvisorConfig {
  /// Require the latest bar's volume to confirm an entry
  pub use_volume: bool,
  pub vol_mult: Multiplier,
  pub sl_atr_mult: Multiplier,
  pub reward_risk_ratio: Multiplier,
  /// Shorter series always produce `wait`
  pub min_history: Period,
  pub indicators: IndicatorParams,
  pub patterns: ReversalDetector,
}

impl Default for AdvisorConfig {
  fn default() -> Self {
    Self {
      use_volume: true,
      vol_mult: Multiplier::new_const(1.2),
      sl_atr_mult: Multiplier::new_const(1.5),
      reward_risk_ratio: Multiplier::new_const(3.0),
      min_history: Period::new_const(210),
      indicators: IndicatorParams::default(),
      patterns: ReversalDetector::default(),
    }
  }
}

impl AdvisorConfig {
  /// Build from a parameter map. Missing parameters use their defaults,
  /// unknown names are rejected.
  pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    if let Some(unknown) = params.keys().find(|k| !ADVISOR_PARAMS.iter().any(|m| m.name == **k)) {
      return Err(AdvisorError::InvalidConfig(format!("unknown parameter `{unknown}`")));
    }

    for (name, value) in params {
      if let Some(meta) = param_meta(name) {
        meta.validate(*value)?;
      }
    }

    let d = Self::default();
    let hammer = ReversalDetector::default().hammer;
    let tail_ratio = get_ratio(params, "tail_ratio", hammer.tail_ratio.get())?;
    let max_body_ratio = get_ratio(params, "max_body_ratio", hammer.max_body_ratio.get())?;

    let mut config = Self {
      use_volume: d.use_volume,
      vol_mult: get_multiplier(params, "vol_mult", d.vol_mult.get())?,
      sl_atr_mult: get_multiplier(params, "sl_atr_mult", d.sl_atr_mult.get())?,
      reward_risk_ratio: get_multiplier(params, "reward_risk_ratio", d.reward_risk_ratio.get())?,
      min_history: get_period(params, "min_history", d.min_history.get())?,
      indicators: IndicatorParams {
        ema_fast: get_period(params, "ema_fast", d.indicators.ema_fast.get())?,
        ema_mid: get_period(params, "ema_mid", d.indicators.ema_mid.get())?,
        ema_slow: get_period(params, "ema_slow", d.indicators.ema_slow.get())?,
        atr: get_period(params, "atr", d.indicators.atr.get())?,
        slope_lookback: get_period(params, "slope_lookback", d.indicators.slope_lookback.get())?,
        volume_ma: get_period(params, "volume_ma", d.indicators.volume_ma.get())?,
      },
      patterns: ReversalDetector::default(),
    };
    config.patterns.hammer.tail_ratio = tail_ratio;
    config.patterns.hammer.max_body_ratio = max_body_ratio;
    config.patterns.shooting_star.tail_ratio = tail_ratio;
    config.patterns.shooting_star.max_body_ratio = max_body_ratio;

    config.validate()?;
    Ok(config)
  }

  /// Parse a TOML document. Absent keys keep their defaults.
  pub fn from_toml_str(s: &str) -> Result<Self> {
    let config: Self = toml::from_str(s).map_err(|e| AdvisorError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Current value of a named parameter, as listed in [`ADVISOR_PARAMS`].
  ///
  /// `tail_ratio` and `max_body_ratio` report the hammer detector's setting.
  pub fn value_of(&self, name: &str) -> Option<f64> {
    let ind = &self.indicators;
    let value = match name {
      "vol_mult" => self.vol_mult.get(),
      "sl_atr_mult" => self.sl_atr_mult.get(),
      "reward_risk_ratio" => self.reward_risk_ratio.get(),
      "min_history" => self.min_history.get() as f64,
      "ema_fast" => ind.ema_fast.get() as f64,
      "ema_mid" => ind.ema_mid.get() as f64,
      "ema_slow" => ind.ema_slow.get() as f64,
      "atr" => ind.atr.get() as f64,
      "slope_lookback" => ind.slope_lookback.get() as f64,
      "volume_ma" => ind.volume_ma.get() as f64,
      "tail_ratio" => self.patterns.hammer.tail_ratio.get(),
      "max_body_ratio" => self.patterns.hammer.max_body_ratio.get(),
      _ => return None,
    };
    Some(value)
  }

  /// Check every parameter value, the EMA ordering, and that `min_history`
  /// covers the indicator warm-up.
  pub fn validate(&self) -> Result<()> {
    for meta in ADVISOR_PARAMS {
      if let Some(value) = self.value_of(meta.name) {
        meta.validate(value)?;
      }
    }
    let star = &self.patterns.shooting_star;
    param_meta("tail_ratio").map_or(Ok(()), |m| m.validate(star.tail_ratio.get()))?;
    param_meta("max_body_ratio").map_or(Ok(()), |m| m.validate(star.max_body_ratio.get()))?;

    let ind = &self.indicators;
    if !(ind.ema_fast < ind.ema_mid && ind.ema_mid < ind.ema_slow) {
      return Err(AdvisorError::InvalidConfig(format!(
        "EMA spans must increase: fast {} < mid {} < slow {}",
        ind.ema_fast.get(),
        ind.ema_mid.get(),
        ind.ema_slow.get()
      )));
    }
    let warm_up = ind.warm_up();
    if self.min_history.get() < warm_up {
      return Err(AdvisorError::InvalidConfig(format!(
        "min_history {} is shorter than the indicator warm-up of {warm_up} bars",
        self.min_history.get()
      )));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Look up metadata by parameter name
pub fn param_meta(name: &str) -> Option<&'static ParamMeta> {
  ADVISOR_PARAMS.iter().find(|m| m.name == name)
}

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value.fract() != 0.0 || value < 0.0 {
    return Err(AdvisorError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a Multiplier from params with default fallback
pub fn get_multiplier(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Multiplier> {
  let value = params.get(key).copied().unwrap_or(default);
  Multiplier::new(value)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    assert!(AdvisorConfig::default().validate().is_ok());
  }

  #[test]
  fn test_defaults_match_meta() {
    let config = AdvisorConfig::default();
    for meta in ADVISOR_PARAMS {
      assert_eq!(config.value_of(meta.name), Some(meta.default), "{}", meta.name);
    }
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < f64::EPSILON);
    assert!((grid[1] - 0.5).abs() < f64::EPSILON);
    assert!((grid[2] - 0.7).abs() < f64::EPSILON);
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 14.0, (10.0, 20.0, 2.0), "Test");

    assert!(meta.validate(14.0).is_ok());
    assert!(meta.validate(1.0).is_ok());
    // outside the grid is still a valid period
    assert!(meta.validate(600.0).is_ok());
    assert!(meta.validate(12.5).is_err());
    assert!(meta.validate(0.0).is_err());
    assert!(meta.validate(-3.0).is_err());
  }

  #[test]
  fn test_validate_by_type() {
    let ratio = param_meta("tail_ratio").unwrap();
    assert!(ratio.validate(0.95).is_ok());
    assert!(matches!(ratio.validate(1.5), Err(AdvisorError::OutOfRange { field: "tail_ratio", .. })));

    let mult = param_meta("vol_mult").unwrap();
    assert!(mult.validate(0.8).is_ok());
    assert!(mult.validate(25.0).is_ok());
    assert!(mult.validate(0.0).is_err());
    assert!(mult.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_with_params() {
    let mut params = HashMap::new();
    params.insert("sl_atr_mult", 2.0);
    params.insert("reward_risk_ratio", 2.5);
    params.insert("atr", 10.0);
    params.insert("tail_ratio", 0.7);

    let config = AdvisorConfig::with_params(&params).unwrap();
    assert_eq!(config.sl_atr_mult.get(), 2.0);
    assert_eq!(config.reward_risk_ratio.get(), 2.5);
    assert_eq!(config.indicators.atr.get(), 10);
    assert_eq!(config.patterns.hammer.tail_ratio.get(), 0.7);
    assert_eq!(config.patterns.shooting_star.tail_ratio.get(), 0.7);
    assert_eq!(config.vol_mult.get(), 1.2);
  }

  #[test]
  fn test_with_params_rejects_unknown() {
    let mut params = HashMap::new();
    params.insert("rr", 3.0);
    assert!(matches!(
      AdvisorConfig::with_params(&params),
      Err(AdvisorError::InvalidConfig(_))
    ));
  }

  #[test]
  fn test_with_params_rejects_non_positive() {
    let mut params = HashMap::new();
    params.insert("sl_atr_mult", 0.0);
    let err = AdvisorConfig::with_params(&params).unwrap_err();
    assert!(err.to_string().contains("sl_atr_mult"), "{err}");

    params.insert("sl_atr_mult", -1.5);
    assert!(AdvisorConfig::with_params(&params).is_err());
  }

  #[test]
  fn test_values_outside_grid_accepted() {
    let config = AdvisorConfig::from_toml_str(
      "reward_risk_ratio = 8.0\nvol_mult = 0.8\nsl_atr_mult = 0.25\nmin_history = 600\n",
    )
    .unwrap();
    assert_eq!(config.reward_risk_ratio.get(), 8.0);
    assert_eq!(config.vol_mult.get(), 0.8);
    assert_eq!(config.sl_atr_mult.get(), 0.25);
    assert_eq!(config.min_history.get(), 600);

    let mut params = HashMap::new();
    params.insert("reward_risk_ratio", 8.0);
    params.insert("sl_atr_mult", 0.25);
    assert!(AdvisorConfig::with_params(&params).is_ok());
  }

  #[test]
  fn test_min_history_must_cover_warm_up() {
    assert!(matches!(
      AdvisorConfig::from_toml_str("min_history = 50"),
      Err(AdvisorError::InvalidConfig(_))
    ));
    // slow EMA longer than the default history
    assert!(matches!(
      AdvisorConfig::from_toml_str("[indicators]\nema_slow = 300\n"),
      Err(AdvisorError::InvalidConfig(_))
    ));
    assert!(AdvisorConfig::from_toml_str("min_history = 305\n[indicators]\nema_slow = 300\n").is_ok());

    let mut params = HashMap::new();
    params.insert("min_history", 204.0);
    assert!(AdvisorConfig::with_params(&params).is_err());
    params.insert("min_history", 205.0);
    assert!(AdvisorConfig::with_params(&params).is_ok());
  }

  #[test]
  fn test_with_params_rejects_fractional_period() {
    let mut params = HashMap::new();
    params.insert("atr", 14.5);
    assert!(AdvisorConfig::with_params(&params).is_err());
  }

  #[test]
  fn test_ema_ordering_enforced() {
    let mut params = HashMap::new();
    params.insert("ema_fast", 50.0);
    params.insert("ema_mid", 40.0);
    assert!(matches!(
      AdvisorConfig::with_params(&params),
      Err(AdvisorError::InvalidConfig(_))
    ));
  }

  #[test]
  fn test_from_toml() {
    let toml = r#"
      use_volume = false
      vol_mult = 1.5
      reward_risk_ratio = 2

      [indicators]
      ema_fast = 10

      [patterns.hammer]
      tail_ratio = 0.65
    "#;
    let config = AdvisorConfig::from_toml_str(toml).unwrap();
    assert!(!config.use_volume);
    assert_eq!(config.vol_mult.get(), 1.5);
    assert_eq!(config.reward_risk_ratio.get(), 2.0);
    assert_eq!(config.indicators.ema_fast.get(), 10);
    assert_eq!(config.indicators.ema_slow.get(), 200);
    assert_eq!(config.patterns.hammer.tail_ratio.get(), 0.65);
    assert_eq!(config.patterns.hammer.max_body_ratio.get(), 0.4);
  }

  #[test]
  fn test_from_toml_rejects_invalid_values() {
    assert!(AdvisorConfig::from_toml_str("sl_atr_mult = -1.0").is_err());
    assert!(AdvisorConfig::from_toml_str("[indicators]\natr = 0").is_err());
    assert!(AdvisorConfig::from_toml_str("stop = 1.0").is_err());
  }
}
