//! Daily advisor job
//!
//! Wires the advisor to its collaborators: a source of daily bars, a store
//! remembering which candles were already announced, and a notifier. Only the
//! traits live here; HTTP clients, databases and chat delivery are supplied by
//! the caller.
//!
//! Per symbol: fetch, keep the most recent `lookback` bars, skip short
//! histories, skip candles already sent, advise, deliver, mark sent.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::{
    advisor::{Advisor, Recommendation},
    AdvisorError, PriceSeries,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies closed daily candles, UTC-normalised
pub trait BarSource {
    fn daily_bars(&self, symbol: &str) -> std::result::Result<PriceSeries, BoxError>;
}

/// Remembers which (symbol, candle day) pairs were delivered
pub trait SeenStore {
    fn already_sent(&self, symbol: &str, day: NaiveDate) -> std::result::Result<bool, BoxError>;
    fn mark_sent(&self, symbol: &str, day: NaiveDate) -> std::result::Result<(), BoxError>;
}

/// Renders and delivers advice
pub trait Notifier {
    fn deliver(&self, advice: &Advice) -> std::result::Result<(), BoxError>;

    /// Tell the same audience that a symbol could not be processed
    fn alert(&self, error: &JobError) -> std::result::Result<(), BoxError>;
}

/// A recommendation addressed to one instrument and candle
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Advice {
    pub symbol: String,
    pub timeframe: String,
    pub candle_time: DateTime<Utc>,
    pub recommendation: Recommendation,
}

impl Advice {
    #[inline]
    pub fn candle_day(&self) -> NaiveDate {
        self.candle_time.date_naive()
    }
}

/// What happened to one symbol
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Delivered(Advice),
    /// Advice was produced but the notifier failed; the day stays unmarked
    DeliveryFailed { advice: Advice, error: String },
    AlreadySent { symbol: String, day: NaiveDate },
    InsufficientHistory { symbol: String, bars: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{symbol}: failed to fetch bars: {source}")]
    Fetch { symbol: String, source: BoxError },

    #[error("{symbol}: {source}")]
    Advice {
        symbol: String,
        source: AdvisorError,
    },

    #[error("{symbol}: seen-state store failed: {source}")]
    SeenState { symbol: String, source: BoxError },
}

impl JobError {
    pub fn symbol(&self) -> &str {
        match self {
            JobError::Fetch { symbol, .. }
            | JobError::Advice { symbol, .. }
            | JobError::SeenState { symbol, .. } => symbol,
        }
    }
}

/// Daily advice run over a fixed symbol list
pub struct DailyJob<B, S, N> {
    advisor: Advisor,
    source: B,
    seen: S,
    notifier: N,
    symbols: Vec<String>,
    timeframe: String,
    min_bars: usize,
    lookback: usize,
}

impl<B: BarSource, S: SeenStore, N: Notifier> DailyJob<B, S, N> {
    pub fn new(advisor: Advisor, source: B, seen: S, notifier: N) -> Self {
        Self {
            advisor,
            source,
            seen,
            notifier,
            symbols: Vec::new(),
            timeframe: "1D".to_string(),
            min_bars: 220,
            lookback: 320,
        }
    }

    pub fn symbols(mut self, symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Label passed along with each advice, e.g. "1D"
    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    /// Symbols with fewer bars are skipped before advising
    pub fn min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    /// Only the most recent `lookback` bars are handed to the advisor
    pub fn lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn seen_store(&self) -> &S {
        &self.seen
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run one symbol through fetch, de-dup, advise and deliver.
    pub fn run_symbol(&self, symbol: &str) -> std::result::Result<JobOutcome, JobError> {
        let series = self
            .source
            .daily_bars(symbol)
            .map_err(|source| JobError::Fetch {
                symbol: symbol.to_string(),
                source,
            })?
            .tail(self.lookback);

        let Some(last) = series.last().filter(|_| series.len() >= self.min_bars) else {
            info!(symbol, bars = series.len(), min_bars = self.min_bars, "not enough history, skipping");
            return Ok(JobOutcome::InsufficientHistory {
                symbol: symbol.to_string(),
                bars: series.len(),
            });
        };
        let candle_time = last.timestamp;
        let day = candle_time.date_naive();

        let seen_err = |source| JobError::SeenState {
            symbol: symbol.to_string(),
            source,
        };
        if self.seen.already_sent(symbol, day).map_err(seen_err)? {
            return Ok(JobOutcome::AlreadySent {
                symbol: symbol.to_string(),
                day,
            });
        }

        let recommendation =
            self.advisor
                .advise(series.bars())
                .map_err(|source| JobError::Advice {
                    symbol: symbol.to_string(),
                    source,
                })?;
        let advice = Advice {
            symbol: symbol.to_string(),
            timeframe: self.timeframe.clone(),
            candle_time,
            recommendation,
        };

        if let Err(e) = self.notifier.deliver(&advice) {
            warn!(symbol, %day, error = %e, "advice delivery failed");
            return Ok(JobOutcome::DeliveryFailed {
                advice,
                error: e.to_string(),
            });
        }

        self.seen.mark_sent(symbol, day).map_err(seen_err)?;
        info!(
            symbol,
            %day,
            action = %advice.recommendation.action,
            "advice delivered"
        );
        Ok(JobOutcome::Delivered(advice))
    }

    /// Run every symbol. A failing symbol is alerted through the notifier
    /// and never stops the others.
    pub fn run(&self) -> Vec<std::result::Result<JobOutcome, JobError>> {
        self.symbols
            .iter()
            .map(|symbol| {
                let outcome = self.run_symbol(symbol);
                if let Err(e) = &outcome {
                    error!(symbol = %symbol, error = %e, "advisor job failed");
                    if let Err(alert_err) = self.notifier.alert(e) {
                        warn!(symbol = %symbol, error = %alert_err, "error alert not delivered");
                    }
                }
                outcome
            })
            .collect()
    }
}
