use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use common::{
    Candle, CandleInterval, CandleSource, Config, Error, IndicatorSet, Result, SignalResult,
};
use strategy::{IndicatorEngine, SignalEvaluator, StrategyParams};

/// Where and how much market data to fetch.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub instrument: String,
    pub interval: CandleInterval,
    pub lookback: chrono::Duration,
    pub fetch_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            instrument: cfg.instrument.clone(),
            interval: cfg.candle_interval,
            lookback: cfg.lookback(),
            fetch_timeout: cfg.fetch_timeout,
        }
    }
}

/// Calendar time per required bar; sessions, nights and weekends yield no bars.
const CALENDAR_SLACK: i32 = 3;

/// Result of one read-only pass over fresh candles.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub candle: Candle,
    pub indicators: IndicatorSet,
    pub signal: SignalResult,
}

/// fetch → validate → indicators → signal. Shared by the evaluation loop
/// and on-demand queries; never touches the position.
pub struct Pipeline {
    source: Arc<dyn CandleSource>,
    settings: PipelineSettings,
    indicators: IndicatorEngine,
    evaluator: SignalEvaluator,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn CandleSource>,
        settings: PipelineSettings,
        params: &StrategyParams,
    ) -> Self {
        Self {
            source,
            settings,
            indicators: IndicatorEngine::from_params(params),
            evaluator: SignalEvaluator::new(params.adx_threshold),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.settings.instrument
    }

    /// How far back to fetch: the configured lookback, widened so that the
    /// indicators can be defined at the configured interval. A weekend is
    /// added on top so a Monday tick still sees enough bars.
    pub fn fetch_window(&self) -> chrono::Duration {
        let bars = i32::try_from(self.indicators.required_candles()).unwrap_or(i32::MAX);
        let needed = self.settings.interval.duration() * bars.saturating_mul(CALENDAR_SLACK)
            + chrono::Duration::days(3);
        self.settings.lookback.max(needed)
    }

    /// Fetch the window ending now, bounded by the fetch timeout.
    pub async fn fetch(&self) -> Result<Vec<Candle>> {
        let to = Utc::now();
        let from = to - self.fetch_window();
        let fetch = self
            .source
            .fetch(&self.settings.instrument, from, to, self.settings.interval);

        let candles = tokio::time::timeout(self.settings.fetch_timeout, fetch)
            .await
            .map_err(|_| {
                Error::DataUnavailable(format!(
                    "candle fetch timed out after {:?}",
                    self.settings.fetch_timeout
                ))
            })??;

        debug!(instrument = %self.settings.instrument, count = candles.len(), "Candles fetched");
        Ok(candles)
    }

    /// Evaluate an already fetched candle sequence.
    pub fn evaluate_candles(&self, candles: &[Candle]) -> Result<Evaluation> {
        validate(candles)?;

        let required = self.indicators.required_candles();
        if candles.len() < required {
            return Err(Error::DataUnavailable(format!(
                "insufficient history: {} candles, need {required}",
                candles.len()
            )));
        }

        let candle = candles[candles.len() - 1];
        let indicators = self.indicators.latest(candles);
        let signal = self.evaluator.evaluate(&candle, &indicators);
        Ok(Evaluation {
            candle,
            indicators,
            signal,
        })
    }

    pub async fn evaluate(&self) -> Result<Evaluation> {
        let candles = self.fetch().await?;
        self.evaluate_candles(&candles)
    }
}

/// Reject empty, non-finite or out-of-order candle sequences.
fn validate(candles: &[Candle]) -> Result<()> {
    if candles.is_empty() {
        return Err(Error::DataUnavailable("no candles returned".into()));
    }
    if let Some(bad) = candles.iter().find(|c| !c.is_finite()) {
        return Err(Error::DataUnavailable(format!(
            "malformed candle at {}",
            bad.timestamp
        )));
    }
    if let Some(pair) = candles.windows(2).find(|w| w[0].timestamp >= w[1].timestamp) {
        return Err(Error::DataUnavailable(format!(
            "candles out of order at {}",
            pair[1].timestamp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};

    struct FixedSource(Vec<Candle>);

    #[async_trait]
    impl CandleSource for FixedSource {
        async fn fetch(
            &self,
            _instrument: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _interval: CandleInterval,
        ) -> Result<Vec<Candle>> {
            Ok(self.0.clone())
        }
    }

    struct SlowSource;

    #[async_trait]
    impl CandleSource for SlowSource {
        async fn fetch(
            &self,
            _instrument: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _interval: CandleInterval,
        ) -> Result<Vec<Candle>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    /// One bar per interval step in `[from, to)`, the way an always-open
    /// market would answer.
    struct SteppedSource;

    #[async_trait]
    impl CandleSource for SteppedSource {
        async fn fetch(
            &self,
            _instrument: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
            interval: CandleInterval,
        ) -> Result<Vec<Candle>> {
            let mut candles = Vec::new();
            let mut ts = from;
            while ts < to {
                let close = 100.0 + candles.len() as f64 * 0.1;
                candles.push(Candle {
                    timestamp: ts,
                    open: close,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1000.0,
                });
                ts += interval.duration();
            }
            Ok(candles)
        }
    }

    fn params() -> StrategyParams {
        StrategyParams {
            ema_period: 5,
            adx_period: 3,
            volume_window: 4,
            ..StrategyParams::default()
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            instrument: "TEST".into(),
            interval: CandleInterval::Hour,
            lookback: chrono::Duration::hours(200),
            fetch_timeout: Duration::from_millis(50),
        }
    }

    fn bars(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn evaluates_last_candle() {
        let pipeline = Pipeline::new(Arc::new(FixedSource(bars(10))), settings(), &params());
        let eval = pipeline.evaluate().await.unwrap();
        assert_eq!(eval.candle.close, 109.0);
        assert!(eval.indicators.is_defined());
    }

    #[tokio::test]
    async fn short_history_is_data_unavailable() {
        let pipeline = Pipeline::new(Arc::new(FixedSource(bars(4))), settings(), &params());
        let err = pipeline.evaluate().await.unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(msg) if msg.contains("insufficient")));
    }

    #[tokio::test]
    async fn empty_and_malformed_are_rejected() {
        let pipeline = Pipeline::new(Arc::new(FixedSource(Vec::new())), settings(), &params());
        assert!(matches!(pipeline.evaluate().await, Err(Error::DataUnavailable(_))));

        let mut bad = bars(10);
        bad[3].high = f64::INFINITY;
        assert!(matches!(pipeline.evaluate_candles(&bad), Err(Error::DataUnavailable(_))));

        let mut unordered = bars(10);
        unordered.swap(2, 3);
        assert!(matches!(pipeline.evaluate_candles(&unordered), Err(Error::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn daily_interval_fetches_enough_history() {
        let settings = PipelineSettings {
            interval: CandleInterval::Day,
            ..settings()
        };
        let pipeline =
            Pipeline::new(Arc::new(SteppedSource), settings, &StrategyParams::default());
        assert!(pipeline.fetch_window() > chrono::Duration::days(100));

        let eval = pipeline.evaluate().await.unwrap();
        assert!(eval.indicators.is_defined());
    }

    #[tokio::test]
    async fn hourly_default_lookback_is_widened_to_required_history() {
        let pipeline =
            Pipeline::new(Arc::new(SteppedSource), settings(), &StrategyParams::default());
        assert!(pipeline.fetch_window() > chrono::Duration::hours(200));
        assert!(pipeline.evaluate().await.is_ok());
    }

    #[test]
    fn longer_configured_lookback_is_kept() {
        let settings = PipelineSettings {
            lookback: chrono::Duration::days(365),
            ..settings()
        };
        let pipeline = Pipeline::new(Arc::new(SteppedSource), settings, &params());
        assert_eq!(pipeline.fetch_window(), chrono::Duration::days(365));
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let pipeline = Pipeline::new(Arc::new(SlowSource), settings(), &params());
        let err = pipeline.evaluate().await.unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(msg) if msg.contains("timed out")));
    }
}
