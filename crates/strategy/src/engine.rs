use common::{Candle, IndicatorSet};

use crate::indicators::{directional, ema_series, rolling_mean};
use crate::StrategyParams;

/// Computes the indicator set the signal rule needs from a candle sequence.
///
/// Pure: the result for a candle depends only on that candle and the ones
/// before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorEngine {
    ema_period: usize,
    adx_period: usize,
    volume_window: usize,
}

impl IndicatorEngine {
    pub fn new(ema_period: usize, adx_period: usize, volume_window: usize) -> Self {
        assert!(
            ema_period >= 1 && adx_period >= 1 && volume_window >= 1,
            "indicator periods must be >= 1"
        );
        Self {
            ema_period,
            adx_period,
            volume_window,
        }
    }

    pub fn from_params(params: &StrategyParams) -> Self {
        Self::new(params.ema_period, params.adx_period, params.volume_window)
    }

    /// Number of candles after which every field of [`IndicatorSet`] is defined.
    /// ADX averages DX, which itself needs `adx_period` bars, hence `2p - 1`.
    pub fn required_candles(&self) -> usize {
        self.ema_period
            .max(2 * self.adx_period - 1)
            .max(self.volume_window)
    }

    /// Indicators for the final candle. All fields are `None` when fewer
    /// than [`required_candles`](Self::required_candles) candles are given.
    pub fn latest(&self, candles: &[Candle]) -> IndicatorSet {
        if candles.len() < self.required_candles() {
            return IndicatorSet::default();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let ema_trend = ema_series(&closes, self.ema_period).last().copied();
        let dir = directional(candles, self.adx_period);
        let volume_ma = rolling_mean(&volumes, self.volume_window)
            .last()
            .copied()
            .flatten();

        IndicatorSet {
            ema_trend,
            adx: dir.adx.last().copied().flatten(),
            plus_di: dir.plus_di.last().copied().flatten(),
            minus_di: dir.minus_di.last().copied().flatten(),
            volume_ma,
        }
    }

    /// One indicator set per candle, each computed from the prefix ending there.
    pub fn series(&self, candles: &[Candle]) -> Vec<IndicatorSet> {
        (1..=candles.len())
            .map(|end| self.latest(&candles[..end]))
            .collect()
    }
}
