use common::{Candle, IndicatorSet, Signal, SignalResult};

/// Combines the latest candle and its indicators into a trade decision.
///
/// BUY requires all of:
/// - ADX strictly above the threshold
/// - volume above its moving average
/// - +DI strictly positive
/// - close above the trend EMA
///
/// Undefined indicators fail their condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvaluator {
    pub adx_threshold: f64,
}

impl SignalEvaluator {
    pub fn new(adx_threshold: f64) -> Self {
        Self { adx_threshold }
    }

    pub fn evaluate(&self, candle: &Candle, indicators: &IndicatorSet) -> SignalResult {
        let adx_condition = indicators.adx.is_some_and(|adx| adx > self.adx_threshold);
        let volume_condition = indicators.volume_ma.is_some_and(|ma| candle.volume > ma);
        // One-sided on purpose: -DI is reported but never compared.
        let directional_condition = indicators.plus_di.is_some_and(|di| di > 0.0);
        let trend_condition = indicators.ema_trend.is_some_and(|ema| candle.close > ema);

        let all = adx_condition && volume_condition && directional_condition && trend_condition;
        let signal = if all { Signal::Buy } else { Signal::None };

        SignalResult {
            adx_condition,
            volume_condition,
            directional_condition,
            trend_condition,
            signal,
        }
    }
}
