//! Directional movement: +DI, -DI and ADX over simple rolling means.
//!
//! 1. +DM = max(0, high - prev high), -DM = max(0, prev low - low)
//! 2. TR = max(high - low, |high - prev close|, |low - prev close|)
//! 3. ATR, mean(+DM), mean(-DM) over `period`
//! 4. +DI = 100 * mean(+DM) / ATR, -DI likewise (0 when ATR is 0)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI) (0 when both are 0)
//! 6. ADX = mean(DX) over `period`
//!
//! The first bar has no predecessor: it contributes TR = high - low and no
//! directional movement. DI is defined from index `period - 1`, ADX from
//! index `2 * period - 2`.

use common::Candle;

use super::sma::rolling_mean;

/// Per-candle directional values, same length as the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionalSeries {
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
    pub adx: Vec<Option<f64>>,
}

pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    (candle.high - candle.low)
        .max((candle.high - prev_close).abs())
        .max((candle.low - prev_close).abs())
}

pub fn directional(candles: &[Candle], period: usize) -> DirectionalSeries {
    let n = candles.len();
    let mut tr = Vec::with_capacity(n);
    let mut plus_dm = Vec::with_capacity(n);
    let mut minus_dm = Vec::with_capacity(n);

    for (i, c) in candles.iter().enumerate() {
        match i.checked_sub(1).map(|p| &candles[p]) {
            None => {
                tr.push(c.high - c.low);
                plus_dm.push(0.0);
                minus_dm.push(0.0);
            }
            Some(prev) => {
                tr.push(true_range(c, prev.close));
                plus_dm.push((c.high - prev.high).max(0.0));
                minus_dm.push((prev.low - c.low).max(0.0));
            }
        }
    }

    let atr = rolling_mean(&tr, period);
    let plus_di = di(&rolling_mean(&plus_dm, period), &atr);
    let minus_di = di(&rolling_mean(&minus_dm, period), &atr);

    let dx: Vec<Option<f64>> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let (p, m) = ((*p)?, (*m)?);
            let sum = p + m;
            Some(if sum > 0.0 { 100.0 * (p - m).abs() / sum } else { 0.0 })
        })
        .collect();

    // DX is a defined suffix; ADX averages over that suffix only.
    let first = dx.iter().position(Option::is_some).unwrap_or(n);
    let defined: Vec<f64> = dx[first..].iter().flatten().copied().collect();
    let mut adx = vec![None; first];
    adx.extend(rolling_mean(&defined, period));

    DirectionalSeries {
        plus_di,
        minus_di,
        adx,
    }
}

fn di(dm_mean: &[Option<f64>], atr: &[Option<f64>]) -> Vec<Option<f64>> {
    dm_mean
        .iter()
        .zip(atr)
        .map(|(dm, atr)| {
            let (dm, atr) = ((*dm)?, (*atr)?);
            Some(if atr > 0.0 { 100.0 * dm / atr } else { 0.0 })
        })
        .collect()
}
