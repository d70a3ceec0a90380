/// Exponential moving average with smoothing factor `2 / (period + 1)`,
/// seeded with the first value:
///
/// `ema[0] = x[0]`, `ema[i] = a * x[i] + (1 - a) * ema[i - 1]`.
///
/// Defined for every index; callers decide how much history is enough.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_by_first_value() {
        let out = ema_series(&[10.0, 20.0], 3);
        // alpha = 0.5
        assert_eq!(out, vec![10.0, 15.0]);
    }

    #[test]
    fn constant_series_stays_constant() {
        let out = ema_series(&[42.0; 50], 20);
        assert!(out.iter().all(|v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn lags_behind_rising_prices() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = ema_series(&prices, 10);
        let last = *out.last().unwrap();
        assert!(last < 129.0 && last > 100.0, "unexpected EMA {last}");
    }

    #[test]
    fn empty_input() {
        assert!(ema_series(&[], 5).is_empty());
    }
}
