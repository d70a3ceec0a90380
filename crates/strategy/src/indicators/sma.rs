/// Simple rolling mean over `window` values.
///
/// Output has the same length as the input; index `i` is `None` until
/// `window` values ending at `i` are available. A zero window yields all `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for (i, slice) in values.windows(window).enumerate() {
        out[i + window - 1] = Some(slice.iter().sum::<f64>() / window as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_before_window_filled() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn short_input_is_all_none() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 3), vec![None, None]);
        assert!(rolling_mean(&[], 3).is_empty());
    }

    #[test]
    fn zero_window_is_all_none() {
        assert_eq!(rolling_mean(&[1.0], 0), vec![None]);
    }
}
