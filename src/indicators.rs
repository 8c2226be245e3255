use crate::klines::Candle;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage, TrueRange};
use ta::{Close, High, Low, Next};

/// Wilder period used for the average true range.
pub const ATR_PERIOD: usize = 14;

impl High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

// A series too short for the period, or carrying a non-finite value, has no indicator value.
fn has_enough_data(series: &[f64], period: usize) -> bool {
    period > 0 && series.len() >= period && series.iter().all(|v| v.is_finite())
}

/// Exponential moving average over the whole series, seeded with the first element.
pub fn ema(series: &[f64], period: usize) -> Option<f64> {
    if !has_enough_data(series, period) {
        return None;
    }

    let mut indicator = ExponentialMovingAverage::new(period).ok()?;
    let mut last = None;
    for &value in series {
        last = Some(indicator.next(value));
    }
    last
}

/// Arithmetic mean of the trailing `period` elements.
pub fn sma(series: &[f64], period: usize) -> Option<f64> {
    if !has_enough_data(series, period) {
        return None;
    }

    let mut indicator = SimpleMovingAverage::new(period).ok()?;
    let mut last = None;
    for &value in &series[series.len() - period..] {
        last = Some(indicator.next(value));
    }
    last
}

/// Wilder smoothing, one value per element from index `period - 1` onward.
///
/// The first output is the mean of the first `period` inputs, every later one is
/// `alpha * x + (1 - alpha) * prev` with `alpha = 1 / period`.
pub fn rma_series(series: &[f64], period: usize) -> Option<Vec<f64>> {
    if !has_enough_data(series, period) {
        return None;
    }

    let alpha = 1.0 / period as f64;
    let (seed, rest) = series.split_at(period);
    let mut current = seed.iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(rest.len() + 1);
    out.push(current);
    for &value in rest {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    Some(out)
}

pub fn rma(series: &[f64], period: usize) -> Option<f64> {
    rma_series(series, period)?.last().copied()
}

/// True range per candle. The first candle has no previous close, so it is just high - low.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut indicator = TrueRange::new();
    candles.iter().map(|candle| indicator.next(candle)).collect()
}

pub fn atr(candles: &[Candle]) -> Option<f64> {
    if !candles.iter().all(Candle::is_finite) {
        return None;
    }
    rma(&true_range(candles), ATR_PERIOD)
}

/// ATR expressed as a percentage of the last close.
pub fn atr_percent(atr: Option<f64>, last_close: Option<f64>) -> Option<f64> {
    match (atr, last_close) {
        (Some(atr), Some(close)) if close != 0.0 => Some(atr / close * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle { high, low, close }
    }

    fn close_enough(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn short_series_is_undefined_for_every_average() {
        let series = [1.0, 2.0, 3.0];
        for period in 4..10 {
            assert_eq!(ema(&series, period), None);
            assert_eq!(sma(&series, period), None);
            assert_eq!(rma(&series, period), None);
        }
        assert_eq!(ema(&[], 1), None);
        assert_eq!(sma(&series, 0), None);
    }

    #[test]
    fn ema_runs_over_the_whole_series() {
        // k = 0.5: 1 -> 1.5 -> 2.25 -> 3.125
        let value = ema(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert!(close_enough(value, 3.125));
    }

    #[test]
    fn ema_of_exact_length_series_is_defined() {
        let value = ema(&[2.0, 4.0], 2).unwrap();
        // k = 2/3
        assert!(close_enough(value, 4.0 * 2.0 / 3.0 + 2.0 / 3.0));
    }

    #[test]
    fn sma_uses_only_the_tail() {
        let value = sma(&[100.0, 1.0, 2.0, 3.0], 3).unwrap();
        assert!(close_enough(value, 2.0));
    }

    #[test]
    fn rma_is_seeded_with_the_mean() {
        let values = rma_series(&[2.0, 4.0, 6.0, 10.0], 3).unwrap();
        assert_eq!(values.len(), 2);
        assert!(close_enough(values[0], 4.0));
        assert!(close_enough(values[1], 10.0 / 3.0 + 4.0 * 2.0 / 3.0));
    }

    #[test]
    fn rma_stays_within_the_range_seen_so_far() {
        let series: Vec<f64> = (0..120)
            .map(|i| 50.0 + ((i * 37) % 23) as f64 - ((i * 11) % 7) as f64 * 1.5)
            .collect();
        let period = 5;
        let smoothed = rma_series(&series, period).unwrap();

        for (offset, value) in smoothed.iter().enumerate() {
            let seen = &series[..period + offset];
            let min = seen.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = seen.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(*value >= min - 1e-9 && *value <= max + 1e-9);
        }
    }

    #[test]
    fn non_finite_input_counts_as_insufficient_data() {
        let series = [1.0, f64::NAN, 3.0, 4.0];
        assert_eq!(ema(&series, 2), None);
        assert_eq!(sma(&series, 2), None);
        assert_eq!(rma(&series, 2), None);

        let mut candles = vec![candle(2.0, 1.0, 1.5); 20];
        candles[3].high = f64::INFINITY;
        assert_eq!(atr(&candles), None);
    }

    #[test]
    fn first_true_range_ignores_previous_close() {
        let candles = [candle(10.0, 7.5, 9.0), candle(9.5, 9.2, 9.3), candle(12.0, 11.0, 11.5)];
        let ranges = true_range(&candles);

        assert_eq!(ranges.len(), candles.len());
        assert_eq!(ranges[0], 10.0 - 7.5);
        // |high - prev close| dominates the narrow second bar
        assert!(close_enough(ranges[1], 0.5));
        // gap up: |high - prev close|
        assert!(close_enough(ranges[2], 12.0 - 9.3));
    }

    #[test]
    fn atr_needs_a_full_period_of_candles() {
        let candles = vec![candle(11.0, 9.0, 10.0); ATR_PERIOD - 1];
        assert_eq!(atr(&candles), None);

        let candles = vec![candle(11.0, 9.0, 10.0); ATR_PERIOD];
        assert!(close_enough(atr(&candles).unwrap(), 2.0));
    }

    #[test]
    fn atr_percent_requires_a_nonzero_close() {
        assert_eq!(atr_percent(Some(2.0), Some(0.0)), None);
        assert_eq!(atr_percent(None, Some(10.0)), None);
        assert_eq!(atr_percent(Some(2.0), None), None);
        assert!(close_enough(atr_percent(Some(2.0), Some(200.0)).unwrap(), 1.0));
    }
}
