use crate::indicators::{atr, atr_percent, ema, sma};
use crate::klines::Candle;
use serde::Serialize;

const FAST_EMA: usize = 50;
const SLOW_EMA: usize = 200;
const LONG_SMA: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    StrongUp,
    Up,
    Neutral,
    Down,
    StrongDown,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Undefined => "undefined",
        }
    }
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::StrongUp => "strong_up",
            Rating::Up => "up",
            Rating::Neutral => "neutral",
            Rating::Down => "down",
            Rating::StrongDown => "strong_down",
        }
    }

    /// Ranking weight, higher is better.
    pub fn score(self) -> u8 {
        match self {
            Rating::StrongUp => 4,
            Rating::Up => 3,
            Rating::Neutral => 2,
            Rating::Down => 1,
            Rating::StrongDown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub last_close: Option<f64>,
    pub atr_percent: Option<f64>,
    pub trend: Trend,
}

pub fn classify_trend(
    ema_fast: Option<f64>,
    ema_slow: Option<f64>,
    sma_long: Option<f64>,
    last_close: Option<f64>,
) -> Trend {
    let up_or_down = |up: bool| if up { Trend::Up } else { Trend::Down };

    match (ema_fast, ema_slow, sma_long, last_close) {
        (Some(fast), Some(slow), _, _) => up_or_down(fast > slow),
        (_, _, Some(sma), Some(close)) => up_or_down(close > sma),
        _ => Trend::Undefined,
    }
}

/// Discrete rating from trend and 24h change. An absent change never clears a threshold.
pub fn rate(trend: Trend, pct_24h: Option<f64>) -> Rating {
    let pct = pct_24h.filter(|p| !p.is_nan());
    match (trend, pct) {
        (Trend::Up, Some(p)) if p > 2.0 => Rating::StrongUp,
        (Trend::Up, Some(p)) if p > 1.0 => Rating::Up,
        (Trend::Down, Some(p)) if p < -2.0 => Rating::StrongDown,
        (Trend::Down, Some(p)) if p < -1.0 => Rating::Down,
        _ => Rating::Neutral,
    }
}

pub fn analyze(candles: &[Candle]) -> IndicatorSnapshot {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let last_close = closes.last().copied().filter(|c| c.is_finite());

    let trend = classify_trend(
        ema(&closes, FAST_EMA),
        ema(&closes, SLOW_EMA),
        sma(&closes, LONG_SMA),
        last_close,
    );

    IndicatorSnapshot {
        last_close,
        atr_percent: atr_percent(atr(candles), last_close),
        trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle { high: close + 1.0, low: close - 1.0, close }
            })
            .collect()
    }

    #[test]
    fn rating_follows_thresholds() {
        assert_eq!(rate(Trend::Up, Some(2.5)), Rating::StrongUp);
        assert_eq!(rate(Trend::Up, Some(1.5)), Rating::Up);
        assert_eq!(rate(Trend::Up, Some(0.5)), Rating::Neutral);
        assert_eq!(rate(Trend::Up, Some(2.0)), Rating::Up);
        assert_eq!(rate(Trend::Down, Some(-2.5)), Rating::StrongDown);
        assert_eq!(rate(Trend::Down, Some(-1.5)), Rating::Down);
        assert_eq!(rate(Trend::Down, Some(-1.0)), Rating::Neutral);
        assert_eq!(rate(Trend::Down, Some(5.0)), Rating::Neutral);
    }

    #[test]
    fn undefined_trend_or_change_is_neutral() {
        for pct in [Some(-10.0), Some(0.0), Some(10.0), None] {
            assert_eq!(rate(Trend::Undefined, pct), Rating::Neutral);
        }
        assert_eq!(rate(Trend::Up, None), Rating::Neutral);
        assert_eq!(rate(Trend::Down, None), Rating::Neutral);
        assert_eq!(rate(Trend::Up, Some(f64::NAN)), Rating::Neutral);
    }

    #[test]
    fn ema_crossover_takes_priority() {
        // close below the SMA, but the EMA pair says up
        assert_eq!(classify_trend(Some(2.0), Some(1.0), Some(50.0), Some(10.0)), Trend::Up);
        assert_eq!(classify_trend(Some(1.0), Some(1.0), None, None), Trend::Down);
    }

    #[test]
    fn falls_back_to_price_versus_sma() {
        assert_eq!(classify_trend(Some(2.0), None, Some(10.0), Some(11.0)), Trend::Up);
        assert_eq!(classify_trend(None, None, Some(10.0), Some(10.0)), Trend::Down);
        assert_eq!(classify_trend(None, None, Some(10.0), None), Trend::Undefined);
        assert_eq!(classify_trend(None, None, None, Some(10.0)), Trend::Undefined);
    }

    #[test]
    fn analyze_long_rising_series_trends_up() {
        let snapshot = analyze(&rising(250));
        assert_eq!(snapshot.trend, Trend::Up);
        assert_eq!(snapshot.last_close, Some(349.0));
        // every bar ranges 2.0, so ATR is 2.0
        let atr_pct = snapshot.atr_percent.unwrap();
        assert!((atr_pct - 2.0 / 349.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_short_series_has_no_trend() {
        let snapshot = analyze(&rising(20));
        assert_eq!(snapshot.trend, Trend::Undefined);
        assert!(snapshot.atr_percent.is_some());

        let empty = analyze(&[]);
        assert_eq!(
            empty,
            IndicatorSnapshot { last_close: None, atr_percent: None, trend: Trend::Undefined }
        );
    }

    #[test]
    fn labels_match_serialized_names() {
        for trend in [Trend::Up, Trend::Down, Trend::Undefined] {
            assert_eq!(serde_json::to_value(trend).unwrap(), trend.as_str());
        }
        for rating in [Rating::StrongUp, Rating::Up, Rating::Neutral, Rating::Down, Rating::StrongDown] {
            assert_eq!(serde_json::to_value(rating).unwrap(), rating.as_str());
        }
    }

    #[test]
    fn rating_scores_are_ordered() {
        let ordered = [Rating::StrongDown, Rating::Down, Rating::Neutral, Rating::Up, Rating::StrongUp];
        assert!(ordered.windows(2).all(|w| w[0].score() < w[1].score()));
    }
}
