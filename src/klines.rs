use crate::error::GatewayError;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const DEFAULT_EXCHANGE_URL: &str = "https://api.binance.com";

// Positions inside a raw kline row: [openTime, open, high, low, close, volume, ...]
const HIGH_IDX: usize = 2;
const LOW_IDX: usize = 3;
const CLOSE_IDX: usize = 4;

static BAN_UNTIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"until\s+(\d+)").expect("ban pattern is a valid regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn is_finite(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Candles for one symbol and interval, oldest first.
pub type PriceSeries = Vec<Candle>;

/// 24h rolling statistics for one exchange pair.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Ticker {
    #[serde(rename = "lastPrice", default, deserialize_with = "deserialize_f64_lenient")]
    pub last_price: Option<f64>,
    #[serde(rename = "priceChangePercent", default, deserialize_with = "deserialize_f64_lenient")]
    pub percent_change_24h: Option<f64>,
    #[serde(rename = "quoteVolume", default, deserialize_with = "deserialize_f64_lenient")]
    pub volume_24h: Option<f64>,
}

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v).filter(|v| v.is_finite()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            return Ok(None);
        }
        // "NaN" and "inf" parse fine but must not reach the ranking as real numbers
        let parsed = v.trim().parse::<f64>().map_err(E::custom)?;
        Ok(Some(parsed).filter(|p| p.is_finite()))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64Visitor)
}

// Exchange numbers arrive as strings. Anything unparseable becomes NaN, which the
// indicator engine treats as insufficient data.
fn number_at(row: &[Value], idx: usize) -> f64 {
    match row.get(idx) {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

pub fn parse_klines(raw: &[Vec<Value>]) -> PriceSeries {
    raw.iter()
        .map(|row| Candle {
            high: number_at(row, HIGH_IDX),
            low: number_at(row, LOW_IDX),
            close: number_at(row, CLOSE_IDX),
        })
        .collect()
}

/// Extracts the ban expiry (epoch ms) from a `-1003` rate-limit body.
pub fn banned_until(body: &str) -> Option<u64> {
    if !body.contains("-1003") {
        return None;
    }
    BAN_UNTIL
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Unauthenticated spot-exchange client for tickers and candles.
pub struct ExchangeClient {
    client: Client,
    base_url: String,
}

impl ExchangeClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::IM_A_TEAPOT || status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            let banned_until_ms = banned_until(&body);
            warn!(endpoint, status = status.as_u16(), ?banned_until_ms, "exchange rate limit hit");
            return Err(GatewayError::RateLimited { banned_until_ms });
        }

        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    pub async fn fetch_ticker(&self, pair: &str) -> Result<Ticker, GatewayError> {
        debug!(symbol = %pair, "fetching 24h ticker");
        let response = self
            .get("/api/v3/ticker/24hr", &[("symbol", pair.to_string())])
            .await?;
        response
            .json::<Ticker>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    pub async fn fetch_klines(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> Result<PriceSeries, GatewayError> {
        debug!(symbol = %pair, interval, limit, "fetching klines");
        let query = [
            ("symbol", pair.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let response = self.get("/api/v3/klines", &query).await?;
        let raw = response
            .json::<Vec<Vec<Value>>>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(parse_klines(&raw))
    }
}
