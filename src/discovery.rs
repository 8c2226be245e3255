//! Candidate discovery: ranked listing -> per-asset ticker and candles -> indicators -> summary.

use crate::classifier::{Rating, Trend, analyze, rate};
use crate::error::{DiscoveryError, GatewayError};
use crate::gateway::MarketGateway;
use crate::listings::{ListingRequest, RankedAsset};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Quote asset appended to every base symbol to form the exchange pair.
pub const QUOTE_ASSET: &str = "USDT";

/// Stable-value assets never worth screening for trend.
pub const STABLE_ASSETS: &[&str] = &[
    "USDT", "USDC", "DAI", "BUSD", "TUSD", "USDP", "FDUSD", "USDD", "PYUSD", "USDE", "GUSD", "FRAX",
    "LUSD", "EURC", "EURT",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryParams {
    pub top_n: u32,
    pub interval: String,
    pub limit: u32,
    pub convert: String,
    pub sort: String,
    pub sort_dir: String,
}

impl DiscoveryParams {
    fn listing_request(&self) -> ListingRequest {
        ListingRequest {
            limit: self.top_n,
            convert: self.convert.clone(),
            sort: self.sort.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

/// Ranking-provider fields captured when the listing was fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub market_cap: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub symbol: String,
    pub price: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub atr_percent: Option<f64>,
    pub trend: Trend,
    pub rating: Rating,
    pub provenance: Option<Provenance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    StableAsset,
    TickerUnavailable(String),
    HistoryUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAsset {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetOutcome {
    Ok(AssetSummary),
    Skipped(SkippedAsset),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveryReport {
    /// Number of rows the ranking provider returned.
    pub candidates: usize,
    /// Summaries in listing order.
    pub summaries: Vec<AssetSummary>,
    pub skipped: Vec<SkippedAsset>,
}

pub fn is_stable_asset(symbol: &str) -> bool {
    STABLE_ASSETS.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}

pub fn pair_symbol(base: &str) -> String {
    format!("{}{}", base.to_ascii_uppercase(), QUOTE_ASSET)
}

fn skipped(symbol: String, reason: SkipReason) -> AssetOutcome {
    AssetOutcome::Skipped(SkippedAsset { symbol, reason })
}

fn unavailable(pair: &str, what: &str, error: &GatewayError) {
    warn!(symbol = %pair, error = %error, "{} unavailable, skipping asset", what);
}

async fn assess_candidate<G: MarketGateway>(
    gateway: &G,
    asset: &RankedAsset,
    params: &DiscoveryParams,
) -> AssetOutcome {
    // 1. Stable coins never trend, don't spend requests on them
    if is_stable_asset(&asset.symbol) {
        debug!(symbol = %asset.symbol, "stable asset excluded");
        return skipped(asset.symbol.clone(), SkipReason::StableAsset);
    }

    let pair = pair_symbol(&asset.symbol);

    // 2. Ticker first: no 24h stats means there is nothing to rate
    let ticker = match gateway.fetch_symbol_ticker(&pair).await {
        Ok(ticker) => ticker,
        Err(e) => {
            unavailable(&pair, "ticker", &e);
            return skipped(pair, SkipReason::TickerUnavailable(e.to_string()));
        }
    };

    // 3. Candles for the indicator engine (discarded once the snapshot is built)
    let candles = match gateway
        .fetch_price_history(&pair, &params.interval, params.limit)
        .await
    {
        Ok(candles) => candles,
        Err(e) => {
            unavailable(&pair, "price history", &e);
            return skipped(pair, SkipReason::HistoryUnavailable(e.to_string()));
        }
    };

    // 4. Indicators, trend and rating, with the listing's provenance attached as fetched
    let snapshot = analyze(&candles);
    let rating = rate(snapshot.trend, ticker.percent_change_24h);

    AssetOutcome::Ok(AssetSummary {
        symbol: pair,
        price: snapshot.last_close.or(ticker.last_price),
        percent_change_24h: ticker.percent_change_24h,
        volume_24h: ticker.volume_24h,
        atr_percent: snapshot.atr_percent,
        trend: snapshot.trend,
        rating,
        provenance: Some(Provenance {
            market_cap: asset.market_cap,
            percent_change_24h: asset.percent_change_24h,
            rank: asset.rank,
        }),
    })
}

/// Runs discovery over the top `params.top_n` ranked assets.
///
/// Up to `concurrency` assets are fetched at once; results always come back in
/// listing order. A failed per-asset fetch skips that asset only, while a failed
/// listing fetch fails the whole run.
pub async fn discover<G: MarketGateway>(
    gateway: &G,
    params: &DiscoveryParams,
    concurrency: usize,
) -> Result<DiscoveryReport, DiscoveryError> {
    // A missing listing is a hard failure, unlike a single missing asset
    let listing = gateway
        .fetch_ranked_listing(&params.listing_request())
        .await
        .map_err(DiscoveryError::Listing)?;

    info!(candidates = listing.len(), interval = %params.interval, "starting discovery");

    // `buffered` yields in input order, so the report follows the listing
    // no matter which request finishes first
    let outcomes: Vec<AssetOutcome> = stream::iter(
        listing
            .iter()
            .map(|asset| assess_candidate(gateway, asset, params)),
    )
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let mut report = DiscoveryReport {
        candidates: listing.len(),
        ..Default::default()
    };
    // Split successes from skips, keeping order inside each list
    for outcome in outcomes {
        match outcome {
            AssetOutcome::Ok(summary) => report.summaries.push(summary),
            AssetOutcome::Skipped(skip) => report.skipped.push(skip),
        }
    }

    info!(
        summarized = report.summaries.len(),
        skipped = report.skipped.len(),
        "discovery finished"
    );
    Ok(report)
}
