use crate::cache::{RequestCache, cache_key};
use crate::error::GatewayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_LISTINGS_URL: &str = "https://pro-api.coinmarketcap.com";
const LISTINGS_ENDPOINT: &str = "/v1/cryptocurrency/listings/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// One row of the market-cap ranking, quoted in the requested currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAsset {
    pub symbol: String,
    pub rank: Option<u32>,
    pub market_cap: Option<f64>,
    pub percent_change_24h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    pub limit: u32,
    pub convert: String,
    pub sort: String,
    pub sort_dir: String,
}

impl ListingRequest {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start", "1".to_string()),
            ("limit", self.limit.to_string()),
            ("convert", self.convert.clone()),
            ("sort", self.sort.clone()),
            ("sort_dir", self.sort_dir.clone()),
        ]
    }
}

#[derive(Deserialize)]
struct ListingsResponse {
    #[serde(default)]
    data: Vec<RawListing>,
}

#[derive(Deserialize)]
struct RawListing {
    symbol: String,
    cmc_rank: Option<u32>,
    #[serde(default)]
    quote: HashMap<String, RawQuote>,
}

#[derive(Deserialize)]
struct RawQuote {
    market_cap: Option<f64>,
    percent_change_24h: Option<f64>,
}

fn into_ranked_assets(response: ListingsResponse, convert: &str) -> Vec<RankedAsset> {
    response
        .data
        .into_iter()
        .map(|raw| {
            // quote keys come back upper-case whatever case `convert` was sent in
            let quote = raw
                .quote
                .iter()
                .find(|(currency, _)| currency.eq_ignore_ascii_case(convert))
                .map(|(_, quote)| quote);
            RankedAsset {
                symbol: raw.symbol,
                rank: raw.cmc_rank,
                market_cap: quote.and_then(|q| q.market_cap),
                percent_change_24h: quote.and_then(|q| q.percent_change_24h),
            }
        })
        .collect()
}

/// Authenticated market-cap ranking client. Successful responses are cached per request.
pub struct ListingsClient {
    client: Client,
    base_url: String,
    api_key: String,
    cache: Arc<RequestCache<Vec<RankedAsset>>>,
}

impl ListingsClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        cache: Arc<RequestCache<Vec<RankedAsset>>>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            cache,
        }
    }

    pub async fn fetch_ranked_listing(
        &self,
        request: &ListingRequest,
    ) -> Result<Vec<RankedAsset>, GatewayError> {
        let query = request.query();
        let key = cache_key(LISTINGS_ENDPOINT, query.iter().cloned());
        self.cache
            .get_or_fetch(&key, || self.fetch_uncached(request, &query))
            .await
    }

    async fn fetch_uncached(
        &self,
        request: &ListingRequest,
        query: &[(&'static str, String)],
    ) -> Result<Vec<RankedAsset>, GatewayError> {
        let url = format!("{}{}", self.base_url, LISTINGS_ENDPOINT);
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "ranked listing request failed");
            return Err(GatewayError::Status {
                endpoint: LISTINGS_ENDPOINT,
                status: status.as_u16(),
            });
        }

        let body = response
            .json::<ListingsResponse>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let assets = into_ranked_assets(body, &request.convert);
        debug!(count = assets.len(), convert = %request.convert, "ranked listing fetched");
        Ok(assets)
    }
}
