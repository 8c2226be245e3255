use crate::error::GatewayError;
use crate::klines::{ExchangeClient, PriceSeries, Ticker};
use crate::listings::{ListingRequest, ListingsClient, RankedAsset};

/// Everything the discovery pipeline needs from upstream providers.
#[allow(async_fn_in_trait)]
pub trait MarketGateway {
    async fn fetch_ranked_listing(
        &self,
        request: &ListingRequest,
    ) -> Result<Vec<RankedAsset>, GatewayError>;

    async fn fetch_symbol_ticker(&self, pair: &str) -> Result<Ticker, GatewayError>;

    async fn fetch_price_history(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> Result<PriceSeries, GatewayError>;
}

pub struct HttpGateway {
    listings: ListingsClient,
    exchange: ExchangeClient,
}

impl HttpGateway {
    pub fn new(listings: ListingsClient, exchange: ExchangeClient) -> Self {
        Self { listings, exchange }
    }
}

impl MarketGateway for HttpGateway {
    async fn fetch_ranked_listing(
        &self,
        request: &ListingRequest,
    ) -> Result<Vec<RankedAsset>, GatewayError> {
        self.listings.fetch_ranked_listing(request).await
    }

    async fn fetch_symbol_ticker(&self, pair: &str) -> Result<Ticker, GatewayError> {
        self.exchange.fetch_ticker(pair).await
    }

    async fn fetch_price_history(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> Result<PriceSeries, GatewayError> {
        self.exchange.fetch_klines(pair, interval, limit).await
    }
}
