use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key: set CMC_API_KEY (or COINMARKETCAP_API_KEY)")]
    MissingApiKey,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Recoverable upstream failures. None of these are retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("rate limited by exchange (banned until {banned_until_ms:?})")]
    RateLimited { banned_until_ms: Option<u64> },
    #[error("malformed payload: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("ranked listing unavailable: {0}")]
    Listing(#[source] GatewayError),
}
