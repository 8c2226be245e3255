use crate::cache::DEFAULT_TTL;
use crate::error::ConfigError;
use crate::klines::DEFAULT_EXCHANGE_URL;
use crate::listings::DEFAULT_LISTINGS_URL;
use crate::tools::ToolParams;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const API_KEY_VARS: &[&str] = &["CMC_API_KEY", "COINMARKETCAP_API_KEY"];

/// Optional `config.json` kept in the storage directory next to the binary.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileConfig {
    pub defaults: ToolParams,
    pub cache_ttl_ms: Option<u64>,
    pub fetch_concurrency: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub cache_ttl: Duration,
    pub fetch_concurrency: usize,
    pub listings_url: String,
    pub exchange_url: String,
    pub defaults: ToolParams,
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(None),
    }
}

impl Settings {
    /// Resolves settings from the config file and environment. Environment wins.
    pub fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|&name| lookup(name))
            .find(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let ttl_ms = parse_var::<u64>(&lookup, "CACHE_TTL_MS")?.or(file.cache_ttl_ms);
        let fetch_concurrency = parse_var::<usize>(&lookup, "FETCH_CONCURRENCY")?
            .or(file.fetch_concurrency)
            .unwrap_or(1)
            .max(1);

        Ok(Self {
            api_key: api_key.trim().to_string(),
            cache_ttl: ttl_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TTL),
            fetch_concurrency,
            listings_url: lookup("LISTINGS_BASE_URL").unwrap_or_else(|| DEFAULT_LISTINGS_URL.to_string()),
            exchange_url: lookup("EXCHANGE_BASE_URL").unwrap_or_else(|| DEFAULT_EXCHANGE_URL.to_string()),
            defaults: file.defaults,
        })
    }
}

pub struct AsyncStorageManager {
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Storage directory resolved relative to the running executable.
    pub fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;
        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);
        Ok(Self { base_dir })
    }

    /// Loads `<filename>.json`, or `None` when the file does not exist.
    pub async fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<Option<T>> {
        let path = self.base_dir.join(format!("{}.json", filename));
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        // serde_json validates UTF-8 itself, so skip read_to_string
        let content = fs::read(&path).await?;
        let data = serde_json::from_slice(&content)?;
        Ok(Some(data))
    }
}

pub async fn load_file_config() -> anyhow::Result<FileConfig> {
    let storage = AsyncStorageManager::new_relative("storage")?;
    Ok(storage.load_optional("config").await?.unwrap_or_default())
}
