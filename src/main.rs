mod cache;
mod classifier;
mod comfy_table;
mod config;
mod discovery;
mod error;
mod gateway;
mod indicators;
mod klines;
mod listings;
mod ranking;
mod tools;

use anyhow::{Context, Result, bail};
use cache::{RequestCache, SystemClock};
use config::Settings;
use gateway::HttpGateway;
use klines::ExchangeClient;
use listings::ListingsClient;
use serde_json::Value;
use std::sync::Arc;
use tools::{Tool, run_tool};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: trend-screener <top|pick> [params-json] [--table]";

struct Invocation {
    tool: Tool,
    params: Value,
    table: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Invocation> {
    let (flags, positional): (Vec<String>, Vec<String>) = args.partition(|a| a.starts_with("--"));

    let table = flags.iter().any(|f| f == "--table");
    if let Some(unknown) = flags.iter().find(|f| *f != "--table") {
        bail!("unknown flag {}\n{}", unknown, USAGE);
    }

    let mut positional = positional.into_iter();
    let tool = match positional.next() {
        Some(name) => name.parse::<Tool>().map_err(anyhow::Error::msg)?,
        None => bail!(USAGE),
    };
    let params = match positional.next() {
        Some(raw) => serde_json::from_str(&raw).context("params must be a JSON object")?,
        None => Value::Object(Default::default()),
    };

    Ok(Invocation { tool, params, table })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // stdout carries tool output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trend_screener=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let invocation = parse_args(std::env::args().skip(1))?;

    let file_config = config::load_file_config().await?;
    let settings = Settings::resolve(file_config, |name| std::env::var(name).ok())?;
    let params = settings.defaults.merged_with(&invocation.params)?;

    let client = reqwest::Client::builder().pool_max_idle_per_host(50).build()?;
    let cache = Arc::new(RequestCache::new(settings.cache_ttl, Arc::new(SystemClock)));
    let gateway = HttpGateway::new(
        ListingsClient::new(client.clone(), &settings.listings_url, &settings.api_key, cache),
        ExchangeClient::new(client, &settings.exchange_url),
    );

    info!(tool = ?invocation.tool, strategy = ?params.strategy, "running tool");
    let output = match run_tool(invocation.tool, &gateway, &params, settings.fetch_concurrency).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "tool failed");
            return Err(e.into());
        }
    };

    if invocation.table {
        println!("{}", comfy_table::render(&output));
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
