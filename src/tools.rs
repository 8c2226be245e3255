//! `top` and `pick`: the two operations exposed to the agent host.

use crate::discovery::{AssetSummary, DiscoveryParams, SkippedAsset, discover};
use crate::error::DiscoveryError;
use crate::gateway::MarketGateway;
use crate::ranking::{Filter, Strategy, rank};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Top,
    Pick,
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Tool::Top),
            "pick" => Ok(Tool::Pick),
            other => Err(format!("unknown tool '{}', expected 'top' or 'pick'", other)),
        }
    }
}

/// Host-supplied parameters. Every field is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolParams {
    #[serde(rename = "topN")]
    pub top_n: u32,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    pub interval: String,
    pub limit: u32,
    pub convert: String,
    pub sort: String,
    pub sort_dir: String,
    #[serde(rename = "rankMax")]
    pub rank_max: u32,
    #[serde(rename = "atrPctMax")]
    pub atr_pct_max: f64,
    pub strategy: Strategy,
}

impl Default for ToolParams {
    fn default() -> Self {
        Self {
            top_n: 20,
            result_count: 5,
            interval: "1h".to_string(),
            limit: 250,
            convert: "USD".to_string(),
            sort: "market_cap".to_string(),
            sort_dir: "desc".to_string(),
            rank_max: 50,
            atr_pct_max: 1.0,
            strategy: Strategy::default(),
        }
    }
}

impl ToolParams {
    /// Overlays a host parameter object onto `self`; fields the host leaves out keep their value.
    pub fn merged_with(&self, overrides: &Value) -> serde_json::Result<Self> {
        // Round-trip through JSON so host keys use the same names as the config file
        let mut base = serde_json::to_value(self)?;
        if let (Value::Object(base), Value::Object(overrides)) = (&mut base, overrides) {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base)
    }

    fn discovery(&self) -> DiscoveryParams {
        DiscoveryParams {
            top_n: self.top_n,
            interval: self.interval.clone(),
            limit: self.limit,
            convert: self.convert.clone(),
            sort: self.sort.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub results: Vec<AssetSummary>,
    pub skipped: Vec<SkippedAsset>,
    pub candidates: usize,
}

pub async fn run_tool<G: MarketGateway>(
    tool: Tool,
    gateway: &G,
    params: &ToolParams,
    concurrency: usize,
) -> Result<ToolOutput, DiscoveryError> {
    // Step 1: Discover and summarize the candidate pool
    let report = discover(gateway, &params.discovery(), concurrency).await?;

    // Step 2: Only `pick` filters, `top` ranks everything it found
    let filter = match tool {
        Tool::Top => None,
        Tool::Pick => Some(Filter {
            rank_max: params.rank_max,
            atr_pct_max: params.atr_pct_max,
        }),
    };

    // Step 3: Sort by strategy and cut to the requested count
    Ok(ToolOutput {
        results: rank(&report.summaries, filter, params.strategy, params.result_count),
        skipped: report.skipped,
        candidates: report.candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Rating;
    use crate::discovery::tests::{FakeGateway, drifting, ranked, ticker};
    use serde_json::json;

    fn gateway() -> FakeGateway {
        FakeGateway::default()
            // strong up, calm
            .with_asset(ranked("BTC", 1), ticker(2.5, 3e9), drifting(250, 1000.0, 1.0, 1.0))
            // strong up, volatile
            .with_asset(ranked("DOGE", 9), ticker(4.0, 9e9), drifting(250, 1.0, 0.001, 0.05))
            .with_asset(ranked("USDC", 4), ticker(0.0, 1e9), drifting(250, 1.0, 0.0, 0.001))
            // up, calm, but ranked outside the default rankMax
            .with_asset(ranked("LINK", 70), ticker(1.5, 1e8), drifting(250, 10.0, 0.01, 0.01))
    }

    #[test]
    fn defaults_fill_missing_parameters() {
        let params = ToolParams::default()
            .merged_with(&json!({ "resultCount": 2, "strategy": "strong_up_high_vol" }))
            .unwrap();

        assert_eq!(params.result_count, 2);
        assert_eq!(params.strategy, Strategy::StrongUpHighVol);
        assert_eq!(params.top_n, 20);
        assert_eq!(params.limit, 250);
        assert_eq!(params.interval, "1h");
        assert_eq!(params.atr_pct_max, 1.0);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = ToolParams::default().merged_with(&json!({ "strategy": "yolo" }));
        assert!(result.is_err());
    }

    #[test]
    fn tool_names_parse() {
        assert_eq!("top".parse::<Tool>(), Ok(Tool::Top));
        assert_eq!("pick".parse::<Tool>(), Ok(Tool::Pick));
        assert!("sell".parse::<Tool>().is_err());
    }

    #[tokio::test]
    async fn pick_filters_then_ranks() {
        let params = ToolParams::default();
        let output = run_tool(Tool::Pick, &gateway(), &params, 1).await.unwrap();

        let symbols: Vec<_> = output.results.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["BTCUSDT"]);
        assert_eq!(output.results[0].rating, Rating::StrongUp);
        assert_eq!(output.candidates, 4);
        assert_eq!(output.skipped.len(), 1);
    }

    #[tokio::test]
    async fn top_skips_filtering() {
        let params = ToolParams { result_count: 10, ..Default::default() };
        let output = run_tool(Tool::Top, &gateway(), &params, 1).await.unwrap();

        let symbols: Vec<_> = output.results.iter().map(|s| s.symbol.as_str()).collect();
        // both strong_up first, calmer BTC ahead of DOGE, then LINK rated up
        assert_eq!(symbols, ["BTCUSDT", "DOGEUSDT", "LINKUSDT"]);
    }

    #[tokio::test]
    async fn result_count_beyond_available_returns_everything() {
        let params = ToolParams { result_count: 50, rank_max: 100, atr_pct_max: 100.0, ..Default::default() };
        let output = run_tool(Tool::Pick, &gateway(), &params, 2).await.unwrap();
        assert_eq!(output.results.len(), 3);
    }

    #[tokio::test]
    async fn output_serializes_with_camel_case_fields() {
        let params = ToolParams { result_count: 1, ..Default::default() };
        let output = run_tool(Tool::Top, &gateway(), &params, 1).await.unwrap();
        let value = serde_json::to_value(&output).unwrap();

        let first = &value["results"][0];
        assert_eq!(first["symbol"], "BTCUSDT");
        assert_eq!(first["rating"], "strong_up");
        assert_eq!(first["trend"], "up");
        assert!(first["atrPercent"].is_number());
        assert_eq!(first["provenance"]["rank"], 1);
        assert_eq!(value["skipped"][0]["reason"], "stable_asset");
    }
}
