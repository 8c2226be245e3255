use crate::discovery::AssetSummary;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Rating, then calmest ATR, then volume, then absolute 24h move.
    #[default]
    StrongUpLowAtr,
    /// Rating, then volume, then calmest ATR, then absolute 24h move.
    StrongUpHighVol,
}

/// Inclusion thresholds for the `pick` tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub rank_max: u32,
    pub atr_pct_max: f64,
}

impl Filter {
    /// Absent rank or ATR never passes.
    pub fn accepts(&self, summary: &AssetSummary) -> bool {
        let rank = summary.provenance.as_ref().and_then(|p| p.rank);
        match (rank, summary.atr_percent) {
            (Some(rank), Some(atr)) => rank <= self.rank_max && atr <= self.atr_pct_max,
            _ => false,
        }
    }
}

fn rating_desc(a: &AssetSummary, b: &AssetSummary) -> Ordering {
    b.rating.score().cmp(&a.rating.score())
}

// Absent ATR sorts as +infinity.
fn atr_asc(a: &AssetSummary, b: &AssetSummary) -> Ordering {
    let key = |s: &AssetSummary| s.atr_percent.unwrap_or(f64::INFINITY);
    key(a).total_cmp(&key(b))
}

fn volume_desc(a: &AssetSummary, b: &AssetSummary) -> Ordering {
    let key = |s: &AssetSummary| s.volume_24h.unwrap_or(f64::NEG_INFINITY);
    key(b).total_cmp(&key(a))
}

fn abs_change_desc(a: &AssetSummary, b: &AssetSummary) -> Ordering {
    let key = |s: &AssetSummary| s.percent_change_24h.map(f64::abs).unwrap_or(f64::NEG_INFINITY);
    key(b).total_cmp(&key(a))
}

pub fn compare(strategy: Strategy, a: &AssetSummary, b: &AssetSummary) -> Ordering {
    match strategy {
        Strategy::StrongUpLowAtr => rating_desc(a, b)
            .then_with(|| atr_asc(a, b))
            .then_with(|| volume_desc(a, b))
            .then_with(|| abs_change_desc(a, b)),
        Strategy::StrongUpHighVol => rating_desc(a, b)
            .then_with(|| volume_desc(a, b))
            .then_with(|| atr_asc(a, b))
            .then_with(|| abs_change_desc(a, b)),
    }
}

/// Stable sort by `strategy`, then keep the first `count`.
pub fn rank(
    summaries: &[AssetSummary],
    filter: Option<Filter>,
    strategy: Strategy,
    count: usize,
) -> Vec<AssetSummary> {
    let mut selected: Vec<&AssetSummary> = summaries
        .iter()
        .filter(|s| filter.is_none_or(|f| f.accepts(s)))
        .collect();

    selected.sort_by(|a, b| compare(strategy, a, b));
    selected.into_iter().take(count).cloned().collect()
}
