//! Region ranking and emission statistics.
//!
//! Pure helpers used by the analysis stage and the report renderer.

use crate::models::{IngestionSummary, RegionSummary};
use crate::prediction::RegionForecast;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of regions exposed in each ranking.
pub const DEFAULT_TOP_N: usize = 5;
/// Regions above `average × HIGH_RISK_MULTIPLIER` are high-risk.
pub const HIGH_RISK_MULTIPLIER: f64 = 1.5;
/// Regions below `average × LOW_RISK_MULTIPLIER` are low-risk.
pub const LOW_RISK_MULTIPLIER: f64 = 0.5;

/// Tunable thresholds for the analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisThresholds {
    pub top_n: usize,
    pub high_risk_multiplier: f64,
    pub low_risk_multiplier: f64,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            high_risk_multiplier: HIGH_RISK_MULTIPLIER,
            low_risk_multiplier: LOW_RISK_MULTIPLIER,
        }
    }
}

/// Min/max/mean/median of per-region totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionDistribution {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

/// Regions classified against the global average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub high_emission_regions: Vec<RegionSummary>,
    pub low_emission_regions: Vec<RegionSummary>,
    pub high_risk_count: usize,
    pub low_risk_count: usize,
}

fn desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Regions sorted by total emissions (highest first). Ties keep input order.
pub fn rank_by_emissions(regions: &[RegionSummary]) -> Vec<RegionSummary> {
    let mut sorted = regions.to_vec();
    sorted.sort_by(|a, b| desc_f64(a.total_emissions, b.total_emissions));
    sorted
}

/// Regions sorted by factory count (highest first). Ties keep input order.
pub fn rank_by_factory_count(regions: &[RegionSummary]) -> Vec<RegionSummary> {
    let mut sorted = regions.to_vec();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.factory_count));
    sorted
}

/// First `n` entries of an already ranked list.
pub fn top_regions(mut ranked: Vec<RegionSummary>, n: usize) -> Vec<RegionSummary> {
    ranked.truncate(n);
    ranked
}

/// Distribution of per-region totals, or `None` when there are no regions.
///
/// The median is the upper median (`sorted[len / 2]`).
pub fn emission_distribution(regions: &[RegionSummary]) -> Option<EmissionDistribution> {
    if regions.is_empty() {
        return None;
    }

    let mut totals: Vec<f64> = regions.iter().map(|r| r.total_emissions).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let sum: f64 = totals.iter().sum();
    Some(EmissionDistribution {
        min: totals[0],
        max: totals[totals.len() - 1],
        avg: sum / totals.len() as f64,
        median: totals[totals.len() / 2],
    })
}

/// Classify regions as high- or low-risk relative to `average`.
pub fn classify_risk(
    regions: &[RegionSummary],
    average: f64,
    thresholds: &AnalysisThresholds,
) -> RiskAssessment {
    let high_cut = average * thresholds.high_risk_multiplier;
    let low_cut = average * thresholds.low_risk_multiplier;

    let high: Vec<RegionSummary> = regions
        .iter()
        .filter(|r| r.total_emissions > high_cut)
        .cloned()
        .collect();
    let low: Vec<RegionSummary> = regions
        .iter()
        .filter(|r| r.total_emissions < low_cut)
        .cloned()
        .collect();

    RiskAssessment {
        high_risk_count: high.len(),
        low_risk_count: low.len(),
        high_emission_regions: high,
        low_emission_regions: low,
    }
}

/// Regional forecasts with the largest absolute percent change.
pub fn largest_movers(regions: &[RegionForecast], n: usize) -> Vec<&RegionForecast> {
    let mut movers: Vec<&RegionForecast> = regions.iter().collect();
    movers.sort_by(|a, b| {
        desc_f64(
            a.emission_change_percent.abs(),
            b.emission_change_percent.abs(),
        )
    });
    movers.truncate(n);
    movers
}

/// Generate a plain-text summary of the ingested totals.
pub fn generate_summary_text(summary: &IngestionSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Factories: {}", summary.total_factory_count));
    lines.push(format!(
        "Total annual emissions: {:.2} t CO2e",
        summary.total_annual_emissions
    ));
    lines.push(format!(
        "Average per factory: {:.2} t CO2e",
        summary.average_annual_emissions
    ));

    if !summary.regions_with_factories.is_empty() {
        lines.push(String::new());
        lines.push("Top regions:".to_string());

        let ranked = top_regions(
            rank_by_emissions(&summary.regions_with_factories),
            DEFAULT_TOP_N,
        );
        for region in ranked {
            lines.push(format!(
                "- {}: {:.2} t ({} factories)",
                region.name, region.total_emissions, region.factory_count
            ));
        }
    }

    lines.join("\n")
}
