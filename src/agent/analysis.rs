//! Analysis stage: aggregates, ranks and risk-classifies regions.

use super::{Agent, AgentCore};
use crate::analysis::{
    classify_risk, emission_distribution, rank_by_emissions, rank_by_factory_count, top_regions,
    AnalysisThresholds, EmissionDistribution, RiskAssessment,
};
use crate::models::{safe_ratio, IngestionSummary, RegionSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_factories: u64,
    pub total_emissions: f64,
    pub avg_emissions: f64,
    pub emission_per_factory: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalInsights {
    pub top_emission_regions: Vec<RegionSummary>,
    pub top_factory_regions: Vec<RegionSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionPatterns {
    /// Absent when no region has factories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emission_distribution: Option<EmissionDistribution>,
}

/// Output of the analysis stage; becomes the report's `current_emissions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub summary: AnalysisSummary,
    pub regional_insights: RegionalInsights,
    pub emission_patterns: EmissionPatterns,
    pub risk_assessment: RiskAssessment,
}

pub struct AnalysisAgent {
    core: AgentCore,
    thresholds: AnalysisThresholds,
}

impl AnalysisAgent {
    pub fn new(thresholds: AnalysisThresholds) -> Self {
        Self {
            core: AgentCore::new("Analyzer"),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &AnalysisThresholds {
        &self.thresholds
    }
}

impl Default for AnalysisAgent {
    fn default() -> Self {
        Self::new(AnalysisThresholds::default())
    }
}

impl Agent for AnalysisAgent {
    type Input = IngestionSummary;
    type Output = AnalysisResults;

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn process(&mut self, input: &IngestionSummary) -> AnalysisResults {
        let regions = &input.regions_with_factories;
        let top_n = self.thresholds.top_n;

        let results = AnalysisResults {
            summary: AnalysisSummary {
                total_factories: input.total_factory_count,
                total_emissions: input.total_annual_emissions,
                avg_emissions: input.average_annual_emissions,
                emission_per_factory: safe_ratio(
                    input.total_annual_emissions,
                    input.total_factory_count as f64,
                ),
            },
            regional_insights: RegionalInsights {
                top_emission_regions: top_regions(rank_by_emissions(regions), top_n),
                top_factory_regions: top_regions(rank_by_factory_count(regions), top_n),
            },
            emission_patterns: EmissionPatterns {
                emission_distribution: emission_distribution(regions),
            },
            risk_assessment: classify_risk(
                regions,
                input.average_annual_emissions,
                &self.thresholds,
            ),
        };

        info!(
            "Analysis complete: {} high-risk, {} low-risk regions",
            results.risk_assessment.high_risk_count, results.risk_assessment.low_risk_count
        );

        self.remember("analysis_results", &results);
        results
    }
}
