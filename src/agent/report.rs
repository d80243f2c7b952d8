//! Report stage: assembles the final envelope from the stage outputs.

use super::analysis::AnalysisResults;
use super::prediction::PredictionOutput;
use super::recommendation::Recommendations;
use super::{Agent, AgentCore};
use crate::models::IngestionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const DEFAULT_TITLE: &str = "Carbon Emission Sustainability Report for Industrial Facilities";

/// Who produced the report's prose fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    #[default]
    Templated,
    Service,
    /// Some sections came from the service, the rest are templated.
    Mixed,
}

impl fmt::Display for NarrativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NarrativeSource::Templated => "templated",
            NarrativeSource::Service => "service",
            NarrativeSource::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub strategy: String,
    pub seed: u64,
    pub target_year: i32,
    pub narrative_source: NarrativeSource,
}

/// The final structured report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub title: String,
    pub executive_summary: String,
    pub current_emissions: AnalysisResults,
    pub future_predictions: PredictionOutput,
    pub recommendations: Recommendations,
    pub conclusion: String,
    pub metadata: ReportMetadata,
}

/// Input mapped from every earlier stage.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub summary: IngestionSummary,
    pub analysis: AnalysisResults,
    pub predictions: PredictionOutput,
    pub recommendations: Recommendations,
}

/// Templated executive summary.
pub fn executive_summary(summary: &IngestionSummary, predictions: &PredictionOutput) -> String {
    let forecast = &predictions.summary;
    format!(
        "This report analyses the current carbon emissions of {} factories and forecasts their \
         emissions for {}. Forecast factories currently emit {:.2} t CO2e; the {} model projects {:.2} t CO2e \
         for {} ({:+.2}%). The report closes with emission reduction strategies and recommendations \
         for sustainable practice.",
        summary.total_factory_count,
        forecast.target_year,
        forecast.current_emissions_ton,
        forecast.strategy,
        forecast.predicted_emissions_ton,
        forecast.target_year,
        forecast.emission_change_percent
    )
}

/// Templated conclusion.
pub fn conclusion() -> String {
    "Managing industrial carbon emissions sustainably is critical both for reducing environmental \
     impact and for staying economically competitive. The analyses and recommendations in this \
     report provide a roadmap for cutting emissions and developing sustainable production practices."
        .to_string()
}

pub struct ReportAgent {
    core: AgentCore,
    title: String,
    seed: u64,
}

impl ReportAgent {
    pub fn new(title: &str, seed: u64) -> Self {
        Self {
            core: AgentCore::new("ReportGenerator"),
            title: title.to_string(),
            seed,
        }
    }
}

impl Agent for ReportAgent {
    type Input = ReportInput;
    type Output = ReportEnvelope;

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn process(&mut self, input: &ReportInput) -> ReportEnvelope {
        let report = ReportEnvelope {
            title: self.title.clone(),
            executive_summary: executive_summary(&input.summary, &input.predictions),
            current_emissions: input.analysis.clone(),
            future_predictions: input.predictions.clone(),
            recommendations: input.recommendations.clone(),
            conclusion: conclusion(),
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                strategy: input.predictions.summary.strategy.clone(),
                seed: self.seed,
                target_year: input.predictions.summary.target_year,
                narrative_source: NarrativeSource::Templated,
            },
        };

        info!("Assembled report '{}'", report.title);
        self.remember("report", &report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::AggregateForecast;

    fn input() -> ReportInput {
        ReportInput {
            summary: IngestionSummary {
                total_factory_count: 12,
                total_annual_emissions: 4800.0,
                average_annual_emissions: 400.0,
                regions_with_factories: vec![],
            },
            predictions: PredictionOutput {
                summary: AggregateForecast {
                    strategy: "multi_factor".to_string(),
                    target_year: 2027,
                    factory_count: 12,
                    region_count: 3,
                    current_emissions_ton: 4800.0,
                    predicted_emissions_ton: 4320.0,
                    emission_change_ton: -480.0,
                    emission_change_percent: -10.0,
                    model_performance: None,
                },
                ..PredictionOutput::default()
            },
            ..ReportInput::default()
        }
    }

    #[test]
    fn test_executive_summary_interpolates_numbers() {
        let input = input();
        let text = executive_summary(&input.summary, &input.predictions);

        assert!(text.contains("12 factories"));
        assert!(text.contains("4800.00 t CO2e"));
        assert!(text.contains("4320.00 t CO2e"));
        assert!(text.contains("2027"));
        assert!(text.contains("-10.00%"));
    }

    #[test]
    fn test_executive_summary_uses_forecast_baseline() {
        let mut input = input();
        // declared total disagrees with the per-factory sum
        input.summary.total_annual_emissions = 9999.0;
        let text = executive_summary(&input.summary, &input.predictions);

        assert!(text.contains("currently emit 4800.00 t CO2e"));
        assert!(!text.contains("9999.00"));
    }

    #[test]
    fn test_envelope_fields() {
        let mut agent = ReportAgent::new(DEFAULT_TITLE, 17);
        let report = agent.process(&input());

        assert_eq!(report.title, DEFAULT_TITLE);
        assert_eq!(report.conclusion, conclusion());
        assert_eq!(report.metadata.seed, 17);
        assert_eq!(report.metadata.target_year, 2027);
        assert_eq!(report.metadata.strategy, "multi_factor");
        assert_eq!(report.metadata.narrative_source, NarrativeSource::Templated);
        assert!(agent.get_knowledge("report").is_some());
    }

    #[test]
    fn test_envelope_json_keys() {
        let mut agent = ReportAgent::new("Custom", 1);
        let json = serde_json::to_value(agent.process(&input())).unwrap();

        for key in [
            "title",
            "executive_summary",
            "current_emissions",
            "future_predictions",
            "recommendations",
            "conclusion",
            "metadata",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["metadata"]["narrative_source"], "templated");
    }
}
