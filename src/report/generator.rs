//! Markdown and JSON report rendering.
//!
//! This module renders a [`ReportEnvelope`] as a Markdown document or as
//! pretty-printed JSON.

use crate::agent::analysis::AnalysisResults;
use crate::agent::recommendation::Recommendations;
use crate::agent::{PredictionOutput, ReportEnvelope, ReportMetadata};
use crate::analysis::largest_movers;
use crate::models::RegionSummary;
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Number of regions listed under "Largest Projected Changes".
const MOVERS_LIMIT: usize = 5;

/// Output format for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension used for reports of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Markdown => f.write_str("markdown"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ReportEnvelope) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.title));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));

    output.push_str("## Executive Summary\n\n");
    output.push_str(&report.executive_summary);
    output.push_str("\n\n");

    output.push_str(&generate_current_emissions_section(&report.current_emissions));
    output.push_str(&generate_forecast_section(&report.future_predictions));
    output.push_str(&generate_scenarios_section(&report.future_predictions.scenarios));
    output.push_str(&generate_recommendations_section(&report.recommendations));

    output.push_str("## Conclusion\n\n");
    output.push_str(&report.conclusion);
    output.push_str("\n\n");

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Prediction Model:** `{}`\n", metadata.strategy));
    section.push_str(&format!("- **Target Year:** {}\n", metadata.target_year));
    section.push_str(&format!("- **Seed:** {}\n", metadata.seed));
    section.push_str(&format!("- **Narrative:** {}\n", metadata.narrative_source));
    section.push_str(&format!("- **Tool Version:** {}\n", metadata.tool_version));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &ReportEnvelope) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Executive Summary](#executive-summary)\n");
    toc.push_str("- [Current Emissions](#current-emissions)\n");
    toc.push_str("- [Emission Forecast](#emission-forecast)\n");
    if !report.future_predictions.scenarios.is_empty() {
        toc.push_str("- [Scenarios](#scenarios)\n");
    }
    if report.recommendations.total() > 0 {
        toc.push_str("- [Recommendations](#recommendations)\n");
    }
    toc.push_str("- [Conclusion](#conclusion)\n\n");

    toc
}

fn region_table(title: &str, regions: &[RegionSummary]) -> String {
    if regions.is_empty() {
        return String::new();
    }

    let mut table = format!("### {}\n\n", title);
    table.push_str("| Region | Factories | Emissions (t CO2e) |\n");
    table.push_str("|:---|:---:|---:|\n");
    for region in regions {
        table.push_str(&format!(
            "| {} | {} | {:.2} |\n",
            region.name, region.factory_count, region.total_emissions
        ));
    }
    table.push('\n');
    table
}

fn generate_current_emissions_section(analysis: &AnalysisResults) -> String {
    let mut section = String::new();
    let summary = &analysis.summary;

    section.push_str("## Current Emissions\n\n");
    section.push_str("| Factories | Total (t CO2e) | Average (t CO2e) |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {:.2} | {:.2} |\n\n",
        summary.total_factories, summary.total_emissions, summary.avg_emissions
    ));

    section.push_str(&region_table(
        "Top Emitting Regions",
        &analysis.regional_insights.top_emission_regions,
    ));
    section.push_str(&region_table(
        "Regions with Most Factories",
        &analysis.regional_insights.top_factory_regions,
    ));

    if let Some(dist) = &analysis.emission_patterns.emission_distribution {
        section.push_str("### Regional Distribution\n\n");
        section.push_str("| Min | Max | Average | Median |\n");
        section.push_str("|:---:|:---:|:---:|:---:|\n");
        section.push_str(&format!(
            "| {:.2} | {:.2} | {:.2} | {:.2} |\n\n",
            dist.min, dist.max, dist.avg, dist.median
        ));
    }

    let risk = &analysis.risk_assessment;
    section.push_str("### Risk Assessment\n\n");
    section.push_str(&format!(
        "{} high-risk and {} low-risk regions relative to the average.\n\n",
        risk.high_risk_count, risk.low_risk_count
    ));
    section.push_str(&region_table("High-Risk Regions", &risk.high_emission_regions));

    section
}

fn generate_forecast_section(predictions: &PredictionOutput) -> String {
    let mut section = String::new();
    let forecast = &predictions.summary;

    section.push_str("## Emission Forecast\n\n");
    section.push_str(&format!(
        "*Model: `{}` | Target year: {} | Regions: {} | Factories: {}*\n\n",
        forecast.strategy, forecast.target_year, forecast.region_count, forecast.factory_count
    ));
    section.push_str("| Current (t CO2e) | Predicted (t CO2e) | Change (t CO2e) | Change (%) |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.2} | {:.2} | {:+.2} | {:+.2}% |\n\n",
        forecast.current_emissions_ton,
        forecast.predicted_emissions_ton,
        forecast.emission_change_ton,
        forecast.emission_change_percent
    ));

    if let Some(performance) = &forecast.model_performance {
        section.push_str("### Model Performance\n\n");
        section.push_str(&format!(
            "*Scored on {} held-out of {} synthesized rows.*\n\n",
            performance.test_rows,
            performance.train_rows + performance.test_rows
        ));
        section.push_str("| Regressor | R² | MAE (t CO2e) |\n");
        section.push_str("|:---|:---:|---:|\n");
        for (name, metrics) in [
            ("Random forest", performance.random_forest),
            ("Linear regression", performance.linear_regression),
        ] {
            section.push_str(&format!("| {} | {:.3} | {:.2} |\n", name, metrics.r2, metrics.mae));
        }
        section.push('\n');
    }

    if predictions.regional_predictions.is_empty() {
        section.push_str("No regional data was available for forecasting.\n\n");
        return section;
    }

    section.push_str("### Regional Forecasts\n\n");
    section.push_str("| Region | Factories | Current | Predicted | Change (%) |\n");
    section.push_str("|:---|:---:|---:|---:|---:|\n");
    for region in &predictions.regional_predictions {
        section.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {:+.2}% |\n",
            region.region,
            region.factory_count,
            region.current_emissions_ton,
            region.predicted_emissions_ton,
            region.emission_change_percent
        ));
    }
    section.push('\n');

    let movers = largest_movers(&predictions.regional_predictions, MOVERS_LIMIT);
    if movers.len() > 1 {
        section.push_str("### Largest Projected Changes\n\n");
        for (i, region) in movers.iter().enumerate() {
            section.push_str(&format!(
                "{}. **{}**: {:+.2}% ({:+.2} t CO2e)\n",
                i + 1,
                region.region,
                region.emission_change_percent,
                region.emission_change_ton
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_scenarios_section(scenarios: &[Scenario]) -> String {
    if scenarios.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Scenarios\n\n");
    section.push_str("| Scenario | Growth | Reduction | Predicted (t CO2e) | Change (%) |\n");
    section.push_str("|:---|:---:|:---:|---:|---:|\n");
    for scenario in scenarios {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} | {:+.2}% |\n",
            scenario.name,
            scenario.growth_factor,
            scenario.reduction_factor,
            scenario.predicted_total,
            scenario.emission_change_percent
        ));
    }
    section.push('\n');

    for scenario in scenarios {
        section.push_str(&generate_scenario_block(scenario));
    }

    section
}

fn generate_scenario_block(scenario: &Scenario) -> String {
    let narrative = &scenario.narrative;
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", narrative.title));
    block.push_str(&format!("{}\n\n", scenario.description));
    block.push_str(&format!(
        "**Probability:** {} | **Impact:** {}\n\n",
        narrative.probability, narrative.impact
    ));

    for (heading, items) in [
        ("Drivers", &narrative.drivers),
        ("Key industries", &narrative.key_industries),
        ("Policy requirements", &narrative.policy_requirements),
        ("Regional impacts", &narrative.regional_impacts),
    ] {
        if items.is_empty() {
            continue;
        }
        block.push_str(&format!("**{}:**\n", heading));
        for item in items {
            block.push_str(&format!("- {}\n", item));
        }
        block.push('\n');
    }

    block
}

fn numbered(heading: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut list = format!("### {}\n\n", heading);
    for (i, item) in items.iter().enumerate() {
        list.push_str(&format!("{}. {}\n", i + 1, item));
    }
    list.push('\n');
    list
}

fn generate_recommendations_section(recommendations: &Recommendations) -> String {
    if recommendations.total() == 0 {
        return String::new();
    }

    let strategic = &recommendations.strategic_recommendations;
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    section.push_str(&numbered("Emission Reduction", &recommendations.emission_reduction));
    section.push_str(&numbered("Policy Suggestions", &recommendations.policy_suggestions));
    section.push_str(&numbered(
        "Technology Investments",
        &recommendations.technology_investments,
    ));
    section.push_str(&numbered("Short Term (0-1 years)", &strategic.short_term));
    section.push_str(&numbered("Medium Term (1-3 years)", &strategic.medium_term));
    section.push_str(&numbered("Long Term (3+ years)", &strategic.long_term));

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by carbon-forecast {}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Write the Markdown report to a file.
pub fn write_report(report: &ReportEnvelope, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);
    write_file(path, &content)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ReportEnvelope) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &ReportEnvelope, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    write_file(path, &content)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
