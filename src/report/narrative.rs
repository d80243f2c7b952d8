//! Optional narrative-generation service.
//!
//! The templated executive summary and conclusion can be replaced verbatim
//! by text from an external language model. Any failure keeps the templated
//! text; the report never fails because of the service.

use crate::agent::{NarrativeSource, ReportEnvelope};
use crate::analysis::{generate_summary_text, largest_movers};
use crate::error::NarrativeError;
use crate::models::IngestionSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Report section a narrative is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeSection {
    ExecutiveSummary,
    Conclusion,
}

impl NarrativeSection {
    fn instruction(&self) -> &'static str {
        match self {
            NarrativeSection::ExecutiveSummary => {
                "Write a concise executive summary (one paragraph) of the emission data and forecast below."
            }
            NarrativeSection::Conclusion => {
                "Write a short conclusion (one paragraph) with the most important takeaways for decision makers, based on the data below."
            }
        }
    }
}

impl fmt::Display for NarrativeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeSection::ExecutiveSummary => f.write_str("executive summary"),
            NarrativeSection::Conclusion => f.write_str("conclusion"),
        }
    }
}

/// Source of free-text narrative for a report section.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn generate(&self, section: NarrativeSection, context: &str) -> Result<String, NarrativeError>;
}

/// Configuration for [`OllamaNarrator`].
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = "You are a carbon emissions and sustainability expert. \
You analyse industrial facility emission data and forecasts and write clear, factual report prose. \
Reply with the requested paragraph only, without headings or lists.";

/// Narrative service backed by an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaNarrator {
    config: NarratorConfig,
    http_client: reqwest::Client,
}

impl OllamaNarrator {
    pub fn new(config: NarratorConfig) -> Result<Self, NarrativeError> {
        info!(
            "Narrative service: model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn request(&self, section: NarrativeSection, context: &str) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("{}\n\n{}", section.instruction(), context),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl NarrativeService for OllamaNarrator {
    async fn generate(&self, section: NarrativeSection, context: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));
        debug!("Requesting {} from {}", section, url);

        let response = self
            .http_client
            .post(&url)
            .json(&self.request(section, context))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Status { status, body });
        }

        let chat: OllamaChatResponse = response.json().await?;
        let text = chat.message.content.trim().to_string();
        if text.is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Prompt context describing `report`'s numbers.
pub fn narrative_context(report: &ReportEnvelope) -> String {
    let analysis = &report.current_emissions;
    let forecast = &report.future_predictions;

    let overview = IngestionSummary {
        total_factory_count: analysis.summary.total_factories,
        total_annual_emissions: analysis.summary.total_emissions,
        average_annual_emissions: analysis.summary.avg_emissions,
        regions_with_factories: analysis.regional_insights.top_emission_regions.clone(),
    };

    let mut lines = vec![generate_summary_text(&overview), String::new()];
    lines.push(format!(
        "Forecast for {} ({} model): {:.2} t CO2e ({:+.2}%)",
        forecast.summary.target_year,
        forecast.summary.strategy,
        forecast.summary.predicted_emissions_ton,
        forecast.summary.emission_change_percent
    ));
    lines.push(format!(
        "High-risk regions: {}, low-risk regions: {}",
        analysis.risk_assessment.high_risk_count, analysis.risk_assessment.low_risk_count
    ));

    let movers = largest_movers(&forecast.regional_predictions, 5);
    if !movers.is_empty() {
        lines.push("Largest projected changes:".to_string());
        for region in movers {
            lines.push(format!(
                "- {}: {:+.2}%",
                region.region, region.emission_change_percent
            ));
        }
    }

    if !forecast.scenarios.is_empty() {
        lines.push("Scenarios:".to_string());
        for scenario in &forecast.scenarios {
            lines.push(format!(
                "- {}: {:.2} t CO2e ({:+.2}%)",
                scenario.name, scenario.predicted_total, scenario.emission_change_percent
            ));
        }
    }

    lines.join("\n")
}

/// Replace the templated executive summary and conclusion with service
/// output where available, and record the resulting narrative source.
pub async fn apply_narrative(
    report: &mut ReportEnvelope,
    service: Option<&dyn NarrativeService>,
) -> NarrativeSource {
    let Some(service) = service else {
        report.metadata.narrative_source = NarrativeSource::Templated;
        return NarrativeSource::Templated;
    };

    let context = narrative_context(report);
    let mut replaced = 0;

    for section in [NarrativeSection::ExecutiveSummary, NarrativeSection::Conclusion] {
        match service.generate(section, &context).await {
            Ok(text) if !text.trim().is_empty() => {
                match section {
                    NarrativeSection::ExecutiveSummary => report.executive_summary = text,
                    NarrativeSection::Conclusion => report.conclusion = text,
                }
                replaced += 1;
            }
            Ok(_) => warn!("Narrative service returned no {}, keeping template", section),
            Err(e) => warn!("Narrative service failed for {}, keeping template: {}", section, e),
        }
    }

    let source = match replaced {
        0 => NarrativeSource::Templated,
        2 => NarrativeSource::Service,
        _ => NarrativeSource::Mixed,
    };
    report.metadata.narrative_source = source;
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RawDataset;
    use crate::pipeline::{run_pipeline, PipelineOptions};
    use serde_json::json;

    enum Fake {
        Text(&'static str),
        Fail,
        OnlySummary,
    }

    #[async_trait]
    impl NarrativeService for Fake {
        async fn generate(
            &self,
            section: NarrativeSection,
            _context: &str,
        ) -> Result<String, NarrativeError> {
            match (self, section) {
                (Fake::Text(t), _) => Ok(t.to_string()),
                (Fake::Fail, _) => Err(NarrativeError::Status {
                    status: 500,
                    body: "boom".to_string(),
                }),
                (Fake::OnlySummary, NarrativeSection::ExecutiveSummary) => {
                    Ok("Service summary".to_string())
                }
                (Fake::OnlySummary, NarrativeSection::Conclusion) => Err(NarrativeError::EmptyResponse),
            }
        }
    }

    fn report() -> ReportEnvelope {
        let raw = RawDataset::Value(json!({
            "region_results": [{
                "region": "Mersin",
                "factories": [{"name": "A", "type": "plastic", "annual_emissions_ton": 250.0}]
            }]
        }));
        run_pipeline(
            &raw,
            PipelineOptions {
                target_year: 2026,
                ..PipelineOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_success_replaces_verbatim() {
        let mut report = report();
        let source = apply_narrative(&mut report, Some(&Fake::Text("From the model."))).await;

        assert_eq!(source, NarrativeSource::Service);
        assert_eq!(report.executive_summary, "From the model.");
        assert_eq!(report.conclusion, "From the model.");
        assert_eq!(report.metadata.narrative_source, NarrativeSource::Service);
    }

    #[tokio::test]
    async fn test_failure_keeps_template() {
        let mut report = report();
        let templated = report.clone();
        let source = apply_narrative(&mut report, Some(&Fake::Fail)).await;

        assert_eq!(source, NarrativeSource::Templated);
        assert_eq!(report.executive_summary, templated.executive_summary);
        assert_eq!(report.conclusion, templated.conclusion);
    }

    #[tokio::test]
    async fn test_empty_text_keeps_template() {
        let mut report = report();
        let templated = report.executive_summary.clone();
        apply_narrative(&mut report, Some(&Fake::Text("   "))).await;
        assert_eq!(report.executive_summary, templated);
    }

    #[tokio::test]
    async fn test_partial_success_is_mixed() {
        let mut report = report();
        let templated = report.conclusion.clone();
        let source = apply_narrative(&mut report, Some(&Fake::OnlySummary)).await;

        assert_eq!(source, NarrativeSource::Mixed);
        assert_eq!(report.executive_summary, "Service summary");
        assert_eq!(report.conclusion, templated);
    }

    #[test]
    fn test_no_service_is_templated() {
        let mut report = report();
        let source = tokio_test::block_on(apply_narrative(&mut report, None));
        assert_eq!(source, NarrativeSource::Templated);
    }

    #[test]
    fn test_context_mentions_forecast_and_scenarios() {
        let context = narrative_context(&report());
        assert!(context.contains("Factories: 1"));
        assert!(context.contains("Forecast for 2026"));
        assert!(context.contains("- Mersin:"));
        assert!(context.contains("Climate Policy Shift"));
    }

    #[test]
    fn test_request_shape() {
        let narrator = OllamaNarrator::new(NarratorConfig::default()).unwrap();
        let request = narrator.request(NarrativeSection::Conclusion, "ctx");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3.2:latest");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json["messages"][1]["content"].as_str().unwrap().ends_with("ctx"));
    }
}
