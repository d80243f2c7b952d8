//! The five-stage forecasting pipeline.
//!
//! Stages run strictly in order. Each stage's typed output is mapped field
//! by field into the next stage's input, and each producing agent notifies
//! the next one with a completion message.

use crate::agent::{
    Agent, AnalysisAgent, IngestionAgent, PredictionAgent, PredictionInput, RawDataset,
    RecommendationAgent, RecommendationPools, ReportAgent, ReportEnvelope, ReportInput,
};
use crate::analysis::AnalysisThresholds;
use crate::prediction::{PredictionEngine, Strategy, StrategyKind, StrategyTables, TechLevel};
use crate::report::DEFAULT_TITLE;
use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;

pub const DEFAULT_SEED: u64 = 42;

/// Everything needed to build a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub strategy: StrategyKind,
    pub seed: u64,
    pub target_year: i32,
    /// Forces the bounded heuristic's technology tier.
    pub tech_level: Option<TechLevel>,
    pub tables: StrategyTables,
    pub thresholds: AnalysisThresholds,
    pub pools: RecommendationPools,
    pub title: String,
}

/// The year after the current UTC year.
pub fn default_target_year() -> i32 {
    chrono::Utc::now().year() + 1
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            seed: DEFAULT_SEED,
            target_year: default_target_year(),
            tech_level: None,
            tables: StrategyTables::default(),
            thresholds: AnalysisThresholds::default(),
            pools: RecommendationPools::default(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

pub struct ForecastPipeline {
    ingestion: IngestionAgent,
    analysis: AnalysisAgent,
    prediction: PredictionAgent,
    recommendation: RecommendationAgent,
    report: ReportAgent,
}

impl ForecastPipeline {
    /// Build all five agents. Every random source is derived from
    /// `options.seed`.
    pub fn new(options: PipelineOptions) -> Self {
        let mut seeds = StdRng::seed_from_u64(options.seed);
        let prediction_seed: u64 = seeds.gen();
        let recommendation_seed: u64 = seeds.gen();

        let strategy = Strategy::build(options.strategy, &options.tables, options.tech_level);
        let engine = PredictionEngine::new(strategy, prediction_seed);

        Self {
            ingestion: IngestionAgent::new(),
            analysis: AnalysisAgent::new(options.thresholds),
            prediction: PredictionAgent::new(engine, options.target_year),
            recommendation: RecommendationAgent::new(
                options.pools,
                StdRng::seed_from_u64(recommendation_seed),
            ),
            report: ReportAgent::new(&options.title, options.seed),
        }
    }

    /// Run every stage over `raw`. Never fails; bad input yields a
    /// zero-filled report.
    pub fn run(&mut self, raw: &RawDataset) -> ReportEnvelope {
        info!("Running ingestion stage");
        let ingested = self.ingestion.process(raw);
        self.ingestion.send_message(
            &mut self.analysis,
            json!({
                "stage": "ingestion",
                "status": "complete",
                "factories": ingested.summary.total_factory_count,
            }),
        );

        info!("Running analysis stage");
        let analysis = self.analysis.process(&ingested.summary);
        self.analysis.send_message(
            &mut self.prediction,
            json!({
                "stage": "analysis",
                "status": "complete",
                "high_risk_regions": analysis.risk_assessment.high_risk_count,
            }),
        );

        info!("Running prediction stage");
        let prediction_input = PredictionInput {
            summary: ingested.summary.clone(),
            dataset: ingested.dataset,
        };
        let predictions = self.prediction.process(&prediction_input);
        self.prediction.send_message(
            &mut self.recommendation,
            json!({
                "stage": "prediction",
                "status": "complete",
                "predicted_total": predictions.summary.predicted_emissions_ton,
            }),
        );

        info!("Running recommendation stage");
        let recommendations = self.recommendation.process(&());
        self.recommendation.send_message(
            &mut self.report,
            json!({
                "stage": "recommendation",
                "status": "complete",
                "count": recommendations.total(),
            }),
        );

        info!("Running report stage");
        let report_input = ReportInput {
            summary: prediction_input.summary,
            analysis,
            predictions,
            recommendations,
        };
        self.report.process(&report_input)
    }

    pub fn ingestion(&self) -> &IngestionAgent {
        &self.ingestion
    }

    pub fn analysis(&self) -> &AnalysisAgent {
        &self.analysis
    }

    pub fn prediction(&self) -> &PredictionAgent {
        &self.prediction
    }

    pub fn recommendation(&self) -> &RecommendationAgent {
        &self.recommendation
    }

    pub fn report(&self) -> &ReportAgent {
        &self.report
    }
}

/// Build a pipeline from `options` and run it once.
pub fn run_pipeline(raw: &RawDataset, options: PipelineOptions) -> ReportEnvelope {
    ForecastPipeline::new(options).run(raw)
}
