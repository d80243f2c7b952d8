//! Prediction stage: runs the forecasting engine and the scenario generator.

use super::{Agent, AgentCore};
use crate::models::{EmissionDataset, IngestionSummary};
use crate::prediction::{AggregateForecast, PredictionEngine, RegionForecast};
use crate::scenario::{generate_scenarios, Scenario};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Input mapped from the ingestion output.
#[derive(Debug, Clone, Default)]
pub struct PredictionInput {
    pub summary: IngestionSummary,
    pub dataset: EmissionDataset,
}

/// Output of the prediction stage; becomes the report's `future_predictions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub summary: AggregateForecast,
    pub regional_predictions: Vec<RegionForecast>,
    pub scenarios: Vec<Scenario>,
}

pub struct PredictionAgent {
    core: AgentCore,
    engine: PredictionEngine,
    target_year: i32,
}

impl PredictionAgent {
    pub fn new(engine: PredictionEngine, target_year: i32) -> Self {
        Self {
            core: AgentCore::new("Predictor"),
            engine,
            target_year,
        }
    }

    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }
}

impl Agent for PredictionAgent {
    type Input = PredictionInput;
    type Output = PredictionOutput;

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn process(&mut self, input: &PredictionInput) -> PredictionOutput {
        let forecast = self.engine.predict_all(&input.dataset, self.target_year);
        // Scenarios only ever see the ingested aggregate.
        let scenarios = generate_scenarios(input.summary.total_annual_emissions);

        info!(
            "Prediction complete: {} regions, {} scenarios",
            forecast.regions.len(),
            scenarios.len()
        );

        let output = PredictionOutput {
            summary: forecast.aggregate,
            regional_predictions: forecast.regions,
            scenarios,
        };
        self.remember("predictions", &output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Factory, RegionResult};
    use crate::prediction::StrategyKind;

    fn input() -> PredictionInput {
        let factories = vec![
            Factory::new("A", "Bursa", "automotive", 1.0, 400.0),
            Factory::new("B", "Bursa", "textile", 1.0, 600.0),
        ];
        PredictionInput {
            summary: IngestionSummary {
                total_factory_count: 2,
                // declared total deliberately differs from the factory sum
                total_annual_emissions: 2000.0,
                average_annual_emissions: 1000.0,
                regions_with_factories: vec![],
            },
            dataset: EmissionDataset {
                region_results: vec![RegionResult {
                    region: "Bursa".to_string(),
                    factory_count: 2,
                    total_annual_emissions_ton: 1000.0,
                    factories,
                }],
                ..EmissionDataset::default()
            },
        }
    }

    #[test]
    fn test_scenarios_use_ingested_aggregate() {
        let engine = PredictionEngine::new(StrategyKind::MultiFactor.into(), 1);
        let mut agent = PredictionAgent::new(engine, 2026);
        let output = agent.process(&input());

        assert_eq!(output.scenarios.len(), 5);
        assert_eq!(output.scenarios[1].predicted_total, 2000.0 * 1.03 * 0.95);
        assert_eq!(output.summary.current_emissions_ton, 1000.0);
        assert_eq!(output.summary.target_year, 2026);
    }

    #[test]
    fn test_records_predictions() {
        let engine = PredictionEngine::new(StrategyKind::BoundedHeuristic.into(), 1);
        let mut agent = PredictionAgent::new(engine, 2030);
        agent.process(&input());

        let stored = agent.get_knowledge("predictions").unwrap();
        assert_eq!(stored["summary"]["strategy"], "bounded_heuristic");
        assert_eq!(stored["scenarios"].as_array().map(|s| s.len()), Some(5));
    }
}
