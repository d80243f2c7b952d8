//! Drives a strategy over a whole dataset.

use super::{ModelPerformance, PredictionStrategy, Strategy, StrategyKind};
use crate::models::{percent_change, EmissionDataset, Factory, PredictionRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Forecast for one region. Totals are always sums over `predictions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionForecast {
    pub region: String,
    pub factory_count: usize,
    pub current_emissions_ton: f64,
    pub predicted_emissions_ton: f64,
    pub emission_change_ton: f64,
    pub emission_change_percent: f64,
    pub predictions: Vec<PredictionRecord>,
}

impl RegionForecast {
    fn from_records(region: &str, predictions: Vec<PredictionRecord>) -> Self {
        let current: f64 = predictions.iter().map(|p| p.current_emissions_ton).sum();
        let predicted: f64 = predictions.iter().map(|p| p.predicted_emissions_ton).sum();
        Self {
            region: region.to_string(),
            factory_count: predictions.len(),
            current_emissions_ton: current,
            predicted_emissions_ton: predicted,
            emission_change_ton: predicted - current,
            emission_change_percent: percent_change(current, predicted),
            predictions,
        }
    }
}

/// Dataset-wide totals of a forecast run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateForecast {
    pub strategy: String,
    pub target_year: i32,
    pub factory_count: usize,
    pub region_count: usize,
    pub current_emissions_ton: f64,
    pub predicted_emissions_ton: f64,
    pub emission_change_ton: f64,
    pub emission_change_percent: f64,
    /// Held-out regressor scores; only the ensemble reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_performance: Option<ModelPerformance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSet {
    pub aggregate: AggregateForecast,
    pub regions: Vec<RegionForecast>,
}

/// Owns a strategy and the random source it draws from.
pub struct PredictionEngine {
    strategy: Strategy,
    rng: StdRng,
}

impl PredictionEngine {
    pub fn new(strategy: Strategy, seed: u64) -> Self {
        Self::with_rng(strategy, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(strategy: Strategy, rng: StdRng) -> Self {
        Self { strategy, rng }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn predict_one(&mut self, factory: &Factory, target_year: i32) -> PredictionRecord {
        self.strategy.predict_one(factory, target_year, &mut self.rng)
    }

    /// Forecast every factory of every region that has factories.
    pub fn predict_all(&mut self, dataset: &EmissionDataset, target_year: i32) -> ForecastSet {
        self.strategy.prepare(dataset, target_year, &mut self.rng);

        let mut regions = Vec::new();
        for region in &dataset.region_results {
            if region.factories.is_empty() {
                debug!("Skipping region '{}' without factory list", region.region);
                continue;
            }

            let predictions: Vec<PredictionRecord> = region
                .factories
                .iter()
                .map(|f| self.strategy.predict_one(f, target_year, &mut self.rng))
                .collect();

            let forecast = RegionForecast::from_records(&region.region, predictions);
            debug!(
                "{}: {:.2} -> {:.2} t",
                forecast.region, forecast.current_emissions_ton, forecast.predicted_emissions_ton
            );
            regions.push(forecast);
        }

        let current: f64 = regions.iter().map(|r| r.current_emissions_ton).sum();
        let predicted: f64 = regions.iter().map(|r| r.predicted_emissions_ton).sum();
        let aggregate = AggregateForecast {
            strategy: self.strategy.name().to_string(),
            target_year,
            factory_count: regions.iter().map(|r| r.factory_count).sum(),
            region_count: regions.len(),
            current_emissions_ton: current,
            predicted_emissions_ton: predicted,
            emission_change_ton: predicted - current,
            emission_change_percent: percent_change(current, predicted),
            model_performance: self.strategy.performance(),
        };

        info!(
            "Forecast {} ({}): {:.2} -> {:.2} t ({:+.2}%)",
            target_year,
            aggregate.strategy,
            current,
            predicted,
            aggregate.emission_change_percent
        );

        ForecastSet { aggregate, regions }
    }
}
