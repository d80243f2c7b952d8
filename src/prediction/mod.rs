//! Forecasting core.
//!
//! Three interchangeable strategies share the [`PredictionStrategy`]
//! contract; the [`PredictionEngine`] drives one of them over a dataset and
//! rolls the per-factory records up into regional and aggregate forecasts.

pub mod engine;
pub mod ensemble;
pub mod heuristic;
pub mod multi_factor;
pub mod regressor;
pub mod tables;

pub use engine::{AggregateForecast, ForecastSet, PredictionEngine, RegionForecast};
pub use ensemble::{EnsembleModel, ModelPerformance};
pub use heuristic::HeuristicModel;
pub use multi_factor::MultiFactorModel;
pub use regressor::FitMetrics;
pub use tables::{ClampBounds, StrategyTables, TechLevel};

use crate::models::{EmissionDataset, Factory, PredictionRecord};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract shared by all prediction strategies.
pub trait PredictionStrategy {
    /// Identifier written into every record's `strategy` field.
    fn name(&self) -> &'static str;

    /// Per-run setup before any `predict_one` call.
    fn prepare(&mut self, _dataset: &EmissionDataset, _target_year: i32, _rng: &mut StdRng) {}

    /// Held-out fit quality, for strategies that train a model.
    fn performance(&self) -> Option<ModelPerformance> {
        None
    }

    /// Forecast a single factory for `target_year`.
    fn predict_one(&self, factory: &Factory, target_year: i32, rng: &mut StdRng) -> PredictionRecord;
}

/// Selectable strategy variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    MultiFactor,
    BoundedHeuristic,
    StatisticalEnsemble,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MultiFactor => multi_factor::NAME,
            StrategyKind::BoundedHeuristic => heuristic::NAME,
            StrategyKind::StatisticalEnsemble => ensemble::NAME,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "multi_factor" => Ok(StrategyKind::MultiFactor),
            "bounded_heuristic" | "heuristic" => Ok(StrategyKind::BoundedHeuristic),
            "statistical_ensemble" | "ensemble" => Ok(StrategyKind::StatisticalEnsemble),
            other => Err(format!("unknown strategy '{}'", other)),
        }
    }
}

/// A constructed strategy. Delegates to the concrete model.
#[derive(Debug, Clone)]
pub enum Strategy {
    MultiFactor(MultiFactorModel),
    BoundedHeuristic(HeuristicModel),
    StatisticalEnsemble(EnsembleModel),
}

impl Strategy {
    /// Build the strategy for `kind` from `tables`. `tech_level` forces the
    /// technology tier of the heuristic and ensemble variants and is ignored
    /// by the multi-factor model.
    pub fn build(kind: StrategyKind, tables: &StrategyTables, tech_level: Option<TechLevel>) -> Self {
        match kind {
            StrategyKind::MultiFactor => {
                Strategy::MultiFactor(MultiFactorModel::new(tables.multi_factor.clone()))
            }
            StrategyKind::BoundedHeuristic => {
                let model = HeuristicModel::new(tables.heuristic.clone());
                Strategy::BoundedHeuristic(match tech_level {
                    Some(level) => model.with_tech_level(level),
                    None => model,
                })
            }
            StrategyKind::StatisticalEnsemble => {
                let model = EnsembleModel::new(tables.ensemble.clone());
                Strategy::StatisticalEnsemble(match tech_level {
                    Some(level) => model.with_tech_level(level),
                    None => model,
                })
            }
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::MultiFactor(_) => StrategyKind::MultiFactor,
            Strategy::BoundedHeuristic(_) => StrategyKind::BoundedHeuristic,
            Strategy::StatisticalEnsemble(_) => StrategyKind::StatisticalEnsemble,
        }
    }
}

impl From<StrategyKind> for Strategy {
    fn from(kind: StrategyKind) -> Self {
        Strategy::build(kind, &StrategyTables::default(), None)
    }
}

impl PredictionStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::MultiFactor(m) => m.name(),
            Strategy::BoundedHeuristic(m) => m.name(),
            Strategy::StatisticalEnsemble(m) => m.name(),
        }
    }

    fn prepare(&mut self, dataset: &EmissionDataset, target_year: i32, rng: &mut StdRng) {
        match self {
            Strategy::MultiFactor(m) => m.prepare(dataset, target_year, rng),
            Strategy::BoundedHeuristic(m) => m.prepare(dataset, target_year, rng),
            Strategy::StatisticalEnsemble(m) => m.prepare(dataset, target_year, rng),
        }
    }

    fn performance(&self) -> Option<ModelPerformance> {
        match self {
            Strategy::MultiFactor(m) => m.performance(),
            Strategy::BoundedHeuristic(m) => m.performance(),
            Strategy::StatisticalEnsemble(m) => PredictionStrategy::performance(m),
        }
    }

    fn predict_one(&self, factory: &Factory, target_year: i32, rng: &mut StdRng) -> PredictionRecord {
        match self {
            Strategy::MultiFactor(m) => m.predict_one(factory, target_year, rng),
            Strategy::BoundedHeuristic(m) => m.predict_one(factory, target_year, rng),
            Strategy::StatisticalEnsemble(m) => m.predict_one(factory, target_year, rng),
        }
    }
}
