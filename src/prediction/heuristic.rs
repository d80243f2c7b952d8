//! Bounded heuristic model.
//!
//! `current × (1 + sector growth) × tech tier × regulation × economic growth
//! × jitter`, clamped into the configured envelope around the current value.

use super::tables::{HeuristicTables, TechLevel};
use super::PredictionStrategy;
use crate::models::{Factory, FactorTrace, PredictionRecord};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

pub const NAME: &str = "bounded_heuristic";

#[derive(Debug, Clone, Default)]
pub struct HeuristicModel {
    tables: HeuristicTables,
    tech_level: Option<TechLevel>,
}

impl HeuristicModel {
    pub fn new(tables: HeuristicTables) -> Self {
        Self {
            tables,
            tech_level: None,
        }
    }

    /// Force every entity into `level` instead of drawing a tier.
    pub fn with_tech_level(mut self, level: TechLevel) -> Self {
        self.tech_level = Some(level);
        self
    }

    pub fn tables(&self) -> &HeuristicTables {
        &self.tables
    }

    fn tech_level(&self, rng: &mut StdRng) -> TechLevel {
        match self.tech_level {
            Some(level) => level,
            None => TechLevel::ALL[rng.gen_range(0..TechLevel::ALL.len())],
        }
    }
}

impl PredictionStrategy for HeuristicModel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn predict_one(&self, factory: &Factory, target_year: i32, rng: &mut StdRng) -> PredictionRecord {
        let t = &self.tables;
        let current = factory.annual_emissions_ton;

        let growth = 1.0 + t.sector_growth.lookup(&factory.kind);
        let level = self.tech_level(rng);
        let tech = t.tech_factors.factor(level);
        let jitter = t.jitter.abs();
        let variation = rng.gen_range(1.0 - jitter..=1.0 + jitter);

        let raw = current * growth * tech * t.regulation * t.economic_growth * variation;
        let predicted = t.clamp.apply(current, raw);
        if predicted != raw {
            debug!("Clamped '{}' from {:.2} to {:.2}", factory.name, raw, predicted);
        }

        let mut trace = FactorTrace::new();
        trace
            .push("sector_growth", growth)
            .label("tech_level", level.as_str())
            .push("tech_factor", tech)
            .push("regulation", t.regulation)
            .push("economic_growth", t.economic_growth)
            .push("random_variation", variation)
            .push("clamp_min", t.clamp.min)
            .push("clamp_max", t.clamp.max);

        PredictionRecord::for_factory(factory, predicted, target_year, NAME, trace)
    }
}
