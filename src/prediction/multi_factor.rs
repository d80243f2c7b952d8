//! Rule-based multi-factor model.
//!
//! The prediction is the current value times seven table-driven factors.
//! No clamp is applied; the tables keep the product plausible.

use super::tables::MultiFactorTables;
use super::PredictionStrategy;
use crate::models::{Factory, FactorTrace, PredictionRecord};
use rand::rngs::StdRng;
use rand::Rng;

pub const NAME: &str = "multi_factor";

#[derive(Debug, Clone, Default)]
pub struct MultiFactorModel {
    tables: MultiFactorTables,
}

impl MultiFactorModel {
    pub fn new(tables: MultiFactorTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &MultiFactorTables {
        &self.tables
    }

    /// Deterministic factors for `factory`, in application order.
    fn factors(&self, factory: &Factory) -> FactorTrace {
        let t = &self.tables;
        let city = factory.region.as_str();

        let policy = if t.is_developed(city) {
            t.developed_policy
        } else {
            t.other_policy
        };

        let mut trace = FactorTrace::new();
        trace
            .push("historical_trend", 1.0 + t.historical_trend)
            .push(
                "city_growth",
                t.city_growth.lookup(city) * (1.0 + t.industrial_correction),
            )
            .push("sector_green", t.sector_green.lookup(&factory.kind))
            .push("air_quality", t.air_quality.lookup(city))
            .push("policy", policy)
            .push(
                "renewable_offset",
                1.0 - t.renewable_growth * t.renewable_weight,
            );
        trace
    }
}

impl PredictionStrategy for MultiFactorModel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn predict_one(&self, factory: &Factory, target_year: i32, rng: &mut StdRng) -> PredictionRecord {
        let mut trace = self.factors(factory);
        let jitter = self.tables.jitter.abs();
        trace.push("random_variation", rng.gen_range(1.0 - jitter..=1.0 + jitter));

        let predicted = factory.annual_emissions_ton * trace.product();

        PredictionRecord::for_factory(factory, predicted, target_year, NAME, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_trace_names_in_order() {
        let model = MultiFactorModel::default();
        let factory = Factory::new("A", "Kocaeli", "chemical", 10000.0, 1000.0);
        let record = model.predict_one(&factory, 2025, &mut rng());

        assert_eq!(
            record.factors.names(),
            vec![
                "historical_trend",
                "city_growth",
                "sector_green",
                "air_quality",
                "policy",
                "renewable_offset",
                "random_variation"
            ]
        );
        assert_eq!(record.strategy, "multi_factor");
    }

    #[test]
    fn test_known_city_factors() {
        let model = MultiFactorModel::default();
        let factory = Factory::new("A", "İstanbul, Türkiye", "automotive", 10000.0, 1000.0);
        let record = model.predict_one(&factory, 2025, &mut rng());
        let f = &record.factors;

        assert!((f.get("historical_trend").unwrap() - 0.96825).abs() < 1e-12);
        assert!((f.get("city_growth").unwrap() - 0.98 * 0.9925).abs() < 1e-12);
        assert_eq!(f.get("sector_green"), Some(0.85));
        assert_eq!(f.get("air_quality"), Some(0.88));
        assert_eq!(f.get("policy"), Some(0.92));
        assert!((f.get("renewable_offset").unwrap() - 0.995875).abs() < 1e-12);
    }

    #[test]
    fn test_unlisted_city_and_sector_use_defaults() {
        let model = MultiFactorModel::default();
        let factory = Factory::new("A", "Rize", "pottery", 1000.0, 500.0);
        let record = model.predict_one(&factory, 2025, &mut rng());
        let f = &record.factors;

        assert!((f.get("city_growth").unwrap() - 0.9925).abs() < 1e-12);
        assert_eq!(f.get("sector_green"), Some(0.95));
        assert_eq!(f.get("air_quality"), Some(0.92));
        assert_eq!(f.get("policy"), Some(0.97));
    }

    #[test]
    fn test_prediction_is_product_of_factors() {
        let model = MultiFactorModel::default();
        let factory = Factory::new("A", "Bursa", "textile", 1000.0, 2000.0);
        let record = model.predict_one(&factory, 2025, &mut rng());

        let product = record.factors.product();
        assert!((record.predicted_emissions_ton - 2000.0 * product).abs() < 1e-6);

        let jitter = record.factors.get("random_variation").unwrap();
        assert!((0.985..=1.015).contains(&jitter));
        assert!(record.predicted_emissions_ton > 0.0);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let model = MultiFactorModel::default();
        let factory = Factory::new("A", "Van", "food", 1000.0, 750.0);

        let a = model.predict_one(&factory, 2025, &mut rng());
        let b = model.predict_one(&factory, 2025, &mut rng());
        assert_eq!(a, b);
    }
}
