//! Statistical ensemble model.
//!
//! `prepare` synthesizes a short yearly series for every factory, derived
//! backward from its current value, and fits a bagged tree forest and a
//! least-squares model on the pooled rows. A row holds the year, floor area
//! in thousands of m², GDP growth, technology factor, regulation factor,
//! sector growth rate and a one-hot sector encoding. A share of the rows is
//! held out to score both regressors. Each forecast then draws a
//! technology-investment tier, builds the target-year row and blends the two
//! regressors.
//!
//! The fit is circular: the "history" is derived from the very value the
//! model then extrapolates from, so the regressors can only echo the
//! synthesis assumptions. The behavior is kept for parity with the other
//! strategies' outputs. Do not reuse this shape once real historical
//! emission series are available; fit on the observed series instead.

use super::regressor::{
    train_test_split, FitMetrics, LinearRegression, RandomForest, Row, StandardScaler,
};
use super::tables::{fold_key, EnsembleTables, TechLevel};
use super::PredictionStrategy;
use crate::models::{EmissionDataset, Factory, FactorTrace, PredictionRecord};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const NAME: &str = "statistical_ensemble";

/// One synthesized history point with the drift features recorded for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub year: i32,
    pub emissions: f64,
    pub gdp_growth: f64,
    pub tech_factor: f64,
    pub regulation_factor: f64,
}

/// Held-out scores of both regressors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub random_forest: FitMetrics,
    pub linear_regression: FitMetrics,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone)]
struct FittedModels {
    target_year: i32,
    scaler: StandardScaler,
    forest: RandomForest,
    linear: LinearRegression,
    performance: Option<ModelPerformance>,
}

#[derive(Debug, Clone, Default)]
pub struct EnsembleModel {
    tables: EnsembleTables,
    tech_level: Option<TechLevel>,
    fitted: Option<FittedModels>,
}

impl EnsembleModel {
    pub fn new(tables: EnsembleTables) -> Self {
        Self {
            tables,
            tech_level: None,
            fitted: None,
        }
    }

    /// Force every entity into `level` instead of drawing a tier.
    pub fn with_tech_level(mut self, level: TechLevel) -> Self {
        self.tech_level = Some(level);
        self
    }

    pub fn tables(&self) -> &EnsembleTables {
        &self.tables
    }

    /// Scores of the models fitted by the last `prepare`, if any rows were
    /// held out.
    pub fn performance(&self) -> Option<ModelPerformance> {
        self.fitted.as_ref().and_then(|f| f.performance)
    }

    /// Synthesize the pseudo-historical series for `factory`, oldest first.
    ///
    /// The latest point is `target_year - 1`. The point `k` years before it
    /// has `current / (1+g)^k × variation` emissions, a technology factor of
    /// `1 - tech_drift·k` and a regulation factor of `1 + regulation_drift·k`.
    pub fn synthesize_history(
        &self,
        factory: &Factory,
        target_year: i32,
        rng: &mut StdRng,
    ) -> Vec<HistoryPoint> {
        let t = &self.tables;
        let current = factory.annual_emissions_ton;
        let growth = t.sector_growth.lookup(&factory.kind);
        let variation = t.variation.abs();

        (0..t.history_years)
            .rev()
            .map(|k| {
                let kf = k as f64;
                let noise = rng.gen_range(1.0 - variation..=1.0 + variation);

                HistoryPoint {
                    year: target_year - 1 - k as i32,
                    emissions: current / (1.0 + growth).powf(kf) * noise,
                    gdp_growth: t.gdp_growth,
                    tech_factor: 1.0 - t.tech_drift * kf,
                    regulation_factor: 1.0 + t.regulation_drift * kf,
                }
            })
            .collect()
    }

    /// Feature row in the column order the regressors are fitted on.
    fn features(
        &self,
        factory: &Factory,
        year: i32,
        gdp_growth: f64,
        tech_factor: f64,
        regulation_factor: f64,
    ) -> Row {
        let t = &self.tables;
        let kind = fold_key(&factory.kind);

        let mut row = vec![
            year as f64,
            factory.size_m2 / 1000.0,
            gdp_growth,
            tech_factor,
            regulation_factor,
            t.sector_growth.lookup(&factory.kind),
        ];
        row.extend(
            t.sectors
                .iter()
                .map(|s| if fold_key(s) == kind { 1.0 } else { 0.0 }),
        );
        row
    }

    fn fit<'a, I>(&self, factories: I, target_year: i32, rng: &mut StdRng) -> FittedModels
    where
        I: IntoIterator<Item = &'a Factory>,
    {
        let t = &self.tables;
        let mut rows = Vec::new();
        let mut ys = Vec::new();
        for factory in factories {
            for point in self.synthesize_history(factory, target_year, rng) {
                rows.push(self.features(
                    factory,
                    point.year,
                    point.gdp_growth,
                    point.tech_factor,
                    point.regulation_factor,
                ));
                ys.push(point.emissions);
            }
        }

        let (train, test) = train_test_split(rows.len(), t.test_fraction, rng);
        let train_rows: Vec<Row> = train.iter().map(|&i| rows[i].clone()).collect();
        let train_ys: Vec<f64> = train.iter().map(|&i| ys[i]).collect();

        let scaler = StandardScaler::fit(&train_rows);
        let scaled: Vec<Row> = train_rows.iter().map(|r| scaler.transform(r)).collect();
        let forest = RandomForest::fit(&scaled, &train_ys, t.trees, t.max_depth, rng);
        let linear = LinearRegression::fit(&scaled, &train_ys);

        let performance = if test.is_empty() {
            None
        } else {
            let actual: Vec<f64> = test.iter().map(|&i| ys[i]).collect();
            let test_rows: Vec<Row> = test.iter().map(|&i| scaler.transform(&rows[i])).collect();
            let forest_pred: Vec<f64> = test_rows.iter().map(|r| forest.predict(r)).collect();
            let linear_pred: Vec<f64> = test_rows.iter().map(|r| linear.predict(r)).collect();

            Some(ModelPerformance {
                random_forest: FitMetrics::evaluate(&actual, &forest_pred),
                linear_regression: FitMetrics::evaluate(&actual, &linear_pred),
                train_rows: train.len(),
                test_rows: test.len(),
            })
        };

        FittedModels {
            target_year,
            scaler,
            forest,
            linear,
            performance,
        }
    }

    fn tech_level(&self, rng: &mut StdRng) -> TechLevel {
        match self.tech_level {
            Some(level) => level,
            None => TechLevel::ALL[rng.gen_range(0..TechLevel::ALL.len())],
        }
    }
}

impl PredictionStrategy for EnsembleModel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&mut self, dataset: &EmissionDataset, target_year: i32, rng: &mut StdRng) {
        let fitted = self.fit(dataset.factories(), target_year, rng);

        match &fitted.performance {
            Some(p) => info!(
                "Ensemble fitted on {} rows, scored on {}: forest R² {:.3}, linear R² {:.3}",
                p.train_rows, p.test_rows, p.random_forest.r2, p.linear_regression.r2
            ),
            None => debug!("Ensemble fitted without held-out rows"),
        }
        self.fitted = Some(fitted);
    }

    fn performance(&self) -> Option<ModelPerformance> {
        EnsembleModel::performance(self)
    }

    fn predict_one(&self, factory: &Factory, target_year: i32, rng: &mut StdRng) -> PredictionRecord {
        let t = &self.tables;
        let current = factory.annual_emissions_ton;

        let level = self.tech_level(rng);
        let tech = t.tech_factors.factor(level);

        // Standalone calls fit on the factory's own series.
        let standalone;
        let fitted = match &self.fitted {
            Some(f) if f.target_year == target_year => f,
            _ => {
                standalone = self.fit([factory], target_year, rng);
                &standalone
            }
        };

        let row = self.features(
            factory,
            target_year,
            t.forecast_gdp_growth,
            tech,
            t.forecast_regulation,
        );
        let scaled = fitted.scaler.transform(&row);

        let forest_prediction = fitted.forest.predict(&scaled);
        let linear_prediction = fitted.linear.predict(&scaled);
        let blended =
            forest_prediction * t.forest_weight + linear_prediction * (1.0 - t.forest_weight);
        let predicted = t.clamp.apply(current, blended);

        let mut trace = FactorTrace::new();
        trace
            .push("sector_growth_rate", t.sector_growth.lookup(&factory.kind))
            .label("tech_level", level.as_str())
            .push("tech_factor", tech)
            .push("gdp_growth", t.forecast_gdp_growth)
            .push("regulation", t.forecast_regulation)
            .push("forest_prediction", forest_prediction)
            .push("linear_prediction", linear_prediction)
            .push("forest_weight", t.forest_weight)
            .push("blended_prediction", blended)
            .push("clamp_min", t.clamp.min)
            .push("clamp_max", t.clamp.max);

        PredictionRecord::for_factory(factory, predicted, target_year, NAME, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionResult;
    use crate::prediction::tables::ClampBounds;
    use rand::SeedableRng;

    fn dataset() -> EmissionDataset {
        EmissionDataset {
            region_results: vec![RegionResult {
                region: "Adana".to_string(),
                factory_count: 4,
                total_annual_emissions_ton: 7300.0,
                factories: vec![
                    Factory::new("A", "Adana", "food", 4000.0, 800.0),
                    Factory::new("B", "Adana", "steel", 30000.0, 4200.0),
                    Factory::new("C", "Adana", "textile", 9000.0, 1300.0),
                    Factory::new("D", "Adana", "chemical", 15000.0, 1000.0),
                ],
            }],
            ..EmissionDataset::default()
        }
    }

    #[test]
    fn test_history_follows_growth_only() {
        let model = EnsembleModel::default();
        let factory = Factory::new("A", "Bursa", "cement", 1.0, 1000.0);

        let history = model.synthesize_history(&factory, 2026, &mut StdRng::seed_from_u64(5));

        // replay the same draws, oldest point first
        let mut rng = StdRng::seed_from_u64(5);
        let years: Vec<i32> = history.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2020, 2021, 2022, 2023, 2024, 2025]);

        for (point, k) in history.iter().zip((0..6).rev()) {
            let noise: f64 = rng.gen_range(0.9..=1.1);
            let expected = 1000.0 / 1.018f64.powi(k) * noise;
            assert!((point.emissions - expected).abs() < 1e-9, "k = {}", k);
            assert!((point.tech_factor - (1.0 - 0.02 * k as f64)).abs() < 1e-12);
            assert!((point.regulation_factor - (1.0 + 0.015 * k as f64)).abs() < 1e-12);
            assert_eq!(point.gdp_growth, 0.045);
        }
    }

    #[test]
    fn test_feature_row_layout() {
        let model = EnsembleModel::default();
        let factory = Factory::new("A", "Bursa", "Steel", 12000.0, 1.0);
        let row = model.features(&factory, 2026, 0.042, 0.75, 0.92);

        assert_eq!(row.len(), 6 + 15);
        assert_eq!(&row[..6], &[2026.0, 12.0, 0.042, 0.75, 0.92, 0.042]);
        assert_eq!(row[6..].iter().sum::<f64>(), 1.0);
        assert_eq!(row[6 + 1], 1.0);
    }

    #[test]
    fn test_prepare_scores_held_out_rows() {
        let mut model = EnsembleModel::default();
        assert!(model.performance().is_none());

        model.prepare(&dataset(), 2026, &mut StdRng::seed_from_u64(0));
        let p = model.performance().unwrap();

        // 4 factories × 6 years, 20% held out
        assert_eq!((p.train_rows, p.test_rows), (19, 5));
        for metrics in [p.random_forest, p.linear_regression] {
            assert!(metrics.mae.is_finite() && metrics.mae >= 0.0);
            assert!(metrics.r2.is_finite() && metrics.r2 <= 1.0);
        }
    }

    #[test]
    fn test_tier_is_drawn_and_traced() {
        let mut model = EnsembleModel::default();
        let data = dataset();
        let mut rng = StdRng::seed_from_u64(21);
        model.prepare(&data, 2026, &mut rng);

        let mut seen = Vec::new();
        for factory in data.factories().cycle().take(60) {
            let r = model.predict_one(factory, 2026, &mut rng);
            let level = r.factors.get_label("tech_level").unwrap().to_string();
            let expected = match level.as_str() {
                "low" => 0.95,
                "medium" => 0.88,
                _ => 0.75,
            };
            assert_eq!(r.factors.get("tech_factor"), Some(expected));
            assert_eq!(r.factors.get("regulation"), Some(0.92));
            assert_eq!(r.factors.get("gdp_growth"), Some(0.042));
            if !seen.contains(&level) {
                seen.push(level);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_forced_tier() {
        let model = EnsembleModel::default().with_tech_level(TechLevel::Low);
        let factory = Factory::new("X", "Adana", "glass", 5000.0, 700.0);
        let r = model.predict_one(&factory, 2026, &mut StdRng::seed_from_u64(3));
        assert_eq!(r.factors.get_label("tech_level"), Some("low"));
        assert_eq!(r.factors.get("tech_factor"), Some(0.95));
    }

    #[test]
    fn test_clamp_holds() {
        let mut model = EnsembleModel::default();
        let data = dataset();
        let mut rng = StdRng::seed_from_u64(77);
        model.prepare(&data, 2026, &mut rng);

        for factory in data.factories() {
            let current = factory.annual_emissions_ton;
            for _ in 0..5 {
                let r = model.predict_one(factory, 2026, &mut rng);
                assert!(r.predicted_emissions_ton >= 0.3 * current - 1e-9);
                assert!(r.predicted_emissions_ton <= 3.0 * current + 1e-9);
            }
        }

        // unprepared model fits on the single factory
        let fresh = EnsembleModel::default();
        let factory = Factory::new("X", "Adana", "electronics", 1.0, 50.0);
        let r = fresh.predict_one(&factory, 2026, &mut rng);
        assert!((15.0 - 1e-9..=150.0 + 1e-9).contains(&r.predicted_emissions_ton));
    }

    #[test]
    fn test_narrow_clamp_bounds() {
        let tables = EnsembleTables {
            clamp: ClampBounds::new(2.0, 3.0),
            ..EnsembleTables::default()
        };
        let model = EnsembleModel::new(tables);
        let factory = Factory::new("X", "Adana", "food", 1.0, 100.0);

        let r = model.predict_one(&factory, 2026, &mut StdRng::seed_from_u64(2));
        assert!((200.0..=300.0).contains(&r.predicted_emissions_ton));
        assert_eq!(r.factors.get("clamp_min"), Some(2.0));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let data = dataset();
        let run = || {
            let mut model = EnsembleModel::default();
            let mut rng = StdRng::seed_from_u64(11);
            model.prepare(&data, 2026, &mut rng);
            let records: Vec<_> = data
                .factories()
                .map(|f| model.predict_one(f, 2026, &mut rng))
                .collect();
            (records, model.performance())
        };

        let (a, pa) = run();
        let (b, pb) = run();
        assert_eq!(a, b);
        assert_eq!(pa, pb);
        assert_eq!(a[0].factors.get("forest_weight"), Some(0.7));
    }
}
