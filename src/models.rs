//! Data models for the forecasting pipeline.
//!
//! This module contains the canonical dataset shape consumed by the
//! pipeline and the records passed between stages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single facility. Never mutated once ingested.
///
/// Fields that are `null` or of the wrong JSON type fall back to their
/// defaults instead of rejecting the facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    /// Provider-assigned identifier (any JSON value).
    #[serde(default)]
    pub id: Value,
    /// Display name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Owning region. Filled by ingestion from the enclosing region entry.
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: String,
    /// Sector/type tag (e.g. "cement", "textile").
    #[serde(rename = "type", default = "default_kind", deserialize_with = "lenient::kind")]
    pub kind: String,
    /// Floor area in square metres.
    #[serde(default = "default_size", deserialize_with = "lenient::size")]
    pub size_m2: f64,
    /// Current annual emission in tonnes CO2e.
    #[serde(default, deserialize_with = "lenient::number")]
    pub annual_emissions_ton: f64,
}

fn default_kind() -> String {
    "factory".to_string()
}

fn default_size() -> f64 {
    5000.0
}

impl Factory {
    /// Creates a factory with the given sector and emission; used heavily by tests.
    pub fn new(name: &str, region: &str, kind: &str, size_m2: f64, emissions: f64) -> Self {
        Self {
            id: Value::String(name.to_string()),
            name: name.to_string(),
            region: region.to_string(),
            kind: kind.to_string(),
            size_m2,
            annual_emissions_ton: emissions,
        }
    }

    /// Identifier rendered as a plain string.
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::Null => self.name.clone(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// An aggregation bucket (usually a city) grouping factories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub factory_count: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_annual_emissions_ton: f64,
    #[serde(default, deserialize_with = "lenient::records")]
    pub factories: Vec<Factory>,
}

/// Canonical emissions dataset as handed over by the dataset provider.
///
/// Top-level totals are optional; ingestion derives them from the regions
/// when they are absent or unreadable. Region or factory entries that are
/// not JSON objects are dropped with a warning; the rest are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionDataset {
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_factory_count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_annual_emissions_ton: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_annual_emissions_ton: Option<f64>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub region_results: Vec<RegionResult>,
}

impl EmissionDataset {
    /// Iterate over every factory in every region.
    pub fn factories(&self) -> impl Iterator<Item = &Factory> + Clone {
        self.region_results.iter().flat_map(|r| r.factories.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.region_results.is_empty()
    }
}

/// Region entry in the ingestion summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub name: String,
    pub factory_count: u64,
    pub total_emissions: f64,
}

/// Canonical summary produced by the ingestion stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub total_factory_count: u64,
    pub total_annual_emissions: f64,
    pub average_annual_emissions: f64,
    pub regions_with_factories: Vec<RegionSummary>,
}

impl IngestionSummary {
    /// The all-zero summary used when ingestion fails.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Value of a single entry in a factor trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    Number(f64),
    Label(String),
}

impl fmt::Display for FactorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorValue::Number(n) => write!(f, "{:.4}", n),
            FactorValue::Label(s) => write!(f, "{}", s),
        }
    }
}

/// A named factor applied while deriving a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: FactorValue,
}

/// Ordered set of named factors used to derive a prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorTrace {
    factors: Vec<Factor>,
}

impl FactorTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a numeric factor.
    pub fn push(&mut self, name: &str, value: f64) -> &mut Self {
        self.factors.push(Factor {
            name: name.to_string(),
            value: FactorValue::Number(value),
        });
        self
    }

    /// Append a descriptive label (e.g. the chosen technology tier).
    pub fn label(&mut self, name: &str, value: &str) -> &mut Self {
        self.factors.push(Factor {
            name: name.to_string(),
            value: FactorValue::Label(value.to_string()),
        });
        self
    }

    /// Numeric value of the named factor.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.factors.iter().find(|f| f.name == name).and_then(|f| match f.value {
            FactorValue::Number(n) => Some(n),
            FactorValue::Label(_) => None,
        })
    }

    /// Label value of the named factor.
    pub fn get_label(&self, name: &str) -> Option<&str> {
        self.factors.iter().find(|f| f.name == name).and_then(|f| match &f.value {
            FactorValue::Label(s) => Some(s.as_str()),
            FactorValue::Number(_) => None,
        })
    }

    /// Product of all numeric factors.
    pub fn product(&self) -> f64 {
        self.factors
            .iter()
            .filter_map(|f| match f.value {
                FactorValue::Number(n) => Some(n),
                FactorValue::Label(_) => None,
            })
            .product()
    }

    pub fn names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Factor> {
        self.factors.iter()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Forecast for a single factory (or region) together with its factor trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub entity_id: String,
    pub entity_name: String,
    pub region: String,
    pub current_emissions_ton: f64,
    pub predicted_emissions_ton: f64,
    pub emission_change_ton: f64,
    pub emission_change_percent: f64,
    pub target_year: i32,
    pub strategy: String,
    pub factors: FactorTrace,
}

impl PredictionRecord {
    /// Build a record for `factory`, deriving the change fields.
    pub fn for_factory(
        factory: &Factory,
        predicted: f64,
        target_year: i32,
        strategy: &str,
        factors: FactorTrace,
    ) -> Self {
        let current = factory.annual_emissions_ton;
        Self {
            entity_id: factory.id_string(),
            entity_name: factory.name.clone(),
            region: factory.region.clone(),
            current_emissions_ton: current,
            predicted_emissions_ton: predicted,
            emission_change_ton: predicted - current,
            emission_change_percent: percent_change(current, predicted),
            target_year,
            strategy: strategy.to_string(),
            factors,
        }
    }
}

/// Percent change from `current` to `predicted`; 0 when `current` is 0.
pub fn percent_change(current: f64, predicted: f64) -> f64 {
    if current == 0.0 {
        0.0
    } else {
        (predicted - current) / current * 100.0
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Field deserializers that coerce `null` and mistyped values to defaults.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::warn;

    /// Finite number from a JSON number or numeric string.
    fn as_number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }

    fn as_count(value: &Value) -> Option<u64> {
        as_number(value).filter(|n| *n >= 0.0).map(|n| n as u64)
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(as_number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(as_number(&Value::deserialize(deserializer)?))
    }

    pub fn size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(as_number(&Value::deserialize(deserializer)?).unwrap_or_else(super::default_size))
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(as_count(&Value::deserialize(deserializer)?).unwrap_or(0))
    }

    pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Ok(as_count(&Value::deserialize(deserializer)?))
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    pub fn kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            _ => super::default_kind(),
        })
    }

    /// A list of records; entries that do not deserialize are skipped.
    pub fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                warn!("Expected a list of records, got {}", other);
                Vec::new()
            }
        };

        Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed record #{}: {}", index, e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change_zero_current() {
        assert_eq!(percent_change(0.0, 500.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_percent_change() {
        assert!((percent_change(200.0, 250.0) - 25.0).abs() < 1e-9);
        assert!((percent_change(200.0, 150.0) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_eq!(safe_ratio(10.0, 4.0), 2.5);
    }

    #[test]
    fn test_factory_defaults() {
        let factory: Factory = serde_json::from_str(r#"{"name": "Plant A"}"#).unwrap();
        assert_eq!(factory.kind, "factory");
        assert_eq!(factory.size_m2, 5000.0);
        assert_eq!(factory.annual_emissions_ton, 0.0);
        assert_eq!(factory.id_string(), "Plant A");
    }

    #[test]
    fn test_factory_null_and_mistyped_fields() {
        let factory: Factory = serde_json::from_str(
            r#"{"id": 7, "name": null, "type": 3, "size_m2": null, "annual_emissions_ton": "1250.5"}"#,
        )
        .unwrap();
        assert_eq!(factory.name, "");
        assert_eq!(factory.kind, "factory");
        assert_eq!(factory.size_m2, 5000.0);
        assert_eq!(factory.annual_emissions_ton, 1250.5);

        let factory: Factory =
            serde_json::from_str(r#"{"name": "B", "annual_emissions_ton": [1]}"#).unwrap();
        assert_eq!(factory.annual_emissions_ton, 0.0);
    }

    #[test]
    fn test_dataset_skips_only_bad_records() {
        let dataset: EmissionDataset = serde_json::from_str(
            r#"{
                "total_factory_count": "n/a",
                "region_results": [
                    "junk",
                    {"region": "Kocaeli", "factory_count": null, "factories": [
                        {"name": "A", "annual_emissions_ton": 100},
                        42,
                        {"name": "B", "size_m2": null, "annual_emissions_ton": 300}
                    ]},
                    {"region": "Bursa", "factories": null}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(dataset.total_factory_count, None);
        assert_eq!(dataset.region_results.len(), 2);
        let names: Vec<_> = dataset.factories().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(dataset.region_results[1].factories.is_empty());
    }

    #[test]
    fn test_factory_id_any_json() {
        let factory: Factory =
            serde_json::from_str(r#"{"id": 42, "name": "X", "type": "steel"}"#).unwrap();
        assert_eq!(factory.id_string(), "42");
        assert_eq!(factory.kind, "steel");
    }

    #[test]
    fn test_factor_trace_order_and_lookup() {
        let mut trace = FactorTrace::new();
        trace.push("sector_growth", 1.015).label("tech_level", "high");
        trace.push("regulation", 0.96);

        assert_eq!(trace.names(), vec!["sector_growth", "tech_level", "regulation"]);
        assert_eq!(trace.get("regulation"), Some(0.96));
        assert_eq!(trace.get("tech_level"), None);
        assert_eq!(trace.get_label("tech_level"), Some("high"));
    }

    #[test]
    fn test_factor_trace_serializes_as_list() {
        let mut trace = FactorTrace::new();
        trace.push("a", 1.0).label("b", "x");
        let json = serde_json::to_value(&trace).unwrap();
        assert!(json.is_array());
        assert_eq!(json[1]["value"], "x");
    }

    #[test]
    fn test_record_for_zero_emission_factory() {
        let factory = Factory::new("Idle", "Konya", "food", 1000.0, 0.0);
        let record = PredictionRecord::for_factory(&factory, 12.0, 2026, "test", FactorTrace::new());
        assert_eq!(record.emission_change_percent, 0.0);
        assert_eq!(record.emission_change_ton, 12.0);
    }
}
