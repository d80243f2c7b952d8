//! Ingestion stage: normalizes a raw dataset into the canonical summary.

use super::{Agent, AgentCore};
use crate::error::IngestionError;
use crate::models::{safe_ratio, EmissionDataset, IngestionSummary, RegionSummary};
use serde_json::Value;
use tracing::{debug, info, warn};

/// A dataset handle as supplied by the dataset provider.
#[derive(Debug, Clone)]
pub enum RawDataset {
    /// Unparsed JSON text.
    Text(String),
    /// Already parsed JSON.
    Value(Value),
    /// The provider had nothing to hand over.
    Missing,
}

impl RawDataset {
    fn parse(&self) -> Result<EmissionDataset, IngestionError> {
        let value = match self {
            RawDataset::Text(text) => serde_json::from_str::<Value>(text)?,
            RawDataset::Value(value) => value.clone(),
            RawDataset::Missing => return Err(IngestionError::Missing),
        };

        if !value.is_object() {
            return Err(IngestionError::NotAnObject(json_kind(&value)));
        }

        Ok(serde_json::from_value(value)?)
    }
}

impl From<EmissionDataset> for RawDataset {
    fn from(dataset: EmissionDataset) -> Self {
        match serde_json::to_value(dataset) {
            Ok(value) => RawDataset::Value(value),
            Err(_) => RawDataset::Missing,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Output of the ingestion stage.
#[derive(Debug, Clone, Default)]
pub struct IngestionOutput {
    pub summary: IngestionSummary,
    /// Normalized dataset with every factory's `region` filled in.
    pub dataset: EmissionDataset,
}

/// Parses and normalizes raw emission datasets.
pub struct IngestionAgent {
    core: AgentCore,
}

impl IngestionAgent {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new("DataCollector"),
        }
    }

    /// Fill factory regions and derive any missing totals.
    fn normalize(mut dataset: EmissionDataset) -> IngestionOutput {
        let mut regions_with_factories = Vec::new();
        let mut derived_count = 0u64;
        let mut derived_total = 0.0;

        for region in &mut dataset.region_results {
            for factory in &mut region.factories {
                factory.region = region.region.clone();
            }

            let factory_count = if region.factory_count > 0 {
                region.factory_count
            } else {
                region.factories.len() as u64
            };
            let total_emissions = if region.total_annual_emissions_ton != 0.0 {
                region.total_annual_emissions_ton
            } else {
                region.factories.iter().map(|f| f.annual_emissions_ton).sum()
            };

            derived_count += factory_count;
            derived_total += total_emissions;

            if factory_count > 0 {
                regions_with_factories.push(RegionSummary {
                    name: region.region.clone(),
                    factory_count,
                    total_emissions,
                });
            } else {
                debug!("Skipping region '{}' with no factories", region.region);
            }
        }

        let total_factory_count = dataset.total_factory_count.unwrap_or(derived_count);
        let total_annual_emissions = dataset.total_annual_emissions_ton.unwrap_or(derived_total);
        let average_annual_emissions = dataset
            .average_annual_emissions_ton
            .unwrap_or_else(|| safe_ratio(total_annual_emissions, total_factory_count as f64));

        IngestionOutput {
            summary: IngestionSummary {
                total_factory_count,
                total_annual_emissions,
                average_annual_emissions,
                regions_with_factories,
            },
            dataset,
        }
    }
}

impl Default for IngestionAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for IngestionAgent {
    type Input = RawDataset;
    type Output = IngestionOutput;

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn process(&mut self, input: &RawDataset) -> IngestionOutput {
        let output = match input.parse() {
            Ok(dataset) => Self::normalize(dataset),
            Err(e) => {
                warn!("Ingestion failed, continuing with an empty dataset: {}", e);
                IngestionOutput {
                    summary: IngestionSummary::zero(),
                    dataset: EmissionDataset::default(),
                }
            }
        };

        info!(
            "Ingested {} factories across {} regions",
            output.summary.total_factory_count,
            output.summary.regions_with_factories.len()
        );

        self.remember("processed_data", &output.summary);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "total_factory_count": 3,
            "total_annual_emissions_ton": 3500.0,
            "average_annual_emissions_ton": 1166.67,
            "region_results": [
                {
                    "region": "Kocaeli, Turkey",
                    "factory_count": 2,
                    "total_annual_emissions_ton": 3000.0,
                    "factories": [
                        {"id": 1, "name": "A", "type": "cement", "size_m2": 10000, "annual_emissions_ton": 1000.0},
                        {"id": 2, "name": "B", "type": "steel", "size_m2": 20000, "annual_emissions_ton": 2000.0}
                    ]
                },
                {"region": "Van", "factory_count": 0, "total_annual_emissions_ton": 0.0, "factories": []},
                {
                    "region": "Konya",
                    "factory_count": 1,
                    "total_annual_emissions_ton": 500.0,
                    "factories": [{"id": "k1", "name": "C", "type": "food", "size_m2": 4000, "annual_emissions_ton": 500.0}]
                }
            ]
        })
    }

    #[test]
    fn test_summary_from_value() {
        let mut agent = IngestionAgent::new();
        let output = agent.process(&RawDataset::Value(sample()));

        assert_eq!(output.summary.total_factory_count, 3);
        assert_eq!(output.summary.total_annual_emissions, 3500.0);
        assert_eq!(output.summary.average_annual_emissions, 1166.67);

        let names: Vec<_> = output
            .summary
            .regions_with_factories
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Kocaeli, Turkey", "Konya"]);
    }

    #[test]
    fn test_factory_region_filled() {
        let mut agent = IngestionAgent::new();
        let output = agent.process(&RawDataset::Value(sample()));

        let regions: Vec<_> = output.dataset.factories().map(|f| f.region.as_str()).collect();
        assert_eq!(regions, vec!["Kocaeli, Turkey", "Kocaeli, Turkey", "Konya"]);
    }

    #[test]
    fn test_missing_totals_are_derived() {
        let raw = json!({
            "region_results": [{
                "region": "Bursa",
                "factories": [
                    {"name": "A", "annual_emissions_ton": 100.0},
                    {"name": "B", "annual_emissions_ton": 300.0}
                ]
            }]
        });

        let mut agent = IngestionAgent::new();
        let summary = agent.process(&RawDataset::Value(raw)).summary;

        assert_eq!(summary.total_factory_count, 2);
        assert_eq!(summary.total_annual_emissions, 400.0);
        assert_eq!(summary.average_annual_emissions, 200.0);
        assert_eq!(summary.regions_with_factories[0].factory_count, 2);
    }

    #[test]
    fn test_malformed_text_yields_zero_summary() {
        let mut agent = IngestionAgent::new();
        let output = agent.process(&RawDataset::Text("{not json".to_string()));

        assert_eq!(output.summary, IngestionSummary::zero());
        assert!(output.dataset.is_empty());
    }

    #[test]
    fn test_non_object_and_missing_yield_zero_summary() {
        let mut agent = IngestionAgent::new();

        let array = agent.process(&RawDataset::Value(json!([1, 2, 3])));
        assert_eq!(array.summary, IngestionSummary::zero());

        let missing = agent.process(&RawDataset::Missing);
        assert_eq!(missing.summary, IngestionSummary::zero());
    }

    #[test]
    fn test_malformed_factory_keeps_the_rest() {
        let raw = json!({
            "region_results": [{
                "region": "Kocaeli",
                "factory_count": 3,
                "total_annual_emissions_ton": null,
                "factories": [
                    {"id": 1, "name": "A", "type": "steel", "size_m2": 12000, "annual_emissions_ton": 900.0},
                    {"id": 2, "name": "B", "type": "cement", "size_m2": null, "annual_emissions_ton": 600.0},
                    "not a factory"
                ]
            }]
        });

        let mut agent = IngestionAgent::new();
        let output = agent.process(&RawDataset::Value(raw));

        assert_eq!(output.dataset.factories().count(), 2);
        assert_eq!(output.summary.total_factory_count, 3);
        assert_eq!(output.summary.total_annual_emissions, 1500.0);
        assert_eq!(output.summary.regions_with_factories[0].name, "Kocaeli");
    }

    #[test]
    fn test_empty_regions() {
        let mut agent = IngestionAgent::new();
        let output = agent.process(&RawDataset::Text(r#"{"region_results": []}"#.to_string()));

        assert_eq!(output.summary.total_factory_count, 0);
        assert_eq!(output.summary.total_annual_emissions, 0.0);
        assert_eq!(output.summary.average_annual_emissions, 0.0);
    }

    #[test]
    fn test_records_processed_data() {
        let mut agent = IngestionAgent::new();
        agent.process(&RawDataset::Value(sample()));

        let stored = agent.get_knowledge("processed_data").unwrap();
        assert_eq!(stored["total_factory_count"], 3);
    }
}
