//! Macro what-if scenarios derived from the aggregate baseline.
//!
//! Each archetype is a fixed `(growth, reduction)` pair plus narrative text.
//! The narrative is static: it never looks at the numbers it is shown next
//! to, and nothing here asserts that the two agree.

use crate::models::percent_change;
use serde::{Deserialize, Serialize};

/// Static description of one scenario archetype.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioArchetype {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub growth_factor: f64,
    pub reduction_factor: f64,
    pub title: &'static str,
    pub probability: &'static str,
    pub impact: &'static str,
    pub drivers: &'static [&'static str],
    pub key_industries: &'static [&'static str],
    pub policy_requirements: &'static [&'static str],
    pub regional_impacts: &'static [&'static str],
}

pub const ARCHETYPES: [ScenarioArchetype; 5] = [
    ScenarioArchetype {
        key: "optimistic",
        name: "Optimistic",
        description: "High technology investment and low growth",
        growth_factor: 1.01,
        reduction_factor: 0.85,
        title: "Optimistic Scenario: Technology-Led Green Transition",
        probability: "Medium",
        impact: "High",
        drivers: &[
            "Faster shift to renewable energy sources",
            "Wider adoption of carbon capture technologies",
            "More energy efficiency projects",
            "Growth of circular economy practices",
            "Stronger incentives for low-carbon production",
        ],
        key_industries: &["Renewable Energy", "Technology", "R&D"],
        policy_requirements: &[
            "Carbon tax",
            "Renewable energy incentives",
            "Green transition funds",
            "Mandatory sustainability reporting",
        ],
        regional_impacts: &[
            "Economic revival in regions with high renewable potential",
            "Technology transformation in industrial regions",
            "Sustainable agriculture in rural areas",
            "Smart grid systems in cities",
        ],
    },
    ScenarioArchetype {
        key: "moderate",
        name: "Moderate",
        description: "Medium technology investment and medium growth",
        growth_factor: 1.03,
        reduction_factor: 0.95,
        title: "Moderate Scenario: Balanced Transition",
        probability: "High",
        impact: "Medium",
        drivers: &[
            "Gradual improvement of existing technologies",
            "Partial renewable energy integration",
            "Emission reduction efforts in selected sectors",
            "Balance between economic growth and sustainability",
            "Moderate policy changes",
        ],
        key_industries: &["Manufacturing", "Energy", "Logistics"],
        policy_requirements: &[
            "Gradual emission reduction targets",
            "Sector-specific incentives",
            "Energy efficiency standards",
            "Sustainable finance instruments",
        ],
        regional_impacts: &[
            "Gradual emission reduction in large cities",
            "Efficiency gains in industrial zones",
            "Regional disparities persist",
            "Partial transformation in energy-intensive regions",
        ],
    },
    ScenarioArchetype {
        key: "pessimistic",
        name: "Pessimistic",
        description: "Low technology investment and high growth",
        growth_factor: 1.05,
        reduction_factor: 0.98,
        title: "Pessimistic Scenario: Growth First",
        probability: "Low-Medium",
        impact: "Very High (Negative)",
        drivers: &[
            "Economic growth takes priority",
            "Continued reliance on fossil fuels",
            "Insufficient technology investment",
            "Postponed low-carbon policies",
            "Drift away from global climate targets",
        ],
        key_industries: &["Fossil Fuels", "Heavy Industry", "Construction"],
        policy_requirements: &[
            "Relaxed emission reduction targets",
            "Short-term economic incentives",
            "Lower environmental standards",
            "Support for carbon-intensive industries",
        ],
        regional_impacts: &[
            "Rising air pollution in industrial regions",
            "Emission growth in energy-intensive regions",
            "Environmental degradation in rural areas",
            "Widening regional inequality",
        ],
    },
    ScenarioArchetype {
        key: "disruptive_innovation",
        name: "Disruptive Innovation",
        description: "Unexpected breakthroughs in innovative technologies",
        growth_factor: 1.02,
        reduction_factor: 0.75,
        title: "Disruptive Scenario: Technological Breakthrough",
        probability: "Low",
        impact: "Very High (Positive)",
        drivers: &[
            "Major breakthrough in green hydrogen",
            "AI-assisted energy optimization",
            "Revolution in carbon capture technology",
            "Next-generation battery technologies",
            "Biotechnology-based industrial processes",
        ],
        key_industries: &["Green Technology", "Biotechnology", "Artificial Intelligence"],
        policy_requirements: &[
            "Increased R&D investment",
            "Tax exemptions for innovative technologies",
            "Support for pilot projects",
            "University-industry collaboration incentives",
        ],
        regional_impacts: &[
            "Economic revival in technology hubs",
            "Transformation of energy production regions",
            "Spread of smart city applications",
            "Formation of green technology clusters",
        ],
    },
    ScenarioArchetype {
        key: "climate_policy_shift",
        name: "Climate Policy Shift",
        description: "Fundamental change in international climate policy",
        growth_factor: 1.00,
        reduction_factor: 0.80,
        title: "Policy Shift Scenario: International Climate Movement",
        probability: "Medium",
        impact: "High",
        drivers: &[
            "Global carbon pricing mechanism",
            "Widespread carbon border adjustments",
            "Mandatory sustainability reporting",
            "More international climate finance",
            "Binding sector-level net-zero targets",
        ],
        key_industries: &["All Sectors", "Finance", "Consulting"],
        policy_requirements: &[
            "Full compliance with international agreements",
            "Updated national legislation",
            "Carbon accounting infrastructure",
            "Green transition support programmes",
        ],
        regional_impacts: &[
            "Emission reduction efforts in every region",
            "Rapid transformation in export-oriented regions",
            "Green criteria for public investment",
            "Regional emission trading systems",
        ],
    },
];

/// Static narrative attached to a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioNarrative {
    pub title: String,
    pub probability: String,
    pub impact: String,
    pub drivers: Vec<String>,
    pub key_industries: Vec<String>,
    pub policy_requirements: Vec<String>,
    pub regional_impacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub key: String,
    pub name: String,
    pub description: String,
    pub growth_factor: f64,
    pub reduction_factor: f64,
    pub predicted_total: f64,
    pub emission_change: f64,
    pub emission_change_percent: f64,
    pub narrative: ScenarioNarrative,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ScenarioArchetype {
    /// Project `current_total` under this archetype.
    pub fn project(&self, current_total: f64) -> Scenario {
        let predicted_total = current_total * self.growth_factor * self.reduction_factor;
        Scenario {
            key: self.key.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            growth_factor: self.growth_factor,
            reduction_factor: self.reduction_factor,
            predicted_total,
            emission_change: predicted_total - current_total,
            emission_change_percent: percent_change(current_total, predicted_total),
            narrative: ScenarioNarrative {
                title: self.title.to_string(),
                probability: self.probability.to_string(),
                impact: self.impact.to_string(),
                drivers: owned(self.drivers),
                key_industries: owned(self.key_industries),
                policy_requirements: owned(self.policy_requirements),
                regional_impacts: owned(self.regional_impacts),
            },
        }
    }
}

/// Produces the five archetype scenarios in fixed order.
pub fn generate_scenarios(current_total: f64) -> Vec<Scenario> {
    ARCHETYPES.iter().map(|a| a.project(current_total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_scenarios_in_order() {
        let keys: Vec<_> = generate_scenarios(1000.0).into_iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![
                "optimistic",
                "moderate",
                "pessimistic",
                "disruptive_innovation",
                "climate_policy_shift"
            ]
        );
    }

    #[test]
    fn test_predicted_total_is_exact_product() {
        let current = 123_456.789;
        for scenario in generate_scenarios(current) {
            assert_eq!(
                scenario.predicted_total,
                current * scenario.growth_factor * scenario.reduction_factor
            );
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(generate_scenarios(5000.0), generate_scenarios(5000.0));
    }

    #[test]
    fn test_known_values() {
        let scenarios = generate_scenarios(1000.0);
        assert!((scenarios[0].predicted_total - 858.5).abs() < 1e-9);
        assert!((scenarios[4].predicted_total - 800.0).abs() < 1e-9);
        assert!((scenarios[4].emission_change_percent + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_baseline() {
        for scenario in generate_scenarios(0.0) {
            assert_eq!(scenario.predicted_total, 0.0);
            assert_eq!(scenario.emission_change_percent, 0.0);
        }
    }

    #[test]
    fn test_narrative_does_not_depend_on_numbers() {
        let small = generate_scenarios(1.0);
        let large = generate_scenarios(1.0e9);
        for (a, b) in small.iter().zip(&large) {
            assert_eq!(a.narrative, b.narrative);
            assert_ne!(a.predicted_total, b.predicted_total);
        }
    }
}
