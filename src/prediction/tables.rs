//! Constant tables for the prediction strategies.
//!
//! Every strategy reads its constants from one of the structs below so that
//! tests and configuration can swap them out. The defaults reproduce the
//! values the models were originally calibrated with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Normalize a city or sector name for table lookups.
///
/// Keeps the part before the first comma, trims it, lowercases it and folds
/// Turkish diacritics, so `"İzmir, Türkiye"` and `"izmir"` resolve alike.
pub fn fold_key(name: &str) -> String {
    let head = name.split(',').next().unwrap_or("").trim();
    head.chars()
        .flat_map(|c| {
            let folded = match c {
                'İ' | 'I' | 'ı' | 'Î' | 'î' => 'i',
                'Ş' | 'ş' => 's',
                'Ğ' | 'ğ' => 'g',
                'Ü' | 'ü' | 'Û' | 'û' => 'u',
                'Ö' | 'ö' => 'o',
                'Ç' | 'ç' => 'c',
                'Â' | 'â' => 'a',
                other => other,
            };
            folded.to_lowercase()
        })
        .collect()
}

/// Lookup table with an explicit default for unlisted keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    entries: HashMap<String, f64>,
    default: f64,
}

impl FactorTable {
    pub fn new(default: f64) -> Self {
        Self {
            entries: HashMap::new(),
            default,
        }
    }

    pub fn from_pairs(pairs: &[(&str, f64)], default: f64) -> Self {
        let mut table = Self::new(default);
        for (key, value) in pairs {
            table.insert(key, *value);
        }
        table
    }

    /// Insert or overwrite an entry. The key is folded.
    pub fn insert(&mut self, key: &str, value: f64) {
        self.entries.insert(fold_key(key), value);
    }

    pub fn lookup(&self, key: &str) -> f64 {
        self.entries
            .get(&fold_key(key))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&fold_key(key))
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Multiplicative envelope relative to the current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampBounds {
    pub min: f64,
    pub max: f64,
}

impl ClampBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `predicted` into `[current × min, current × max]`.
    pub fn apply(&self, current: f64, predicted: f64) -> f64 {
        predicted.max(current * self.min).min(current * self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Technology-investment tier of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TechLevel {
    Low,
    Medium,
    High,
}

impl TechLevel {
    pub const ALL: [TechLevel; 3] = [TechLevel::Low, TechLevel::Medium, TechLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TechLevel::Low => "low",
            TechLevel::Medium => "medium",
            TechLevel::High => "high",
        }
    }
}

impl fmt::Display for TechLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TechLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TechLevel::Low),
            "medium" => Ok(TechLevel::Medium),
            "high" => Ok(TechLevel::High),
            other => Err(format!("unknown tech level '{}'", other)),
        }
    }
}

/// Emission multiplier per technology tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechFactors {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl TechFactors {
    pub fn factor(&self, level: TechLevel) -> f64 {
        match level {
            TechLevel::Low => self.low,
            TechLevel::Medium => self.medium,
            TechLevel::High => self.high,
        }
    }
}

/// Cities treated as developed by the policy factor.
pub const DEVELOPED_CITIES: [&str; 5] = ["İstanbul", "Ankara", "İzmir", "Bursa", "Kocaeli"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFactorTables {
    /// Yearly carbon-intensity trend (negative means improving).
    pub historical_trend: f64,
    /// Yearly industrial production correction applied to city growth.
    pub industrial_correction: f64,
    /// Yearly renewable-share growth.
    pub renewable_growth: f64,
    /// Fraction of renewable growth that offsets emissions.
    pub renewable_weight: f64,
    pub city_growth: FactorTable,
    pub sector_green: FactorTable,
    pub air_quality: FactorTable,
    pub developed_cities: Vec<String>,
    pub developed_policy: f64,
    pub other_policy: f64,
    /// Half-width of the uniform random factor around 1.
    pub jitter: f64,
}

impl MultiFactorTables {
    pub fn is_developed(&self, city: &str) -> bool {
        let key = fold_key(city);
        self.developed_cities.iter().any(|c| fold_key(c) == key)
    }
}

impl Default for MultiFactorTables {
    fn default() -> Self {
        Self {
            historical_trend: -0.03175,
            industrial_correction: -0.0075,
            renewable_growth: 0.01375,
            renewable_weight: 0.3,
            city_growth: FactorTable::from_pairs(
                &[
                    ("İstanbul", 0.98),
                    ("Ankara", 1.02),
                    ("İzmir", 1.01),
                    ("Bursa", 1.03),
                    ("Kocaeli", 1.04),
                    ("Gaziantep", 1.05),
                    ("Konya", 1.02),
                    ("Adana", 1.01),
                    ("Antalya", 0.99),
                    ("Diyarbakır", 1.03),
                    ("Mersin", 1.02),
                    ("Kayseri", 1.02),
                    ("Eskişehir", 1.01),
                    ("Denizli", 1.01),
                    ("Samsun", 1.00),
                    ("Malatya", 1.01),
                    ("Van", 1.02),
                    ("Kahramanmaraş", 1.02),
                    ("Erzurum", 1.01),
                    ("Şanlıurfa", 1.04),
                ],
                1.00,
            ),
            sector_green: FactorTable::from_pairs(
                &[
                    ("textile", 0.92),
                    ("food", 0.96),
                    ("chemical", 0.88),
                    ("metal", 0.90),
                    ("automotive", 0.85),
                    ("cement", 0.93),
                    ("paper", 0.94),
                    ("plastic", 0.91),
                    ("electronics", 0.89),
                ],
                0.95,
            ),
            air_quality: FactorTable::from_pairs(
                &[
                    ("İstanbul", 0.88),
                    ("Ankara", 0.90),
                    ("Bursa", 0.89),
                    ("Kocaeli", 0.87),
                    ("Adana", 0.89),
                    ("Gaziantep", 0.86),
                    ("Konya", 0.91),
                    ("Kayseri", 0.90),
                    ("İzmir", 0.92),
                    ("Antalya", 0.94),
                    ("Mersin", 0.91),
                    ("Diyarbakır", 0.90),
                    ("Samsun", 0.93),
                    ("Denizli", 0.92),
                    ("Malatya", 0.91),
                    ("Eskişehir", 0.92),
                    ("Erzurum", 0.95),
                    ("Van", 0.94),
                    ("Şanlıurfa", 0.92),
                    ("Kahramanmaraş", 0.90),
                ],
                0.92,
            ),
            developed_cities: DEVELOPED_CITIES.iter().map(|c| c.to_string()).collect(),
            developed_policy: 0.92,
            other_policy: 0.97,
            jitter: 0.015,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicTables {
    pub sector_growth: FactorTable,
    pub tech_factors: TechFactors,
    pub regulation: f64,
    pub economic_growth: f64,
    pub jitter: f64,
    pub clamp: ClampBounds,
}

impl Default for HeuristicTables {
    fn default() -> Self {
        Self {
            sector_growth: FactorTable::from_pairs(
                &[
                    ("chemical", 0.058),
                    ("steel", 0.038),
                    ("cement", 0.015),
                    ("automotive", 0.052),
                    ("textile", -0.015),
                    ("food", 0.032),
                    ("electronics", 0.078),
                    ("metal", 0.042),
                    ("glass", 0.025),
                    ("paper", -0.012),
                    ("plastic", 0.048),
                    ("machinery", 0.055),
                    ("furniture", 0.035),
                    ("factory", 0.038),
                    ("manufacturing", 0.044),
                ],
                0.038,
            ),
            tech_factors: TechFactors {
                low: 0.98,
                medium: 0.92,
                high: 0.85,
            },
            regulation: 0.96,
            economic_growth: 1.035,
            jitter: 0.05,
            clamp: ClampBounds::new(0.5, 1.5),
        }
    }
}

/// Sectors one-hot encoded in the ensemble's feature rows, in column order.
pub const ENSEMBLE_SECTORS: [&str; 15] = [
    "chemical",
    "steel",
    "cement",
    "automotive",
    "textile",
    "food",
    "electronics",
    "metal",
    "glass",
    "paper",
    "plastic",
    "machinery",
    "furniture",
    "factory",
    "manufacturing",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleTables {
    pub sector_growth: FactorTable,
    /// One-hot encoded sector columns.
    pub sectors: Vec<String>,
    /// Number of synthesized yearly points preceding the target year.
    pub history_years: u32,
    /// Yearly technology improvement; `tech_factor = 1 - drift·k` for the
    /// point `k` years back.
    pub tech_drift: f64,
    /// GDP growth feature of the synthesized history.
    pub gdp_growth: f64,
    /// Yearly regulation loosening going back; `1 + drift·k`.
    pub regulation_drift: f64,
    /// Half-width of the per-point uniform variation around 1.
    pub variation: f64,
    /// Tier multipliers used as the target year's technology feature.
    pub tech_factors: TechFactors,
    /// GDP growth feature of the target year.
    pub forecast_gdp_growth: f64,
    /// Regulation feature of the target year.
    pub forecast_regulation: f64,
    /// Share of the synthesized rows held out to score the regressors.
    pub test_fraction: f64,
    pub trees: usize,
    pub max_depth: usize,
    /// Weight of the forest in the blend; the linear model gets the rest.
    pub forest_weight: f64,
    pub clamp: ClampBounds,
}

impl Default for EnsembleTables {
    fn default() -> Self {
        Self {
            sector_growth: FactorTable::from_pairs(
                &[
                    ("chemical", 0.065),
                    ("steel", 0.042),
                    ("cement", 0.018),
                    ("automotive", 0.058),
                    ("textile", -0.012),
                    ("food", 0.035),
                    ("electronics", 0.085),
                    ("metal", 0.045),
                    ("glass", 0.028),
                    ("paper", -0.008),
                    ("plastic", 0.052),
                    ("machinery", 0.061),
                    ("furniture", 0.038),
                    ("factory", 0.041),
                    ("manufacturing", 0.047),
                ],
                0.041,
            ),
            sectors: ENSEMBLE_SECTORS.iter().map(|s| s.to_string()).collect(),
            history_years: 6,
            tech_drift: 0.02,
            gdp_growth: 0.045,
            regulation_drift: 0.015,
            variation: 0.1,
            tech_factors: TechFactors {
                low: 0.95,
                medium: 0.88,
                high: 0.75,
            },
            forecast_gdp_growth: 0.042,
            forecast_regulation: 0.92,
            test_fraction: 0.2,
            trees: 100,
            max_depth: 10,
            forest_weight: 0.7,
            clamp: ClampBounds::new(0.3, 3.0),
        }
    }
}

/// All strategy tables bundled together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyTables {
    pub multi_factor: MultiFactorTables,
    pub heuristic: HeuristicTables,
    pub ensemble: EnsembleTables,
}
