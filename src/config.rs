//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.carbon-forecast.toml` files.

use crate::analysis::{AnalysisThresholds, DEFAULT_TOP_N, HIGH_RISK_MULTIPLIER, LOW_RISK_MULTIPLIER};
use crate::error::ConfigError;
use crate::pipeline::{default_target_year, PipelineOptions, DEFAULT_SEED};
use crate::prediction::tables::{EnsembleTables, HeuristicTables, MultiFactorTables};
use crate::prediction::{ClampBounds, StrategyKind, StrategyTables, TechLevel};
use crate::report::{NarratorConfig, ReportFormat, DEFAULT_TITLE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".carbon-forecast.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub prediction: PredictionConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report path for a single dataset; directory for batch runs.
    #[serde(default = "default_output")]
    pub output: String,

    /// Number of datasets forecast concurrently in batch mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "carbon_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Forecasting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Defaults to next calendar year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_year: Option<i32>,

    /// Forces the heuristic and ensemble technology tier instead of drawing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_level: Option<TechLevel>,

    /// Half-width of the multi-factor random variation.
    #[serde(default = "default_multi_factor_jitter")]
    pub multi_factor_jitter: f64,

    /// Half-width of the bounded heuristic random variation.
    #[serde(default = "default_heuristic_jitter")]
    pub heuristic_jitter: f64,

    #[serde(default = "default_heuristic_clamp")]
    pub heuristic_clamp: ClampBounds,

    #[serde(default = "default_ensemble_clamp")]
    pub ensemble_clamp: ClampBounds,

    /// Trees in the ensemble's random forest.
    #[serde(default = "default_ensemble_trees")]
    pub ensemble_trees: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            seed: default_seed(),
            target_year: None,
            tech_level: None,
            multi_factor_jitter: default_multi_factor_jitter(),
            heuristic_jitter: default_heuristic_jitter(),
            heuristic_clamp: default_heuristic_clamp(),
            ensemble_clamp: default_ensemble_clamp(),
            ensemble_trees: default_ensemble_trees(),
        }
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_multi_factor_jitter() -> f64 {
    MultiFactorTables::default().jitter
}

fn default_heuristic_jitter() -> f64 {
    HeuristicTables::default().jitter
}

fn default_heuristic_clamp() -> ClampBounds {
    HeuristicTables::default().clamp
}

fn default_ensemble_clamp() -> ClampBounds {
    EnsembleTables::default().clamp
}

fn default_ensemble_trees() -> usize {
    EnsembleTables::default().trees
}

/// Regional risk classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Regions listed in each ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_high_risk")]
    pub high_risk_multiplier: f64,

    #[serde(default = "default_low_risk")]
    pub low_risk_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            high_risk_multiplier: default_high_risk(),
            low_risk_multiplier: default_low_risk(),
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_high_risk() -> f64 {
    HIGH_RISK_MULTIPLIER
}

fn default_low_risk() -> f64 {
    LOW_RISK_MULTIPLIER
}

/// Narrative service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Ask the service for the executive summary and conclusion.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ollama_url: default_ollama_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_ollama_url() -> String {
    NarratorConfig::default().ollama_url
}

fn default_model() -> String {
    NarratorConfig::default().model_name
}

fn default_temperature() -> f32 {
    NarratorConfig::default().temperature
}

fn default_timeout() -> u64 {
    NarratorConfig::default().timeout_seconds
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            format: ReportFormat::default(),
        }
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence; only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.to_string_lossy().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(strategy) = args.strategy {
            self.prediction.strategy = strategy;
        }
        if let Some(seed) = args.seed {
            self.prediction.seed = seed;
        }
        if let Some(year) = args.target_year {
            self.prediction.target_year = Some(year);
        }
        if let Some(level) = args.tech_level {
            self.prediction.tech_level = Some(level);
        }

        if args.narrative {
            self.narrative.enabled = true;
        } else if args.no_narrative {
            self.narrative.enabled = false;
        }
        if let Some(ref url) = args.ollama_url {
            self.narrative.ollama_url = url.clone();
        }
        if let Some(ref model) = args.model {
            self.narrative.model = model.clone();
        }
        if let Some(timeout) = args.timeout {
            self.narrative.timeout_seconds = timeout;
        }

        if let Some(ref title) = args.title {
            self.report.title = title.clone();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.prediction;
        for (name, clamp) in [("heuristic", p.heuristic_clamp), ("ensemble", p.ensemble_clamp)] {
            if !clamp.is_valid() {
                return Err(ConfigError::InvalidClamp {
                    name,
                    min: clamp.min,
                    max: clamp.max,
                });
            }
        }

        for (name, value) in [
            ("multi_factor_jitter", p.multi_factor_jitter),
            ("heuristic_jitter", p.heuristic_jitter),
            ("narrative temperature", f64::from(self.narrative.temperature)),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }

        for (name, value) in [
            ("concurrency", self.general.concurrency),
            ("ensemble_trees", p.ensemble_trees),
            ("top_n", self.analysis.top_n),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }

        let a = &self.analysis;
        if a.low_risk_multiplier > a.high_risk_multiplier {
            return Err(ConfigError::RiskThresholds {
                low: a.low_risk_multiplier,
                high: a.high_risk_multiplier,
            });
        }

        Ok(())
    }

    /// Strategy tables with this configuration's overrides applied.
    pub fn strategy_tables(&self) -> StrategyTables {
        let p = &self.prediction;
        let mut tables = StrategyTables::default();
        tables.multi_factor.jitter = p.multi_factor_jitter;
        tables.heuristic.jitter = p.heuristic_jitter;
        tables.heuristic.clamp = p.heuristic_clamp;
        tables.ensemble.clamp = p.ensemble_clamp;
        tables.ensemble.trees = p.ensemble_trees;
        tables
    }

    /// Pipeline options for one run.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            strategy: self.prediction.strategy,
            seed: self.prediction.seed,
            target_year: self.prediction.target_year.unwrap_or_else(default_target_year),
            tech_level: self.prediction.tech_level,
            tables: self.strategy_tables(),
            thresholds: AnalysisThresholds {
                top_n: self.analysis.top_n,
                high_risk_multiplier: self.analysis.high_risk_multiplier,
                low_risk_multiplier: self.analysis.low_risk_multiplier,
            },
            title: self.report.title.clone(),
            ..PipelineOptions::default()
        }
    }

    pub fn narrator_config(&self) -> NarratorConfig {
        NarratorConfig {
            ollama_url: self.narrative.ollama_url.clone(),
            model_name: self.narrative.model.clone(),
            temperature: self.narrative.temperature,
            timeout_seconds: self.narrative.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.prediction.strategy, StrategyKind::MultiFactor);
        assert_eq!(config.prediction.seed, 42);
        assert_eq!(config.prediction.heuristic_clamp, ClampBounds::new(0.5, 1.5));
        assert_eq!(config.prediction.ensemble_clamp, ClampBounds::new(0.3, 3.0));
        assert!(!config.narrative.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "out/report.json"

[prediction]
strategy = "statistical_ensemble"
seed = 7
target_year = 2030
tech_level = "high"

[prediction.ensemble_clamp]
min = 0.5
max = 2.0

[report]
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "out/report.json");
        assert_eq!(config.prediction.strategy, StrategyKind::StatisticalEnsemble);
        assert_eq!(config.prediction.seed, 7);
        assert_eq!(config.prediction.target_year, Some(2030));
        assert_eq!(config.prediction.tech_level, Some(TechLevel::High));
        assert_eq!(config.prediction.ensemble_clamp, ClampBounds::new(0.5, 2.0));
        assert_eq!(config.report.format, ReportFormat::Json);
    }

    #[test]
    fn test_logging_is_not_configured_here() {
        // verbosity comes from --verbose/--quiet and RUST_LOG only
        assert!(!Config::default_toml().contains("verbose"));

        let config: Config = toml::from_str("[general]\nverbose = true\nconcurrency = 2\n").unwrap();
        assert_eq!(config.general.concurrency, 2);
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[prediction]\nseed = 3\n\n[narrative]\nenabled = true\n").unwrap();

        assert_eq!(config.prediction.seed, 3);
        assert_eq!(config.prediction.heuristic_clamp, ClampBounds::new(0.5, 1.5));
        assert_eq!(config.prediction.heuristic_jitter, 0.05);
        assert!(config.narrative.enabled);
        assert_eq!(config.narrative.ollama_url, "http://localhost:11434");
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.report.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.prediction.heuristic_clamp = ClampBounds::new(1.5, 0.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClamp { name: "heuristic", .. })
        ));

        let mut config = Config::default();
        config.prediction.multi_factor_jitter = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfUnitRange { .. })));

        let mut config = Config::default();
        config.general.concurrency = 0;
        assert_eq!(config.validate(), Err(ConfigError::Zero { name: "concurrency" }));

        let mut config = Config::default();
        config.analysis.low_risk_multiplier = 2.0;
        assert!(matches!(config.validate(), Err(ConfigError::RiskThresholds { .. })));
    }

    #[test]
    fn test_pipeline_options_carry_overrides() {
        let mut config = Config::default();
        config.prediction.seed = 11;
        config.prediction.target_year = Some(2031);
        config.prediction.heuristic_clamp = ClampBounds::new(0.9, 1.1);
        config.analysis.top_n = 3;
        config.report.title = "Marmara".to_string();

        let options = config.pipeline_options();
        assert_eq!(options.seed, 11);
        assert_eq!(options.target_year, 2031);
        assert_eq!(options.tables.heuristic.clamp, ClampBounds::new(0.9, 1.1));
        assert_eq!(options.tables.ensemble.clamp, ClampBounds::new(0.3, 3.0));
        assert_eq!(options.thresholds.top_n, 3);
        assert_eq!(options.title, "Marmara");
    }

    #[test]
    fn test_default_target_year_when_unset() {
        let options = Config::default().pipeline_options();
        assert_eq!(options.target_year, default_target_year());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[prediction]"));
        assert!(toml_str.contains("[narrative]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.prediction.seed, 42);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[general]\nconcurrency = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.general.concurrency, 2);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
