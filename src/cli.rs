//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Every option is optional so that unset flags fall
//! through to `.carbon-forecast.toml` and then to built-in defaults.

use crate::prediction::{StrategyKind, TechLevel};
use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

/// carbon-forecast - emission forecasts and sustainability reports
///
/// Runs the five-stage forecasting pipeline (ingest, analyze, predict,
/// recommend, report) over one emission dataset or a directory of them.
///
/// Examples:
///   carbon-forecast --input data/marmara.json
///   carbon-forecast --input data/marmara.json --strategy bounded-heuristic --seed 7
///   carbon-forecast --input data/ --output reports/ --format json --concurrency 8
///   carbon-forecast --input data/marmara.json --narrative --model llama3.2:latest
///   carbon-forecast --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Emission dataset (JSON file) or directory of datasets
    #[arg(short, long, value_name = "PATH", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Report file, or output directory when the input is a directory
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Prediction strategy
    #[arg(short, long, value_name = "STRATEGY", env = "CARBON_FORECAST_STRATEGY")]
    pub strategy: Option<StrategyKind>,

    /// Seed for every random draw in the pipeline
    ///
    /// Batch runs add the dataset's index to this seed.
    #[arg(long, value_name = "SEED", env = "CARBON_FORECAST_SEED")]
    pub seed: Option<u64>,

    /// Year to forecast (default: next calendar year)
    #[arg(long, value_name = "YEAR")]
    pub target_year: Option<i32>,

    /// Force the technology tier of the heuristic and ensemble strategies
    #[arg(long, value_name = "LEVEL")]
    pub tech_level: Option<TechLevel>,

    /// Report title
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .carbon-forecast.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of datasets forecast concurrently in batch mode
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Ask the narrative service for the executive summary and conclusion
    #[arg(long, conflicts_with = "no_narrative")]
    pub narrative: bool,

    /// Always use the templated executive summary and conclusion
    #[arg(long, conflicts_with = "narrative")]
    pub no_narrative: bool,

    /// Ollama API endpoint URL for the narrative service
    #[arg(long, value_name = "URL", env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Model used by the narrative service
    #[arg(short, long, value_name = "MODEL", env = "CARBON_FORECAST_MODEL")]
    pub model: Option<String>,

    /// Narrative request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Generate a default .carbon-forecast.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input does not exist: {}", input.display()));
            }
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(year) = self.target_year {
            if !(1900..=2200).contains(&year) {
                return Err(format!("Target year {} is out of range (1900-2200)", year));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            output: None,
            format: None,
            strategy: None,
            seed: None,
            target_year: None,
            tech_level: None,
            title: None,
            config: None,
            verbose: false,
            quiet: false,
            concurrency: None,
            narrative: false,
            no_narrative: false,
            ollama_url: None,
            model: None,
            timeout: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "carbon-forecast",
            "--input",
            ".",
            "--strategy",
            "statistical-ensemble",
            "--tech-level",
            "high",
            "--format",
            "json",
            "--seed",
            "9",
        ])
        .unwrap();

        assert_eq!(args.strategy, Some(StrategyKind::StatisticalEnsemble));
        assert_eq!(args.tech_level, Some(TechLevel::High));
        assert_eq!(args.format, Some(ReportFormat::Json));
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_input_required_unless_init_config() {
        assert!(Args::try_parse_from(["carbon-forecast"]).is_err());
        assert!(Args::try_parse_from(["carbon-forecast", "--init-config"]).is_ok());
    }

    #[test]
    fn test_narrative_flags_conflict() {
        let result = Args::try_parse_from([
            "carbon-forecast",
            "--input",
            ".",
            "--narrative",
            "--no-narrative",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.target_year = Some(12);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.target_year = Some(2030);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
