//! Error types for the forecasting pipeline.
//!
//! None of these escape a pipeline run: ingestion failures collapse into a
//! zero-filled summary and narrative failures fall back to templated text.
//! They exist so the recovery sites can log what went wrong. Configuration
//! errors are the exception and stop the binary before any run starts.

use thiserror::Error;

/// Failure to normalize a raw dataset.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The payload was not valid JSON or did not match the canonical shape.
    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed but its top level is not a JSON object.
    #[error("dataset must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The dataset provider had nothing to hand over.
    #[error("no dataset supplied")]
    Missing,
}

/// Failure of the external narrative-generation service.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("narrative service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("narrative service returned an empty response")]
    EmptyResponse,
}

/// A configuration value outside its valid range.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {name} clamp bounds: min {min}, max {max}")]
    InvalidClamp { name: &'static str, min: f64, max: f64 },

    #[error("{name} must be between 0 and 1, got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("{name} must be at least 1")]
    Zero { name: &'static str },

    #[error("low risk multiplier {low} must not exceed high risk multiplier {high}")]
    RiskThresholds { low: f64, high: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_error_messages() {
        let err = IngestionError::NotAnObject("array");
        assert_eq!(err.to_string(), "dataset must be a JSON object, got array");
        assert_eq!(IngestionError::Missing.to_string(), "no dataset supplied");
    }

    #[test]
    fn test_malformed_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: IngestionError = parse_err.into();
        assert!(err.to_string().starts_with("malformed dataset:"));
    }

    #[test]
    fn test_narrative_status_message() {
        let err = NarrativeError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "narrative service returned 503: busy");
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::InvalidClamp {
            name: "heuristic",
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "invalid heuristic clamp bounds: min 2, max 1");
    }
}
