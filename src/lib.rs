//! Multi-agent carbon emission forecasting.
//!
//! A fixed pipeline of five agents turns an emission dataset into a
//! sustainability report: ingestion, analysis, prediction (with one of three
//! interchangeable strategies plus scenario projection), recommendation and
//! report assembly. See [`pipeline::ForecastPipeline`].

pub mod agent;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prediction;
pub mod report;
pub mod scanner;
pub mod scenario;

pub use pipeline::{run_pipeline, ForecastPipeline, PipelineOptions};
