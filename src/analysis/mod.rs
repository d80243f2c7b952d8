//! Emission statistics shared by the analysis stage and report rendering.

pub mod aggregator;

pub use aggregator::*;
