//! Report rendering and the optional narrative service.

pub mod generator;
pub mod narrative;

pub use crate::agent::{NarrativeSource, ReportEnvelope};
pub use crate::agent::report::DEFAULT_TITLE;
pub use generator::*;
pub use narrative::{apply_narrative, NarrativeService, NarratorConfig, OllamaNarrator};
