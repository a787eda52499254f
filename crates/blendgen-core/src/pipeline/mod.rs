pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{generate_parametric, generate_real};
pub use types::{SampleMetadata, SampleRecord, METADATA_KEYS};
