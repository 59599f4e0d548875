//! Multi-pass beamify driver: blob decomposition, parallel solving, and pass merging.
#![forbid(unsafe_code)]

pub mod assemble;
pub mod blobs;
pub mod config;
pub mod labeled;
pub mod orchestrator;

pub use assemble::{PassAssembler, completed_beams};
pub use blobs::{Blob, decompose, kmeans_split};
pub use config::BeamifyConfig;
pub use labeled::LabeledField;
pub use orchestrator::{BeamifyError, BeamifyReport, Beamifier, PassReport};
