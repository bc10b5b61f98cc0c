//! Type definitions for the prediction pipeline

pub mod prediction;
pub mod record;

pub use prediction::{LabelSource, PredictionResult, ResultPanel, StatusCard, Tone};
pub use record::{ClinicalRecord, Feature};
