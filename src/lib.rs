//! Health Profile Predictor Library
//!
//! Collects a patient's clinical measurements through a web form, scales them
//! with a pre-trained transform and predicts alcohol-use and smoking status
//! with two pre-trained ONNX classifiers.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod form;
pub mod metrics;
pub mod models;
pub mod render;
pub mod schema;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::PipelineError;
pub use feature_extractor::FeatureAssembler;
pub use form::FormCollector;
pub use models::inference::InferenceEngine;
pub use server::{router, AppState};
pub use types::{prediction::PredictionResult, record::ClinicalRecord};
