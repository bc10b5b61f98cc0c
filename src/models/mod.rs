//! Artifact fetching, model loading and inference

pub mod fetcher;
pub mod inference;
pub mod loader;

pub use fetcher::ArtifactFetcher;
pub use inference::{Classifier, InferenceEngine, ModelSet, Transform};
pub use loader::{ArtifactDecoder, ModelAvailability, ModelCache, ModelLoader};
