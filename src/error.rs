//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

use crate::types::prediction::LabelSource;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised between artifact download and result rendering.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or filesystem failure while downloading an artifact
    #[error("failed to fetch artifact `{remote_id}` into {}: {source}", path.display())]
    ArtifactFetch {
        remote_id: String,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// An artifact exists locally but could not be turned into a model
    #[error("failed to load model `{name}` from {}: {source}", path.display())]
    ModelLoad {
        name: String,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Feature vector width disagrees with what the scaler was fitted on
    #[error("feature count mismatch: model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The runtime failed while evaluating a loaded model
    #[error("inference failed in `{model}`: {reason}")]
    Inference { model: String, reason: String },

    /// A classifier returned a label with no documented meaning
    #[error("{model} model returned unrecognized label {value}")]
    UnknownLabel { model: LabelSource, value: f64 },
}

impl PipelineError {
    pub(crate) fn fetch(
        remote_id: &str,
        path: impl Into<PathBuf>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ArtifactFetch {
            remote_id: remote_id.to_string(),
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn load(name: &str, path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::ModelLoad {
            name: name.to_string(),
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn inference(model: &str, reason: impl ToString) -> Self {
        Self::Inference {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure belongs to one submission only (the form stays usable).
    pub fn is_per_request(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::Inference { .. } | Self::UnknownLabel { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = PipelineError::DimensionMismatch {
            expected: 22,
            actual: 21,
        };
        assert_eq!(
            err.to_string(),
            "feature count mismatch: model expects 22 features, got 21"
        );
        assert!(err.is_per_request());
    }

    #[test]
    fn test_load_failures_are_not_per_request() {
        let err = PipelineError::load("scaler", "model_data/scaler.bin", "corrupt header");
        assert!(!err.is_per_request());
        assert!(err.to_string().contains("model_data/scaler.bin"));
    }
}
