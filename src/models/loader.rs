//! ONNX model loader and the process-wide model cache

use crate::config::ArtifactsConfig;
use crate::error::PipelineError;
use crate::models::fetcher::ArtifactFetcher;
use crate::models::inference::{Classifier, ModelSet, OnnxClassifier, OnnxTransform, Transform};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session (running needs exclusive access)
    pub session: Mutex<Session>,
    /// Input name for the model
    pub input_name: String,
    /// Output the result is read from
    pub output_name: String,
    /// Trailing dimension of the input tensor, when the graph fixes it
    pub input_dimension: Option<usize>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file.
    ///
    /// The result is read from the first output whose name contains
    /// `output_hint`, falling back to the first output.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        output_hint: &str,
    ) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input = session
            .inputs
            .first()
            .context("Model declares no inputs")?;
        let input_name = input.name.clone();
        let input_dimension = input
            .input_type
            .tensor_shape()
            .and_then(|dims| dims.last().copied())
            .filter(|&d| d > 0)
            .map(|d| d as usize);

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains(output_hint))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .context("Model declares no outputs")?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            input_dimension = ?input_dimension,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
            input_dimension,
        })
    }
}

/// Turns a local artifact file into a model.
pub trait ArtifactDecoder: Send + Sync {
    fn decode_transform(&self, name: &str, path: &Path) -> Result<Arc<dyn Transform>, PipelineError>;

    fn decode_classifier(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<Arc<dyn Classifier>, PipelineError>;
}

impl ArtifactDecoder for ModelLoader {
    fn decode_transform(&self, name: &str, path: &Path) -> Result<Arc<dyn Transform>, PipelineError> {
        let model = self
            .load_model(path, name, "variable")
            .map_err(|e| PipelineError::load(name, path, e))?;
        Ok(Arc::new(OnnxTransform::new(model)))
    }

    fn decode_classifier(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<Arc<dyn Classifier>, PipelineError> {
        let model = self
            .load_model(path, name, "label")
            .map_err(|e| PipelineError::load(name, path, e))?;
        Ok(Arc::new(OnnxClassifier::new(model)))
    }
}

/// Outcome of the one-time model load
#[derive(Clone)]
pub enum ModelAvailability {
    Ready(Arc<ModelSet>),
    /// Prediction is disabled for the lifetime of the process
    Unavailable { reason: String },
}

impl ModelAvailability {
    pub fn models(&self) -> Option<&Arc<ModelSet>> {
        match self {
            ModelAvailability::Ready(models) => Some(models),
            ModelAvailability::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelAvailability::Ready(_))
    }
}

/// Fetches and decodes the three artifacts at most once.
pub struct ModelCache<D> {
    fetcher: ArtifactFetcher,
    decoder: D,
    artifacts: ArtifactsConfig,
    loaded: OnceCell<ModelAvailability>,
}

impl<D: ArtifactDecoder> ModelCache<D> {
    pub fn new(fetcher: ArtifactFetcher, decoder: D, artifacts: ArtifactsConfig) -> Self {
        Self {
            fetcher,
            decoder,
            artifacts,
            loaded: OnceCell::new(),
        }
    }

    /// Load all models, or return the outcome of the earlier load.
    ///
    /// Any single failure makes the whole set unavailable; it is logged once.
    pub async fn load_models(&self) -> &ModelAvailability {
        self.loaded
            .get_or_init(|| async {
                match self.try_load().await {
                    Ok(models) => ModelAvailability::Ready(models),
                    Err(e) => {
                        error!(error = %e, "Error loading models, prediction disabled");
                        ModelAvailability::Unavailable {
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .await
    }

    async fn try_load(&self) -> Result<Arc<ModelSet>, PipelineError> {
        let artifacts = &self.artifacts;
        let scaler_path = artifacts.local_path(&artifacts.scaler);
        let alcohol_path = artifacts.local_path(&artifacts.alcohol);
        let smoke_path = artifacts.local_path(&artifacts.smoke);

        self.fetcher
            .ensure_local(&artifacts.scaler.remote_id, &scaler_path)
            .await?;
        self.fetcher
            .ensure_local(&artifacts.alcohol.remote_id, &alcohol_path)
            .await?;
        self.fetcher
            .ensure_local(&artifacts.smoke.remote_id, &smoke_path)
            .await?;

        let models = ModelSet::new(
            self.decoder.decode_transform("scaler", &scaler_path)?,
            self.decoder.decode_classifier("alcohol", &alcohol_path)?,
            self.decoder.decode_classifier("smoke", &smoke_path)?,
        );
        models.validate()?;

        info!("Scaler and both classifiers loaded; input width matches feature schema");
        Ok(Arc::new(models))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedScaler(Option<usize>);

    impl Transform for FixedScaler {
        fn input_dimension(&self) -> Option<usize> {
            self.0
        }

        fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
            Ok(features.to_vec())
        }
    }

    struct FixedClassifier(String, f64);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            &self.0
        }

        fn classify(&self, _features: &[f32]) -> Result<f64, PipelineError> {
            Ok(self.1)
        }
    }

    /// Decoder that counts calls and can be told to fail one artifact
    #[derive(Default)]
    struct CountingDecoder {
        decodes: AtomicUsize,
        fail: Option<&'static str>,
        scaler_width: Option<usize>,
    }

    impl CountingDecoder {
        fn check(&self, name: &str, path: &Path) -> Result<(), PipelineError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            assert!(path.exists(), "{} decoded before it was fetched", path.display());
            if self.fail == Some(name) {
                return Err(PipelineError::load(name, path, "corrupt artifact"));
            }
            Ok(())
        }
    }

    impl ArtifactDecoder for CountingDecoder {
        fn decode_transform(
            &self,
            name: &str,
            path: &Path,
        ) -> Result<Arc<dyn Transform>, PipelineError> {
            self.check(name, path)?;
            Ok(Arc::new(FixedScaler(self.scaler_width.or(Some(22)))))
        }

        fn decode_classifier(
            &self,
            name: &str,
            path: &Path,
        ) -> Result<Arc<dyn Classifier>, PipelineError> {
            self.check(name, path)?;
            let label = if name == "alcohol" { 0.0 } else { 1.0 };
            Ok(Arc::new(FixedClassifier(name.to_string(), label)))
        }
    }

    /// Artifacts config whose files already exist, so no download happens
    fn cached_artifacts(dir: &TempDir) -> ArtifactsConfig {
        let mut artifacts = crate::config::AppConfig::default().artifacts;
        artifacts.models_dir = dir.path().to_string_lossy().into_owned();
        // Unroutable: any network access fails the test
        artifacts.url_template = "http://127.0.0.1:9/{id}".to_string();
        for spec in [&artifacts.scaler, &artifacts.alcohol, &artifacts.smoke] {
            std::fs::write(artifacts.local_path(spec), b"onnx").unwrap();
        }
        artifacts
    }

    fn cache(artifacts: ArtifactsConfig, decoder: CountingDecoder) -> ModelCache<CountingDecoder> {
        let fetcher = ArtifactFetcher::new(artifacts.url_template.clone(), None).unwrap();
        ModelCache::new(fetcher, decoder, artifacts)
    }

    #[tokio::test]
    async fn test_models_load_once() {
        let dir = TempDir::new().unwrap();
        let cache = cache(cached_artifacts(&dir), CountingDecoder::default());

        let first = cache.load_models().await.models().cloned().unwrap();
        let second = cache.load_models().await.models().cloned().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.scaler, &second.scaler));
        assert_eq!(cache.decoder.decodes.load(Ordering::SeqCst), 3);
        assert_eq!(first.alcohol.name(), "alcohol");
        assert_eq!(first.smoke.name(), "smoke");
    }

    #[tokio::test]
    async fn test_single_failure_disables_everything() {
        let dir = TempDir::new().unwrap();
        let decoder = CountingDecoder {
            fail: Some("smoke"),
            ..Default::default()
        };
        let cache = cache(cached_artifacts(&dir), decoder);

        match cache.load_models().await {
            ModelAvailability::Unavailable { reason } => assert!(reason.contains("smoke")),
            ModelAvailability::Ready(_) => panic!("load should have failed"),
        }
        assert!(!cache.load_models().await.is_ready());
        assert_eq!(cache.decoder.decodes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_schema_width_mismatch_fails_fast() {
        let dir = TempDir::new().unwrap();
        let decoder = CountingDecoder {
            scaler_width: Some(21),
            ..Default::default()
        };
        let cache = cache(cached_artifacts(&dir), decoder);

        match cache.load_models().await {
            ModelAvailability::Unavailable { reason } => {
                assert!(reason.contains("feature count mismatch"), "{reason}")
            }
            ModelAvailability::Ready(_) => panic!("width mismatch should disable prediction"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut artifacts = crate::config::AppConfig::default().artifacts;
        artifacts.models_dir = dir.path().join("model_data").to_string_lossy().into_owned();
        artifacts.url_template = "http://127.0.0.1:9/{id}".to_string();
        let cache = cache(artifacts, CountingDecoder::default());

        let availability = cache.load_models().await;
        assert!(!availability.is_ready());
        assert_eq!(cache.decoder.decodes.load(Ordering::SeqCst), 0);
    }
}
