//! Scaling and classification of assembled feature vectors

use crate::error::PipelineError;
use crate::feature_extractor::FeatureAssembler;
use crate::models::loader::LoadedModel;
use crate::schema;
use crate::types::prediction::PredictionResult;
use crate::types::record::ClinicalRecord;
use ort::value::Tensor;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A fitted feature transform (e.g. standardization).
pub trait Transform: Send + Sync {
    /// Feature count the transform was fitted on, if the artifact declares it
    fn input_dimension(&self) -> Option<usize>;

    /// Map a raw vector to a normalized vector of the same width.
    fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError>;
}

/// A fitted classifier producing one discrete label per vector.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Feature count the classifier was fitted on, if the artifact declares it
    fn input_dimension(&self) -> Option<usize> {
        None
    }

    fn classify(&self, features: &[f32]) -> Result<f64, PipelineError>;
}

/// Scale `features` and run both classifiers on the scaled vector.
///
/// Returns `(alcohol_label, smoke_label)`.
pub fn predict(
    features: &[f32],
    scaler: &dyn Transform,
    alcohol: &dyn Classifier,
    smoke: &dyn Classifier,
) -> Result<(f64, f64), PipelineError> {
    if let Some(expected) = scaler.input_dimension() {
        if expected != features.len() {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }
    }

    let scaled = scaler.transform(features)?;
    let alcohol_label = alcohol.classify(&scaled)?;
    let smoke_label = smoke.classify(&scaled)?;

    Ok((alcohol_label, smoke_label))
}

/// The three loaded artifacts, shared read-only by every request.
pub struct ModelSet {
    pub scaler: Arc<dyn Transform>,
    pub alcohol: Arc<dyn Classifier>,
    pub smoke: Arc<dyn Classifier>,
}

impl ModelSet {
    pub fn new(
        scaler: Arc<dyn Transform>,
        alcohol: Arc<dyn Classifier>,
        smoke: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            scaler,
            alcohol,
            smoke,
        }
    }

    /// Check every declared input width against the feature schema.
    pub fn validate(&self) -> Result<(), PipelineError> {
        schema::validate_dimension(self.scaler.input_dimension())?;
        schema::validate_dimension(self.alcohol.input_dimension())?;
        schema::validate_dimension(self.smoke.input_dimension())?;
        Ok(())
    }
}

/// Record-to-labels pipeline over a loaded [`ModelSet`]
pub struct InferenceEngine {
    models: Arc<ModelSet>,
    assembler: FeatureAssembler,
}

impl InferenceEngine {
    pub fn new(models: Arc<ModelSet>) -> Self {
        Self {
            models,
            assembler: FeatureAssembler::new(),
        }
    }

    /// Run inference on an assembled feature vector
    pub fn predict(&self, features: &[f32]) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        let (alcohol_label, smoke_label) = predict(
            features,
            self.models.scaler.as_ref(),
            self.models.alcohol.as_ref(),
            self.models.smoke.as_ref(),
        )?;
        let result = PredictionResult::new(alcohol_label, smoke_label);

        debug!(
            prediction_id = %result.prediction_id,
            alcohol_label,
            smoke_label,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(result)
    }

    /// Assemble a record and run inference on it
    pub fn predict_record(
        &self,
        record: &ClinicalRecord,
    ) -> Result<(Vec<f32>, PredictionResult), PipelineError> {
        let features = self.assembler.assemble(record);
        let result = self.predict(&features)?;
        Ok((features, result))
    }
}

/// Scaler backed by an ONNX graph
pub struct OnnxTransform {
    model: LoadedModel,
}

impl OnnxTransform {
    pub fn new(model: LoadedModel) -> Self {
        Self { model }
    }
}

impl Transform for OnnxTransform {
    fn input_dimension(&self) -> Option<usize> {
        self.model.input_dimension
    }

    fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
        let name = &self.model.name;
        let input = input_tensor(name, features)?;

        let mut session = self
            .model
            .session
            .lock()
            .map_err(|e| PipelineError::inference(name, format!("lock error: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.model.input_name.as_str() => input])
            .map_err(|e| PipelineError::inference(name, e))?;
        let output = outputs
            .get(self.model.output_name.as_str())
            .ok_or_else(|| {
                PipelineError::inference(name, format!("missing output `{}`", self.model.output_name))
            })?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::inference(name, e))?;

        if data.len() != features.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: features.len(),
                actual: data.len(),
            });
        }
        Ok(data.to_vec())
    }
}

/// Classifier backed by an ONNX graph with a label output
pub struct OnnxClassifier {
    model: LoadedModel,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Self {
        Self { model }
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.model.name
    }

    fn input_dimension(&self) -> Option<usize> {
        self.model.input_dimension
    }

    fn classify(&self, features: &[f32]) -> Result<f64, PipelineError> {
        let name = &self.model.name;
        let input = input_tensor(name, features)?;

        let mut session = self
            .model
            .session
            .lock()
            .map_err(|e| PipelineError::inference(name, format!("lock error: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.model.input_name.as_str() => input])
            .map_err(|e| PipelineError::inference(name, e))?;
        let output = outputs
            .get(self.model.output_name.as_str())
            .ok_or_else(|| {
                PipelineError::inference(name, format!("missing output `{}`", self.model.output_name))
            })?;

        // skl2onnx emits int64 labels; float labels show up for regressor-style exports
        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            return first_label(name, data.iter().map(|&v| v as f64));
        }
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            return first_label(name, data.iter().map(|&v| v as f64));
        }
        if let Ok((_, data)) = output.try_extract_tensor::<f64>() {
            return first_label(name, data.iter().copied());
        }

        Err(PipelineError::inference(
            name,
            format!("output `{}` is not a numeric tensor", self.model.output_name),
        ))
    }
}

fn input_tensor(model: &str, features: &[f32]) -> Result<Tensor<f32>, PipelineError> {
    // Shape [1, num_features]: exactly one record per call
    let shape = vec![1_i64, features.len() as i64];
    Tensor::from_array((shape, features.to_vec()))
        .map_err(|e| PipelineError::inference(model, format!("failed to create input tensor: {e}")))
}

fn first_label(model: &str, mut labels: impl Iterator<Item = f64>) -> Result<f64, PipelineError> {
    labels
        .next()
        .ok_or_else(|| PipelineError::inference(model, "empty label tensor"))
}
