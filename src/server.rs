//! Axum routes for the prediction form
//!
//! `GET /` renders the empty form, `POST /` runs one prediction and renders the
//! form again with its results, `POST /api/predict` does the same for JSON
//! clients and `GET /health` reports whether the models loaded.

use crate::config::ArtifactsConfig;
use crate::error::PipelineError;
use crate::form::FormCollector;
use crate::metrics::PredictionMetrics;
use crate::models::inference::InferenceEngine;
use crate::models::loader::ModelAvailability;
use crate::render;
use crate::types::prediction::{ResultPanel, StatusCard};
use crate::types::record::ClinicalRecord;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const INDEX_TEMPLATE: &str = "index.html";

/// Everything a request handler needs, built once at startup
pub struct AppState {
    engine: Option<InferenceEngine>,
    unavailable_reason: Option<String>,
    collector: FormCollector,
    templates: Environment<'static>,
    metrics: Arc<PredictionMetrics>,
    artifact_names: String,
    models_dir: String,
}

impl AppState {
    pub fn new(
        availability: ModelAvailability,
        artifacts: &ArtifactsConfig,
        metrics: Arc<PredictionMetrics>,
    ) -> anyhow::Result<Self> {
        let mut templates = Environment::new();
        templates.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;

        let (engine, unavailable_reason) = match availability {
            ModelAvailability::Ready(models) => (Some(InferenceEngine::new(models)), None),
            ModelAvailability::Unavailable { reason } => (None, Some(reason)),
        };

        Ok(Self {
            engine,
            unavailable_reason,
            collector: FormCollector::new(),
            templates,
            metrics,
            artifact_names: [&artifacts.scaler, &artifacts.alcohol, &artifacts.smoke]
                .iter()
                .map(|a| a.file_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            models_dir: artifacts.models_dir.clone(),
        })
    }

    /// Assemble, predict and render one record.
    fn run(
        &self,
        engine: &InferenceEngine,
        record: &ClinicalRecord,
    ) -> Result<Outcome, PipelineError> {
        let start = Instant::now();
        let result = engine
            .predict_record(record)
            .and_then(|(features, prediction)| {
                render::render(&prediction).map(|panel| Outcome {
                    features,
                    prediction_id: prediction.prediction_id,
                    alcohol_label: prediction.alcohol_label,
                    smoke_label: prediction.smoke_label,
                    panel,
                })
            });

        match &result {
            Ok(outcome) => {
                self.metrics.record_prediction(start.elapsed(), &outcome.panel);
                info!(
                    prediction_id = %outcome.prediction_id,
                    alcohol = %outcome.panel.alcohol.status,
                    smoke = %outcome.panel.smoke.status,
                    processing_time_us = start.elapsed().as_micros() as u64,
                    "Prediction served"
                );
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(error = %e, "Prediction aborted");
            }
        }
        result
    }

    fn render_page(
        &self,
        record: &ClinicalRecord,
        result: Option<&ResultPanel>,
        error_message: Option<String>,
    ) -> Response {
        let rendered = self.templates.get_template(INDEX_TEMPLATE).and_then(|template| {
            template.render(context! {
                unavailable => self.unavailable_reason.is_some(),
                artifact_names => &self.artifact_names,
                models_dir => &self.models_dir,
                sections => self.collector.view(record),
                result => result,
                error => error_message,
            })
        });

        let status = if self.engine.is_some() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        match rendered {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
            }
        }
    }
}

struct Outcome {
    features: Vec<f32>,
    prediction_id: String,
    alcohol_label: f64,
    smoke_label: f64,
    panel: ResultPanel,
}

/// Message shown to the user for an aborted submission
fn user_message(err: &PipelineError) -> String {
    match err {
        PipelineError::DimensionMismatch { .. } => {
            format!("Error scaling data: {err}. Ensure feature count matches the model.")
        }
        _ => format!("Prediction failed: {err}"),
    }
}

/// Construct the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .route("/api/predict", post(api_predict))
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
}

async fn show_form(State(state): State<Arc<AppState>>) -> Response {
    state.render_page(&ClinicalRecord::default(), None, None)
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let Some(engine) = state.engine.as_ref() else {
        return state.render_page(&ClinicalRecord::default(), None, None);
    };

    // Re-render what did parse so the user only fixes the rejected fields
    let (record, errors) = state.collector.collect(&fields);
    if !errors.is_empty() {
        state.metrics.record_failure();
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return state.render_page(&record, None, Some(message));
    }

    match state.run(engine, &record) {
        Ok(outcome) => state.render_page(&record, Some(&outcome.panel), None),
        Err(e) => state.render_page(&record, None, Some(user_message(&e))),
    }
}

/// JSON prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction_id: String,
    /// Model input vector, in training column order
    pub features: Vec<f32>,
    pub alcohol_label: f64,
    pub smoke_label: f64,
    pub alcohol: StatusCard,
    pub smoke: StatusCard,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn api_error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody { error: message }))
}

async fn api_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClinicalRecord>, JsonRejection>,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorBody>)> {
    let engine = state.engine.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "prediction models are unavailable".to_string(),
        )
    })?;
    let Json(record) = payload.map_err(|rejection| {
        state.metrics.record_failure();
        api_error(rejection.status(), rejection.body_text())
    })?;

    let record = state.collector.normalize(&record);
    let outcome = state.run(engine, &record).map_err(|e| {
        let status = if e.is_per_request() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        api_error(status, user_message(&e))
    })?;

    Ok(Json(PredictResponse {
        prediction_id: outcome.prediction_id,
        features: outcome.features,
        alcohol_label: outcome.alcohol_label,
        smoke_label: outcome.smoke_label,
        alcohol: outcome.panel.alcohol,
        smoke: outcome.panel.smoke,
    }))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub version: &'static str,
}

async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label) = if state.engine.is_some() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            reason: state.unavailable_reason.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_dimension_mismatch() {
        let message = user_message(&PipelineError::DimensionMismatch {
            expected: 22,
            actual: 21,
        });
        assert!(message.starts_with("Error scaling data: feature count mismatch"));
    }

    #[test]
    fn test_unavailable_state_builds() {
        let state = AppState::new(
            ModelAvailability::Unavailable {
                reason: "no artifacts".to_string(),
            },
            &crate::config::AppConfig::default().artifacts,
            Arc::new(PredictionMetrics::new()),
        )
        .unwrap();
        assert!(state.engine.is_none());
        assert_eq!(
            state.artifact_names,
            "scaler.bin, model_alcohol.bin, model_smoke.bin"
        );
    }
}
