//! Prediction outputs and their rendered form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which classifier produced a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Alcohol,
    Smoke,
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSource::Alcohol => f.write_str("alcohol"),
            LabelSource::Smoke => f.write_str("smoke"),
        }
    }
}

/// Severity tone of a rendered status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Cautionary,
    Alarming,
}

/// One status card in the results panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCard {
    /// Card heading ("Alcohol Status", "Smoking Status")
    pub heading: String,
    pub icon: String,
    /// Short status line, e.g. "Ex-Smoker"
    pub status: String,
    pub tone: Tone,
    pub caption: String,
}

/// Labels produced by one prediction cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Unique prediction identifier, used to correlate log lines
    pub prediction_id: String,

    /// Alcohol classifier output (0 or 1)
    pub alcohol_label: f64,

    /// Smoking classifier output (1, 2 or 3)
    pub smoke_label: f64,

    /// Prediction timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(alcohol_label: f64, smoke_label: f64) -> Self {
        Self {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            alcohol_label,
            smoke_label,
            timestamp: Utc::now(),
        }
    }

    /// Raw label for one classifier
    pub fn label(&self, source: LabelSource) -> f64 {
        match source {
            LabelSource::Alcohol => self.alcohol_label,
            LabelSource::Smoke => self.smoke_label,
        }
    }
}

/// Both rendered cards for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPanel {
    pub alcohol: StatusCard,
    pub smoke: StatusCard,
}
