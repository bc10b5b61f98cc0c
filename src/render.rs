//! Maps classifier labels to the status cards shown in the results panel.

use crate::error::PipelineError;
use crate::types::prediction::{LabelSource, PredictionResult, ResultPanel, StatusCard, Tone};

struct StatusEntry {
    source: LabelSource,
    label: f64,
    icon: &'static str,
    status: &'static str,
    tone: Tone,
    caption: &'static str,
}

/// Every label with a documented meaning. Anything else is an error.
const STATUS_TABLE: &[StatusEntry] = &[
    StatusEntry {
        source: LabelSource::Alcohol,
        label: 1.0,
        icon: "🍺",
        status: "Drinker Detected",
        tone: Tone::Alarming,
        caption: "The model identified patterns consistent with alcohol consumption.",
    },
    StatusEntry {
        source: LabelSource::Alcohol,
        label: 0.0,
        icon: "💧",
        status: "Non-Drinker",
        tone: Tone::Positive,
        caption: "No significant patterns of alcohol consumption detected.",
    },
    StatusEntry {
        source: LabelSource::Smoke,
        label: 1.0,
        icon: "🌿",
        status: "Non-Smoker",
        tone: Tone::Positive,
        caption: "Healthy lifestyle regarding tobacco.",
    },
    StatusEntry {
        source: LabelSource::Smoke,
        label: 2.0,
        icon: "🚬",
        status: "Ex-Smoker",
        tone: Tone::Cautionary,
        caption: "Patterns indicate a history of smoking.",
    },
    StatusEntry {
        source: LabelSource::Smoke,
        label: 3.0,
        icon: "🔥",
        status: "Active Smoker",
        tone: Tone::Alarming,
        caption: "Strong indicators of active tobacco use.",
    },
];

fn heading(source: LabelSource) -> &'static str {
    match source {
        LabelSource::Alcohol => "Alcohol Status",
        LabelSource::Smoke => "Smoking Status",
    }
}

/// Render one label into its status card.
pub fn render_label(source: LabelSource, label: f64) -> Result<StatusCard, PipelineError> {
    STATUS_TABLE
        .iter()
        .find(|entry| entry.source == source && entry.label == label)
        .map(|entry| StatusCard {
            heading: heading(source).to_string(),
            icon: entry.icon.to_string(),
            status: entry.status.to_string(),
            tone: entry.tone,
            caption: entry.caption.to_string(),
        })
        .ok_or(PipelineError::UnknownLabel {
            model: source,
            value: label,
        })
}

/// Render both cards of a prediction.
pub fn render(result: &PredictionResult) -> Result<ResultPanel, PipelineError> {
    Ok(ResultPanel {
        alcohol: render_label(LabelSource::Alcohol, result.label(LabelSource::Alcohol))?,
        smoke: render_label(LabelSource::Smoke, result.label(LabelSource::Smoke))?,
    })
}
