//! Form collection: field presentation and submission parsing.
//!
//! Every value leaving this module lies inside its schema domain. Numbers are
//! clamped the way the browser widgets clamp them, integer fields are rounded
//! and categorical fields are snapped onto one of their options.

use crate::schema::{ChoiceOption, FieldSpec, InputKind, Section, FEATURE_SCHEMA};
use crate::types::record::ClinicalRecord;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A submitted field could not be read as a number
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{label}: `{value}` is not a valid number")]
    InvalidNumber { label: &'static str, value: String },
}

/// Collects [`ClinicalRecord`]s from submitted form fields.
pub struct FormCollector;

impl FormCollector {
    pub fn new() -> Self {
        Self
    }

    /// Build a record from submitted `key -> value` pairs.
    ///
    /// Missing fields take their default. Choice fields accept the option
    /// label ("Male") or the option value ("1"). Malformed numbers keep their
    /// default in the returned record and are reported in schema order; the
    /// submission is usable only when no error is returned.
    pub fn collect(
        &self,
        fields: &HashMap<String, String>,
    ) -> (ClinicalRecord, Vec<FormError>) {
        let mut record = ClinicalRecord::default();
        let mut errors = Vec::new();

        for spec in &FEATURE_SCHEMA {
            let Some(raw) = fields.get(spec.feature.key()) else {
                debug!(field = %spec.feature, "Field missing from submission, using default");
                continue;
            };
            let value = match spec.input {
                InputKind::Choice { options, .. } => parse_choice(spec, options, raw.trim()),
                _ => match raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()) {
                    Some(parsed) => coerce(spec, parsed),
                    None => {
                        errors.push(FormError::InvalidNumber {
                            label: spec.label,
                            value: raw.clone(),
                        });
                        continue;
                    }
                },
            };
            record.set(spec.feature, value);
        }

        (record, errors)
    }

    /// Clamp and snap every field of an already numeric record into its domain.
    pub fn normalize(&self, record: &ClinicalRecord) -> ClinicalRecord {
        let mut normalized = *record;
        for spec in &FEATURE_SCHEMA {
            normalized.set(spec.feature, coerce(spec, record.get(spec.feature)));
        }
        normalized
    }

    /// Presentation model of the whole form, pre-filled from `record`.
    pub fn view(&self, record: &ClinicalRecord) -> Vec<SectionView> {
        Section::ALL
            .iter()
            .map(|section| SectionView {
                title: section.title(),
                icon: section.icon(),
                fields: crate::schema::fields_in(*section)
                    .map(|spec| FieldView::new(spec, record.get(spec.feature)))
                    .collect(),
            })
            .collect()
    }
}

impl Default for FormCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_choice(spec: &FieldSpec, options: &[ChoiceOption], raw: &str) -> f64 {
    if let Some(option) = options.iter().find(|o| o.label.eq_ignore_ascii_case(raw)) {
        return option.value;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => coerce(spec, value),
        _ => {
            debug!(field = %spec.feature, value = %raw, "Unknown option, using default");
            spec.input.default_value()
        }
    }
}

/// Force `value` into the domain of `spec`.
fn coerce(spec: &FieldSpec, value: f64) -> f64 {
    if !value.is_finite() {
        return spec.input.default_value();
    }
    match spec.input {
        InputKind::Integer { min, max, .. } => value.round().clamp(min, max),
        InputKind::Decimal { min, max, step, .. } | InputKind::Slider { min, max, step, .. } => {
            snap_to_step(value, min, max, step)
        }
        InputKind::Choice { options, .. } => options
            .iter()
            .map(|o| o.value)
            .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
            .unwrap_or_else(|| spec.input.default_value()),
    }
}

/// Nearest multiple of `step` above `min`, kept inside `[min, max]`.
fn snap_to_step(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let snapped = (min + ((value - min) / step).round() * step).clamp(min, max);
    // Drop the float noise left by the multiplication (0.1 * 3 = 0.30000000000000004)
    let scale = 10f64.powi((-step.log10()).ceil().max(0.0) as i32);
    (snapped * scale).round() / scale
}

/// One form section as handed to the page template
#[derive(Debug, Serialize)]
pub struct SectionView {
    pub title: &'static str,
    pub icon: &'static str,
    pub fields: Vec<FieldView>,
}

/// One input widget as handed to the page template
#[derive(Debug, Serialize)]
pub struct FieldView {
    pub key: &'static str,
    pub label: &'static str,
    /// "number", "range" or "select"
    pub widget: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub value: String,
    pub options: Vec<OptionView>,
    pub help: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub label: &'static str,
    pub selected: bool,
}

impl FieldView {
    fn new(spec: &FieldSpec, current: f64) -> Self {
        let (widget, value, options) = match spec.input {
            InputKind::Integer { .. } => ("number", format!("{current:.0}"), Vec::new()),
            InputKind::Decimal { .. } => ("number", current.to_string(), Vec::new()),
            InputKind::Slider { .. } => ("range", current.to_string(), Vec::new()),
            InputKind::Choice { options, .. } => {
                let options: Vec<OptionView> = options
                    .iter()
                    .map(|o| OptionView {
                        label: o.label,
                        selected: o.value == current,
                    })
                    .collect();
                let value = options
                    .iter()
                    .find(|o| o.selected)
                    .map(|o| o.label.to_string())
                    .unwrap_or_default();
                ("select", value, options)
            }
        };
        // Selects carry no numeric bounds in the markup
        let bounds = (widget != "select").then(|| spec.input.bounds());

        Self {
            key: spec.feature.key(),
            label: spec.label,
            widget,
            min: bounds.map(|(min, _)| min),
            max: bounds.map(|(_, max)| max),
            step: spec.input.step(),
            value,
            options,
            help: spec.help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::Feature;

    fn submission(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn collect_ok(fields: &HashMap<String, String>) -> ClinicalRecord {
        let (record, errors) = FormCollector::new().collect(fields);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        record
    }

    #[test]
    fn test_empty_submission_yields_defaults() {
        let record = collect_ok(&HashMap::new());
        assert_eq!(record, ClinicalRecord::default());
        assert_eq!(record.sex, 1.0);
        assert_eq!(record.hemoglobin, 14.5);
        assert_eq!(record.serum_creatinine, 0.9);
    }

    #[test]
    fn test_sex_mapping() {
        let male = collect_ok(&submission(&[("sex", "Male")]));
        let female = collect_ok(&submission(&[("sex", "Female")]));
        assert_eq!(male.sex, 1.0);
        assert_eq!(female.sex, 0.0);
    }

    #[test]
    fn test_numbers_are_clamped_and_rounded() {
        let record = collect_ok(&submission(&[
            ("age", "7"),
            ("height", "301"),
            ("weight", "80.6"),
            ("sight_left", "9.9"),
            ("waistline", "12.5"),
        ]));
        assert_eq!(record.age, 18.0);
        assert_eq!(record.height, 220.0);
        assert_eq!(record.weight, 81.0);
        assert_eq!(record.sight_left, 2.5);
        assert_eq!(record.waistline, 40.0);
    }

    #[test]
    fn test_decimals_snap_to_their_step() {
        let record = collect_ok(&submission(&[
            ("sight_left", "1.2345"),
            ("hemoglobin", "14.56789"),
            ("waistline", "80.123"),
            ("serum_creatinine", "1.26"),
        ]));
        assert_eq!(record.sight_left, 1.2);
        assert_eq!(record.hemoglobin, 14.6);
        assert_eq!(record.waistline, 80.1);
        assert_eq!(record.serum_creatinine, 1.3);
    }

    #[test]
    fn test_malformed_fields_keep_the_rest() {
        let collector = FormCollector::new();
        let (record, errors) = collector.collect(&submission(&[
            ("age", "abc"),
            ("sbp", "150"),
            ("weight", "x"),
        ]));
        assert_eq!(record.sbp, 150.0);
        assert_eq!(record.age, ClinicalRecord::default().age);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            FormError::InvalidNumber {
                label: "Age",
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_choice_accepts_label_or_value() {
        let record = collect_ok(&submission(&[
            ("hear_left", "Abnormal"),
            ("hear_right", "2"),
            ("urine_protein", "4"),
        ]));
        assert_eq!(record.hear_left, 2.0);
        assert_eq!(record.hear_right, 2.0);
        assert_eq!(record.urine_protein, 4.0);
    }

    #[test]
    fn test_unknown_choice_falls_back_to_default() {
        let record = collect_ok(&submission(&[("sex", "Unknown")]));
        assert_eq!(record.sex, 1.0);
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let collector = FormCollector::new();
        let (_, errors) = collector.collect(&submission(&[("sbp", "one-twenty")]));
        assert_eq!(
            errors,
            vec![FormError::InvalidNumber {
                label: "Systolic BP (mmHg)",
                value: "one-twenty".to_string()
            }]
        );
        let (_, errors) = collector.collect(&submission(&[("dbp", "NaN")]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_normalize_snaps_categories_and_steps() {
        let collector = FormCollector::new();
        let mut record = ClinicalRecord::default();
        record.set(Feature::UrineProtein, 9.0);
        record.set(Feature::Sex, 0.2);
        record.set(Feature::GammaGtp, 4000.0);
        record.set(Feature::SerumCreatinine, 0.97531);
        record.set(Feature::SightRight, 1.66);

        let normalized = collector.normalize(&record);
        assert_eq!(normalized.urine_protein, 6.0);
        assert_eq!(normalized.sex, 0.0);
        assert_eq!(normalized.gamma_gtp, 1000.0);
        assert_eq!(normalized.serum_creatinine, 1.0);
        assert_eq!(normalized.sight_right, 1.7);
    }

    #[test]
    fn test_view_reflects_current_values() {
        let collector = FormCollector::new();
        let mut record = ClinicalRecord::default();
        record.set(Feature::Sex, 0.0);
        let sections = collector.view(&record);

        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].title, "Demographics & Body Metrics");
        let sex = &sections[0].fields[0];
        assert_eq!(sex.widget, "select");
        assert_eq!(sex.value, "Female");
        assert!(sex.options.iter().any(|o| o.label == "Female" && o.selected));

        let age = &sections[0].fields[1];
        assert_eq!((age.min, age.max, age.step), (Some(18.0), Some(100.0), Some(1.0)));
        assert_eq!(age.value, "30");

        let total: usize = sections.iter().map(|s| s.fields.len()).sum();
        assert_eq!(total, 22);
    }
}
