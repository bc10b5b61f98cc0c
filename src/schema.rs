//! Feature schema shared by the form, the assembler and startup validation.
//!
//! [`FEATURE_SCHEMA`] lists the model inputs in the exact column order the
//! scaler and both classifiers were fitted on. Reordering it silently corrupts
//! predictions; the artifacts must be re-exported together with any change.

use crate::types::record::{ClinicalRecord, Feature};
use serde::Serialize;

/// Number of model input features
pub const FEATURE_COUNT: usize = 22;

/// Form section a field is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    Demographics,
    Vitals,
    LipidsUrinalysis,
    LiverKidney,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Demographics,
        Section::Vitals,
        Section::LipidsUrinalysis,
        Section::LiverKidney,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Demographics => "Demographics & Body Metrics",
            Section::Vitals => "Senses & Vital Signs",
            Section::LipidsUrinalysis => "Lipid Panel & Urinalysis",
            Section::LiverKidney => "Liver & Kidney Function",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Section::Demographics => "👤",
            Section::Vitals => "👁️",
            Section::LipidsUrinalysis => "🩸",
            Section::LiverKidney => "🧪",
        }
    }
}

/// One selectable option of a categorical field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceOption {
    pub label: &'static str,
    pub value: f64,
}

/// Input widget and numeric domain of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    /// Whole-number input
    Integer { min: f64, max: f64, default: f64 },
    /// Number input with a fractional step
    Decimal {
        min: f64,
        max: f64,
        default: f64,
        step: f64,
    },
    /// Range slider
    Slider {
        min: f64,
        max: f64,
        default: f64,
        step: f64,
    },
    /// Fixed option list; `default` indexes into `options`
    Choice {
        options: &'static [ChoiceOption],
        default: usize,
    },
}

impl InputKind {
    pub fn default_value(&self) -> f64 {
        match *self {
            InputKind::Integer { default, .. }
            | InputKind::Decimal { default, .. }
            | InputKind::Slider { default, .. } => default,
            InputKind::Choice { options, default } => options[default].value,
        }
    }

    /// Inclusive numeric bounds
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            InputKind::Integer { min, max, .. }
            | InputKind::Decimal { min, max, .. }
            | InputKind::Slider { min, max, .. } => (min, max),
            InputKind::Choice { options, .. } => options
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                    (lo.min(o.value), hi.max(o.value))
                }),
        }
    }

    pub fn step(&self) -> Option<f64> {
        match *self {
            InputKind::Integer { .. } => Some(1.0),
            InputKind::Decimal { step, .. } | InputKind::Slider { step, .. } => Some(step),
            InputKind::Choice { .. } => None,
        }
    }
}

/// Descriptor of one model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub feature: Feature,
    /// Column name used at training time
    pub column: &'static str,
    pub label: &'static str,
    pub section: Section,
    pub input: InputKind,
    pub help: Option<&'static str>,
}

const SEX: &[ChoiceOption] = &[
    ChoiceOption { label: "Male", value: 1.0 },
    ChoiceOption { label: "Female", value: 0.0 },
];

const HEARING: &[ChoiceOption] = &[
    ChoiceOption { label: "Normal", value: 1.0 },
    ChoiceOption { label: "Abnormal", value: 2.0 },
];

const URINE_PROTEIN: &[ChoiceOption] = &[
    ChoiceOption { label: "1", value: 1.0 },
    ChoiceOption { label: "2", value: 2.0 },
    ChoiceOption { label: "3", value: 3.0 },
    ChoiceOption { label: "4", value: 4.0 },
    ChoiceOption { label: "5", value: 5.0 },
    ChoiceOption { label: "6", value: 6.0 },
];

const fn integer(min: f64, max: f64, default: f64) -> InputKind {
    InputKind::Integer { min, max, default }
}

const fn decimal(min: f64, max: f64, default: f64) -> InputKind {
    InputKind::Decimal {
        min,
        max,
        default,
        step: 0.1,
    }
}

const fn field(
    feature: Feature,
    column: &'static str,
    label: &'static str,
    section: Section,
    input: InputKind,
) -> FieldSpec {
    FieldSpec {
        feature,
        column,
        label,
        section,
        input,
        help: None,
    }
}

/// Model inputs in training column order.
pub static FEATURE_SCHEMA: [FieldSpec; FEATURE_COUNT] = [
    field(
        Feature::Sex,
        "sex",
        "Sex",
        Section::Demographics,
        InputKind::Choice {
            options: SEX,
            default: 0,
        },
    ),
    field(Feature::Age, "age", "Age", Section::Demographics, integer(18.0, 100.0, 30.0)),
    field(
        Feature::Height,
        "height",
        "Height (cm)",
        Section::Demographics,
        integer(100.0, 220.0, 175.0),
    ),
    field(
        Feature::Weight,
        "weight",
        "Weight (kg)",
        Section::Demographics,
        integer(30.0, 200.0, 75.0),
    ),
    field(
        Feature::Waistline,
        "waistline",
        "Waist Circumference (cm)",
        Section::Demographics,
        InputKind::Slider {
            min: 40.0,
            max: 150.0,
            default: 80.0,
            step: 0.1,
        },
    ),
    field(
        Feature::SightLeft,
        "sight_left",
        "Sight (Left)",
        Section::Vitals,
        decimal(0.1, 2.5, 1.0),
    ),
    field(
        Feature::SightRight,
        "sight_right",
        "Sight (Right)",
        Section::Vitals,
        decimal(0.1, 2.5, 1.0),
    ),
    field(
        Feature::HearLeft,
        "hear_left",
        "Hearing (Left)",
        Section::Vitals,
        InputKind::Choice {
            options: HEARING,
            default: 0,
        },
    ),
    field(
        Feature::HearRight,
        "hear_right",
        "Hearing (Right)",
        Section::Vitals,
        InputKind::Choice {
            options: HEARING,
            default: 0,
        },
    ),
    field(
        Feature::Sbp,
        "SBP",
        "Systolic BP (mmHg)",
        Section::Vitals,
        integer(70.0, 220.0, 120.0),
    ),
    field(
        Feature::Dbp,
        "DBP",
        "Diastolic BP (mmHg)",
        Section::Vitals,
        integer(40.0, 140.0, 80.0),
    ),
    field(
        Feature::Blds,
        "BLDS",
        "Fasting Glucose (mg/dL)",
        Section::Vitals,
        integer(50.0, 400.0, 95.0),
    ),
    field(
        Feature::TotChole,
        "tot_chole",
        "Total Cholesterol (mg/dL)",
        Section::LipidsUrinalysis,
        integer(50.0, 500.0, 190.0),
    ),
    field(
        Feature::HdlChole,
        "HDL_chole",
        "HDL Cholesterol (mg/dL)",
        Section::LipidsUrinalysis,
        integer(10.0, 200.0, 55.0),
    ),
    field(
        Feature::LdlChole,
        "LDL_chole",
        "LDL Cholesterol (mg/dL)",
        Section::LipidsUrinalysis,
        integer(10.0, 400.0, 110.0),
    ),
    field(
        Feature::Triglyceride,
        "triglyceride",
        "Triglycerides (mg/dL)",
        Section::LipidsUrinalysis,
        integer(20.0, 1000.0, 130.0),
    ),
    field(
        Feature::Hemoglobin,
        "hemoglobin",
        "Hemoglobin (g/dL)",
        Section::LipidsUrinalysis,
        decimal(5.0, 20.0, 14.5),
    ),
    FieldSpec {
        help: Some("1: Negative, 6: Highly Positive"),
        ..field(
            Feature::UrineProtein,
            "urine_protein",
            "Urine Protein",
            Section::LipidsUrinalysis,
            InputKind::Choice {
                options: URINE_PROTEIN,
                default: 0,
            },
        )
    },
    field(
        Feature::SerumCreatinine,
        "serum_creatinine",
        "Serum Creatinine",
        Section::LiverKidney,
        decimal(0.1, 20.0, 0.9),
    ),
    field(
        Feature::SgotAst,
        "SGOT_AST",
        "AST (SGOT)",
        Section::LiverKidney,
        integer(5.0, 1000.0, 25.0),
    ),
    field(
        Feature::SgotAlt,
        "SGOT_ALT",
        "ALT (SGPT)",
        Section::LiverKidney,
        integer(5.0, 1000.0, 25.0),
    ),
    FieldSpec {
        help: Some("High values may indicate alcohol consumption"),
        ..field(
            Feature::GammaGtp,
            "gamma_GTP",
            "Gamma GTP",
            Section::LiverKidney,
            integer(5.0, 1000.0, 30.0),
        )
    },
];

/// Training column names in model input order.
pub fn column_names() -> Vec<&'static str> {
    FEATURE_SCHEMA.iter().map(|spec| spec.column).collect()
}

/// Fields rendered in one section, in schema order.
pub fn fields_in(section: Section) -> impl Iterator<Item = &'static FieldSpec> {
    FEATURE_SCHEMA
        .iter()
        .filter(move |spec| spec.section == section)
}

pub(crate) fn default_record() -> ClinicalRecord {
    let mut record = ClinicalRecord {
        sex: 0.0,
        age: 0.0,
        height: 0.0,
        weight: 0.0,
        waistline: 0.0,
        sight_left: 0.0,
        sight_right: 0.0,
        hear_left: 0.0,
        hear_right: 0.0,
        sbp: 0.0,
        dbp: 0.0,
        blds: 0.0,
        tot_chole: 0.0,
        hdl_chole: 0.0,
        ldl_chole: 0.0,
        triglyceride: 0.0,
        hemoglobin: 0.0,
        urine_protein: 0.0,
        serum_creatinine: 0.0,
        sgot_ast: 0.0,
        sgot_alt: 0.0,
        gamma_gtp: 0.0,
    };
    for spec in &FEATURE_SCHEMA {
        record.set(spec.feature, spec.input.default_value());
    }
    record
}

/// Check that a model input width agrees with the schema.
pub fn validate_dimension(expected: Option<usize>) -> Result<(), crate::PipelineError> {
    match expected {
        Some(expected) if expected != FEATURE_COUNT => Err(crate::PipelineError::DimensionMismatch {
            expected,
            actual: FEATURE_COUNT,
        }),
        _ => Ok(()),
    }
}
