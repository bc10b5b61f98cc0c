//! Clinical record collected from one form submission

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names one attribute of a [`ClinicalRecord`].
///
/// The declaration order here is for readability only. Model input order is
/// defined by [`crate::schema::FEATURE_SCHEMA`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Sex,
    Age,
    Height,
    Weight,
    Waistline,
    SightLeft,
    SightRight,
    HearLeft,
    HearRight,
    Sbp,
    Dbp,
    Blds,
    TotChole,
    HdlChole,
    LdlChole,
    Triglyceride,
    Hemoglobin,
    UrineProtein,
    SerumCreatinine,
    SgotAst,
    SgotAlt,
    GammaGtp,
}

impl Feature {
    /// Form field key (also the JSON key of [`ClinicalRecord`])
    pub fn key(self) -> &'static str {
        match self {
            Feature::Sex => "sex",
            Feature::Age => "age",
            Feature::Height => "height",
            Feature::Weight => "weight",
            Feature::Waistline => "waistline",
            Feature::SightLeft => "sight_left",
            Feature::SightRight => "sight_right",
            Feature::HearLeft => "hear_left",
            Feature::HearRight => "hear_right",
            Feature::Sbp => "sbp",
            Feature::Dbp => "dbp",
            Feature::Blds => "blds",
            Feature::TotChole => "tot_chole",
            Feature::HdlChole => "hdl_chole",
            Feature::LdlChole => "ldl_chole",
            Feature::Triglyceride => "triglyceride",
            Feature::Hemoglobin => "hemoglobin",
            Feature::UrineProtein => "urine_protein",
            Feature::SerumCreatinine => "serum_creatinine",
            Feature::SgotAst => "sgot_ast",
            Feature::SgotAlt => "sgot_alt",
            Feature::GammaGtp => "gamma_gtp",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw measurements for one patient, exactly as collected.
///
/// Categorical attributes are already numeric here: sex is 1 for male and 0
/// for female, hearing is 1 (normal) or 2 (abnormal), urine protein is 1..=6.
/// Attributes missing from a deserialized payload take their form default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalRecord {
    /// Sex (1 = male, 0 = female)
    pub sex: f64,
    /// Age in years
    pub age: f64,
    /// Height in cm
    pub height: f64,
    /// Weight in kg
    pub weight: f64,
    /// Waist circumference in cm
    pub waistline: f64,
    /// Visual acuity, left eye
    pub sight_left: f64,
    /// Visual acuity, right eye
    pub sight_right: f64,
    /// Hearing, left ear (1 = normal, 2 = abnormal)
    pub hear_left: f64,
    /// Hearing, right ear (1 = normal, 2 = abnormal)
    pub hear_right: f64,
    /// Systolic blood pressure (mmHg)
    #[serde(alias = "SBP")]
    pub sbp: f64,
    /// Diastolic blood pressure (mmHg)
    #[serde(alias = "DBP")]
    pub dbp: f64,
    /// Fasting blood glucose (mg/dL)
    #[serde(alias = "BLDS")]
    pub blds: f64,
    /// Total cholesterol (mg/dL)
    pub tot_chole: f64,
    /// HDL cholesterol (mg/dL)
    #[serde(alias = "HDL_chole", alias = "hdl")]
    pub hdl_chole: f64,
    /// LDL cholesterol (mg/dL)
    #[serde(alias = "LDL_chole", alias = "ldl")]
    pub ldl_chole: f64,
    /// Triglycerides (mg/dL)
    pub triglyceride: f64,
    /// Hemoglobin (g/dL)
    pub hemoglobin: f64,
    /// Urine protein category (1 = negative .. 6 = highly positive)
    pub urine_protein: f64,
    /// Serum creatinine (mg/dL)
    pub serum_creatinine: f64,
    /// AST / SGOT (IU/L)
    #[serde(alias = "SGOT_AST")]
    pub sgot_ast: f64,
    /// ALT / SGPT (IU/L)
    #[serde(alias = "SGOT_ALT")]
    pub sgot_alt: f64,
    /// Gamma-GTP (IU/L)
    #[serde(alias = "gamma_GTP")]
    pub gamma_gtp: f64,
}

impl ClinicalRecord {
    /// Read one attribute by name.
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Sex => self.sex,
            Feature::Age => self.age,
            Feature::Height => self.height,
            Feature::Weight => self.weight,
            Feature::Waistline => self.waistline,
            Feature::SightLeft => self.sight_left,
            Feature::SightRight => self.sight_right,
            Feature::HearLeft => self.hear_left,
            Feature::HearRight => self.hear_right,
            Feature::Sbp => self.sbp,
            Feature::Dbp => self.dbp,
            Feature::Blds => self.blds,
            Feature::TotChole => self.tot_chole,
            Feature::HdlChole => self.hdl_chole,
            Feature::LdlChole => self.ldl_chole,
            Feature::Triglyceride => self.triglyceride,
            Feature::Hemoglobin => self.hemoglobin,
            Feature::UrineProtein => self.urine_protein,
            Feature::SerumCreatinine => self.serum_creatinine,
            Feature::SgotAst => self.sgot_ast,
            Feature::SgotAlt => self.sgot_alt,
            Feature::GammaGtp => self.gamma_gtp,
        }
    }

    /// Overwrite one attribute by name.
    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Sex => &mut self.sex,
            Feature::Age => &mut self.age,
            Feature::Height => &mut self.height,
            Feature::Weight => &mut self.weight,
            Feature::Waistline => &mut self.waistline,
            Feature::SightLeft => &mut self.sight_left,
            Feature::SightRight => &mut self.sight_right,
            Feature::HearLeft => &mut self.hear_left,
            Feature::HearRight => &mut self.hear_right,
            Feature::Sbp => &mut self.sbp,
            Feature::Dbp => &mut self.dbp,
            Feature::Blds => &mut self.blds,
            Feature::TotChole => &mut self.tot_chole,
            Feature::HdlChole => &mut self.hdl_chole,
            Feature::LdlChole => &mut self.ldl_chole,
            Feature::Triglyceride => &mut self.triglyceride,
            Feature::Hemoglobin => &mut self.hemoglobin,
            Feature::UrineProtein => &mut self.urine_protein,
            Feature::SerumCreatinine => &mut self.serum_creatinine,
            Feature::SgotAst => &mut self.sgot_ast,
            Feature::SgotAlt => &mut self.sgot_alt,
            Feature::GammaGtp => &mut self.gamma_gtp,
        };
        *slot = value;
    }
}

impl Default for ClinicalRecord {
    /// Record holding every field's form default.
    fn default() -> Self {
        crate::schema::default_record()
    }
}

/// Example patient (male, 45, 175 cm) shared by pipeline tests.
#[cfg(test)]
pub(crate) fn reference_record() -> ClinicalRecord {
    ClinicalRecord {
        sex: 1.0,
        age: 45.0,
        height: 175.0,
        weight: 80.0,
        waistline: 90.0,
        sight_left: 1.0,
        sight_right: 1.0,
        hear_left: 1.0,
        hear_right: 1.0,
        sbp: 130.0,
        dbp: 85.0,
        blds: 100.0,
        tot_chole: 200.0,
        hdl_chole: 50.0,
        ldl_chole: 120.0,
        triglyceride: 150.0,
        hemoglobin: 15.0,
        urine_protein: 1.0,
        serum_creatinine: 1.0,
        sgot_ast: 30.0,
        sgot_alt: 30.0,
        gamma_gtp: 40.0,
    }
}
