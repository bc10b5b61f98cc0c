//! Feature assembly for model inference.
//!
//! Turns a [`ClinicalRecord`] into the flat vector the ONNX artifacts expect.
//! Positions come from [`FEATURE_SCHEMA`], never from literals.

use crate::schema::{FEATURE_COUNT, FEATURE_SCHEMA};
use crate::types::record::ClinicalRecord;

/// Maps clinical records into model input vectors.
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Create a new feature assembler.
    pub fn new() -> Self {
        Self
    }

    /// Assemble the model input vector for a record.
    ///
    /// Returns [`FEATURE_COUNT`] values in training column order.
    pub fn assemble(&self, record: &ClinicalRecord) -> Vec<f32> {
        FEATURE_SCHEMA
            .iter()
            .map(|spec| record.get(spec.feature) as f32)
            .collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (training column order).
    pub fn feature_names(&self) -> Vec<&'static str> {
        crate::schema::column_names()
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::reference_record;

    #[test]
    fn test_reference_record_vector() {
        let assembler = FeatureAssembler::new();
        let features = assembler.assemble(&reference_record());

        assert_eq!(
            features,
            vec![
                1.0, 45.0, 175.0, 80.0, 90.0, 1.0, 1.0, 1.0, 1.0, 130.0, 85.0, 100.0, 200.0, 50.0,
                120.0, 150.0, 15.0, 1.0, 1.0, 30.0, 30.0, 40.0,
            ]
        );
    }

    #[test]
    fn test_feature_count() {
        let assembler = FeatureAssembler::new();
        assert_eq!(assembler.feature_count(), 22);
        assert_eq!(assembler.feature_names()[21], "gamma_GTP");
        assert_eq!(assembler.assemble(&ClinicalRecord::default()).len(), 22);
    }

    #[test]
    fn test_each_field_lands_at_its_position() {
        let assembler = FeatureAssembler::new();
        for (position, spec) in FEATURE_SCHEMA.iter().enumerate() {
            let mut record = ClinicalRecord::default();
            record.set(spec.feature, -7.0);
            let features = assembler.assemble(&record);
            let hits: Vec<usize> = features
                .iter()
                .enumerate()
                .filter(|(_, v)| **v == -7.0)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(hits, vec![position], "{}", spec.column);
        }
    }
}
