//! Categorical encoding shared by the trainer and the predictor.
//!
//! Both sides map category strings through the same [`CategoricalField`]
//! tables, and the classifier artifact records [`ENCODING_VERSION`] so the
//! service can refuse a model trained against a different table. Bump the
//! version whenever any code below changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ENCODING_VERSION: u32 = 1;

/// How the trainer turns categorical columns into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The fixed tables in this module, identical to inference.
    #[default]
    Fixed,
    /// Per-run label encoding: sorted distinct strings get codes 0..n.
    /// Codes are not guaranteed to match the inference tables.
    Label,
}

#[derive(Debug)]
pub struct CategoricalField {
    pub name: &'static str,
    codes: &'static [(&'static str, f64)],
    fallback: f64,
}

impl CategoricalField {
    /// Trimmed, case-insensitive lookup. Unknown or absent values map to the
    /// field's fallback code.
    pub fn encode(&self, raw: Option<&str>) -> f64 {
        let Some(raw) = raw else {
            return self.fallback;
        };
        let key = raw.trim().to_lowercase();
        self.codes
            .iter()
            .find(|(label, _)| *label == key)
            .map(|(_, code)| *code)
            .unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }
}

pub const GENDER: CategoricalField = CategoricalField {
    name: "Gender",
    codes: &[("male", 1.0), ("female", 0.0), ("other", 2.0)],
    fallback: 2.0,
};

pub const EXTRACURRICULAR: CategoricalField = CategoricalField {
    name: "ExtracurricularActivities",
    codes: &[("yes", 1.0)],
    fallback: 0.0,
};

pub const PARENTAL_SUPPORT: CategoricalField = CategoricalField {
    name: "ParentalSupport",
    codes: &[("high", 2.0), ("medium", 1.0), ("low", 0.0)],
    fallback: 1.0,
};

pub const CATEGORICAL_FIELDS: [&CategoricalField; 3] = [&GENDER, &EXTRACURRICULAR, &PARENTAL_SUPPORT];

/// Data-driven encoder used by [`EncodingMode::Label`].
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: BTreeMap<String, f64>,
}

impl LabelEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: BTreeMap<String, f64> =
            values.into_iter().map(|v| (v.to_string(), 0.0)).collect();
        for (code, slot) in classes.values_mut().enumerate() {
            *slot = code as f64;
        }
        Self { classes }
    }

    pub fn transform(&self, value: &str) -> Option<f64> {
        self.classes.get(value).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, f64)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognised_gender_is_two() {
        for raw in ["nonbinary", "", "  ", "M", "Unknown", "123"] {
            assert_eq!(GENDER.encode(Some(raw)), 2.0, "input {raw:?}");
        }
        assert_eq!(GENDER.encode(None), 2.0);
    }

    #[test]
    fn lookup_trims_and_ignores_case() {
        assert_eq!(GENDER.encode(Some("  MALE ")), 1.0);
        assert_eq!(GENDER.encode(Some("Female")), 0.0);
        assert_eq!(EXTRACURRICULAR.encode(Some(" Yes")), 1.0);
        assert_eq!(EXTRACURRICULAR.encode(Some("no")), 0.0);
        assert_eq!(EXTRACURRICULAR.encode(Some("maybe")), 0.0);
        assert_eq!(PARENTAL_SUPPORT.encode(Some("HIGH")), 2.0);
        assert_eq!(PARENTAL_SUPPORT.encode(Some("low")), 0.0);
        assert_eq!(PARENTAL_SUPPORT.encode(Some("Unknown")), 1.0);
    }

    #[test]
    fn label_encoder_sorts_classes() {
        let enc = LabelEncoder::fit(["Medium", "High", "Low", "High", "Unknown"]);
        assert_eq!(enc.transform("High"), Some(0.0));
        assert_eq!(enc.transform("Low"), Some(1.0));
        assert_eq!(enc.transform("Medium"), Some(2.0));
        assert_eq!(enc.transform("Unknown"), Some(3.0));
        assert_eq!(enc.transform("high"), None);
        assert_eq!(enc.classes().count(), 4);
    }
}
