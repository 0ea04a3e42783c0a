//! Feature cleaning: one raw student record in, one fixed-order numeric
//! feature vector out.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::encoding::{EXTRACURRICULAR, GENDER, PARENTAL_SUPPORT};

pub const ONLINE_CLASSES: &str = "Online Classes Taken";

/// Column order used to build the training matrix.
pub const FEATURE_COLUMNS: [&str; 7] = [
    GENDER.name,
    ATTENDANCE.name,
    STUDY_HOURS.name,
    PREVIOUS_GRADE.name,
    EXTRACURRICULAR.name,
    PARENTAL_SUPPORT.name,
    ONLINE_CLASSES,
];

/// A numeric column with its inference-time default and clip range.
#[derive(Debug)]
pub struct NumericField {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericField {
    pub fn clean(&self, raw: Option<&Value>) -> f64 {
        raw.and_then(coerce_number)
            .unwrap_or(self.default)
            .clamp(self.min, self.max)
    }
}

pub const ATTENDANCE: NumericField = NumericField {
    name: "AttendanceRate",
    default: 80.0,
    min: 0.0,
    max: 100.0,
};

pub const STUDY_HOURS: NumericField = NumericField {
    name: "StudyHoursPerWeek",
    default: 15.0,
    min: 0.0,
    max: 80.0,
};

pub const PREVIOUS_GRADE: NumericField = NumericField {
    name: "PreviousGrade",
    default: 70.0,
    min: 0.0,
    max: 100.0,
};

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("feature '{0}' in the feature list is not produced by the cleaner")]
    UnknownFeature(String),
    #[error("feature '{0}' is missing from the feature list")]
    MissingFromFeatureList(String),
    #[error("feature '{0}' appears more than once in the feature list")]
    DuplicateFeature(String),
}

/// One request body. Every field is optional and may hold any JSON type;
/// cleaning decides what is usable.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Gender", default)]
    pub gender: Option<Value>,
    #[serde(rename = "ExtracurricularActivities", default)]
    pub extracurricular: Option<Value>,
    #[serde(rename = "ParentalSupport", default)]
    pub parental_support: Option<Value>,
    #[serde(rename = "Online Classes Taken", default)]
    pub online_classes: Option<Value>,
    #[serde(rename = "AttendanceRate", default)]
    pub attendance_rate: Option<Value>,
    #[serde(rename = "StudyHoursPerWeek", default)]
    pub study_hours: Option<Value>,
    #[serde(rename = "PreviousGrade", default)]
    pub previous_grade: Option<Value>,
}

/// A record after cleaning, before it is arranged into artifact order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanedRecord {
    pub gender: f64,
    pub extracurricular: f64,
    pub parental_support: f64,
    pub online_classes: f64,
    pub attendance_rate: f64,
    pub study_hours: f64,
    pub previous_grade: f64,
}

/// Named values in the exact order of the persisted feature list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl StudentRecord {
    /// Never fails: anything missing or unparseable takes the field default.
    pub fn clean(&self) -> CleanedRecord {
        let online = self
            .online_classes
            .as_ref()
            .and_then(coerce_number)
            .map_or(0.0, |n| if n > 0.0 { 1.0 } else { 0.0 });

        CleanedRecord {
            gender: GENDER.encode(category_text(self.gender.as_ref()).as_deref()),
            extracurricular: EXTRACURRICULAR.encode(category_text(self.extracurricular.as_ref()).as_deref()),
            parental_support: PARENTAL_SUPPORT.encode(category_text(self.parental_support.as_ref()).as_deref()),
            online_classes: online,
            attendance_rate: ATTENDANCE.clean(self.attendance_rate.as_ref()),
            study_hours: STUDY_HOURS.clean(self.study_hours.as_ref()),
            previous_grade: PREVIOUS_GRADE.clean(self.previous_grade.as_ref()),
        }
    }
}

impl CleanedRecord {
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            n if n == GENDER.name => Some(self.gender),
            n if n == EXTRACURRICULAR.name => Some(self.extracurricular),
            n if n == PARENTAL_SUPPORT.name => Some(self.parental_support),
            ONLINE_CLASSES => Some(self.online_classes),
            n if n == ATTENDANCE.name => Some(self.attendance_rate),
            n if n == STUDY_HOURS.name => Some(self.study_hours),
            n if n == PREVIOUS_GRADE.name => Some(self.previous_grade),
            _ => None,
        }
    }

    /// Reorder into `feature_names`. The list must name every cleaned
    /// feature exactly once and nothing else.
    pub fn arrange(&self, feature_names: &[String]) -> Result<FeatureVector, FeatureError> {
        let mut seen = HashSet::with_capacity(feature_names.len());
        let mut values = Vec::with_capacity(feature_names.len());
        for name in feature_names {
            if !seen.insert(name.as_str()) {
                return Err(FeatureError::DuplicateFeature(name.clone()));
            }
            let value = self
                .get(name)
                .ok_or_else(|| FeatureError::UnknownFeature(name.clone()))?;
            values.push(value);
        }
        if let Some(missing) = FEATURE_COLUMNS.iter().find(|c| !seen.contains(**c)) {
            return Err(FeatureError::MissingFromFeatureList(missing.to_string()));
        }
        Ok(FeatureVector {
            names: feature_names.to_vec(),
            values,
        })
    }
}

/// Lenient numeric coercion: numbers pass through, numeric strings are
/// parsed, booleans become 0/1, everything else (including NaN) is missing.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    (!n.is_nan()).then_some(n)
}

fn category_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
