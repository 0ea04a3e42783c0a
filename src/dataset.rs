//! Training data: CSV loading, imputation, encoding and label derivation.

use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::encoding::{CategoricalField, EncodingMode, LabelEncoder, CATEGORICAL_FIELDS};
use crate::features::{NumericField, ATTENDANCE, FEATURE_COLUMNS, PREVIOUS_GRADE, STUDY_HOURS};

/// Tokens read as missing, matching the usual dataframe NA set.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Identifier and leakage columns never used as features.
pub const DROPPED_COLUMNS: [&str; 5] = ["StudentID", "Name", "FinalGrade", "Study Hours", "Attendance (%)"];

/// Below this missing fraction a numeric column is imputed with its median,
/// otherwise with its mean.
const MEDIAN_IMPUTE_LIMIT: f64 = 0.05;

const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Cannot create target variable - {} column not found", PREVIOUS_GRADE.name)]
    MissingLabelSource,
    #[error("no usable rows left after cleaning")]
    Empty,
    #[error("none of the feature columns are present")]
    NoFeatures,
}

/// A CSV held as strings, with NA tokens already turned into `None`.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row = (0..headers.len())
                .map(|i| record.get(i).filter(|v| !NA_TOKENS.contains(&v.trim())).map(str::to_string))
                .collect();
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }
}

/// Cleaned training matrix with labels and the ordered feature names.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<usize>,
}

impl PreparedData {
    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&c| c == 1).count()
    }
}

pub fn prepare(table: &RawTable, pass_threshold: f64, encoding: EncodingMode) -> Result<PreparedData, DatasetError> {
    if !table.has_column(PREVIOUS_GRADE.name) {
        return Err(DatasetError::MissingLabelSource);
    }
    if table.is_empty() {
        return Err(DatasetError::Empty);
    }

    let dropped: Vec<&str> = DROPPED_COLUMNS.iter().copied().filter(|c| table.has_column(c)).collect();
    if !dropped.is_empty() {
        log::info!("Dropping identifier columns: {:?}", dropped);
    }

    let mut columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for name in FEATURE_COLUMNS {
        let Some(raw) = table.column(name) else {
            log::warn!("Feature column '{}' not in dataset; skipping", name);
            continue;
        };
        let values = if let Some(field) = numeric_field(name) {
            impute_numeric(field, &raw)
        } else if let Some(field) = CATEGORICAL_FIELDS.iter().find(|f| f.name == name) {
            encode_categorical(field, &raw, encoding)
        } else {
            raw.iter().map(|v| Some(online_flag(*v))).collect()
        };
        columns.push((name.to_string(), values));
    }
    if columns.is_empty() {
        return Err(DatasetError::NoFeatures);
    }

    let grade_idx = columns
        .iter()
        .position(|(n, _)| n == PREVIOUS_GRADE.name)
        .ok_or(DatasetError::MissingLabelSource)?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut labels = Vec::new();
    'rows: for r in 0..table.len() {
        let mut row = Vec::with_capacity(columns.len());
        for (_, values) in &columns {
            match values[r] {
                Some(v) => row.push(v),
                None => continue 'rows,
            }
        }
        labels.push(usize::from(row[grade_idx] >= pass_threshold));
        rows.push(row);
    }

    let kept = labels.len();
    if kept < table.len() {
        log::info!("Dropped {} rows with unresolved missing values", table.len() - kept);
    }
    if kept == 0 {
        return Err(DatasetError::Empty);
    }

    let width = columns.len();
    let x = Array2::from_shape_fn((kept, width), |(i, j)| rows[i][j]);
    Ok(PreparedData {
        feature_names: columns.into_iter().map(|(n, _)| n).collect(),
        x,
        y: Array1::from(labels),
    })
}

fn numeric_field(name: &str) -> Option<&'static NumericField> {
    [&ATTENDANCE, &STUDY_HOURS, &PREVIOUS_GRADE].into_iter().find(|f| f.name == name)
}

fn impute_numeric(field: &NumericField, raw: &[Option<&str>]) -> Vec<Option<f64>> {
    let parsed: Vec<Option<f64>> = raw
        .iter()
        .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|n| !n.is_nan()))
        .collect();
    let present: Vec<f64> = parsed.iter().flatten().copied().collect();
    let missing_frac = (parsed.len() - present.len()) as f64 / parsed.len() as f64;

    let fill = if missing_frac < MEDIAN_IMPUTE_LIMIT {
        median(&present)
    } else {
        mean(&present)
    };
    log::info!(
        "{}: {:.1}% missing, imputing with {} {:?}",
        field.name,
        missing_frac * 100.0,
        if missing_frac < MEDIAN_IMPUTE_LIMIT { "median" } else { "mean" },
        fill
    );
    parsed.into_iter().map(|v| v.or(fill)).collect()
}

fn encode_categorical(field: &CategoricalField, raw: &[Option<&str>], mode: EncodingMode) -> Vec<Option<f64>> {
    let filled: Vec<&str> = raw.iter().map(|v| v.unwrap_or(UNKNOWN_CATEGORY)).collect();
    match mode {
        EncodingMode::Fixed => filled.iter().map(|v| Some(field.encode(Some(v)))).collect(),
        EncodingMode::Label => {
            let encoder = LabelEncoder::fit(filled.iter().copied());
            log::info!(
                "{}: label codes {:?}",
                field.name,
                encoder.classes().collect::<Vec<_>>()
            );
            filled.iter().map(|v| encoder.transform(v)).collect()
        }
    }
}

/// Boolean-ish column: true/yes spellings are 1, anything else (missing too) is 0.
fn online_flag(raw: Option<&str>) -> f64 {
    match raw.map(str::trim) {
        Some("True" | "TRUE" | "true" | "Yes") => 1.0,
        _ => 0.0,
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
