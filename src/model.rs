use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TrainingConfig;
use crate::encoding::{EncodingMode, ENCODING_VERSION};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty matrix")]
    EmptyInput,
    #[error("expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("label count {labels} does not match row count {rows}")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("logistic regression fit failed: {0}")]
    Fit(String),
}

/// Provenance stored alongside the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub encoding: EncodingMode,
    pub encoding_version: u32,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
}

/// Binary logistic regression. `predict_proba` returns P(Pass).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f64>,
    bias: f64,
    pub meta: ModelMeta,
}

impl LogisticModel {
    /// `x` must already be scaled; `y` holds 0 (Fail) / 1 (Pass).
    pub fn train(x: ArrayView2<f64>, y: &Array1<usize>, cfg: &TrainingConfig) -> Result<Self, ModelError> {
        let rows = x.nrows();
        if rows == 0 {
            return Err(ModelError::EmptyInput);
        }
        if y.len() != rows {
            return Err(ModelError::LabelMismatch { rows, labels: y.len() });
        }
        let meta = ModelMeta {
            encoding: cfg.encoding,
            encoding_version: ENCODING_VERSION,
            trained_at: Utc::now(),
            training_rows: rows,
        };

        let positives = y.iter().filter(|&&c| c == 1).count();
        if positives == 0 || positives == rows {
            log::warn!(
                "Training split holds a single class ({} of {} Pass); fitting a constant model",
                positives,
                rows
            );
            return Ok(Self::constant(x.ncols(), positives, rows, meta));
        }

        let ds = Dataset::new(x.to_owned(), y.clone());
        let fitted = LogisticRegression::default()
            .alpha(cfg.l2_penalty)
            .max_iterations(cfg.max_iterations)
            .fit(&ds)
            .map_err(|e| ModelError::Fit(e.to_string()))?;

        let mut weights = fitted.params().to_vec();
        let mut bias = fitted.intercept();
        // linfa orients the decision function towards whichever class it
        // picked as positive; we always want P(Pass).
        if fitted.labels().pos.class != 1 {
            weights.iter_mut().for_each(|w| *w = -*w);
            bias = -bias;
        }
        Ok(Self { weights, bias, meta })
    }

    /// Zero weights with the bias at the log-odds of the Laplace-smoothed
    /// positive rate.
    fn constant(n_features: usize, positives: usize, rows: usize, meta: ModelMeta) -> Self {
        let p = (positives as f64 + 1.0) / (rows as f64 + 2.0);
        Self {
            weights: vec![0.0; n_features],
            bias: (p / (1.0 - p)).ln(),
            meta,
        }
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn decision(&self, features: ArrayView1<f64>) -> Result<f64, ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                got: features.len(),
            });
        }
        Ok(self.bias + ArrayView1::from(&self.weights).dot(&features))
    }

    pub fn predict_proba(&self, features: ArrayView1<f64>) -> Result<f64, ModelError> {
        let z = self.decision(features)?;
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    /// 1 when the decision function is strictly positive.
    pub fn predict(&self, features: ArrayView1<f64>) -> Result<usize, ModelError> {
        Ok(usize::from(self.decision(features)? > 0.0))
    }

    pub fn accuracy(&self, x: ArrayView2<f64>, y: &Array1<usize>) -> Result<f64, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyInput);
        }
        let mut correct = 0usize;
        for (row, &label) in x.rows().into_iter().zip(y.iter()) {
            if self.predict(row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / x.nrows() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn separable() -> (Array2<f64>, Array1<usize>) {
        let x = array![
            [-2.0, 0.1],
            [-1.5, -0.3],
            [-1.0, 0.2],
            [-0.8, 0.0],
            [0.8, 0.1],
            [1.0, -0.2],
            [1.5, 0.3],
            [2.0, 0.0]
        ];
        let y = Array1::from(vec![0, 0, 0, 0, 1, 1, 1, 1]);
        (x, y)
    }

    #[test]
    fn learns_separable_data() {
        let (x, y) = separable();
        let model = LogisticModel::train(x.view(), &y, &TrainingConfig::default()).unwrap();
        assert_eq!(model.n_features(), 2);
        assert!(model.predict_proba(array![2.0, 0.0].view()).unwrap() > 0.5);
        assert!(model.predict_proba(array![-2.0, 0.0].view()).unwrap() < 0.5);
        assert_eq!(model.accuracy(x.view(), &y).unwrap(), 1.0);
        assert_eq!(model.meta.encoding_version, ENCODING_VERSION);
    }

    #[test]
    fn orientation_does_not_depend_on_label_order() {
        // Same data with the Pass rows first
        let (x, y) = separable();
        let order = [4, 5, 6, 7, 0, 1, 2, 3];
        let x2 = x.select(ndarray::Axis(0), &order);
        let y2 = y.select(ndarray::Axis(0), &order);
        let model = LogisticModel::train(x2.view(), &y2, &TrainingConfig::default()).unwrap();
        assert_eq!(model.predict(array![1.8, 0.0].view()).unwrap(), 1);
        assert_eq!(model.predict(array![-1.8, 0.0].view()).unwrap(), 0);
    }

    #[test]
    fn single_class_fits_constant_model() {
        let x = array![[0.1, 1.0], [0.4, -1.0], [-0.5, 0.0]];
        let y = Array1::from(vec![1, 1, 1]);
        let model = LogisticModel::train(x.view(), &y, &TrainingConfig::default()).unwrap();
        let p = model.predict_proba(array![5.0, -5.0].view()).unwrap();
        assert!((p - 0.8).abs() < 1e-12);
        assert_eq!(model.predict(array![0.0, 0.0].view()).unwrap(), 1);

        let y = Array1::from(vec![0, 0, 0]);
        let model = LogisticModel::train(x.view(), &y, &TrainingConfig::default()).unwrap();
        assert_eq!(model.predict(array![0.0, 0.0].view()).unwrap(), 0);
    }

    #[test]
    fn rejects_wrong_width() {
        let (x, y) = separable();
        let model = LogisticModel::train(x.view(), &y, &TrainingConfig::default()).unwrap();
        assert!(matches!(
            model.predict_proba(array![1.0].view()),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn rejects_label_length_mismatch() {
        let (x, _) = separable();
        let y = Array1::from(vec![0, 1]);
        assert!(matches!(
            LogisticModel::train(x.view(), &y, &TrainingConfig::default()),
            Err(ModelError::LabelMismatch { rows: 8, labels: 2 })
        ));
    }
}
