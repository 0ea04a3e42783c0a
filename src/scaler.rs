use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Per-feature standardisation: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Population standard deviation; constant columns get a scale of 1 so
    /// they transform to zero instead of NaN.
    pub fn fit(x: ArrayView2<f64>) -> Result<Self, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyInput);
        }
        let mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyInput)?;
        let std = x.std_axis(Axis(0), 0.0);
        let scale = std.mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_width(x.ncols())?;
        let mean = ArrayView1::from(&self.mean);
        let scale = ArrayView1::from(&self.scale);
        Ok((&x - &mean) / &scale)
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Array1<f64>, ModelError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    fn check_width(&self, got: usize) -> Result<(), ModelError> {
        if got != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                got,
            });
        }
        Ok(())
    }
}
