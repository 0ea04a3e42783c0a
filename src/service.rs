//! Predictor state and the per-record inference path.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::artifacts::{ArtifactPaths, TrainedArtifacts};
use crate::encoding::EncodingMode;
use crate::features::{FeatureError, StudentRecord};
use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Pass,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => f.write_str("Pass"),
            Outcome::Fail => f.write_str("Fail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Probability of the predicted class, in [0.5, 1].
    pub confidence: f64,
}

impl Prediction {
    /// e.g. `"87.35%"`
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// Loaded artifacts plus the inference path over them.
#[derive(Debug)]
pub struct Predictor {
    artifacts: TrainedArtifacts,
}

impl Predictor {
    pub fn new(artifacts: TrainedArtifacts) -> Self {
        Self { artifacts }
    }

    pub fn predict(&self, record: &StudentRecord) -> Result<Prediction, PredictError> {
        let features = record.clean().arrange(&self.artifacts.feature_names)?;
        let scaled = self.artifacts.scaler.transform_row(&features.values)?;
        let model = &self.artifacts.model;
        let p_pass = model.predict_proba(scaled.view())?;
        let outcome = match model.predict(scaled.view())? {
            1 => Outcome::Pass,
            _ => Outcome::Fail,
        };
        Ok(Prediction {
            outcome,
            confidence: p_pass.max(1.0 - p_pass),
        })
    }
}

/// Service state, fixed at startup.
#[derive(Debug)]
pub enum PredictorContext {
    Ready(Predictor),
    Unready { reason: String },
}

impl PredictorContext {
    pub fn load(paths: &ArtifactPaths) -> Self {
        match TrainedArtifacts::load(paths) {
            Ok(artifacts) => {
                let meta = &artifacts.model.meta;
                log::info!(
                    "Loaded model trained at {} on {} rows ({} features)",
                    meta.trained_at,
                    meta.training_rows,
                    artifacts.feature_names.len()
                );
                if meta.encoding == EncodingMode::Label {
                    log::warn!("Model used per-run label encoding; inference category codes may not match training");
                }
                if let Err(e) = StudentRecord::default().clean().arrange(&artifacts.feature_names) {
                    log::warn!("Feature list does not match the cleaner, every prediction will fail: {}", e);
                }
                Self::Ready(Predictor::new(artifacts))
            }
            Err(e) => {
                log::error!("Model files could not be loaded ({}). Please run the trainer first.", e);
                Self::Unready { reason: e.to_string() }
            }
        }
    }

    pub fn predictor(&self) -> Option<&Predictor> {
        match self {
            Self::Ready(p) => Some(p),
            Self::Unready { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.predictor().is_some()
    }
}
