//! Student pass/fail predictor.
//!
//! - `train` binary: CSV → cleaned matrix → scaler + logistic regression →
//!   three artifact files
//! - service binary: loads the artifacts once and answers `POST /predict`
//!
//! Both sides clean categorical fields through the shared tables in
//! [`encoding`], so training and inference codes agree.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod features;
pub mod model;
pub mod scaler;
pub mod service;
pub mod trainer;

pub use artifacts::{ArtifactPaths, TrainedArtifacts};
pub use config::PredictorConfig;
pub use features::StudentRecord;
pub use service::{Outcome, Prediction, Predictor, PredictorContext};
