use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::encoding::EncodingMode;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PredictorConfig {
    /// Labeled CSV read by the trainer
    pub dataset_path: String,
    /// Serialized classifier artifact
    pub model_path: String,
    /// Serialized scaler artifact
    pub scaler_path: String,
    /// JSON array of feature names in training column order
    pub feature_names_path: String,
    /// Address the predictor service binds to
    pub listen_addr: String,
    pub training: TrainingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation. Defaults to 0.2
    pub test_fraction: f64,
    /// Seed for the stratified split. Defaults to 42
    pub seed: u64,
    /// Iteration cap for the logistic regression solver. Defaults to 1000
    pub max_iterations: u64,
    /// L2 regularisation strength. Defaults to 1.0
    pub l2_penalty: f64,
    /// PreviousGrade at or above this value is labelled Pass. Defaults to 70
    pub pass_threshold: f64,
    pub encoding: EncodingMode,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            dataset_path: "student_performance_updated_1000.csv".to_string(),
            model_path: "model.bin".to_string(),
            scaler_path: "scaler.bin".to_string(),
            feature_names_path: "feature_names.json".to_string(),
            listen_addr: "127.0.0.1:5001".to_string(),
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            max_iterations: 1000,
            l2_penalty: 1.0,
            pass_threshold: 70.0,
            encoding: EncodingMode::Fixed,
        }
    }
}

impl PredictorConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&content).map_err(|e| anyhow!(e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Like [`from_file`](Self::from_file), but falls back to the built-in
    /// defaults when `path` does not exist.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            log::info!("Loading configuration from {}", path);
            Self::from_file(path)
        } else {
            log::info!("Config file '{}' not found. Using defaults.", path);
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            bail!("training.test_fraction must be in (0, 1), got {}", t.test_fraction);
        }
        if t.max_iterations == 0 {
            bail!("training.max_iterations must be at least 1");
        }
        if !(t.l2_penalty >= 0.0) {
            bail!("training.l2_penalty must be non-negative, got {}", t.l2_penalty);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: PredictorConfig = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:8080"

            [training]
            seed = 7
            encoding = "label"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.model_path, "model.bin");
        assert_eq!(cfg.training.seed, 7);
        assert_eq!(cfg.training.max_iterations, 1000);
        assert_eq!(cfg.training.encoding, EncodingMode::Label);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_test_fraction() {
        let mut cfg = PredictorConfig::default();
        cfg.training.test_fraction = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = PredictorConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(cfg.dataset_path, "student_performance_updated_1000.csv");
        assert_eq!(cfg.training.pass_threshold, 70.0);
    }
}
