//! One-shot training run: CSV in, three artifacts out.

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::artifacts::{ArtifactPaths, TrainedArtifacts};
use crate::config::{PredictorConfig, TrainingConfig};
use crate::dataset::{self, PreparedData, RawTable};
use crate::model::LogisticModel;
use crate::scaler::StandardScaler;

#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<usize>,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub artifacts: TrainedArtifacts,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the test split came out empty.
    pub test_accuracy: Option<f64>,
}

/// Shuffles each class with a seeded RNG and holds out `test_fraction` of it
/// (rounded), so both splits keep the class balance.
pub fn stratified_split(data: &PreparedData, test_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();
    for class in [0usize, 1] {
        let mut idx: Vec<usize> = (0..data.y.len()).filter(|&i| data.y[i] == class).collect();
        idx.shuffle(&mut rng);
        let n_test = (idx.len() as f64 * test_fraction).round() as usize;
        // keep at least one row of a class in training when it has any
        let n_test = n_test.min(idx.len().saturating_sub(1));
        test_idx.extend_from_slice(&idx[..n_test]);
        train_idx.extend_from_slice(&idx[n_test..]);
    }
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Split {
        x_train: data.x.select(Axis(0), &train_idx),
        y_train: data.y.select(Axis(0), &train_idx),
        x_test: data.x.select(Axis(0), &test_idx),
        y_test: data.y.select(Axis(0), &test_idx),
    }
}

/// Scale on the training split only, then fit the classifier.
pub fn fit(data: &PreparedData, cfg: &TrainingConfig) -> Result<TrainingReport> {
    let split = stratified_split(data, cfg.test_fraction, cfg.seed);
    log::info!(
        "Split {} rows into {} train / {} test",
        data.y.len(),
        split.y_train.len(),
        split.y_test.len()
    );

    let scaler = StandardScaler::fit(split.x_train.view())?;
    let x_train = scaler.transform(split.x_train.view())?;
    let model = LogisticModel::train(x_train.view(), &split.y_train, cfg)?;

    let test_accuracy = if split.y_test.is_empty() {
        None
    } else {
        let x_test = scaler.transform(split.x_test.view())?;
        Some(model.accuracy(x_test.view(), &split.y_test)?)
    };

    Ok(TrainingReport {
        artifacts: TrainedArtifacts {
            model,
            scaler,
            feature_names: data.feature_names.clone(),
        },
        train_rows: split.y_train.len(),
        test_rows: split.y_test.len(),
        test_accuracy,
    })
}

/// Full run as the `train` binary performs it. Nothing is written unless
/// every step before persistence succeeded.
pub fn run(cfg: &PredictorConfig) -> Result<TrainingReport> {
    log::info!("Reading training data from {}", cfg.dataset_path);
    let table = RawTable::from_path(&cfg.dataset_path)
        .with_context(|| format!("loading {}", cfg.dataset_path))?;
    log::info!("Read {} rows", table.len());

    let data = dataset::prepare(&table, cfg.training.pass_threshold, cfg.training.encoding)?;
    log::info!(
        "Prepared {} rows x {} features; {} Pass / {} Fail",
        data.y.len(),
        data.feature_names.len(),
        data.positives(),
        data.y.len() - data.positives()
    );

    let report = fit(&data, &cfg.training)?;
    match report.test_accuracy {
        Some(acc) => log::info!("Test accuracy: {:.2}%", acc * 100.0),
        None => log::warn!("Test split is empty; skipping evaluation"),
    }

    let paths = ArtifactPaths::from_config(cfg);
    report.artifacts.save(&paths)?;
    log::info!("Model saved to {}", paths.model.display());
    log::info!("Scaler saved to {}", paths.scaler.display());
    log::info!("Feature names saved to {}", paths.feature_names.display());
    Ok(report)
}
