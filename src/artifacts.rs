//! The three files shared between the trainer and the service.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::PredictorConfig;
use crate::encoding::{EncodingMode, ENCODING_VERSION};
use crate::model::LogisticModel;
use crate::scaler::StandardScaler;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid bincode artifact {}", path.display())]
    Bincode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("invalid JSON artifact {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact shapes disagree: {features} feature names, scaler width {scaler}, model width {model}")]
    ShapeMismatch { features: usize, scaler: usize, model: usize },
    #[error("model was trained with encoding version {found}, this build uses {expected}")]
    EncodingMismatch { found: u32, expected: u32 },
}

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub feature_names: PathBuf,
}

impl ArtifactPaths {
    pub fn from_config(cfg: &PredictorConfig) -> Self {
        Self {
            model: PathBuf::from(&cfg.model_path),
            scaler: PathBuf::from(&cfg.scaler_path),
            feature_names: PathBuf::from(&cfg.feature_names_path),
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let defaults = PredictorConfig::default();
        Self {
            model: dir.join(defaults.model_path),
            scaler: dir.join(defaults.scaler_path),
            feature_names: dir.join(defaults.feature_names_path),
        }
    }
}

/// Everything the service needs, immutable once loaded.
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub model: LogisticModel,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
}

impl TrainedArtifacts {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let (features, scaler, model) =
            (self.feature_names.len(), self.scaler.n_features(), self.model.n_features());
        if features != scaler || features != model {
            return Err(ArtifactError::ShapeMismatch { features, scaler, model });
        }
        let meta = &self.model.meta;
        if meta.encoding == EncodingMode::Fixed && meta.encoding_version != ENCODING_VERSION {
            return Err(ArtifactError::EncodingMismatch {
                found: meta.encoding_version,
                expected: ENCODING_VERSION,
            });
        }
        Ok(())
    }

    /// Stages every file as a `.tmp` sibling, then swaps them in feature
    /// list first and model last. Any failure removes the staged files and
    /// restores the destinations already replaced, so the previous set stays
    /// intact.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        let encoded = [
            (&paths.feature_names, encode_json(&paths.feature_names, &self.feature_names)?),
            (&paths.scaler, encode_bincode(&paths.scaler, &self.scaler)?),
            (&paths.model, encode_bincode(&paths.model, &self.model)?),
        ];

        let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(encoded.len());
        for (dest, bytes) in &encoded {
            match stage(dest, bytes) {
                Ok(tmp) => staged.push((tmp, dest.as_path())),
                Err(e) => {
                    discard(&staged);
                    return Err(e);
                }
            }
        }
        commit(&staged)
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let model: LogisticModel = decode_bincode(&paths.model)?;
        let scaler: StandardScaler = decode_bincode(&paths.scaler)?;
        let feature_names: Vec<String> = {
            let bytes = read(&paths.feature_names)?;
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: paths.feature_names.clone(),
                source,
            })?
        };
        let artifacts = Self {
            model,
            scaler,
            feature_names,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }
}

fn sibling(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    dest.with_file_name(name)
}

fn io_error(path: &Path, source: io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn stage(dest: &Path, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
    let tmp = sibling(dest, ".tmp");
    fs::write(&tmp, bytes).map_err(|source| io_error(&tmp, source))?;
    Ok(tmp)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        if let Err(e) = fs::remove_file(tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("could not remove staged file {}: {}", tmp.display(), e);
            }
        }
    }
}

fn commit(staged: &[(PathBuf, &Path)]) -> Result<(), ArtifactError> {
    let mut applied: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged {
        match swap_in(tmp, dest) {
            Ok(backup) => applied.push((*dest, backup)),
            Err(e) => {
                for (dest, backup) in applied.iter().rev() {
                    restore(dest, backup.as_deref());
                }
                discard(staged);
                return Err(e);
            }
        }
    }
    for (_, backup) in applied {
        if let Some(bak) = backup {
            if let Err(e) = fs::remove_file(&bak) {
                log::warn!("could not remove backup {}: {}", bak.display(), e);
            }
        }
    }
    Ok(())
}

/// Moves an existing regular file at `dest` aside as `.bak` and renames
/// `tmp` over it. Returns the backup path, if one was made.
fn swap_in(tmp: &Path, dest: &Path) -> Result<Option<PathBuf>, ArtifactError> {
    let backup = if dest.is_file() {
        let bak = sibling(dest, ".bak");
        fs::rename(dest, &bak).map_err(|source| io_error(dest, source))?;
        Some(bak)
    } else {
        None
    };
    if let Err(source) = fs::rename(tmp, dest) {
        if let Some(bak) = &backup {
            restore(dest, Some(bak.as_path()));
        }
        return Err(io_error(dest, source));
    }
    Ok(backup)
}

fn restore(dest: &Path, backup: Option<&Path>) {
    let result = match backup {
        Some(bak) => fs::rename(bak, dest),
        None => fs::remove_file(dest),
    };
    if let Err(e) = result {
        log::error!("could not roll back {}: {}", dest.display(), e);
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| io_error(path, source))
}

fn encode_bincode<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, ArtifactError> {
    bincode::serialize(value).map_err(|source| ArtifactError::Bincode {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_bincode<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = read(path)?;
    bincode::deserialize(&bytes).map_err(|source| ArtifactError::Bincode {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_json<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
