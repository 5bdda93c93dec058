use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::CheckpointOrder;
use crate::errors::{FxVideoError, Result};

const MODEL_EXTENSION: &str = "onnx";
const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// A model snapshot saved at the end of one training epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub epoch: u64,
    /// Directory entry name the epoch was parsed from.
    pub name: String,
    /// ONNX file to load.
    pub model_path: PathBuf,
}

/// Lists the snapshots directory, one checkpoint per entry.
///
/// Entries are either `<epoch>.onnx` files or `<epoch>/` directories holding
/// the model. Hidden entries are skipped; any other entry whose name is not an
/// integer is an error.
pub fn discover_checkpoints(dir: &Path, order: CheckpointOrder) -> Result<Vec<Checkpoint>> {
    if !dir.is_dir() {
        return Err(FxVideoError::FileSystem {
            path: dir.to_path_buf(),
            operation: "snapshot directory lookup".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "snapshot directory does not exist",
            ),
        });
    }

    let mut checkpoints = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| FxVideoError::Checkpoint {
            path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
            reason: e.to_string(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            tracing::debug!(entry = %name, "skipping hidden entry");
            continue;
        }
        checkpoints.push(checkpoint_from_entry(entry.path(), name)?);
    }

    if checkpoints.is_empty() {
        return Err(FxVideoError::Checkpoint {
            path: dir.to_path_buf(),
            reason: "no checkpoints found".to_string(),
        });
    }

    if order == CheckpointOrder::Numeric {
        checkpoints.sort_by_key(|c| c.epoch);
    }
    Ok(checkpoints)
}

/// Parses an epoch label; leading zeros are allowed.
pub fn parse_epoch(label: &str) -> Option<u64> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

fn checkpoint_from_entry(path: &Path, name: String) -> Result<Checkpoint> {
    let (label, model_path) = if path.is_dir() {
        (name.as_str(), resolve_model_file(path)?)
    } else {
        let is_model = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION));
        if !is_model {
            return Err(FxVideoError::Checkpoint {
                path: path.to_path_buf(),
                reason: format!("expected a `.{}` file or a directory", MODEL_EXTENSION),
            });
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        (stem, path.to_path_buf())
    };

    let epoch = parse_epoch(label).ok_or_else(|| FxVideoError::Checkpoint {
        path: path.to_path_buf(),
        reason: format!("{:?} is not an epoch number", label),
    })?;

    Ok(Checkpoint {
        epoch,
        name,
        model_path,
    })
}

fn resolve_model_file(dir: &Path) -> Result<PathBuf> {
    let default = dir.join(DEFAULT_MODEL_FILE);
    if default.is_file() {
        return Ok(default);
    }

    let read_dir = fs::read_dir(dir).map_err(|e| FxVideoError::FileSystem {
        path: dir.to_path_buf(),
        operation: "checkpoint directory listing".to_string(),
        source: e,
    })?;
    let mut candidates: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
        })
        .collect();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(FxVideoError::Checkpoint {
            path: dir.to_path_buf(),
            reason: "no ONNX model in checkpoint directory".to_string(),
        }),
        n => Err(FxVideoError::Checkpoint {
            path: dir.to_path_buf(),
            reason: format!("{} ONNX models found, expected `{}`", n, DEFAULT_MODEL_FILE),
        }),
    }
}
