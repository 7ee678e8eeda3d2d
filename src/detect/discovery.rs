//! Model artifact discovery.
//!
//! The models directory is scanned at startup: a custom-trained export
//! archive (`*.zip`, extracted alongside) takes precedence over the
//! bundled `TinyYolo2_model.onnx` fallback. Archive candidates are
//! sorted by file name so discovery is deterministic across platforms.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the fallback model shipped with the daemon.
pub const TINY_YOLO_MODEL_FILE: &str = "TinyYolo2_model.onnx";

/// A discovered model artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelArtifact {
    /// Custom-trained export archive. The archive is expected to be
    /// extracted next to itself (a directory with the same stem holding
    /// `model.onnx` and `labels.txt`).
    CustomVision { archive: PathBuf },
    /// The bundled TinyYOLO v2 model.
    TinyYolo { model: PathBuf },
}

impl ModelArtifact {
    /// Path to the ONNX graph to load.
    pub fn onnx_path(&self) -> Result<PathBuf> {
        match self {
            ModelArtifact::TinyYolo { model } => Ok(model.clone()),
            ModelArtifact::CustomVision { archive } => {
                let path = extracted_dir(archive).join("model.onnx");
                if !path.exists() {
                    return Err(anyhow!(
                        "custom export {} is not extracted (expected {})",
                        archive.display(),
                        path.display()
                    ));
                }
                Ok(path)
            }
        }
    }

    /// Label list for the artifact. The TinyYOLO fallback carries its
    /// labels in code; custom exports ship a `labels.txt`.
    pub fn labels(&self) -> Result<Option<Vec<String>>> {
        match self {
            ModelArtifact::TinyYolo { .. } => Ok(None),
            ModelArtifact::CustomVision { archive } => {
                let path = extracted_dir(archive).join("labels.txt");
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("read labels file {}", path.display()))?;
                let labels: Vec<String> = raw
                    .lines()
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect();
                if labels.is_empty() {
                    return Err(anyhow!("labels file {} is empty", path.display()));
                }
                Ok(Some(labels))
            }
        }
    }
}

fn extracted_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Find the model to load: first `*.zip` archive in `models_dir` (sorted
/// by file name), else the bundled TinyYOLO model, else an error.
pub fn discover_model(models_dir: &Path) -> Result<ModelArtifact> {
    let entries = fs::read_dir(models_dir)
        .with_context(|| format!("read models directory {}", models_dir.display()))?;

    let mut archives: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("zip"))
                    .unwrap_or(false)
        })
        .collect();
    archives.sort();

    if let Some(archive) = archives.into_iter().next() {
        return Ok(ModelArtifact::CustomVision { archive });
    }

    let fallback = models_dir.join(TINY_YOLO_MODEL_FILE);
    if fallback.exists() {
        return Ok(ModelArtifact::TinyYolo { model: fallback });
    }

    Err(anyhow!(
        "no model found in {}: no *.zip export and no {}",
        models_dir.display(),
        TINY_YOLO_MODEL_FILE
    ))
}
