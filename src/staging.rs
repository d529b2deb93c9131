//! Staging directories for uploaded and generated files.
//!
//! Both directories are resolved once at startup and shared by every request.
//! Caller-supplied filenames are sanitized before they are joined under a staging
//! root, so a request can never address a path outside of it.

use crate::error::{BridgeError, BridgeResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Device names Windows refuses as file names, regardless of extension.
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a caller-supplied filename to a safe single path component.
///
/// Path separators become word breaks, whitespace runs become `_`, and everything
/// outside `[A-Za-z0-9_.-]` is dropped. Leading and trailing `.`/`_` are stripped so
/// the result can't be `..` or a hidden file. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_').to_string();

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return format!("_{}", trimmed);
    }

    trimmed
}

/// The two process-wide staging roots.
#[derive(Debug, Clone)]
pub struct StagingDirs {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl StagingDirs {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Create both directories if they do not exist yet.
    pub fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        info!(
            upload_dir = %self.upload_dir.display(),
            output_dir = %self.output_dir.display(),
            "Staging directories ready"
        );
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve a caller-supplied name inside the output directory.
    pub fn output_path(&self, requested: &str) -> BridgeResult<StagedFile> {
        StagedFile::resolve(&self.output_dir, requested)
    }

    /// Resolve a caller-supplied name inside the upload directory.
    pub fn upload_path(&self, requested: &str) -> BridgeResult<StagedFile> {
        StagedFile::resolve(&self.upload_dir, requested)
    }

    /// Write an uploaded file into the upload directory.
    pub async fn persist_upload(&self, requested: &str, contents: &[u8]) -> BridgeResult<StagedFile> {
        let staged = self.upload_path(requested)?;
        tokio::fs::write(&staged.path, contents).await.map_err(|e| {
            BridgeError::import(format!(
                "Failed to save uploaded file '{}': {}",
                staged.name, e
            ))
        })?;
        info!(
            file = %staged.name,
            size = %humansize::format_size(contents.len() as u64, humansize::DECIMAL),
            "Upload staged"
        );
        Ok(staged)
    }
}

/// A sanitized file name and its absolute location under a staging root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub path: PathBuf,
}

impl StagedFile {
    fn resolve(root: &Path, requested: &str) -> BridgeResult<Self> {
        let name = sanitize_filename(requested);
        if name.is_empty() {
            return Err(BridgeError::invalid_input(format!(
                "File name '{}' is not usable after sanitization.",
                requested
            )));
        }
        debug!(requested, sanitized = %name, "Resolved staged file name");
        Ok(Self {
            path: root.join(&name),
            name,
        })
    }
}
