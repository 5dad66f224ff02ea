//! Output path resolution.

use castkit_common::OutputFormat;
use chrono::Local;
use std::path::{Component, Path, PathBuf};

/// Reason an output location was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path contains directory traversal sequences (..)
    ContainsTraversal,
    /// Path contains null bytes
    ContainsNullByte,
    /// File name contains a path separator
    FileNameHasSeparator(String),
    /// Directory could not be created
    CreateFailed(String),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ContainsTraversal => write!(f, "Path contains directory traversal"),
            PathError::ContainsNullByte => write!(f, "Path contains null byte"),
            PathError::FileNameHasSeparator(name) => {
                write!(f, "File name must not contain a path separator: {}", name)
            }
            PathError::CreateFailed(e) => write!(f, "Failed to create output directory: {}", e),
        }
    }
}

impl std::error::Error for PathError {}

fn check_directory(dir: &Path) -> Result<(), PathError> {
    if dir.to_string_lossy().contains('\0') {
        return Err(PathError::ContainsNullByte);
    }
    if dir.components().any(|c| c == Component::ParentDir) {
        return Err(PathError::ContainsTraversal);
    }
    Ok(())
}

fn check_file_name(name: &str) -> Result<(), PathError> {
    if name.contains('\0') {
        return Err(PathError::ContainsNullByte);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(PathError::FileNameHasSeparator(name.to_string()));
    }
    if name == ".." || name == "." {
        return Err(PathError::ContainsTraversal);
    }
    Ok(())
}

/// Synthesize `capture_<timestamp>.<ext>` for the given container.
pub fn generate_file_name(format: OutputFormat) -> String {
    let timestamp = Local::now().format("%Y-%m-%d_%H%M%S");
    format!("capture_{}.{}", timestamp, format.extension())
}

/// Resolve the session's output file and create its parent directories.
///
/// Uses `directory` when given, otherwise `default_dir`. Uses `file_name`
/// when given, otherwise a timestamped name with the container's extension.
pub fn resolve_output_path(
    directory: Option<&Path>,
    file_name: Option<&str>,
    format: OutputFormat,
    default_dir: &Path,
) -> Result<PathBuf, PathError> {
    let dir = directory.unwrap_or(default_dir);
    check_directory(dir)?;

    let name = match file_name {
        Some(name) => {
            check_file_name(name)?;
            name.to_string()
        }
        None => generate_file_name(format),
    };

    std::fs::create_dir_all(dir).map_err(|e| PathError::CreateFailed(e.to_string()))?;

    Ok(dir.join(name))
}
