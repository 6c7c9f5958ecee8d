//! Filesystem operations
//!
//! Handles directory listing and file reads for recipe repositories.

use std::path::Path;

use crate::error::RecipeError;

/// Names of the immediate, non-hidden subdirectories of `path`, sorted
pub fn list_subdirectories(path: &Path) -> Result<Vec<String>, RecipeError> {
    let io_error = |e: std::io::Error| RecipeError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if !entry.file_type().map_err(io_error)?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            dirs.push(name);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, RecipeError> {
    std::fs::read_to_string(path).map_err(|e| RecipeError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
