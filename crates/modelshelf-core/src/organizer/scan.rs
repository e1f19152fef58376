//! Filesystem walks producing the candidates for each phase.
//!
//! Candidates are collected up front so files moved during a phase are not
//! revisited by the same walk.

use super::layout::{ModelLayout, Placement};
use crate::error::{OrganizerError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recognized files somewhere below a type bucket.
pub fn bucket_files(layout: &ModelLayout) -> Result<Vec<PathBuf>> {
    let files = walk_recognized(layout, None)?
        .into_iter()
        .filter(|path| {
            !matches!(
                layout.placement(path),
                Placement::Staging | Placement::Outside
            )
        })
        .collect();
    Ok(files)
}

/// Recognized files directly inside the model root.
pub fn staging_files(layout: &ModelLayout) -> Result<Vec<PathBuf>> {
    let files = walk_recognized(layout, Some(1))?
        .into_iter()
        .filter(|path| layout.placement(path) == Placement::Staging)
        .collect();
    Ok(files)
}

fn walk_recognized(layout: &ModelLayout, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    let root = layout.root();
    if !root.is_dir() {
        return Err(OrganizerError::Io {
            message: "Model root is not a directory".to_string(),
            path: Some(root.to_path_buf()),
            source: None,
        });
    }

    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_file() && layout.is_recognized(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn walk_error(root: &Path, err: walkdir::Error) -> OrganizerError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let message = err.to_string();
    OrganizerError::Io {
        message,
        path: Some(path),
        source: err.into_io_error(),
    }
}
