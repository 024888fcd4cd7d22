//! Finding build scripts in a project tree

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{GradleError, Result};
use crate::model::Dsl;

/// Directories that hold generated or cached scripts
const SKIPPED_DIRS: [&str; 6] = ["build", ".gradle", ".git", ".dart_tool", "node_modules", ".idea"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn is_build_script(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == "build.gradle" || n == "build.gradle.kts")
}

/// Build scripts under `root`, sorted by path. A file path is returned as-is.
pub fn find_build_scripts(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        if Dsl::from_path(root).is_none() {
            return Err(GradleError::NotAScript(root.to_path_buf()));
        }
        return Ok(vec![root.to_path_buf()]);
    }

    let mut scripts = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped(e)) {
        let entry = entry.map_err(|e| GradleError::Io(e.into()))?;
        if entry.file_type().is_file() && is_build_script(entry.path()) {
            scripts.push(entry.into_path());
        }
    }

    scripts.sort();
    debug!(root = %root.display(), count = scripts.len(), "found build scripts");
    Ok(scripts)
}
