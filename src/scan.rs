//! Class-file discovery under the project's classes directory.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub const CLASS_EXTENSION: &str = "class";

pub fn is_class_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == CLASS_EXTENSION)
}

/// Depth-first listing of every class file under `root`, in a
/// deterministic order. The walk is sequential: a build pass is
/// single-threaded end to end, and unreadable entries are skipped.
pub fn scan_class_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file()) && is_class_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}
