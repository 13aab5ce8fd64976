//! Problem annotations for enhancement failures.
//!
//! Annotations land on the class's original source file when one can be
//! found under the configured source roots, otherwise on the project
//! root. Records persist in the problems file until a completed pass
//! without failures clears them. Creating an annotation is itself a
//! failure-reporting mechanism: errors here are logged and swallowed.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::resolve_in;
use crate::error::EnhanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

/// One problem record. No finer-grained source mapping is attempted, so
/// the line is fixed at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub target: PathBuf,
    pub severity: Severity,
    pub message: String,
    pub priority: Priority,
    pub line: u32,
}

impl AnnotationRecord {
    pub fn error(target: PathBuf, cause: &str) -> Self {
        Self {
            target,
            severity: Severity::Error,
            message: format!("Error during enhancement: {cause}"),
            priority: Priority::High,
            line: 1,
        }
    }
}

pub struct MarkerStore {
    path: PathBuf,
    records: Vec<AnnotationRecord>,
    fresh: bool,
}

impl MarkerStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: Vec::new(),
            fresh: true,
        }
    }

    /// Reset per-pass state; the first annotation of a pass replaces the
    /// previous pass's problems.
    pub fn begin_pass(&mut self) {
        self.records.clear();
        self.fresh = true;
    }

    /// Best-effort annotation creation.
    pub fn annotate(&mut self, target: PathBuf, cause: &str) {
        let record = AnnotationRecord::error(target, cause);
        if let Err(e) = self.append(&record) {
            tracing::error!(error = %e, "error during creating annotation");
        }
        self.records.push(record);
    }

    fn append(&mut self, record: &AnnotationRecord) -> Result<(), EnhanceError> {
        let annotation_error = |source: std::io::Error| EnhanceError::AnnotationCreation {
            target: record.target.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(annotation_error)?;
        }

        let mut options = OpenOptions::new();
        if self.fresh {
            options.write(true).create(true).truncate(true);
        } else {
            options.create(true).append(true);
        }
        let mut file = options.open(&self.path).map_err(annotation_error)?;

        let line = serde_json::to_string(record)
            .map_err(|e| annotation_error(std::io::Error::other(e)))?;
        writeln!(file, "{line}").map_err(annotation_error)?;
        self.fresh = false;
        Ok(())
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// A completed pass without annotations clears problems left over
    /// from earlier passes.
    pub fn finish_pass(&mut self) {
        if self.records.is_empty() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Locate the source file for a class under the configured source roots,
/// mapping inner classes to their enclosing top-level source. Falls back
/// to the project root when no source is found.
pub fn find_source(project_root: &Path, source_roots: &[PathBuf], class_name: &str) -> PathBuf {
    let top_level = class_name.split('$').next().unwrap_or(class_name);
    let rel = format!("{}.java", top_level.replace('.', "/"));

    for root in source_roots {
        let candidate = resolve_in(project_root, root).join(&rel);
        if candidate.is_file() {
            return candidate;
        }
    }

    project_root.to_path_buf()
}
