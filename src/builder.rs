//! Build orchestration: full and incremental enhancement passes.
//!
//! One pass per invocation, single-threaded; the build trigger guarantees
//! passes for the same project never overlap. Failures local to one
//! candidate are contained and surfaced as annotations; only classpath
//! resolution failure aborts the pass.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::classpath::{ClasspathIndex, resolve_classpath};
use crate::config::{EnhancerConfig, resolve_in};
use crate::error::EnhanceError;
use crate::marker::{self, MarkerStore};
use crate::probe;
use crate::scan;
use crate::sink::TransformLog;
use crate::transform::CombinedTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    Added,
    Changed,
    Removed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaEntry {
    pub kind: DeltaKind,
    pub path: PathBuf,
}

/// Change-set handed over by the build trigger for an incremental pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceDelta {
    pub entries: Vec<DeltaEntry>,
}

impl ResourceDelta {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read delta file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse delta file: {}", path.display()))
    }
}

/// Immutable for the duration of one build pass.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub kind: BuildKind,
    pub delta: Option<ResourceDelta>,
}

impl BuildRequest {
    pub fn full() -> Self {
        Self {
            kind: BuildKind::Full,
            delta: None,
        }
    }

    pub fn incremental(delta: Option<ResourceDelta>) -> Self {
        Self {
            kind: BuildKind::Incremental,
            delta,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub kind: &'static str,
    pub attempted: usize,
    pub enhanced: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: usize,
    pub annotations: usize,
    pub duration_ms: u64,
}

struct CandidateOutcome {
    enhanced: bool,
    written: bool,
    failures: usize,
}

pub struct BuildOrchestrator {
    project_root: PathBuf,
    config: EnhancerConfig,
    transform: CombinedTransform,
    markers: MarkerStore,
}

impl BuildOrchestrator {
    pub fn new(project_root: PathBuf, config: EnhancerConfig, transform: CombinedTransform) -> Self {
        let markers = MarkerStore::new(config.problems_path(&project_root));
        Self {
            project_root,
            config,
            transform,
            markers,
        }
    }

    /// Run one build pass. Classpath resolution failure aborts the whole
    /// pass before any candidate is touched; everything else is contained
    /// per candidate.
    pub fn run(&mut self, request: &BuildRequest) -> Result<BuildSummary, EnhanceError> {
        let start = Instant::now();

        // Resolved once and reused for the duration of this pass only.
        let classpath = resolve_classpath(&self.project_root, &self.config)?;

        let mut log = TransformLog::to_file(
            &self.config.log_path(&self.project_root),
            self.config.debug.plugin,
        );
        self.markers.begin_pass();

        let (kind, candidates) = self.candidates(request);
        let mut summary = BuildSummary {
            kind,
            attempted: 0,
            enhanced: 0,
            unchanged: 0,
            skipped: 0,
            failures: 0,
            annotations: 0,
            duration_ms: 0,
        };

        for path in candidates {
            summary.attempted += 1;
            match self.process_candidate(&path, &classpath, &mut log) {
                Ok(outcome) => {
                    if outcome.written {
                        summary.enhanced += 1;
                    } else if outcome.enhanced {
                        summary.unchanged += 1;
                    }
                    summary.failures += outcome.failures;
                }
                Err(EnhanceError::MalformedClass { reason }) => {
                    // not attributable to any source file, skip without marker
                    tracing::warn!(path = %path.display(), reason = %reason, "skipping unreadable class file");
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "error during enhancement");
                    self.markers
                        .annotate(self.project_root.clone(), &e.to_string());
                    summary.failures += 1;
                }
            }
        }

        summary.annotations = self.markers.records().len();
        self.markers.finish_pass();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    fn candidates(&self, request: &BuildRequest) -> (&'static str, Vec<PathBuf>) {
        let classes_dir = self.config.classes_dir_in(&self.project_root);
        match request.kind {
            BuildKind::Full => ("full", scan::scan_class_files(&classes_dir)),
            BuildKind::Incremental => match &request.delta {
                // first pass after activation has no change-set yet
                None => ("full", scan::scan_class_files(&classes_dir)),
                Some(delta) => {
                    let mut paths = Vec::new();
                    for entry in &delta.entries {
                        if matches!(entry.kind, DeltaKind::Added | DeltaKind::Changed)
                            && scan::is_class_file(&entry.path)
                        {
                            paths.push(resolve_in(&self.project_root, &entry.path));
                        }
                    }
                    ("incremental", paths)
                }
            },
        }
    }

    fn process_candidate(
        &mut self,
        path: &Path,
        classpath: &[PathBuf],
        log: &mut TransformLog,
    ) -> Result<CandidateOutcome, EnhanceError> {
        let bytes = std::fs::read(path)?;
        let class_name = probe::class_name(&bytes)?;
        let source = marker::find_source(&self.project_root, &self.config.source_roots, &class_name);

        // classpath resources for this candidate live exactly as long as
        // the index does
        let index = ClasspathIndex::new(classpath);
        let outcome = self.transform.apply(&index, &class_name, &bytes, log);

        let mut written = false;
        let mut failures = outcome.failures.len();

        if let Some(out) = outcome.bytes.as_deref() {
            // writing identical bytes would re-trigger the change
            // notification that got us here
            if out != bytes.as_slice() {
                match std::fs::write(path, out) {
                    Ok(()) => {
                        written = true;
                        log.summary(&format!("enhanced: {class_name}"));
                    }
                    Err(e) => {
                        tracing::error!(class = %class_name, error = %e, "failed to write enhanced class");
                        self.markers
                            .annotate(source.clone(), &format!("failed to write enhanced class: {e}"));
                        failures += 1;
                    }
                }
            }
        }

        for failure in &outcome.failures {
            tracing::error!(
                class = %failure.class_name,
                pass = failure.pass,
                message = %failure.message,
                "enhancement failure"
            );
            self.markers.annotate(source.clone(), &failure.message);
        }

        Ok(CandidateOutcome {
            enhanced: outcome.enhanced,
            written,
            failures,
        })
    }
}
