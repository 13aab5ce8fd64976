//! Project configuration, read from `enhancer.toml` at the project root.
//!
//! The build trigger owns activation: a project without a config file
//! still builds with the defaults below, and disabling enhancement means
//! not invoking the trigger at all.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "enhancer.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EnhancerConfig {
    /// Directory holding the compiled class files, relative to the
    /// project root unless absolute.
    #[serde(default = "default_classes_dir")]
    pub classes_dir: PathBuf,

    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<PathBuf>,

    /// Inline classpath entries, in runtime order.
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Optional file of further entries, newline- or separator-delimited,
    /// as written by e.g. `mvn dependency:build-classpath`.
    #[serde(default)]
    pub classpath_file: Option<PathBuf>,

    #[serde(default)]
    pub debug: DebugConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub agents: AgentConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DebugConfig {
    /// Verbosity of the transform log: 0 silent, 1 summary, 2+ per-class.
    #[serde(default)]
    pub plugin: u8,

    /// Debug level forwarded to the enhancement agents.
    #[serde(default)]
    pub enhance: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AgentConfig {
    pub entity_jar: Option<PathBuf>,
    pub query_bean_jar: Option<PathBuf>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            classes_dir: default_classes_dir(),
            source_roots: default_source_roots(),
            classpath: Vec::new(),
            classpath_file: None,
            debug: DebugConfig::default(),
            log: LogConfig::default(),
            agents: AgentConfig::default(),
        }
    }
}

impl EnhancerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Explicit path wins; otherwise `enhancer.toml` under the project
    /// root, falling back to defaults when the file does not exist.
    pub fn load_for_project(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = project_root.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn classes_dir_in(&self, project_root: &Path) -> PathBuf {
        resolve_in(project_root, &self.classes_dir)
    }

    pub fn log_path(&self, project_root: &Path) -> PathBuf {
        match &self.log.file {
            Some(file) => resolve_in(project_root, file),
            None => project_root.join(".enhancer").join("enhance.log"),
        }
    }

    pub fn problems_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(".enhancer").join("problems.json")
    }
}

pub fn resolve_in(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn default_classes_dir() -> PathBuf {
    PathBuf::from("target/classes")
}

fn default_source_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/java")]
}
