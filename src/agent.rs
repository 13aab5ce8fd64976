//! Subprocess-backed enhancement passes.
//!
//! Each pass shells out to an agent jar through the `java` launcher. The
//! contract: the agent receives the classpath, the class's binary name, a
//! debug level and an input file; it writes the rewritten bytes to the
//! output file, or leaves it absent when the class is untouched. A
//! non-zero exit reports the failure on stderr. Scratch files are removed
//! on every exit path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::classpath::{ClasspathIndex, join_classpath};
use crate::error::EnhanceError;
use crate::sink::TransformLog;
use crate::transform::ClassTransformer;

fn java_command(args: &[&str]) -> Result<std::process::Output> {
    let java_bin = std::env::var("CLASS_ENHANCER_JAVA").unwrap_or_else(|_| "java".to_string());

    #[cfg(windows)]
    {
        let lower = java_bin.to_ascii_lowercase();
        if lower.ends_with(".cmd") || lower.ends_with(".bat") {
            return Command::new("cmd")
                .arg("/C")
                .arg(&java_bin)
                .args(args)
                .output()
                .context("Failed to execute java (ensure JRE/JDK is installed)");
        }
    }

    Command::new(&java_bin)
        .args(args)
        .output()
        .context("Failed to execute java (ensure JRE/JDK is installed)")
}

pub struct AgentTransformer {
    pass: &'static str,
    agent_jar: PathBuf,
    debug: u8,
}

impl AgentTransformer {
    pub fn entity(agent_jar: PathBuf, debug: u8) -> Self {
        Self {
            pass: "entity",
            agent_jar,
            debug,
        }
    }

    pub fn query_bean(agent_jar: PathBuf, debug: u8) -> Self {
        Self {
            pass: "query-bean",
            agent_jar,
            debug,
        }
    }

    fn failure(&self, class_name: &str, message: impl Into<String>) -> EnhanceError {
        EnhanceError::Transformation {
            pass: self.pass,
            class_name: class_name.to_string(),
            message: message.into(),
        }
    }
}

impl ClassTransformer for AgentTransformer {
    fn pass_name(&self) -> &'static str {
        self.pass
    }

    fn transform(
        &self,
        index: &ClasspathIndex<'_>,
        class_name: &str,
        bytes: &[u8],
        log: &mut TransformLog,
    ) -> Result<Option<Vec<u8>>, EnhanceError> {
        let scratch = Scratch::create(self.pass);
        std::fs::write(&scratch.input, bytes)?;

        let jar = self
            .agent_jar
            .to_str()
            .ok_or_else(|| self.failure(class_name, "agent jar path is not valid UTF-8"))?;
        let input = scratch
            .input
            .to_str()
            .ok_or_else(|| self.failure(class_name, "scratch path is not valid UTF-8"))?;
        let output = scratch
            .output
            .to_str()
            .ok_or_else(|| self.failure(class_name, "scratch path is not valid UTF-8"))?;

        let classpath = join_classpath(index.entries());
        let debug = self.debug.to_string();
        let result = java_command(&[
            "-jar",
            jar,
            "--classpath",
            &classpath,
            "--name",
            class_name,
            "--debug",
            &debug,
            "--in",
            input,
            "--out",
            output,
        ])
        .map_err(|e| self.failure(class_name, e.to_string()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(self.failure(class_name, stderr.trim().to_string()));
        }

        if scratch.output.is_file() {
            let out = std::fs::read(&scratch.output)?;
            log.verbose(&format!(
                "{} agent rewrote {class_name} ({} -> {} bytes)",
                self.pass,
                bytes.len(),
                out.len()
            ));
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Per-invocation scratch files, removed on drop regardless of outcome.
struct Scratch {
    input: PathBuf,
    output: PathBuf,
}

impl Scratch {
    fn create(pass: &str) -> Self {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let base = std::env::temp_dir().join(format!(
            "class-enhancer-{pass}-{}-{n}",
            std::process::id()
        ));
        Self {
            input: with_extension(&base, "in.class"),
            output: with_extension(&base, "out.class"),
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.input);
        let _ = std::fs::remove_file(&self.output);
    }
}

fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}
