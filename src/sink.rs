//! Verbosity-gated log sink for enhancement tracing.
//!
//! Level 0 is a null sink that never opens the file. Level 1 records
//! summary lines, level 2 and above adds per-class tracing. The sink is a
//! pure side channel: write failures are swallowed and must never abort
//! enhancement.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub struct TransformLog {
    level: u8,
    out: Option<Box<dyn Write + Send>>,
}

impl TransformLog {
    pub fn null() -> Self {
        Self {
            level: 0,
            out: None,
        }
    }

    /// File-backed sink, appending across builds like the enhance log of
    /// the IDE original. Opening the file lazily is not worth it: at level
    /// 0 we never get here.
    pub fn to_file(path: &Path, level: u8) -> Self {
        if level == 0 {
            return Self::null();
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && std::fs::create_dir_all(parent).is_err()
        {
            return Self::null();
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                level,
                out: Some(Box::new(file)),
            },
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to open transform log");
                Self::null()
            }
        }
    }

    pub fn to_writer(level: u8, out: Box<dyn Write + Send>) -> Self {
        if level == 0 {
            Self::null()
        } else {
            Self {
                level,
                out: Some(out),
            }
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Summary line, written at level >= 1.
    pub fn summary(&mut self, msg: &str) {
        self.write_gated(1, msg);
    }

    /// Per-class tracing, written at level >= 2.
    pub fn verbose(&mut self, msg: &str) {
        self.write_gated(2, msg);
    }

    fn write_gated(&mut self, min_level: u8, msg: &str) {
        if self.level < min_level {
            return;
        }
        if let Some(out) = self.out.as_mut() {
            let _ = writeln!(out, "{msg}");
            let _ = out.flush();
        }
    }
}
