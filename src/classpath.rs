//! Runtime classpath resolution and auxiliary class lookup.
//!
//! The classpath is recomputed once per build pass and never cached
//! across passes: project configuration may change between builds. A
//! single unresolvable entry fails the whole resolution, since a partial
//! classpath silently changes enhancement behavior (false "unresolved
//! superclass" failures inside the agents).

use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::{EnhancerConfig, resolve_in};
use crate::error::EnhanceError;

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Ordered runtime classpath for one project: inline entries first, then
/// the entries of the optional classpath file. Defaults to the classes
/// directory when nothing is configured.
pub fn resolve_classpath(
    project_root: &Path,
    config: &EnhancerConfig,
) -> Result<Vec<PathBuf>, EnhanceError> {
    let mut entries = Vec::new();

    for raw in &config.classpath {
        entries.push(resolve_entry(project_root, raw)?);
    }

    if let Some(file) = &config.classpath_file {
        let path = resolve_in(project_root, file);
        let text =
            std::fs::read_to_string(&path).map_err(|_| EnhanceError::ClasspathResolution {
                entry: path.display().to_string(),
            })?;
        for raw in split_entries(&text) {
            entries.push(resolve_entry(project_root, raw)?);
        }
    }

    if entries.is_empty() {
        let classes_dir = config.classes_dir_in(project_root);
        entries.push(resolve_entry(
            project_root,
            &classes_dir.to_string_lossy(),
        )?);
    }

    Ok(entries)
}

fn split_entries(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', '\r', PATH_SEPARATOR])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn resolve_entry(project_root: &Path, raw: &str) -> Result<PathBuf, EnhanceError> {
    let entry = raw.trim();
    if entry.is_empty() {
        return Err(EnhanceError::ClasspathResolution {
            entry: raw.to_string(),
        });
    }
    let path = resolve_in(project_root, Path::new(entry));
    if !path.exists() {
        return Err(EnhanceError::ClasspathResolution {
            entry: entry.to_string(),
        });
    }
    Ok(path)
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// Auxiliary class lookup over a resolved classpath, e.g. to check a
/// superclass during enhancement. One index is created per candidate and
/// dropped when that candidate completes; archives are opened per lookup,
/// so no classpath resource outlives a candidate's processing.
pub struct ClasspathIndex<'a> {
    entries: &'a [PathBuf],
}

impl<'a> ClasspathIndex<'a> {
    pub fn new(entries: &'a [PathBuf]) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PathBuf] {
        self.entries
    }

    /// Resolve a binary name to class bytes; first hit in classpath order
    /// wins. Directories are probed on disk, archives through their
    /// central directory.
    pub fn find_class(&self, binary_name: &str) -> Result<Option<Vec<u8>>, EnhanceError> {
        let rel = format!("{}.class", binary_name.replace('.', "/"));
        for entry in self.entries {
            if entry.is_dir() {
                let candidate = entry.join(&rel);
                if candidate.is_file() {
                    return Ok(Some(std::fs::read(candidate)?));
                }
            } else if entry.is_file()
                && let Some(bytes) = read_archive_entry(entry, &rel)?
            {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}

fn read_archive_entry(archive_path: &Path, rel: &str) -> Result<Option<Vec<u8>>, EnhanceError> {
    let file = File::open(archive_path)?;
    // SAFETY: The file is opened read-only and remains valid for the
    // lifetime of the mmap. The mmap is dropped before the file.
    let mmap = unsafe { Mmap::map(&file)? };
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..])).map_err(std::io::Error::from)?;

    match archive.by_name(rel) {
        Ok(mut entry) => {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(EnhanceError::Io(std::io::Error::from(e))),
    }
}
