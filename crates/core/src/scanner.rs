//! Lists candidate PDFs in a directory and performs renames.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(thiserror::Error, Debug)]
pub enum RenameError {
    #[error("source file does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub trait FileSystem: Send + Sync {
    /// Top-level `*.pdf` files of `dir`, sorted by path.
    fn list_pdf_files(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool;

    /// Renames `from` within its directory. Never overwrites.
    fn rename(&self, from: &Path, new_name: &str) -> Result<PathBuf, RenameError>;
}

pub struct LocalFileSystem {
    pdf: GlobMatcher,
    excludes: GlobSet,
}

impl LocalFileSystem {
    /// `excludes` are globs matched against file names, e.g. `*_updated.pdf`.
    pub fn new(excludes: &[String]) -> anyhow::Result<Self> {
        let pdf = GlobBuilder::new("*.pdf")
            .case_insensitive(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            pdf,
            excludes: build_globset(excludes)?,
        })
    }
}

impl FileSystem for LocalFileSystem {
    fn list_pdf_files(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if is_hidden(name) || !self.pdf.is_match(name) || self.excludes.is_match(name) {
                continue;
            }
            files.push(entry.into_path());
        }
        files.sort();
        debug!(dir = %dir.display(), count = files.len(), "listed pdf files");
        Ok(files)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, new_name: &str) -> Result<PathBuf, RenameError> {
        if new_name.is_empty() || new_name.contains(['/', '\\']) {
            return Err(RenameError::InvalidName(new_name.to_string()));
        }
        if !from.is_file() {
            return Err(RenameError::SourceMissing(from.to_path_buf()));
        }
        let target = from.with_file_name(new_name);
        if target == from {
            return Ok(target);
        }
        if target.exists() {
            return Err(RenameError::DestinationExists(target));
        }
        fs::rename(from, &target)?;
        Ok(target)
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
