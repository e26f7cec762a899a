use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::brew::InstalledSet;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest {0} does not exist")]
    Missing(PathBuf),
    #[error("reading manifest {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// Package identifiers from a manifest file, in file order, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ManifestError::Missing(path.to_path_buf())),
            Err(source) => Err(ManifestError::Read { path: path.to_path_buf(), source }),
        }
    }

    /// One identifier per line; blank lines are dropped and surrounding whitespace trimmed.
    pub fn parse(text: &str) -> Self {
        let entries = text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(String::as_str) }

    pub fn entry_count(&self) -> usize { self.entries.len() }

    /// Distinct entries not present in `installed`, sorted.
    pub fn missing_from(&self, installed: &InstalledSet) -> BTreeSet<String> {
        self.iter().filter(|id| !installed.contains(id)).map(str::to_string).collect()
    }
}
