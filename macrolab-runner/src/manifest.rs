//! `manifest.json`: one entry per written file, with a BLAKE3 content hash.
//!
//! Jobs run at different times share one manifest; recording a file replaces
//! its previous entry and leaves every other entry alone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest I/O on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read CSV header of {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("manifest {} is not valid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub job: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub blake3: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load `<dir>/manifest.json`, or an empty manifest if there is none yet.
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ManifestError::Io { path, source }),
        };
        serde_json::from_str(&text).map_err(|source| ManifestError::Json { path, source })
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|source| ManifestError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Hash the CSV file at `path` and record it under its file name.
    ///
    /// Rows and columns are read back from the file, so the entry describes
    /// exactly what was written.
    pub fn record(&mut self, job: &str, path: &Path) -> Result<(), ManifestError> {
        let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let csv_error = |source| ManifestError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let columns: Vec<String> = rdr
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = 0;
        for record in rdr.records() {
            record.map_err(csv_error)?;
            rows += 1;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.files.insert(
            name,
            ManifestEntry {
                job: job.to_string(),
                rows,
                columns,
                blake3: blake3::hash(&bytes).to_hex().to_string(),
            },
        );
        Ok(())
    }
}
