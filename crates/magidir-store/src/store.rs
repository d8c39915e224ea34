//! Load / upsert / finalize over the persisted dataset file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use magidir_core::{CanonicalRecord, Dataset};

use crate::StoreError;

/// Whether an upsert added a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Single-writer owner of the in-memory dataset for one crawl.
///
/// Nothing is written to disk until [`finalize`](Self::finalize).
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    dataset: Dataset,
}

impl DatasetStore {
    /// Reads the dataset at `path`. A missing file yields an empty dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the file exists but cannot be read, or
    /// [`StoreError::Parse`] if it is not a valid dataset document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dataset = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no existing dataset, starting empty");
                Dataset::default()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        tracing::info!(
            path = %path.display(),
            records = dataset.len(),
            "loaded dataset"
        );
        Ok(Self { path, dataset })
    }

    /// A store over an in-memory dataset that will be written to `path`.
    #[must_use]
    pub fn with_dataset(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        Self {
            path: path.into(),
            dataset,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Replaces the entry with the same `id` in place, or appends.
    pub fn upsert(&mut self, record: CanonicalRecord) -> UpsertOutcome {
        match self
            .dataset
            .magicians
            .iter_mut()
            .find(|existing| existing.id == record.id)
        {
            Some(existing) => {
                *existing = record;
                UpsertOutcome::Updated
            }
            None => {
                self.dataset.magicians.push(record);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Sorts by name, stamps `last_updated` and `total_count`, and writes the
    /// whole document. Returns the dataset as written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] or [`StoreError::Write`]; the file on
    /// disk is left untouched in either case.
    pub fn finalize(self) -> Result<Dataset, StoreError> {
        let Self { path, mut dataset } = self;

        sort_by_name(&mut dataset.magicians);
        dataset.last_updated = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        dataset.total_count = dataset.magicians.len();

        let json = serde_json::to_string_pretty(&dataset).map_err(StoreError::Serialize)?;
        write_atomically(&path, json.as_bytes())?;

        tracing::info!(
            path = %path.display(),
            total_count = dataset.total_count,
            "dataset written"
        );
        Ok(dataset)
    }
}

/// Name ascending, byte-wise; `id` breaks ties so equal names stay stable
/// across runs.
fn sort_by_name(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

/// Writes to a sibling temp file and renames it over `path`, so readers never
/// see a half-written document.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        write_err(source)
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
