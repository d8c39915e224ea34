//! JSON-file persistence for the magician [`Dataset`](magidir_core::Dataset).
//!
//! The dataset is loaded once, mutated in memory by [`DatasetStore::upsert`],
//! and written back exactly once by [`DatasetStore::finalize`].

mod query;
mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use query::records_in_city;
pub use store::{DatasetStore, UpsertOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize dataset: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write dataset {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
