//! Where stops come from and where edits go
use std::future::Future;

use crate::model::{EditEntry, StopRecord};

pub mod json_file;
pub mod pg_store;
pub mod stop_updates;
pub mod stops;

pub use json_file::*;
pub use pg_store::*;
pub use stop_updates::*;
pub use stops::*;

pub trait StopSource {
    fn load_stops(&self) -> impl Future<Output = Result<Vec<StopRecord>, anyhow::Error>> + Send;
}

/// Durable storage for edit entries. Gets the whole log on every save.
pub trait EditSink {
    fn persist(&self, entries: &[EditEntry]) -> impl Future<Output = Result<(), PersistError>> + Send;
}

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("database error saving updates")]
    Database(#[from] sqlx::Error),

    #[error("error writing updates file")]
    Io(#[from] std::io::Error),

    #[error("error serializing updates")]
    Serialization(#[from] serde_json::Error),

    #[error("error saving updates: {0}")]
    Other(#[from] anyhow::Error),
}
