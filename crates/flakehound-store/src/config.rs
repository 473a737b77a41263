//! Store selection and construction.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::file::JsonFileStore;
use crate::memory::MemoryStore;
use crate::surreal::SurrealStore;
use crate::traits::DataStore;

/// Tagged backend selection, typically read from the CLI config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; contents die with the process.
    Memory,
    /// JSON documents inside `data_dir`.
    File { data_dir: PathBuf },
    /// Embedded SurrealDB. On-disk at `path`, in-memory when absent.
    Surreal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl StoreConfig {
    /// Build the configured backend.
    pub async fn connect(&self) -> StoreResult<Arc<dyn DataStore>> {
        match self {
            StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreConfig::File { data_dir } => {
                Ok(Arc::new(JsonFileStore::open(data_dir.clone()).await?))
            }
            StoreConfig::Surreal { path } => match path {
                Some(path) => Ok(Arc::new(SurrealStore::connect_file(path).await?)),
                None => Ok(Arc::new(SurrealStore::connect_memory().await?)),
            },
        }
    }
}
