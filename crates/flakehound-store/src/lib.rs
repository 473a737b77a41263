//! Flakehound Store - failure and cluster persistence
//!
//! Defines the [`DataStore`] capability consumed by the detection pipeline
//! and three backends:
//!
//! - [`MemoryStore`]: process-local, also the test fake
//! - [`JsonFileStore`]: a data directory of JSON documents
//! - [`SurrealStore`]: an embedded SurrealDB document store
//!
//! Backends are built from a tagged [`StoreConfig`] via
//! [`StoreConfig::connect`]; callers hold an `Arc<dyn DataStore>` and never
//! name a concrete backend.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod surreal;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use surreal::SurrealStore;
pub use traits::DataStore;
