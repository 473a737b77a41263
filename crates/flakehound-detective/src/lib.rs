//! Flakehound Detective - detection pass orchestration
//!
//! Wires the domain stages of `flakehound-core` to the storage and
//! embedding collaborators and runs the end-to-end pass:
//!
//! fetch -> validate -> enrich -> embed -> cluster -> assemble -> rank -> save
//!
//! A pass either returns the full ranked output or exactly one typed
//! [`DetectiveError`]; nothing is emitted partially, nothing is retried
//! here, and an external [`CancellationToken`] is honored at every
//! suspension point.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod embedder;
pub mod error;
pub mod pipeline;

pub use embedder::EmbeddingOrchestrator;
pub use error::DetectiveError;
pub use pipeline::FlakinessDetective;
