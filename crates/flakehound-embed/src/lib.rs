//! Flakehound Embed - embedding providers
//!
//! The detection pipeline only needs one capability from an embedding
//! service: turn an ordered list of texts into an equally long, equally
//! dimensioned list of finite vectors. [`EmbeddingProvider`] captures that
//! contract; [`GeminiEmbedder`] binds it to the Google Generative Language
//! API and [`MockEmbedder`] provides a deterministic offline stand-in.

pub mod error;
pub mod gemini;
pub mod mock;
pub mod provider;

pub use error::EmbedError;
pub use gemini::{GeminiConfig, GeminiEmbedder};
pub use mock::MockEmbedder;
pub use provider::EmbeddingProvider;
