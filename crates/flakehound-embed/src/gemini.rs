//! Gemini embedding client
//!
//! Binds [`EmbeddingProvider`] to the Google Generative Language API's
//! `batchEmbedContents` endpoint. The credential comes from explicit
//! configuration or the `GENAI_API_KEY` environment variable and is checked
//! at construction; the HTTP client itself is only built when the first
//! embedding is requested.

use std::sync::OnceLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EmbedError;
use crate::provider::EmbeddingProvider;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GENAI_API_KEY";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "text-embedding-004";

/// Gemini client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Explicit API key; falls back to `GENAI_API_KEY` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name.
    pub model: String,
    /// API base URL (overridable for proxies and tests).
    pub api_base: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Config using a specific model, credential from the environment.
    pub fn with_model(model: &str) -> Self {
        GeminiConfig {
            model: model.to_string(),
            ..Default::default()
        }
    }

    /// Set an explicit API key.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Embedding provider backed by the Gemini API
#[derive(Debug)]
pub struct GeminiEmbedder {
    config: GeminiConfig,
    api_key: String,
    http_client: OnceLock<reqwest::Client>,
}

impl GeminiEmbedder {
    /// Create an embedder, resolving the credential now.
    ///
    /// Fails with [`EmbedError::MissingApiKey`] when neither the config nor
    /// the `GENAI_API_KEY` environment variable carries a key.
    pub fn new(config: GeminiConfig) -> Result<Self, EmbedError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or(EmbedError::MissingApiKey)?;

        Ok(GeminiEmbedder {
            config,
            api_key,
            http_client: OnceLock::new(),
        })
    }

    /// Create an embedder from the environment with default model settings.
    pub fn from_env() -> Result<Self, EmbedError> {
        Self::new(GeminiConfig::default())
    }

    fn client(&self) -> &reqwest::Client {
        self.http_client.get_or_init(|| {
            reqwest::Client::builder()
                .user_agent(concat!("flakehound/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default()
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.config.api_base, self.config.model, self.api_key
        )
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = format!("models/{}", self.config.model);
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        debug!(count = texts.len(), model = %self.config.model, "requesting embeddings");

        let response = self
            .client()
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BatchEmbedResponse = response.json().await?;
        vectors_from_response(parsed, texts.len())
    }
}

fn vectors_from_response(
    response: BatchEmbedResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if response.embeddings.len() != expected {
        return Err(EmbedError::MalformedResponse(format!(
            "expected {expected} embeddings, got {}",
            response.embeddings.len()
        )));
    }
    Ok(response
        .embeddings
        .into_iter()
        .map(|embedding| embedding.values)
        .collect())
}
