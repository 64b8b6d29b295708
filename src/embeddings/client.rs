//! Stateless RPC wrapper around an external embedding service.
//!
//! Wire shape is fixed by the specification (§6.2): `POST
//! {base_url}/api/embed` with `{model, input}`, response `{model,
//! embeddings}`. There are no retries at this layer — the indexer's batch
//! loop decides whether to retry or abort (§4.3).

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::error::RetrievalErr;

/// Fixed model-name → dimension table (§4.3). Unknown models default to
/// 768 — a value the specification documents as "known to be wrong for
/// some models"; callers are expected to align model and store dimension.
pub fn model_dimension(model: &str) -> usize {
    match model {
        "nomic-embed-text" => 768,
        "all-minilm" => 384,
        "mxbai-embed-large" => 1024,
        "snowflake-arctic-embed" => 1024,
        _ => 768,
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()], cancel).await?;
        batch
            .pop()
            .ok_or_else(|| RetrievalErr::invariant("embedder returned zero vectors for one input"))
    }

    async fn embed_batch(&self, texts: &[String], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    Many(&'a [String]),
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[allow(dead_code)]
    model: String,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct EmbedErrorBody {
    error: String,
}

/// HTTP client for an Ollama-style embedding endpoint.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = model_dimension(&model);
        Self {
            // A generous wall-clock upper bound accommodates large batches;
            // there is no per-request retry at this layer (§4.3).
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("reqwest client builds with static config"),
            base_url: base_url.into(),
            model,
            dimension,
        }
    }

    /// Override the auto-resolved dimension, for models the built-in table
    /// does not know about.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// `POST {base_url}/api/pull`, streaming newline-delimited status JSON
    /// until `{"status": "success"}` (§6.2). Best-effort: not every
    /// embedding backend implements this endpoint.
    pub async fn pull_model(&self) -> Result<()> {
        #[derive(Serialize)]
        struct PullRequest<'a> {
            name: &'a str,
        }
        #[derive(Deserialize)]
        struct PullStatus {
            status: String,
        }

        let resp = self
            .http
            .post(format!("{}/api/pull", self.base_url))
            .json(&PullRequest { name: &self.model })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RetrievalErr::embedding(format!(
                "pull failed with status {}",
                resp.status()
            )));
        }

        let body = resp.text().await?;
        for line in body.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(status) = serde_json::from_str::<PullStatus>(line) {
                if status.status == "success" {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: EmbedInput::Many(texts),
            })
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RetrievalErr::Cancelled),
            result = request => result?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<EmbedErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("embedding request failed with status {status}"));
            return Err(RetrievalErr::embedding(message));
        }

        let body: EmbedResponse = response.json().await?;

        if body.embeddings.len() != texts.len() {
            return Err(RetrievalErr::invariant(format!(
                "embedder returned {} vectors for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
