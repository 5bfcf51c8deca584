//! OpenAI-compatible embeddings client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lorebase_core::error::{LorebaseError, Result};
use lorebase_core::traits::EmbeddingProvider;

/// Embeddings client for OpenAI-compatible endpoints.
///
/// Failures are surfaced to the caller as provider errors; there is no
/// automatic retry.
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbeddings {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: Option<usize>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(model = %self.model, inputs = texts.len(), "embedding batch");

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LorebaseError::Http(format!("embeddings request to {} failed: {e}", self.endpoint))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LorebaseError::Provider(format!(
                "embeddings API error {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
            LorebaseError::Provider(format!("failed to parse embeddings response: {e}"))
        })?;
        // The API does not guarantee input order
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(LorebaseError::Provider(format!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        if let Some(expected) = self.dimensions {
            if parsed.data.iter().any(|e| e.embedding.len() != expected) {
                return Err(LorebaseError::Provider(format!(
                    "embeddings API returned a vector not {expected} wide"
                )));
            }
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
