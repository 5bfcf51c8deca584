//! # Lorebase Providers
//!
//! OpenAI-compatible provider implementations: one embeddings client and one
//! streaming chat-completions client. Any endpoint speaking the OpenAI wire
//! format works — the default is api.openai.com, overridable per provider in
//! the configuration.

pub mod embeddings;
pub mod openai_compatible;

use std::sync::Arc;

use lorebase_core::config::LorebaseConfig;
use lorebase_core::error::{LorebaseError, Result};
use lorebase_core::traits::{ChatProvider, EmbeddingProvider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Create the chat provider from configuration.
pub fn create_chat_provider(config: &LorebaseConfig) -> Result<Arc<dyn ChatProvider>> {
    let api_key = config.resolved_api_key();
    if api_key.is_empty() {
        return Err(LorebaseError::ApiKeyMissing("chat".into()));
    }
    let base_url = resolve_base_url(&config.llm.endpoint);
    Ok(Arc::new(openai_compatible::OpenAiCompatibleChat::new(
        api_key,
        base_url,
        config.llm.model.clone(),
        config.llm.temperature,
        config.llm.max_tokens,
    )))
}

/// Create the embedding provider from configuration.
pub fn create_embedding_provider(config: &LorebaseConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let api_key = config.resolved_api_key();
    if api_key.is_empty() {
        return Err(LorebaseError::ApiKeyMissing("embedding".into()));
    }
    let base_url = resolve_base_url(&config.embedding.endpoint);
    Ok(Arc::new(embeddings::OpenAiEmbeddings::new(
        api_key,
        base_url,
        config.embedding.model.clone(),
        config.embedding.dimensions,
    )))
}

fn resolve_base_url(endpoint: &str) -> String {
    if endpoint.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        endpoint.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let mut config = LorebaseConfig::default();
        config.api_key.clear();
        // Shield the assertion from an ambient key
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                create_chat_provider(&config),
                Err(LorebaseError::ApiKeyMissing(_))
            ));
            assert!(matches!(
                create_embedding_provider(&config),
                Err(LorebaseError::ApiKeyMissing(_))
            ));
        }
    }

    #[test]
    fn test_endpoint_override() {
        assert_eq!(resolve_base_url(""), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1"
        );
    }
}
