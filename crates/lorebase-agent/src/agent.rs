//! The answer orchestrator and its ingestion/query boundaries.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use lorebase_core::config::LorebaseConfig;
use lorebase_core::error::{LorebaseError, Result};
use lorebase_core::traits::{ChatProvider, TokenStream};
use lorebase_core::types::{Message, SourceKind};
use lorebase_knowledge::{DEFAULT_SECTOR, DocumentInfo, KnowledgeStats, KnowledgeStore};

use crate::context::{SourceCitation, build_context, extract_sources};
use crate::registry::SessionRegistry;

const SYSTEM_PROMPT: &str = "You are a friendly and helpful knowledge assistant.

You have access to a knowledge base with relevant information.
Use ONLY the information provided in the context below to answer.

If the question cannot be answered from the information in the context,
politely say that the knowledge base does not contain it.

Be clear, direct and objective.

CONTEXT:
";

fn build_system_prompt(context: &str) -> String {
    format!("{SYSTEM_PROMPT}{context}")
}

/// A streamed answer: the citation list computed for this call, plus the
/// lazy token sequence. Dropping `tokens` before the end abandons the
/// generation and leaves the conversation history untouched.
pub struct Answer {
    pub sources: Vec<SourceCitation>,
    pub tokens: TokenStream,
}

impl std::fmt::Debug for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Answer")
            .field("sources", &self.sources)
            .field("tokens", &"<TokenStream>")
            .finish()
    }
}

/// The answer engine: knowledge store, per-tenant sessions, and the
/// retrieve → assemble → stream → commit cycle.
pub struct Agent {
    store: Arc<KnowledgeStore>,
    registry: SessionRegistry,
    last_sources: Mutex<Vec<SourceCitation>>,
    active_sector: Mutex<String>,
}

impl Agent {
    /// Wire an agent from configuration, with the real providers.
    pub fn new(config: LorebaseConfig) -> Result<Self> {
        let embedder = lorebase_providers::create_embedding_provider(&config)?;
        let chat = lorebase_providers::create_chat_provider(&config)?;
        let store = Arc::new(KnowledgeStore::open(
            config.knowledge_path(),
            &config.retrieval,
            embedder,
        ));
        Ok(Self::with_components(store, chat))
    }

    /// Assemble an agent from pre-built components. This is the seam used
    /// by tests and by callers that share a store.
    pub fn with_components(store: Arc<KnowledgeStore>, chat: Arc<dyn ChatProvider>) -> Self {
        Self {
            store,
            registry: SessionRegistry::new(chat),
            last_sources: Mutex::new(Vec::new()),
            active_sector: Mutex::new(DEFAULT_SECTOR.to_string()),
        }
    }

    /// The underlying knowledge store, for store-wide operations.
    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    // ── Ingestion boundary ─────────────────────────────────

    /// Add already-extracted text to the knowledge base. Returns the number
    /// of chunks stored; 0 means the text held nothing to index.
    pub async fn ingest(
        &self,
        text: &str,
        source: &str,
        kind: SourceKind,
        sector: Option<&str>,
    ) -> Result<usize> {
        let sector = self.resolve_sector(sector);
        self.store
            .add_document(text, source, kind.tag(), Some(&sector))
            .await
    }

    // ── Query boundary ─────────────────────────────────────

    /// Answer a question from the tenant's knowledge, streaming the reply.
    ///
    /// Retrieval happens first; the returned citation list matches the
    /// context the model sees. The tenant's conversation history gains the
    /// `(question, answer)` pair only after the stream completes normally —
    /// a consumer that stops reading, or a provider failure mid-stream,
    /// commits nothing.
    pub async fn ask(&self, question: &str, sector: Option<&str>) -> Result<Answer> {
        let sector = self.resolve_sector(sector);

        // Fail fast instead of asking the model about an empty base
        if !self.store.has_documents(Some(&sector)) {
            return Err(LorebaseError::UnsupportedInput(
                "the knowledge base has no documents for this sector; add documents first".into(),
            ));
        }

        let hits = self.store.search(question, Some(&sector), None, None).await?;
        let sources = extract_sources(&hits);
        *self
            .last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sources.clone();

        let system = build_system_prompt(&build_context(&hits));

        let entry = self.registry.entry(&sector);
        // Only turns committed before this call; the in-flight turn is
        // invisible to itself
        let history: Vec<Message> = entry.session.lock().await.messages().to_vec();

        let provider_stream = entry.chat.stream_chat(&system, &history, question).await?;

        tracing::debug!(sector = %sector, retrieved = hits.len(), "streaming answer");

        // Capacity 1: each fragment is forwarded as soon as it arrives and
        // nothing accumulates between producer and consumer
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(1);
        let question = question.to_string();
        let entry_for_commit = Arc::clone(&entry);
        tokio::spawn(async move {
            let mut stream = provider_stream;
            let mut full_response = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(token) => {
                        full_response.push_str(&token);
                        if tx.send(Ok(token)).await.is_err() {
                            tracing::debug!("answer stream abandoned by consumer");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("chat provider failed mid-stream: {e}");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
            // Stream completed normally: commit the whole turn
            let mut session = entry_for_commit.session.lock().await;
            session.push_turn(&question, &full_response);
        });

        Ok(Answer {
            sources,
            tokens: Box::pin(ReceiverStream::new(rx)),
        })
    }

    /// Answer without streaming: collect the full reply into one string.
    pub async fn ask_collect(&self, question: &str, sector: Option<&str>) -> Result<String> {
        let mut answer = self.ask(question, sector).await?;
        let mut text = String::new();
        while let Some(item) = answer.tokens.next().await {
            text.push_str(&item?);
        }
        Ok(text)
    }

    /// Aggregate stats for a tenant.
    pub fn stats(&self, sector: Option<&str>) -> KnowledgeStats {
        let sector = self.resolve_sector(sector);
        self.store.stats(Some(&sector))
    }

    /// Documents of a tenant, grouped by source.
    pub fn list_documents(&self, sector: Option<&str>) -> Vec<DocumentInfo> {
        let sector = self.resolve_sector(sector);
        self.store.list_documents(Some(&sector))
    }

    /// Whether the tenant has anything to search.
    pub fn has_knowledge(&self, sector: Option<&str>) -> bool {
        let sector = self.resolve_sector(sector);
        self.store.has_documents(Some(&sector))
    }

    /// Remove one document from a tenant's knowledge.
    pub fn remove_document(&self, source: &str, sector: Option<&str>) -> Result<usize> {
        let sector = self.resolve_sector(sector);
        let removed = self.store.remove_source(source, Some(&sector))?;
        if removed == 0 {
            return Err(LorebaseError::NotFound(format!(
                "no chunks stored for source '{source}'"
            )));
        }
        Ok(removed)
    }

    /// Drop a tenant's whole knowledge partition. Returns chunks removed.
    pub fn clear_knowledge(&self, sector: Option<&str>) -> Result<usize> {
        let sector = self.resolve_sector(sector);
        self.store.clear(Some(&sector))
    }

    // ── Conversation memory ────────────────────────────────

    /// The committed conversation history of a tenant.
    pub async fn history(&self, sector: Option<&str>) -> Vec<Message> {
        let sector = self.resolve_sector(sector);
        let entry = self.registry.entry(&sector);
        let session = entry.session.lock().await;
        session.messages().to_vec()
    }

    /// Forget a tenant's conversation and the last citation list.
    pub async fn clear_conversation(&self, sector: Option<&str>) {
        let sector = self.resolve_sector(sector);
        self.registry.clear(&sector).await;
        self.last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Make `sector` the active tenant. A switch starts a fresh
    /// conversation for that tenant; histories are never merged.
    pub async fn switch_sector(&self, sector: &str) {
        {
            let mut active = self
                .active_sector
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *active == sector {
                return;
            }
            *active = sector.to_string();
        }
        self.registry.clear(sector).await;
        self.last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        tracing::debug!(sector, "active sector switched");
    }

    /// The currently active tenant key.
    pub fn active_sector(&self) -> String {
        self.active_sector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Citations computed by the most recent `ask` call (last call wins).
    pub fn last_sources(&self) -> Vec<SourceCitation> {
        self.last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn resolve_sector(&self, sector: Option<&str>) -> String {
        match sector {
            Some(s) => s.to_string(),
            None => self.active_sector(),
        }
    }
}
