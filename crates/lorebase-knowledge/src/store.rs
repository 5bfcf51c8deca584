//! The persisted, tenant-partitioned knowledge store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use lorebase_core::config::RetrievalConfig;
use lorebase_core::error::{LorebaseError, Result};
use lorebase_core::traits::EmbeddingProvider;

use crate::chunker::TextChunker;
use crate::record::{ChunkRecord, DEFAULT_SECTOR};
use crate::search::{SearchHit, cosine_similarity, rank};

/// Aggregate view of one sector (or of the whole store).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeStats {
    pub total_chunks: usize,
    /// Distinct sources.
    pub total_documents: usize,
    /// Source names in first-seen order.
    pub sources: Vec<String>,
    /// Chunk count per origin kind tag.
    pub types: BTreeMap<String, usize>,
}

/// One ingested document as the presentation layer lists it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub source: String,
    pub kind: String,
    pub chunks: usize,
}

/// File-backed collection of embedded chunks with per-sector isolation.
///
/// Constructed once and shared; the record collection sits behind a lock so
/// concurrent mutations serialize instead of losing writes. Every mutating
/// operation rewrites the persisted file before reporting success, via a
/// temp-file-and-rename so a crash mid-write cannot corrupt the store.
pub struct KnowledgeStore {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    records: RwLock<Vec<ChunkRecord>>,
    path: PathBuf,
    top_k: usize,
    similarity_threshold: f32,
}

impl KnowledgeStore {
    /// Open the store at `path`, loading whatever is persisted there.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty — a blank knowledge base is a valid,
    /// if degraded, state and must not block startup.
    pub fn open(
        path: impl Into<PathBuf>,
        retrieval: &RetrievalConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let path = path.into();
        let records = load_records(&path);
        Self {
            embedder,
            chunker: TextChunker::new(retrieval.chunk_size, retrieval.chunk_overlap),
            records: RwLock::new(records),
            path,
            top_k: retrieval.top_k,
            similarity_threshold: retrieval.similarity_threshold,
        }
    }

    /// Chunk, embed and persist a document. Returns the number of chunks
    /// added; empty or whitespace-only text adds nothing and returns 0.
    pub async fn add_document(
        &self,
        text: &str,
        source: &str,
        kind: &str,
        sector: Option<&str>,
    ) -> Result<usize> {
        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(LorebaseError::Provider(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }
        let width = embeddings[0].len();
        if embeddings.iter().any(|e| e.len() != width) {
            return Err(LorebaseError::Provider(format!(
                "{} returned embeddings of mixed widths in one batch",
                self.embedder.name()
            )));
        }

        let upload_date = chrono::Utc::now().to_rfc3339();
        let sector_id = sector.unwrap_or(DEFAULT_SECTOR);
        let total = chunks.len();
        let new_records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| ChunkRecord {
                id: format!("{source}_{upload_date}_{i}"),
                content,
                embedding,
                source: source.to_string(),
                kind: kind.to_string(),
                upload_date: upload_date.clone(),
                chunk_index: i,
                total_chunks: total,
                sector_id: sector_id.to_string(),
                page: None,
                start_time: None,
                end_time: None,
                heading: None,
                content_tag: None,
            })
            .collect();

        let mut records = self.write_guard()?;
        if let Some(existing) = records.first() {
            if existing.embedding.len() != width {
                return Err(LorebaseError::Config(format!(
                    "embedding width {} does not match the store's width {} — \
                     mixed embedding models are not supported",
                    width,
                    existing.embedding.len()
                )));
            }
        }
        let before = records.len();
        records.extend(new_records);
        if let Err(e) = self.persist(&records) {
            records.truncate(before);
            return Err(e);
        }
        tracing::debug!(source, sector = sector_id, chunks = total, "document added");
        Ok(total)
    }

    /// Rank the sector's chunks against `query_text` by cosine similarity.
    ///
    /// `k` and `threshold` default to the configured values. `sector = None`
    /// searches across every tenant.
    pub async fn search(
        &self,
        query_text: &str,
        sector: Option<&str>,
        k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let k = k.unwrap_or(self.top_k);
        let threshold = threshold.unwrap_or(self.similarity_threshold);

        // Nothing to rank → skip the embedding call entirely.
        if !self.has_documents(sector) {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query_text).await?;

        let records = self.read_guard();
        let scored: Vec<(&ChunkRecord, f32)> = records
            .iter()
            .filter(|r| sector_matches(r, sector))
            .map(|r| (r, cosine_similarity(&query_embedding, &r.embedding)))
            .collect();

        let ranked = rank(scored, k, threshold);
        Ok(ranked
            .into_iter()
            .map(|(record, score)| SearchHit::from_record(record, score))
            .collect())
    }

    /// Whether any chunk belongs to the given sector (or any sector at all).
    pub fn has_documents(&self, sector: Option<&str>) -> bool {
        self.read_guard().iter().any(|r| sector_matches(r, sector))
    }

    /// Aggregate counts for a sector, computed after filtering to it.
    pub fn stats(&self, sector: Option<&str>) -> KnowledgeStats {
        let records = self.read_guard();
        let mut sources = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_chunks = 0;

        for record in records.iter().filter(|r| sector_matches(r, sector)) {
            total_chunks += 1;
            if seen.insert(record.source.clone()) {
                sources.push(record.source.clone());
            }
            *types.entry(record.kind.clone()).or_default() += 1;
        }

        KnowledgeStats {
            total_chunks,
            total_documents: sources.len(),
            sources,
            types,
        }
    }

    /// Ingested documents of a sector, grouped by source in first-seen order.
    pub fn list_documents(&self, sector: Option<&str>) -> Vec<DocumentInfo> {
        let records = self.read_guard();
        let mut order: Vec<String> = Vec::new();
        let mut grouped: std::collections::HashMap<String, DocumentInfo> =
            std::collections::HashMap::new();

        for record in records.iter().filter(|r| sector_matches(r, sector)) {
            match grouped.get_mut(&record.source) {
                Some(info) => info.chunks += 1,
                None => {
                    order.push(record.source.clone());
                    grouped.insert(
                        record.source.clone(),
                        DocumentInfo {
                            source: record.source.clone(),
                            kind: record.kind.clone(),
                            chunks: 1,
                        },
                    );
                }
            }
        }

        order
            .into_iter()
            .filter_map(|source| grouped.remove(&source))
            .collect()
    }

    /// Remove every chunk of `source` within the sector (or everywhere when
    /// `sector` is `None`). Returns how many chunks were removed so callers
    /// can tell "not found" apart from "removed".
    pub fn remove_source(&self, source: &str, sector: Option<&str>) -> Result<usize> {
        let mut records = self.write_guard()?;
        let retained: Vec<ChunkRecord> = records
            .iter()
            .filter(|r| !(r.source == source && sector_matches(r, sector)))
            .cloned()
            .collect();
        let removed = records.len() - retained.len();
        if removed > 0 {
            self.persist(&retained)?;
            *records = retained;
            tracing::debug!(source, removed, "document removed");
        }
        Ok(removed)
    }

    /// Drop a whole sector (or the entire store when `sector` is `None`).
    /// Returns the number of chunks removed.
    pub fn clear(&self, sector: Option<&str>) -> Result<usize> {
        let mut records = self.write_guard()?;
        let retained: Vec<ChunkRecord> = match sector {
            None => Vec::new(),
            Some(s) => records.iter().filter(|r| r.sector_id != s).cloned().collect(),
        };
        let removed = records.len() - retained.len();
        self.persist(&retained)?;
        *records = retained;
        tracing::debug!(?sector, removed, "knowledge base cleared");
        Ok(removed)
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, Vec<ChunkRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<ChunkRecord>>> {
        self.records
            .write()
            .map_err(|e| LorebaseError::Persistence(format!("store lock poisoned: {e}")))
    }

    /// Rewrite the persisted file in full: write a sibling temp file, then
    /// atomically rename it over the store.
    fn persist(&self, records: &[ChunkRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LorebaseError::Persistence(format!(
                    "failed to create {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| LorebaseError::Persistence(format!("failed to serialize store: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            LorebaseError::Persistence(format!("failed to write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            LorebaseError::Persistence(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

fn sector_matches(record: &ChunkRecord, sector: Option<&str>) -> bool {
    sector.is_none_or(|s| record.sector_id == s)
}

/// Load persisted records, tolerating every failure mode short of success:
/// missing file, unreadable file, corrupt JSON, and individually malformed
/// records all degrade to whatever could be read, with a warning.
fn load_records(path: &Path) -> Vec<ChunkRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("failed to read {}: {e}; starting empty", path.display());
            return Vec::new();
        }
    };
    let raw: Vec<serde_json::Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("failed to parse {}: {e}; starting empty", path.display());
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;
    for value in raw {
        match serde_json::from_value::<ChunkRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!("skipping malformed chunk record: {e}");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(
            "loaded {} records from {} ({skipped} skipped)",
            records.len(),
            path.display()
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorebase_core::traits::MockEmbeddingProvider;

    fn test_store(dir: &Path) -> KnowledgeStore {
        KnowledgeStore::open(
            dir.join("knowledge_base.json"),
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::new()),
        )
    }

    #[tokio::test]
    async fn test_add_returns_chunk_count_and_zero_for_blank() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        let added = store
            .add_document("Some content worth keeping.", "notes.txt", "txt", None)
            .await
            .unwrap();
        assert_eq!(added, 1);

        let blank = store.add_document("   \n\n ", "empty.txt", "txt", None).await.unwrap();
        assert_eq!(blank, 0);

        let stats = store.stats(None);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.total_documents, 1);
    }

    #[tokio::test]
    async fn test_chunk_index_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        let long_text = (0..40)
            .map(|i| format!("Paragraph {i} talks about subject number {i} at length."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let added = store
            .add_document(&long_text, "long.txt", "txt", Some("1"))
            .await
            .unwrap();
        assert!(added > 1);

        let records = store.read_guard();
        let siblings: Vec<&ChunkRecord> =
            records.iter().filter(|r| r.source == "long.txt").collect();
        assert_eq!(siblings.len(), added);
        let mut indices: Vec<usize> = siblings.iter().map(|r| r.chunk_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..added).collect::<Vec<_>>());
        assert!(siblings.iter().all(|r| r.total_chunks == added));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_records_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");

        let original = {
            let store = test_store(dir.path());
            store
                .add_document("First document body.", "one.txt", "txt", Some("a"))
                .await
                .unwrap();
            store
                .add_document("Second document body.", "two.pdf", "pdf", Some("b"))
                .await
                .unwrap();
            store.read_guard().clone()
        };

        let reloaded = KnowledgeStore::open(
            &path,
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::new()),
        );
        assert_eq!(*reloaded.read_guard(), original);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = KnowledgeStore::open(
            &path,
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::new()),
        );
        assert!(!store.has_documents(None));
    }

    #[tokio::test]
    async fn test_malformed_record_skipped_others_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "ok_0", "content": "fine", "embedding": [1.0],
                 "source": "ok.txt", "type": "txt",
                 "upload_date": "2024-01-01T00:00:00", "chunk_index": 0,
                 "total_chunks": 1},
                {"id": "broken", "content": 42}
            ]"#,
        )
        .unwrap();

        let store = KnowledgeStore::open(
            &path,
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::new()),
        );
        let stats = store.stats(None);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.sources, vec!["ok.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_search_finds_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_document("The moon orbits the earth.", "astro.txt", "txt", None)
            .await
            .unwrap();
        store
            .add_document("Bread is baked from flour.", "bakery.txt", "txt", None)
            .await
            .unwrap();

        // Identical text embeds identically under the mock provider
        let hits = store
            .search("The moon orbits the earth.", None, None, None)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].source, "astro.txt");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_search_empty_sector_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_document("Content", "doc.txt", "txt", Some("1"))
            .await
            .unwrap();

        let hits = store.search("anything", Some("2"), None, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_sector_isolation() {
        let dir = tempfile::tempdir().unwrap();
        // Small chunks so the documents split predictably: A → 3, B → 2
        let retrieval = RetrievalConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            top_k: 8,
            similarity_threshold: 0.5,
        };
        let store = KnowledgeStore::open(
            dir.path().join("knowledge_base.json"),
            &retrieval,
            Arc::new(MockEmbeddingProvider::new()),
        );

        let text_a = "Alpha department doc.\n\nIt has several paragraphs.\n\nThree, in fact.";
        store.add_document(text_a, "A", "txt", Some("1")).await.unwrap();
        store
            .add_document("Beta doc first part.\n\nAnd the second part.", "B", "txt", Some("2"))
            .await
            .unwrap();

        let stats_1 = store.stats(Some("1"));
        assert_eq!(stats_1.total_documents, 1);
        assert_eq!(stats_1.total_chunks, 3);

        let stats_2 = store.stats(Some("2"));
        assert_eq!(stats_2.total_documents, 1);
        assert_eq!(stats_2.total_chunks, 2);

        let hits = store
            .search("Alpha department doc.", Some("1"), None, None)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.sector_id == "1"));

        // Removing under the wrong sector touches nothing
        assert_eq!(store.remove_source("A", Some("2")).unwrap(), 0);
        assert_eq!(store.stats(Some("1")).total_chunks, 3);

        // Clearing one sector leaves the other intact
        assert_eq!(store.clear(Some("1")).unwrap(), 3);
        assert_eq!(store.stats(Some("1")).total_chunks, 0);
        assert_eq!(store.stats(Some("2")).total_chunks, 2);
    }

    #[tokio::test]
    async fn test_remove_reports_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_document("Doc to delete.", "gone.txt", "txt", None)
            .await
            .unwrap();

        assert_eq!(store.remove_source("gone.txt", None).unwrap(), 1);
        assert_eq!(store.remove_source("gone.txt", None).unwrap(), 0);
        assert!(!store.has_documents(None));
    }

    #[tokio::test]
    async fn test_clear_all_persists_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");
        {
            let store = test_store(dir.path());
            store
                .add_document("Something.", "doc.txt", "txt", None)
                .await
                .unwrap();
            assert_eq!(store.clear(None).unwrap(), 1);
        }
        let reloaded = KnowledgeStore::open(
            &path,
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::new()),
        );
        assert!(!reloaded.has_documents(None));
        // The temp file never lingers
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_mixed_embedding_widths_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");
        {
            let store = KnowledgeStore::open(
                &path,
                &RetrievalConfig::default(),
                Arc::new(MockEmbeddingProvider::with_dimensions(8)),
            );
            store
                .add_document("Eight wide.", "a.txt", "txt", None)
                .await
                .unwrap();
        }
        let store = KnowledgeStore::open(
            &path,
            &RetrievalConfig::default(),
            Arc::new(MockEmbeddingProvider::with_dimensions(16)),
        );
        let err = store
            .add_document("Sixteen wide.", "b.txt", "txt", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LorebaseError::Config(_)));
        // The failed add left nothing behind
        assert_eq!(store.stats(None).total_chunks, 1);
    }

    #[tokio::test]
    async fn test_list_documents_groups_by_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_document("First doc.", "one.txt", "txt", None)
            .await
            .unwrap();
        store
            .add_document("Second doc.", "two.pdf", "pdf", None)
            .await
            .unwrap();

        let docs = store.list_documents(None);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "one.txt");
        assert_eq!(docs[0].kind, "txt");
        assert_eq!(docs[1].source, "two.pdf");
        assert_eq!(docs[1].chunks, 1);
    }
}
