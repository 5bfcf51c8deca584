//! # Lorebase Knowledge
//!
//! Tenant-partitioned semantic knowledge store.
//!
//! ## Design
//! - **Chunking** — recursive separator splitting with bounded size and
//!   character overlap, so chunks keep whole paragraphs where possible
//! - **Exhaustive similarity search** — cosine similarity over every chunk
//!   of the requested sector; no index structures, no approximation
//! - **Quality threshold with fallback** — weak matches are filtered out
//!   unless that would starve the caller of context
//! - **File-based persistence** — one JSON document, fully rewritten through
//!   an atomic rename on every mutation
//! - **Sector isolation** — every query, stats, and deletion operation
//!   filters to its tenant before doing anything else
//!
//! ```text
//! ingest(text)
//!   ↓ TextChunker
//! chunks → EmbeddingProvider → ChunkRecords (per sector)
//!   ↓ KnowledgeStore.search(query, sector)
//! ranked SearchHits with scores and citation metadata
//! ```

pub mod chunker;
pub mod record;
pub mod search;
pub mod store;

pub use chunker::TextChunker;
pub use record::{ChunkRecord, ContentTag, DEFAULT_SECTOR};
pub use search::{SearchHit, cosine_similarity};
pub use store::{DocumentInfo, KnowledgeStats, KnowledgeStore};
