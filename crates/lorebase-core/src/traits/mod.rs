//! Provider traits consumed by the knowledge store and the answer engine.

pub mod chat;
pub mod embedding;

pub use chat::{ChatProvider, TokenStream};
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
