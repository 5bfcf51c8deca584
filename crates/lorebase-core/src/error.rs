//! Workspace-wide error type.

/// Convenience alias used across all Lorebase crates.
pub type Result<T> = std::result::Result<T, LorebaseError>;

/// All failure modes surfaced by Lorebase operations.
#[derive(Debug, thiserror::Error)]
pub enum LorebaseError {
    /// Configuration could not be read, parsed, or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// No API key available for the named provider.
    #[error("no API key configured for provider '{0}'")]
    ApiKeyMissing(String),

    /// Input that cannot be processed (empty text, empty knowledge base).
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// An embedding or chat-completion call failed at the provider level.
    #[error("provider error: {0}")]
    Provider(String),

    /// Transport-level HTTP failure before a provider response was read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The persisted knowledge store could not be written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A source or tenant had no matching records.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
