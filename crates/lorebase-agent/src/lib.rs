//! # Lorebase Agent
//! The answer engine — composes retrieval, context assembly, streamed
//! generation and per-tenant conversation memory into one request cycle.
//!
//! ## Guarantees
//! - **Retrieval before generation**: every answer is grounded in the
//!   chunks ranked for this question and tenant
//! - **No partial turns**: the conversation history only ever gains whole
//!   `(user, assistant)` pairs, committed after the stream finishes;
//!   an abandoned or failed stream leaves the history untouched
//! - **Tenant isolation**: one session per sector, created lazily, cleared
//!   on tenant switch, never merged
//! - **Immediate forwarding**: answer fragments reach the caller as they
//!   arrive, buffered one fragment deep at most

pub mod agent;
pub mod context;
pub mod registry;
pub mod session;

pub use agent::{Agent, Answer};
pub use context::{SourceCitation, build_context, extract_sources};
pub use lorebase_knowledge::DEFAULT_SECTOR;
pub use registry::SessionRegistry;
pub use session::ConversationSession;
