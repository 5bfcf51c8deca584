//! Tenant-keyed registry of conversation sessions and their chat clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lorebase_core::traits::ChatProvider;

use crate::session::ConversationSession;

/// One tenant's conversation state paired with its chat client.
pub struct SessionEntry {
    /// Async mutex: the session is locked across answer commits.
    pub session: tokio::sync::Mutex<ConversationSession>,
    pub chat: Arc<dyn ChatProvider>,
}

/// Maps a tenant key to its [`SessionEntry`], creating entries lazily on
/// first access and reusing them afterwards. Histories never cross tenants.
pub struct SessionRegistry {
    chat: Arc<dyn ChatProvider>,
    entries: Mutex<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self {
            chat,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The entry for `sector`, created on first use.
    pub fn entry(&self, sector: &str) -> Arc<SessionEntry> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(sector.to_string())
            .or_insert_with(|| {
                Arc::new(SessionEntry {
                    session: tokio::sync::Mutex::new(ConversationSession::new()),
                    chat: Arc::clone(&self.chat),
                })
            })
            .clone()
    }

    /// Forget a tenant's conversation, if it has one.
    pub async fn clear(&self, sector: &str) {
        let entry = {
            let entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.get(sector).cloned()
        };
        if let Some(entry) = entry {
            entry.session.lock().await.clear();
        }
    }

    /// Number of tenants with a live session.
    pub fn session_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
