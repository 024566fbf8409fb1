//! Query/append API over the transcript store.
//!
//! Validates submissions, records them, and answers every user turn with a
//! canned acknowledgement. There is no model behind the reply; this is where
//! a real reasoning backend would plug in.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ChatError;
use crate::models::{Message, NewMessage, Role};
use crate::store::{MessageStore, Page};

/// How much of the user's text is echoed back in the acknowledgement.
pub const REPLY_PREFIX_CHARS: usize = 200;

/// Result of `submit_message`: the stored turn plus the synthesized reply, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub user: Message,
    pub assistant: Option<Message>,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn MessageStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub async fn list_messages(&self, page: Page) -> Vec<Message> {
        self.store.list_page(page).await
    }

    /// Record a turn. A `user` turn also records an assistant acknowledgement;
    /// an `assistant` turn is stored verbatim with no reply.
    pub async fn submit_message(
        &self,
        role: &str,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Submission, ChatError> {
        // Content is stored verbatim; only a truly empty string is missing
        if role.trim().is_empty() || content.is_empty() {
            return Err(ChatError::Validation("role and content required".to_string()));
        }
        let role: Role = role.parse()?;

        let user = self
            .store
            .append(NewMessage::new(role, content).with_metadata(metadata))
            .await;

        let assistant = match role {
            Role::User => Some(
                self.store
                    .append(NewMessage::assistant(acknowledgement(content)))
                    .await,
            ),
            Role::Assistant => None,
        };

        tracing::debug!(
            id = %user.id,
            role = %role,
            replied = assistant.is_some(),
            "Chat message submitted"
        );

        Ok(Submission { user, assistant })
    }
}

/// Placeholder reply echoing the first `REPLY_PREFIX_CHARS` characters.
pub fn acknowledgement(content: &str) -> String {
    let prefix: String = content.chars().take(REPLY_PREFIX_CHARS).collect();
    format!("I've registered your query: \"{}\". (Prototype reply)", prefix)
}
