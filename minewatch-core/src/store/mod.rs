//! Chat transcript store
//!
//! `MessageLog` owns the authoritative in-memory sequence and a `Mirror` that
//! keeps a durable copy. Persistence is best effort: each `append` makes one
//! write attempt, failures are logged, and the in-memory sequence stays
//! authoritative for the rest of the process lifetime.

pub mod mirror;
pub mod recovery;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::StorageConfig;
use crate::models::{Message, NewMessage};

pub use mirror::{create_mirror, JournalMirror, Mirror, NullMirror, SnapshotMirror};

/// Read/append interface the API layer is written against.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a new message. Always returns the created message, even when
    /// the durable write failed.
    async fn append(&self, message: NewMessage) -> Message;

    /// Snapshot of the full history, in insertion order.
    async fn list(&self) -> Vec<Message> {
        self.list_page(Page::default()).await
    }

    /// Bounded view of the history.
    async fn list_page(&self, page: Page) -> Vec<Message>;

    async fn count(&self) -> usize;

    /// Name of the durable backend.
    fn backend(&self) -> &str;
}

/// Window over the transcript. The default selects everything.
///
/// `recent` keeps the last N messages; `offset` and `limit` then apply
/// within that window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub recent: Option<usize>,
}

impl Page {
    pub fn recent(n: usize) -> Self {
        Self {
            recent: Some(n),
            ..Self::default()
        }
    }

    pub fn window(offset: usize, limit: usize) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
            recent: None,
        }
    }

    pub fn apply<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        let tail_start = self
            .recent
            .map_or(0, |n| messages.len().saturating_sub(n));
        let window = &messages[tail_start..];

        let start = self.offset.unwrap_or(0).min(window.len());
        let end = self
            .limit
            .map_or(window.len(), |l| start.saturating_add(l).min(window.len()));
        &window[start..end]
    }
}

/// In-memory transcript with a durable mirror.
pub struct MessageLog {
    state: RwLock<LogState>,
    mirror: Box<dyn Mirror>,
}

struct LogState {
    messages: Vec<Message>,
    /// Latest timestamp anywhere in `messages`. Recovered history is not
    /// guaranteed to be sorted, so the tail alone is not enough.
    high_water: Option<DateTime<Utc>>,
}

impl LogState {
    fn new(messages: Vec<Message>) -> Self {
        let high_water = messages.iter().map(|m| m.timestamp).max();
        Self { messages, high_water }
    }
}

impl MessageLog {
    /// Construct the log and recover prior history from `mirror`.
    ///
    /// Recovery never fails: a mirror that cannot be read or parsed is
    /// logged and the log starts empty.
    pub async fn open(mirror: Box<dyn Mirror>) -> Self {
        let messages = match mirror.load().await {
            Ok(messages) => {
                tracing::info!(
                    backend = mirror.name(),
                    recovered = messages.len(),
                    "Chat log loaded"
                );
                messages
            }
            Err(e) => {
                tracing::warn!(
                    backend = mirror.name(),
                    error = %e,
                    "Chat log unreadable, starting with empty history"
                );
                Vec::new()
            }
        };

        Self {
            state: RwLock::new(LogState::new(messages)),
            mirror,
        }
    }

    /// Open the backend selected by `[storage]`.
    pub async fn from_config(config: &StorageConfig) -> Self {
        Self::open(create_mirror(config)).await
    }

    /// Log with no durable mirror.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(LogState::new(Vec::new())),
            mirror: Box::new(NullMirror),
        }
    }
}

#[async_trait]
impl MessageStore for MessageLog {
    async fn append(&self, message: NewMessage) -> Message {
        let mut state = self.state.write().await;

        // Never stamp earlier than anything already logged, even if the wall
        // clock stepped back
        let now = Utc::now();
        let timestamp = state.high_water.map_or(now, |hw| hw.max(now));
        let created = message.stamp(timestamp);
        state.high_water = Some(timestamp);
        state.messages.push(created.clone());

        // Lock is held across the write so the mirror sees appends in order
        if let Err(e) = self.mirror.persist(&state.messages, &created).await {
            tracing::warn!(
                backend = self.mirror.name(),
                id = %created.id,
                error = %e,
                "Failed to persist chat log"
            );
        }

        created
    }

    async fn list_page(&self, page: Page) -> Vec<Message> {
        let state = self.state.read().await;
        page.apply(&state.messages).to_vec()
    }

    async fn count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    fn backend(&self) -> &str {
        self.mirror.name()
    }
}
