pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use chat::{ChatService, Submission};
pub use config::MinewatchConfig;
pub use error::{ChatError, PersistenceError, RecoveryError};
pub use models::{Message, NewMessage, Role};
pub use store::{MessageLog, MessageStore, Page};
