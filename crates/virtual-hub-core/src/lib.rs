pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod source;
pub mod state;

// Re-export main types for convenience
pub use client::HubClient;
pub use config::Config;
pub use conversation::{ConversationStore, Phase};
pub use error::NetworkError;
pub use source::AnswerSource;
pub use state::{Answer, Message, Role, FALLBACK_TEXT, KNOWLEDGE_BASE, SUGGESTED_QUESTIONS, WELCOME_TEXT};
