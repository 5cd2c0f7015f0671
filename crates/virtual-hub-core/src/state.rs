//! UI-agnostic conversation types
//!
//! These are shared by every frontend (the TUI, the one-shot CLI mode) and
//! don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// Seeded bot message shown at session start and after "new chat"
pub const WELCOME_TEXT: &str = "👋 Welcome to the CMC Fellows Virtual Hub! I can answer questions about OPT, international student FAQs, and CBS resources. How can I help you today?";

/// Bot reply used for every failed exchange, whatever the cause
pub const FALLBACK_TEXT: &str =
    "Sorry, I couldn't connect to the server. Please make sure the backend is running.";

/// Shortcuts offered in the sidebar; picking one pre-fills the input
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What is the OPT process?",
    "When should I apply for OPT?",
    "What is STEM OPT extension?",
    "Who do I contact for visa questions?",
];

/// Documents the answer service draws from (display only)
pub const KNOWLEDGE_BASE: [&str; 3] = [
    "OPT Process Letter",
    "International FAQs",
    "CBS ACE Book",
];

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// A message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn bot(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
            sources,
        }
    }

    pub fn welcome() -> Self {
        Self::bot(WELCOME_TEXT, Vec::new())
    }

    pub fn fallback() -> Self {
        Self::bot(FALLBACK_TEXT, Vec::new())
    }
}

/// A successful reply from the answer service
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}
