//! The conversation store: transcript plus input/loading flags.
//!
//! Frontends read the state through the accessors and only change it through
//! the methods here. The store never talks to the network itself; `submit`
//! hands back the question to dispatch and the caller reports the settled
//! result through `on_fetch_result`.

use tracing::{debug, warn};

use crate::error::NetworkError;
use crate::source::AnswerSource;
use crate::state::{Answer, Message};

/// Whether a request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
    pending_input: String,
    is_loading: bool,
    revision: u64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::welcome()],
            pending_input: String::new(),
            is_loading: false,
            revision: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::AwaitingResponse
        } else {
            Phase::Idle
        }
    }

    /// Bumped on every transcript change; renderers compare it to decide
    /// when to scroll to the bottom.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `submit_pending` would currently be accepted
    pub fn can_send(&self) -> bool {
        !self.is_loading && !self.pending_input.trim().is_empty()
    }

    /// Start over with only the welcome message.
    ///
    /// An in-flight request is not cancelled: its reply still lands and
    /// clears the loading flag.
    pub fn reset(&mut self) {
        self.messages = vec![Message::welcome()];
        self.pending_input.clear();
        self.revision += 1;
        debug!("conversation reset");
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// Append the user's question and enter `AwaitingResponse`.
    ///
    /// Returns the trimmed question the caller must dispatch, or `None` when
    /// the text is blank or a request is already outstanding.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let question = text.trim();
        if question.is_empty() || self.is_loading {
            debug!(loading = self.is_loading, "submit ignored");
            return None;
        }

        let question = question.to_string();
        self.messages.push(Message::user(question.clone()));
        self.pending_input.clear();
        self.is_loading = true;
        self.revision += 1;
        Some(question)
    }

    /// `submit` applied to the current pending input
    pub fn submit_pending(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.pending_input);
        let submitted = self.submit(&text);
        if submitted.is_none() {
            self.pending_input = text;
        }
        submitted
    }

    /// Settle the outstanding request: append exactly one bot message and
    /// return to `Idle`.
    pub fn on_fetch_result(&mut self, result: Result<Answer, NetworkError>) {
        let reply = match result {
            Ok(answer) => Message::bot(answer.answer, answer.sources),
            Err(e) => {
                warn!("answer request failed: {}", e);
                Message::fallback()
            }
        };
        self.messages.push(reply);
        self.is_loading = false;
        self.revision += 1;
    }

    /// Submit and settle in one go against `source`.
    ///
    /// Returns `false` if the submit was ignored.
    pub async fn exchange<S>(&mut self, source: &S, text: &str) -> bool
    where
        S: AnswerSource + ?Sized,
    {
        let Some(question) = self.submit(text) else {
            return false;
        };
        let result = source.ask(&question).await;
        self.on_fetch_result(result);
        true
    }
}
