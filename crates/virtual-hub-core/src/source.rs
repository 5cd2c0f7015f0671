use async_trait::async_trait;

use crate::error::NetworkError;
use crate::state::Answer;

/// Anything that can answer a question: the HTTP client in production,
/// canned replies in tests.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Answer, NetworkError>;
}
