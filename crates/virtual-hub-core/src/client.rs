use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::NetworkError;
use crate::source::AnswerSource;
use crate::state::Answer;

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
    // Absent and null both mean "no sources"
    #[serde(default)]
    sources: Option<Vec<String>>,
}

/// Client for the question-answering service's `/chat` endpoint
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One POST, no retries. Any failure comes back as `NetworkError`.
    pub async fn ask(&self, question: &str) -> Result<Answer, NetworkError> {
        let url = format!("{}/chat", self.base_url);
        info!(%url, "asking answer service");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&ChatRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status));
        }

        let body = response.bytes().await?;
        let chat_response: ChatResponse = serde_json::from_slice(&body)?;
        let sources = chat_response.sources.unwrap_or_default();
        debug!(sources = sources.len(), "answer received");

        Ok(Answer {
            answer: chat_response.answer,
            sources,
        })
    }
}

#[async_trait]
impl AnswerSource for HubClient {
    async fn ask(&self, question: &str) -> Result<Answer, NetworkError> {
        HubClient::ask(self, question).await
    }
}
