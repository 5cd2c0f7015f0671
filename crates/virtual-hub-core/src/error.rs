use thiserror::Error;

/// Every way an exchange with the answer service can fail.
///
/// The conversation treats all variants the same (one fallback reply); the
/// variant only exists so logs can say what went wrong.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to answer service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("answer service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("could not decode answer payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("answer request was interrupted: {0}")]
    Interrupted(String),
}
