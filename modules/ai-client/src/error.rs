use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no LLM provider configured (set DEEPSEEK_API_KEY or OPENAI_API_KEY)")]
    NoProvider,

    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned no content")]
    NoContent,

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse JSON from LLM response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Network(err.to_string())
    }
}
