use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("render timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("browser produced an empty DOM for {0}")]
    EmptyDom(String),

    #[error("renderer API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for RenderError {
    fn from(err: reqwest::Error) -> Self {
        RenderError::Network(err.to_string())
    }
}
