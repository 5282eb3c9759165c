use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use quizchain_common::AnswerPayload;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        SubmitError::Network(err.to_string())
    }
}

/// Posts an answer payload to a submission endpoint.
#[async_trait]
pub trait AnswerSubmitter: Send + Sync {
    async fn submit(&self, submit_url: &str, payload: &AnswerPayload) -> Result<Value, SubmitError>;
}

pub struct HttpSubmitter {
    http: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { http }
    }
}

impl Default for HttpSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerSubmitter for HttpSubmitter {
    async fn submit(&self, submit_url: &str, payload: &AnswerPayload) -> Result<Value, SubmitError> {
        info!(submit_url, "Submitting answer");

        let resp = self.http.post(submit_url).json(payload).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        // Non-JSON bodies degrade to a {status, text} object.
        Ok(serde_json::from_str(&body)
            .unwrap_or_else(|_| json!({ "status": status.as_u16(), "text": body })))
    }
}
