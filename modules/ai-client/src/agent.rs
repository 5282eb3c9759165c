use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::deepseek::DeepSeek;
use crate::error::{AiError, Result};
use crate::json::extract_json_block;
use crate::openai::OpenAi;
use crate::provider::LlmProvider;

/// The provider an `LlmAgent` talks to, fixed at construction time.
///
/// Keys may legitimately be absent at startup (the service can boot without
/// them); the first completion call then fails with `AiError::NoProvider`.
#[derive(Clone)]
pub struct LlmAgent {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Select the first configured provider: DeepSeek, then OpenAI.
    pub fn from_keys(deepseek_api_key: Option<&str>, openai_api_key: Option<&str>) -> Self {
        if let Some(key) = deepseek_api_key {
            info!(provider = "deepseek", "LLM provider selected");
            return Self::new(Arc::new(DeepSeek::new(key)));
        }
        if let Some(key) = openai_api_key {
            info!(provider = "openai", "LLM provider selected");
            return Self::new(Arc::new(OpenAi::new(key)));
        }
        warn!("no LLM provider configured; completion calls will fail");
        Self { provider: None }
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>> {
        self.provider.as_ref().ok_or(AiError::NoProvider)
    }

    /// Send one prompt, return the raw completion text.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let provider = self.provider()?;
        debug!(
            provider = provider.name(),
            prompt_len = prompt.len(),
            "sending prompt"
        );
        provider.complete(prompt).await
    }

    /// Ask for JSON. If the response does not contain a parseable JSON value,
    /// re-prompt the model up to `retries` more times with an explicit
    /// instruction to emit valid JSON only, quoting its previous response.
    pub async fn ask_json(&self, prompt: &str, retries: u32) -> Result<Value> {
        let mut raw = self.ask(prompt).await?;
        let mut last_error = String::new();

        for attempt in 0..=retries {
            match extract_json_block(&raw) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt == retries {
                        break;
                    }
                    warn!(attempt = attempt + 1, "LLM response was not valid JSON, coaxing");
                    let coax = format!(
                        "You must output only valid JSON now. Previous response:\n{raw}\n\nNow reply with valid JSON only."
                    );
                    raw = self.ask(&coax).await?;
                }
            }
        }

        Err(AiError::Parse(last_error))
    }
}
