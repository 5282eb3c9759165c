use async_trait::async_trait;

use crate::chat::{ChatClient, ChatRequest};
use crate::error::Result;
use crate::provider::LlmProvider;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAi {
    client: ChatClient,
    model: String,
}

impl OpenAi {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: ChatClient::new(api_key, OPENAI_API_URL),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAi {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client.chat(&ChatRequest::user(&self.model, prompt)).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}
