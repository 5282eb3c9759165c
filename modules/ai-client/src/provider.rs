use async_trait::async_trait;

use crate::error::Result;

/// A single LLM backend. One implementation per provider, chosen once at
/// startup; callers never probe for SDK shapes at runtime.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}
