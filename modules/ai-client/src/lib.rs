pub mod error;
pub mod json;
pub mod util;

mod agent;
mod chat;
mod deepseek;
mod openai;
mod provider;

pub use agent::LlmAgent;
pub use deepseek::DeepSeek;
pub use error::{AiError, Result};
pub use openai::OpenAi;
pub use provider::LlmProvider;
