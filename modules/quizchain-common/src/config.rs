use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret inbound requests must present.
    pub quiz_secret: String,

    // LLM providers; at least one key is needed by the first completion call
    pub deepseek_api_key: Option<String>,
    pub openai_api_key: Option<String>,

    // Web server
    pub host: String,
    pub port: u16,

    // Solving
    pub download_dir: PathBuf,
    pub max_solve_seconds: u64,

    // Remote rendering; when unset a local Chromium is used
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            quiz_secret: required_env("QUIZ_SECRET"),
            deepseek_api_key: optional_env("DEEPSEEK_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a number"),
            download_dir: PathBuf::from(
                env::var("DOWNLOAD_DIR").unwrap_or_else(|_| "downloads".to_string()),
            ),
            max_solve_seconds: env::var("MAX_SOLVE_SECONDS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()
                .expect("MAX_SOLVE_SECONDS must be a number"),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
        }
    }

    /// Log what is configured without leaking any secret values.
    pub fn log_redacted(&self) {
        info!(
            host = %self.host,
            port = self.port,
            download_dir = %self.download_dir.display(),
            max_solve_seconds = self.max_solve_seconds,
            deepseek = self.deepseek_api_key.is_some(),
            openai = self.openai_api_key.is_some(),
            browserless = self.browserless_url.is_some(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
