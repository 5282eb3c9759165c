use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::{RenderError, Result};
use crate::html::readable_text;
use crate::{validate_url, PageRenderer, RenderedPage};

/// Renders pages through a remote Browserless `/content` endpoint. The
/// remote pool owns browser lifecycle; every call is still an isolated
/// session on its side.
pub struct BrowserlessRenderer {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        info!(base_url, "Using BrowserlessRenderer");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    async fn content(&self, url: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({ "url": url });

        let resp = self
            .http
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        validate_url(url)?;

        info!(url, renderer = "browserless", "Rendering page");

        let html = self.content(url).await?;
        if html.trim().is_empty() {
            return Err(RenderError::EmptyDom(url.to_string()));
        }

        let text = readable_text(&html, url);
        Ok(RenderedPage { html, text })
    }

    fn name(&self) -> &str {
        "browserless"
    }
}
