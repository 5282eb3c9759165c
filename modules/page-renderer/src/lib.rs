pub mod error;

mod browserless;
mod chrome;
mod html;

pub use browserless::BrowserlessRenderer;
pub use chrome::ChromeRenderer;
pub use error::{RenderError, Result};
pub use html::readable_text;

use async_trait::async_trait;

/// A fully rendered page: the final DOM markup and its readable text.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub text: String,
}

/// Renders a URL with a real browser engine. Implementations hold no
/// per-page state; each call gets an isolated browser.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage>;

    fn name(&self) -> &str;
}

/// Reject anything that is not plain http(s) before handing it to a browser.
pub(crate) fn validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url).map_err(|e| RenderError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(RenderError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }
    Ok(parsed)
}
