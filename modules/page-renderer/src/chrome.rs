use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::{RenderError, Result};
use crate::html::readable_text;
use crate::{validate_url, PageRenderer, RenderedPage};

/// Max concurrent Chromium processes. Each instance is heavy (~100MB+ RSS,
/// multiple child processes); containers hit PID/memory limits fast.
const MAX_CONCURRENT_CHROME: usize = 2;

/// Hard cap on a single Chromium run.
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Virtual-time budget for the first attempt, in milliseconds. Chromium
/// fast-forwards timers and waits for outstanding fetches within this budget,
/// which approximates a network-idle wait.
const NETWORK_IDLE_BUDGET_MS: u32 = 10_000;

/// Renders pages by launching an isolated Chromium process per call:
/// fresh profile directory, `--dump-dom`, torn down when the dump completes.
/// The first attempt waits out the virtual-time budget; if that times out or
/// produces an empty DOM, one plain load-complete dump is taken instead.
pub struct ChromeRenderer {
    semaphore: Semaphore,
    chrome_bin: String,
}

impl ChromeRenderer {
    pub fn new() -> Self {
        let chrome_bin = std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string());
        info!(chrome_bin, max_concurrent = MAX_CONCURRENT_CHROME, "Using ChromeRenderer");
        Self {
            semaphore: Semaphore::new(MAX_CONCURRENT_CHROME),
            chrome_bin,
        }
    }

    /// Run one Chromium dump and return the DOM as a string.
    async fn dump_dom(&self, url: &str, network_idle: bool) -> Result<String> {
        let tmp_dir = tempfile::tempdir()
            .map_err(|e| RenderError::Launch(format!("failed to create profile dir: {e}")))?;

        let profile_arg = format!("--user-data-dir={}", tmp_dir.path().display());
        let budget_arg = format!("--virtual-time-budget={NETWORK_IDLE_BUDGET_MS}");

        let mut args = vec![
            "--headless",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            profile_arg.as_str(),
        ];
        if network_idle {
            args.push(budget_arg.as_str());
        }
        args.push("--dump-dom");
        args.push(url);

        let result = tokio::time::timeout(
            RENDER_TIMEOUT,
            tokio::process::Command::new(&self.chrome_bin)
                .args(&args)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(RenderError::Launch(format!(
                        "chromium exited with {}: {}",
                        output.status,
                        stderr.trim()
                    )));
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Err(e)) => Err(RenderError::Launch(e.to_string())),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                seconds: RENDER_TIMEOUT.as_secs(),
            }),
        }
    }
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        validate_url(url)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RenderError::Launch("chrome semaphore closed".to_string()))?;

        info!(url, renderer = "chrome", "Rendering page");

        let html = match self.dump_dom(url, true).await {
            Ok(html) if !html.trim().is_empty() => html,
            Ok(_) => {
                warn!(url, "network-idle dump returned an empty DOM, retrying with plain load");
                self.dump_dom(url, false).await?
            }
            Err(e) => {
                warn!(url, error = %e, "network-idle dump failed, retrying with plain load");
                self.dump_dom(url, false).await?
            }
        };

        if html.trim().is_empty() {
            return Err(RenderError::EmptyDom(url.to_string()));
        }

        let text = readable_text(&html, url);
        info!(
            url,
            renderer = "chrome",
            html_bytes = html.len(),
            text_bytes = text.len(),
            "Rendered page"
        );

        Ok(RenderedPage { html, text })
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_bad_urls_before_launching_anything() {
        let renderer = ChromeRenderer::new();
        let err = renderer.render("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidUrl { .. }));
    }
}
