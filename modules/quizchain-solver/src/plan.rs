//! What the LLM returns for a rendered page, and how much of it we trust.
//!
//! Every field is model-authored input: download URLs and the submit target
//! are revalidated before the chain acts on them.

use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// The plan for one page: what to download, what to answer, where to submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// File URLs to download before answering. Models emit `null`, a list or
    /// nothing at all; all of those mean "no downloads".
    #[serde(default)]
    pub needs_download: Option<Vec<String>>,
    /// The value to submit: number, string, boolean or object.
    #[serde(default)]
    pub answer: Value,
    /// Submission endpoint, when the page does not spell one out.
    #[serde(default)]
    pub submit_url: Option<String>,
}

/// The refined (or corrected) answer from a follow-up prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RefinedAnswer {
    #[serde(default)]
    pub answer: Value,
}

impl Plan {
    /// Download URLs that survive validation. Anything that is not plain
    /// http(s) is dropped with a warning.
    pub fn validated_downloads(&self) -> Vec<String> {
        self.needs_download
            .iter()
            .flatten()
            .filter(|u| {
                if is_http_url(u) {
                    true
                } else {
                    warn!(url = u.as_str(), "dropping invalid download URL from plan");
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// The plan's submit URL, if it is a well-formed http(s) URL.
    pub fn validated_submit_url(&self) -> Option<String> {
        match self.submit_url.as_deref() {
            Some(u) if is_http_url(u) => Some(u.to_string()),
            Some(u) => {
                warn!(url = u, "ignoring invalid submit URL from plan");
                None
            }
            None => None,
        }
    }
}

fn is_http_url(s: &str) -> bool {
    matches!(url::Url::parse(s), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
}

/// Scan page markup and text for the first URL containing `/submit`.
pub fn find_submit_url(html: &str, text: &str) -> Option<String> {
    static SUBMIT_RE: OnceLock<Regex> = OnceLock::new();
    let re = SUBMIT_RE.get_or_init(|| {
        Regex::new(r#"(https?://[^\s'"<>]+/submit[^\s'"<>]*)"#).expect("valid submit URL regex")
    });

    let haystack = format!("{html}\n{text}");
    re.find(&haystack).map(|m| m.as_str().to_string())
}
