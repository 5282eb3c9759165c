//! Deterministic fakes for every chain dependency: no browser, no network,
//! no LLM. Tests set up the fake external world, run the real loop, and
//! assert on the step trace that comes out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use ai_client::{AiError, LlmProvider};
use page_renderer::{PageRenderer, RenderError, RenderedPage};
use quizchain_common::AnswerPayload;

use crate::fetch::{FetchError, FileFetcher};
use crate::submit::{AnswerSubmitter, SubmitError};

// ---------------------------------------------------------------------------
// StubRenderer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubRenderer {
    pages: HashMap<String, RenderedPage>,
    failing: Vec<String>,
    rendered: Mutex<Vec<String>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, html: &str, text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            RenderedPage {
                html: html.to_string(),
                text: text.to_string(),
            },
        );
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    /// URLs rendered, in order.
    pub fn rendered_urls(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render(&self, url: &str) -> page_renderer::Result<RenderedPage> {
        self.rendered.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|u| u == url) {
            return Err(RenderError::Launch("stubbed browser crash".to_string()));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::EmptyDom(url.to_string()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// ScriptedProvider — feed the LlmAgent canned completions
// ---------------------------------------------------------------------------

pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Responses are returned in the given order; running past the script is
    /// an error so tests notice unexpected extra calls.
    pub fn new(responses: &[&str]) -> Self {
        let mut rs: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
        rs.reverse();
        Self {
            responses: Mutex::new(rs),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _prompt: &str) -> ai_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AiError::Network("scripted provider exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// MockFetcher — serves canned file bodies from a temp directory
// ---------------------------------------------------------------------------

pub struct MockFetcher {
    /// url → (local filename, body)
    files: HashMap<String, (String, Vec<u8>)>,
    dir: tempfile::TempDir,
    downloads: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            dir: tempfile::tempdir().expect("tempdir for MockFetcher"),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn on_file(mut self, url: &str, name: &str, body: &[u8]) -> Self {
        self.files
            .insert(url.to_string(), (name.to_string(), body.to_vec()));
        self
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileFetcher for MockFetcher {
    async fn download(&self, url: &str) -> Result<PathBuf, FetchError> {
        self.downloads.lock().unwrap().push(url.to_string());

        let Some((name, body)) = self.files.get(url) else {
            return Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            });
        };

        let path = self.dir.path().join(name);
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// MockSubmitter — scripted endpoint responses, records every payload
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSubmitter {
    responses: Mutex<Vec<Value>>,
    submissions: Mutex<Vec<(String, AnswerPayload)>>,
}

impl MockSubmitter {
    pub fn new(responses: &[Value]) -> Self {
        let mut rs = responses.to_vec();
        rs.reverse();
        Self {
            responses: Mutex::new(rs),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<(String, AnswerPayload)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerSubmitter for MockSubmitter {
    async fn submit(&self, submit_url: &str, payload: &AnswerPayload) -> Result<Value, SubmitError> {
        self.submissions
            .lock()
            .unwrap()
            .push((submit_url.to_string(), payload.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| SubmitError::Network("scripted submitter exhausted".to_string()))
    }
}
