//! The solve loop: render, plan, download, submit, follow the next URL.
//!
//! Everything that goes wrong inside an iteration becomes a step record; the
//! loop's only output is the ordered trace, whatever the termination reason.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::LlmAgent;
use page_renderer::PageRenderer;
use quizchain_common::{AnswerPayload, ChainResult, SolveRequest, StepRecord};

use crate::fetch::{FileFetcher, HttpFileFetcher};
use crate::files::prepare_files_for_prompt;
use crate::payload::enforce_payload_cap;
use crate::plan::{find_submit_url, Plan, RefinedAnswer};
use crate::prompts;
use crate::submit::AnswerSubmitter;

/// Parse retries granted to each `ask_json` call.
const JSON_RETRIES: u32 = 2;

/// Everything the loop talks to, injected so tests can swap in mocks and so
/// no client handle lives in process-global state.
#[derive(Clone)]
pub struct SolverDeps {
    pub renderer: Arc<dyn PageRenderer>,
    pub agent: LlmAgent,
    pub fetcher: Arc<dyn FileFetcher>,
    pub submitter: Arc<dyn AnswerSubmitter>,
}

/// Run one quiz chain to completion. `started` is the session clock the
/// deadline is measured against; `max_seconds` is the wall-clock budget.
pub async fn solve_quiz_chain(
    deps: &SolverDeps,
    req: &SolveRequest,
    run_id: &str,
    started: Instant,
    max_seconds: u64,
) -> ChainResult {
    let started_at = Utc::now();
    let mut steps: Vec<StepRecord> = Vec::new();
    let mut url = req.url.clone();

    loop {
        // Cooperative deadline: no iteration starts past the budget.
        if started.elapsed().as_secs_f64() > max_seconds as f64 {
            steps.push(StepRecord::failed(&url, "timeout"));
            break;
        }

        info!(url, step = steps.len(), "chain iteration");

        let page = match deps.renderer.render(&url).await {
            Ok(page) => page,
            Err(e) => {
                steps.push(StepRecord::failed(&url, format!("render_failed: {e}")));
                break;
            }
        };
        steps.push(StepRecord::rendered(&url, page.text.len()));

        let plan = match request_plan(deps, &page.text, &page.html).await {
            Ok(plan) => plan,
            Err(e) => {
                steps.push(StepRecord::failed(&url, format!("llm_parse_failed: {e}")));
                break;
            }
        };

        let mut answer = plan.answer.clone();
        let submit_url = plan
            .validated_submit_url()
            .or_else(|| find_submit_url(&page.html, &page.text));

        let downloads = plan.validated_downloads();
        if !downloads.is_empty() {
            let mut paths = Vec::new();
            for file_url in &downloads {
                match deps.fetcher.download(file_url).await {
                    Ok(path) => paths.push(path),
                    Err(e) => {
                        steps.push(StepRecord::failed(
                            &url,
                            format!("download_failed {file_url}: {e}"),
                        ));
                    }
                }
            }

            let excerpts = prepare_files_for_prompt(&paths);
            if let Some(refined) = refine_answer(deps, &excerpts, &page.text).await {
                answer = refined;
            }
        }

        let mut payload = AnswerPayload {
            email: req.email.clone(),
            secret: req.secret.clone(),
            url: url.clone(),
            answer,
        };
        if enforce_payload_cap(&mut payload).is_err() {
            steps.push(StepRecord::failed(&url, "payload_too_large"));
            break;
        }

        // The normal terminal outcome: an answer with nowhere to send it.
        let Some(submit_url) = submit_url else {
            steps.push(StepRecord::FinalAnswer {
                url: url.clone(),
                answer_payload: payload,
                submit_url: None,
            });
            break;
        };

        let response = match deps.submitter.submit(&submit_url, &payload).await {
            Ok(response) => response,
            Err(e) => {
                steps.push(StepRecord::SubmitFailed {
                    url: url.clone(),
                    submit_error: e.to_string(),
                });
                break;
            }
        };
        steps.push(StepRecord::Submitted {
            url: url.clone(),
            submit_url: submit_url.clone(),
            submit_response: response.clone(),
        });

        let mut next_url = response
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string);
        let correct = response.get("correct").and_then(Value::as_bool);

        if correct == Some(false) && next_url.is_none() {
            if let Some(adopted) =
                corrective_resubmit(deps, &page.text, &page.html, &submit_url, &payload, &url, &mut steps)
                    .await
            {
                next_url = Some(adopted);
            }
        }

        match next_url {
            Some(next) => url = next,
            None => break,
        }
    }

    ChainResult {
        run_id: run_id.to_string(),
        started_at,
        elapsed_ms: started.elapsed().as_millis() as u64,
        steps,
    }
}

/// Plan the page: `ask_json` with its own coax retries, then one direct
/// raw-text parse as a last resort.
async fn request_plan(deps: &SolverDeps, text: &str, html: &str) -> anyhow::Result<Plan> {
    let prompt = prompts::plan_prompt(text, html);

    let parsed = match deps.agent.ask_json(&prompt, JSON_RETRIES).await {
        Ok(value) => value,
        Err(first_err) => {
            warn!(error = %first_err, "plan parse failed, trying one raw completion");
            let raw = deps.agent.ask(&prompt).await.map_err(|_| first_err)?;
            serde_json::from_str(&raw)?
        }
    };

    Ok(serde_json::from_value(parsed)?)
}

/// Second LLM pass over downloaded file excerpts. Returns the refined answer,
/// the raw completion text when it is not JSON, or `None` to keep the answer
/// from the plan.
async fn refine_answer(deps: &SolverDeps, excerpts: &[String], text: &str) -> Option<Value> {
    let prompt = prompts::refine_prompt(excerpts, text);

    match deps.agent.ask_json(&prompt, JSON_RETRIES).await {
        Ok(value) => serde_json::from_value::<RefinedAnswer>(value)
            .ok()
            .map(|r| r.answer),
        Err(e) => {
            warn!(error = %e, "refine parse failed, trying one raw completion");
            match deps.agent.ask(&prompt).await {
                Ok(raw) => Some(
                    serde_json::from_str::<RefinedAnswer>(&raw)
                        .map(|r| r.answer)
                        .unwrap_or(Value::String(raw)),
                ),
                Err(e) => {
                    warn!(error = %e, "refine completion failed, keeping planned answer");
                    None
                }
            }
        }
    }
}

/// One corrective prompt and one resubmission after `correct: false` with no
/// next URL. Every failure here is swallowed; at most one retry ever happens.
/// Returns the next URL adopted from the second response, if any.
async fn corrective_resubmit(
    deps: &SolverDeps,
    text: &str,
    html: &str,
    submit_url: &str,
    payload: &AnswerPayload,
    url: &str,
    steps: &mut Vec<StepRecord>,
) -> Option<String> {
    let prompt = prompts::correction_prompt(text, html);

    let corrected = match deps.agent.ask_json(&prompt, JSON_RETRIES).await {
        Ok(value) => match serde_json::from_value::<RefinedAnswer>(value) {
            Ok(r) => r.answer,
            Err(e) => {
                warn!(error = %e, "corrective answer had unexpected shape, skipping retry");
                return None;
            }
        },
        Err(e) => {
            warn!(error = %e, "corrective prompt failed, skipping retry");
            return None;
        }
    };

    let mut retry_payload = payload.clone();
    retry_payload.answer = corrected;
    if enforce_payload_cap(&mut retry_payload).is_err() {
        warn!("corrected answer exceeded payload cap, skipping retry");
        return None;
    }

    match deps.submitter.submit(submit_url, &retry_payload).await {
        Ok(response) => {
            let adopted = response
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string);
            steps.push(StepRecord::Resubmitted {
                url: url.to_string(),
                resubmit_response: response,
            });
            adopted
        }
        Err(e) => {
            warn!(error = %e, "corrective resubmission failed");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// ChainSolver — the front door's view of this module
// ---------------------------------------------------------------------------

/// Runs a whole chain for one request. The front door holds this behind a
/// trait so handler tests never touch a browser or the network.
#[async_trait]
pub trait ChainSolver: Send + Sync {
    async fn solve(&self, req: &SolveRequest) -> anyhow::Result<ChainResult>;
}

/// Production solver: wires the shared renderer, agent and submitter to a
/// per-run download directory.
pub struct Solver {
    renderer: Arc<dyn PageRenderer>,
    agent: LlmAgent,
    submitter: Arc<dyn AnswerSubmitter>,
    download_dir: std::path::PathBuf,
    max_seconds: u64,
}

impl Solver {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        agent: LlmAgent,
        submitter: Arc<dyn AnswerSubmitter>,
        download_dir: impl Into<std::path::PathBuf>,
        max_seconds: u64,
    ) -> Self {
        Self {
            renderer,
            agent,
            submitter,
            download_dir: download_dir.into(),
            max_seconds,
        }
    }
}

#[async_trait]
impl ChainSolver for Solver {
    async fn solve(&self, req: &SolveRequest) -> anyhow::Result<ChainResult> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        // Per-run directory: concurrent sessions never share filenames.
        let fetcher = Arc::new(HttpFileFetcher::new(self.download_dir.join(&run_id)));

        let deps = SolverDeps {
            renderer: self.renderer.clone(),
            agent: self.agent.clone(),
            fetcher,
            submitter: self.submitter.clone(),
        };

        info!(run_id, url = req.url.as_str(), "starting quiz chain");
        let result = solve_quiz_chain(&deps, req, &run_id, started, self.max_seconds).await;
        info!(
            run_id,
            steps = result.steps.len(),
            elapsed_ms = result.elapsed_ms,
            "quiz chain finished"
        );

        Ok(result)
    }
}
