use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::{info, warn};

use ai_client::LlmAgent;
use page_renderer::{BrowserlessRenderer, ChromeRenderer, PageRenderer};
use quizchain_common::{Config, SolveRequest};
use quizchain_solver::{ChainSolver, HttpSubmitter, Solver};

pub struct AppState {
    pub quiz_secret: String,
    pub max_solve_seconds: u64,
    pub solver: Arc<dyn ChainSolver>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let renderer: Arc<dyn PageRenderer> = match &config.browserless_url {
            Some(base_url) => Arc::new(BrowserlessRenderer::new(
                base_url,
                config.browserless_token.as_deref(),
            )),
            None => Arc::new(ChromeRenderer::new()),
        };

        let agent = LlmAgent::from_keys(
            config.deepseek_api_key.as_deref(),
            config.openai_api_key.as_deref(),
        );

        let solver = Solver::new(
            renderer,
            agent,
            Arc::new(HttpSubmitter::new()),
            config.download_dir.clone(),
            config.max_solve_seconds,
        );

        Self {
            quiz_secret: config.quiz_secret.clone(),
            max_solve_seconds: config.max_solve_seconds,
            solver: Arc::new(solver),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(solve))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // method + path only; request bodies carry secrets
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn healthz() -> &'static str {
    "ok"
}

async fn solve(State(state): State<Arc<AppState>>, Json(body): Json<SolveRequest>) -> Response {
    // Reject before any rendering, LLM or network work happens.
    if body.secret != state.quiz_secret {
        warn!("request rejected: secret mismatch");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "invalid secret"})),
        )
            .into_response();
    }

    info!(url = body.url.as_str(), "solve request accepted");

    // Outer watchdog, deliberately the same budget as the loop's own
    // deadline check: this one also catches a hung render or LLM call.
    let budget = Duration::from_secs(state.max_solve_seconds);
    match tokio::time::timeout(budget, state.solver.solve(&body)).await {
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "detail": format!("Processing timed out (over {} seconds)", state.max_solve_seconds)
            })),
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": format!("Error computing answer: {e}")})),
        )
            .into_response(),
        Ok(Ok(result)) => Json(json!({"ok": true, "result": result})).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use quizchain_common::{ChainResult, StepRecord};

    struct CountingSolver {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingSolver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChainSolver for CountingSolver {
        async fn solve(&self, req: &SolveRequest) -> anyhow::Result<ChainResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(ChainResult {
                run_id: "test-run".to_string(),
                started_at: chrono::Utc::now(),
                elapsed_ms: 1,
                steps: vec![StepRecord::rendered(&req.url, 10)],
            })
        }
    }

    fn state_with(solver: Arc<CountingSolver>, max_seconds: u64) -> Arc<AppState> {
        Arc::new(AppState {
            quiz_secret: "expected".to_string(),
            max_solve_seconds: max_seconds,
            solver,
        })
    }

    fn solve_request(secret: &str) -> Request<Body> {
        let body = json!({
            "email": "player@example.com",
            "secret": secret,
            "url": "https://quiz.example/q1",
        });
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_before_any_work() {
        let solver = Arc::new(CountingSolver::new());
        let app = app(state_with(solver.clone(), 180));

        let response = app.oneshot(solve_request("wrong")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "invalid secret");
        assert_eq!(solver.calls(), 0, "solver must not run on a bad secret");
    }

    #[tokio::test]
    async fn valid_request_returns_ok_with_steps() {
        let solver = Arc::new(CountingSolver::new());
        let app = app(state_with(solver.clone(), 180));

        let response = app.oneshot(solve_request("expected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["result"]["steps"].as_array().unwrap().len(), 1);
        assert_eq!(solver.calls(), 1);
    }

    #[tokio::test]
    async fn watchdog_times_out_slow_chains() {
        let solver = Arc::new(CountingSolver::slow(Duration::from_secs(5)));
        let app = app(state_with(solver, 0));

        let response = app.oneshot(solve_request("expected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn health_route_answers() {
        let app = app(state_with(Arc::new(CountingSolver::new()), 180));
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
