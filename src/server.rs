//! HTTP adapter: JSON endpoints over the lifecycle engine.
//!
//! Role-based authorization gates every mutating endpoint; the server runs
//! a full integrity verification at startup and refuses to bind when it
//! fails under `--strict`. Engine calls are blocking, so handlers run them
//! on the blocking pool.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use packetgov_engine::{Engine, EngineError, IntegrityMode};
use packetgov_policy::role_allows;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: Utf8PathBuf,
    pub host: String,
    pub port: u16,
    /// Refuse to bind when startup integrity verification fails.
    pub strict: bool,
}

struct AppState {
    root: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
struct TransitionBody {
    packet_id: String,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl TransitionBody {
    fn agent(&self) -> String {
        self.agent.clone().unwrap_or_else(|| "api".to_string())
    }

    fn role(&self) -> String {
        self.role
            .clone()
            .unwrap_or_else(|| "operator".to_string())
            .to_lowercase()
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"ok": false, "message": "forbidden"})),
    )
        .into_response()
}

fn transition_response(action: &str, result: Result<String, EngineError>) -> Response {
    match result {
        Ok(message) => (
            StatusCode::OK,
            Json(json!({"ok": true, "action": action, "message": message})),
        )
            .into_response(),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "action": action,
                "kind": error.kind(),
                "message": error.to_string(),
            })),
        )
            .into_response(),
    }
}

async fn run_transition<F>(state: Arc<AppState>, action: &str, body: TransitionBody, f: F) -> Response
where
    F: FnOnce(Engine, TransitionBody) -> Result<String, EngineError> + Send + 'static,
{
    if !role_allows(&body.role(), action) {
        return forbidden();
    }
    let root = state.root.clone();
    let action = action.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let engine = Engine::open(&root)?;
        f(engine, body)
    })
    .await
    .unwrap_or_else(|e| Err(EngineError::io(e)));
    transition_response(&action, result)
}

async fn claim(State(state): State<Arc<AppState>>, Json(body): Json<TransitionBody>) -> Response {
    run_transition(state, "claim", body, |engine, body| {
        let agent = body.agent();
        Ok(engine.claim(&body.packet_id, &agent)?.message)
    })
    .await
}

async fn done(State(state): State<Arc<AppState>>, Json(body): Json<TransitionBody>) -> Response {
    run_transition(state, "done", body, |engine, body| {
        let agent = body.agent();
        let notes = body.notes.clone().unwrap_or_default();
        Ok(engine.done(&body.packet_id, &agent, &notes)?.message)
    })
    .await
}

async fn note(State(state): State<Arc<AppState>>, Json(body): Json<TransitionBody>) -> Response {
    run_transition(state, "note", body, |engine, body| {
        let agent = body.agent();
        let notes = body.notes.clone().unwrap_or_default();
        Ok(engine.note(&body.packet_id, &agent, &notes)?.message)
    })
    .await
}

async fn fail(State(state): State<Arc<AppState>>, Json(body): Json<TransitionBody>) -> Response {
    run_transition(state, "fail", body, |engine, body| {
        let agent = body.agent();
        let reason = body.reason.clone().unwrap_or_default();
        Ok(engine.fail(&body.packet_id, &agent, &reason)?.message)
    })
    .await
}

async fn healthz() -> Response {
    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> Response {
    let root = state.root.clone();
    let result = tokio::task::spawn_blocking(move || Engine::open(&root)?.load_state())
        .await
        .unwrap_or_else(|e| Err(EngineError::io(e)));
    match result {
        Ok(runtime) => (
            StatusCode::OK,
            Json(json!({"ok": true, "state": runtime})),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "message": error.to_string()})),
        )
            .into_response(),
    }
}

async fn integrity(State(state): State<Arc<AppState>>) -> Response {
    let root = state.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        Engine::open(&root)?.verify_integrity(IntegrityMode::Full)
    })
    .await
    .unwrap_or_else(|e| Err(EngineError::io(e)));
    match result {
        Ok(report) if report.ok => (StatusCode::OK, Json(json!(report))).into_response(),
        Ok(report) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!(report))).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "message": error.to_string()})),
        )
            .into_response(),
    }
}

/// Build the API router for a governance root.
pub fn router(root: Utf8PathBuf) -> Router {
    let state = Arc::new(AppState { root });
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/status", get(status))
        .route("/v1/integrity", get(integrity))
        .route("/v1/claim", post(claim))
        .route("/v1/done", post(done))
        .route("/v1/note", post(note))
        .route("/v1/fail", post(fail))
        .with_state(state)
}

/// Run the server until interrupted.
///
/// Startup runs a full integrity verification; under `strict` a failing
/// report prevents the server from binding at all.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let engine = Engine::open(&config.root)
        .map_err(|e| anyhow::anyhow!("failed to open governance root: {e}"))?;
    let report = engine
        .verify_integrity(IntegrityMode::Full)
        .map_err(|e| anyhow::anyhow!("startup integrity verification failed to run: {e}"))?;
    if !report.ok {
        if config.strict {
            anyhow::bail!(
                "integrity verification failed; refusing to serve (strict mode): {:?}",
                report.integrity_errors
            );
        }
        warn!(errors = ?report.integrity_errors, "integrity verification failed; serving anyway");
    }

    let app = router(config.root.clone());
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "governance API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
