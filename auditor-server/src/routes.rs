//! HTTP route handlers for the analysis API.

use anyhow::{Result, anyhow};
use auditor::analyze::{AnalysisOutcome, run_analysis};
use auditor::core::types::{AnalysisRequest, PASS_DETAILS, PASS_RESULT, Verdict};
use auditor::io::oracle::{OpenAiOracle, Oracle};
use auditor::io::toolchain::{CommandToolchain, Toolchain};
use auditor::io::workspace::RunWorkspace;
use auditor::notify::Notifier;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// POST /analyze - run one analysis and return its verdict.
///
/// Malformed bodies answer with the extractor's status and an `{error}` body.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let notifier = state.notifier();
    notifier.emit("Analyze endpoint hit");
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!(status = %rejection.status(), "rejected analyze body");
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            );
        }
    };
    if let Err(err) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("{err:#}") })),
        );
    }

    let task_state = state.clone();
    let result = tokio::task::spawn_blocking(move || execute_live(&task_state, &request))
        .await
        .unwrap_or_else(|join_err| Err(anyhow!("analysis task failed: {join_err}")));

    if let Err(err) = &result {
        let message = format!("Internal Server Error: {err:#}");
        error!(error = %message, "analysis failed");
        notifier.emit(&message);
    }
    verdict_response(result)
}

/// Run an analysis with the configured oracle and toolchain.
fn execute_live(state: &AppState, request: &AnalysisRequest) -> Result<AnalysisOutcome> {
    let oracle = OpenAiOracle::from_config(&state.config.oracle)?;
    let toolchain = CommandToolchain::from_config(&state.config.toolchain);
    execute(state, request, &oracle, &toolchain)
}

/// Run one analysis in a fresh workspace.
///
/// Shared-workspace runs hold the state's run lock for their whole duration.
pub fn execute<O: Oracle, T: Toolchain>(
    state: &AppState,
    request: &AnalysisRequest,
    oracle: &O,
    toolchain: &T,
) -> Result<AnalysisOutcome> {
    let _guard = if state.config.workspace.isolate {
        None
    } else {
        Some(
            state
                .run_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    };

    let workspace = RunWorkspace::open(&state.project_dir, &state.config)?;
    let notifier = state.notifier();
    let result = run_analysis(
        &workspace,
        request,
        oracle,
        toolchain,
        &notifier,
        &state.config.repair,
    );
    let finished = workspace.finish();
    let outcome = result?;
    finished?;
    info!(contract = %outcome.identity.name, "analysis request completed");
    Ok(outcome)
}

/// Map a run result to the response status and body.
pub fn verdict_response(result: Result<AnalysisOutcome>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(outcome) => match outcome.verdict {
            Verdict::Passed => (
                StatusCode::OK,
                Json(json!({ "result": PASS_RESULT, "details": PASS_DETAILS })),
            ),
            Verdict::Vulnerable { analysis } => {
                (StatusCode::OK, Json(json!({ "analysis": analysis })))
            }
            Verdict::Unrepairable {
                stage,
                reason,
                last_output,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": format!("Build Error Detected: {reason}"),
                    "stage": stage,
                    "output": last_output,
                })),
            ),
        },
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Internal Server Error: {err:#}") })),
        ),
    }
}
