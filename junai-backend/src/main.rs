use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use junai_core::config::PlannerBackend;
use junai_core::planner::ExternalLlm;
use junai_core::{CoreConfig, NavigationAgent, NavigationError, Task};

mod llm_client;
mod protocol;

use llm_client::HttpLlmClient;
use protocol::{ErrorResponse, TaskRequest, TaskResponse};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const LLM_TIMEOUT: Duration = Duration::from_secs(60);

// --- API Shared State ---
// One navigation agent serves every request; it holds no per-task state.
#[derive(Clone)]
pub struct ApiState {
    navigator: Arc<NavigationAgent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("junai_backend=info,junai_core=info")),
        )
        .with_target(false)
        .init();

    let config = CoreConfig::from_env().context("invalid configuration")?;
    let navigator = build_navigator(&config)?;

    let bind_addr =
        std::env::var("JUNAI_BACKEND_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "JunAI backend listening");

    axum::serve(listener, app(navigator).into_make_service()).await?;
    Ok(())
}

fn build_navigator(config: &CoreConfig) -> Result<NavigationAgent> {
    let llm: Option<Arc<dyn ExternalLlm>> = match &config.planner_backend {
        PlannerBackend::Llm { url } => {
            info!(endpoint = %url, "Using LLM planner");
            Some(Arc::new(HttpLlmClient::new(url.clone(), LLM_TIMEOUT)?))
        }
        PlannerBackend::Template => None,
    };
    NavigationAgent::from_config(config, llm).context("failed to assemble navigation agent")
}

fn app(navigator: NavigationAgent) -> Router {
    let state = ApiState {
        navigator: Arc::new(navigator),
    };

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tasks", post(execute_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "JunAI Backend Operational")
}

async fn execute_task(
    State(state): State<ApiState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(req) = payload
        .map_err(|rejection| ApiError(NavigationError::validation(rejection.body_text())))?;
    let task: Task = req.into();

    let result = state.navigator.execute_task(&task).await?;
    Ok(Json(result.into()))
}

// --- Error mapping ---

struct ApiError(NavigationError);

impl From<NavigationError> for ApiError {
    fn from(err: NavigationError) -> Self {
        Self(err)
    }
}

fn status_for(err: &NavigationError) -> StatusCode {
    match err {
        NavigationError::Validation(_) => StatusCode::BAD_REQUEST,
        NavigationError::AuthenticationMissing { .. } => StatusCode::UNAUTHORIZED,
        NavigationError::RemoteCallFailed { .. } => StatusCode::BAD_GATEWAY,
        NavigationError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error_kind = self.0.kind(), error = %self.0, "Task failed");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
