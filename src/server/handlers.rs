//! Route handlers for the Sandbox-over-Service control plane.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::error::EngineError;
use crate::manager::SandboxManager;
use crate::server::dto::{
    CreateSandboxRequest, CreateSandboxResponse, ExecRequest, ExecResponse, HealthResponse,
    SandboxListEntry, StopRequest,
};
use crate::server::extract::AppJson;

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn create_sandbox(
    State(manager): State<Arc<SandboxManager>>,
    AppJson(req): AppJson<CreateSandboxRequest>,
) -> Json<CreateSandboxResponse> {
    let id = manager.create(req.image, req.setup_commands).await;
    Json(CreateSandboxResponse { id })
}

pub async fn list_sandboxes(
    State(manager): State<Arc<SandboxManager>>,
) -> Json<Vec<SandboxListEntry>> {
    let entries = manager
        .list()
        .await
        .into_iter()
        .map(|s| SandboxListEntry {
            id: s.id,
            state: s.state.as_str().to_string(),
        })
        .collect();
    Json(entries)
}

pub async fn start_sandbox(
    State(manager): State<Arc<SandboxManager>>,
    Path(id): Path<String>,
) -> Result<StatusCode, EngineError> {
    manager.start(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Concatenates stdout then stderr into `output`, matching the fixed HTTP
/// contract. The in-process [`SandboxManager::exec`] keeps them separate;
/// this is the one place they're joined.
pub async fn exec_sandbox(
    State(manager): State<Arc<SandboxManager>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ExecRequest>,
) -> Result<Json<ExecResponse>, EngineError> {
    let (stdout, stderr, exit_code) = manager.exec(&id, &req.command, req.standalone).await?;
    Ok(Json(ExecResponse {
        output: format!("{stdout}{stderr}"),
        exit_code,
    }))
}

pub async fn stop_sandbox(
    State(manager): State<Arc<SandboxManager>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StopRequest>,
) -> Result<StatusCode, EngineError> {
    manager.stop(&id, req.remove).await?;
    Ok(StatusCode::NO_CONTENT)
}
