//! Request and response bodies for the Sandbox-over-Service HTTP surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSandboxRequest {
    pub image: String,
    #[serde(default)]
    pub setup_commands: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSandboxResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SandboxListEntry {
    pub id: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub standalone: bool,
}

#[derive(Debug, Serialize)]
pub struct ExecResponse {
    pub output: String,
    pub exit_code: i64,
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    #[serde(default)]
    pub remove: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
