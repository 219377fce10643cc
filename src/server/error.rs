//! Maps [`EngineError`] to HTTP status codes and the `{"error", "detail"}`
//! body shape used across the whole control plane.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::EngineError;
use crate::server::dto::ErrorResponse;

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidState { .. } => StatusCode::CONFLICT,
            EngineError::UnknownSandbox(_) => StatusCode::NOT_FOUND,
            EngineError::CommandTimeout | EngineError::ResultRecoveryError(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            EngineError::ProtocolError(_) => StatusCode::BAD_REQUEST,
            EngineError::SetupError { .. }
            | EngineError::AttachError(_)
            | EngineError::SessionClosed
            | EngineError::RuntimeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.kind(),
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn invalid_state_maps_to_conflict() {
        let err = EngineError::InvalidState {
            id: "sbx-1".into(),
            state: "Stopped",
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_sandbox_maps_to_not_found() {
        let response = EngineError::UnknownSandbox("sbx-1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn command_timeout_maps_to_gateway_timeout() {
        let response = EngineError::CommandTimeout.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn runtime_error_maps_to_internal_server_error() {
        let response = EngineError::RuntimeError("docker unreachable".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
