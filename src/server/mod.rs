//! The Sandbox-over-Service HTTP control plane: an `axum` router over a
//! shared [`SandboxManager`].

mod dto;
mod error;
pub(crate) mod extract;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::manager::SandboxManager;

/// Builds the router without binding a listener. Exposed separately so
/// tests can drive it in-process with `tower::ServiceExt::oneshot`.
pub fn build_router(manager: Arc<SandboxManager>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/sandboxes",
            post(handlers::create_sandbox).get(handlers::list_sandboxes),
        )
        .route("/sandboxes/:id/start", post(handlers::start_sandbox))
        .route("/sandboxes/:id/exec", post(handlers::exec_sandbox))
        .route("/sandboxes/:id/stop", post(handlers::stop_sandbox))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

/// Binds `config`'s address and serves the control plane until a SIGINT
/// (ctrl-c) is received, at which point it stops accepting new connections,
/// lets in-flight requests finish, and returns. The caller is still
/// responsible for reaping the registry (see [`SandboxManager::shutdown`]) —
/// this function only stops the listener.
pub async fn serve(config: &ServerConfig, manager: Arc<SandboxManager>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = build_router(manager);

    info!(%addr, "sandboxd control plane listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on ctrl-c, letting [`serve`] stop accepting new connections.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler; server will not shut down gracefully");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::runtime::DynRuntime;
    use crate::runtime::fake::FakeRuntime;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_manager() -> Arc<SandboxManager> {
        let runtime: DynRuntime = Arc::new(FakeRuntime::new());
        Arc::new(SandboxManager::new(runtime, &EngineConfig::default()))
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = build_router(test_manager());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn start_on_unknown_sandbox_is_not_found() {
        let app = build_router(test_manager());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sandboxes/does-not-exist/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let app = build_router(test_manager());
        let create_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sandboxes")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"image":"shellm-sandbox:latest"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(create_response.status(), StatusCode::OK);

        let list_response = app
            .oneshot(Request::builder().uri("/sandboxes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(list_response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_create_body_is_protocol_error() {
        let app = build_router(test_manager());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sandboxes")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "protocol_error");
    }
}
