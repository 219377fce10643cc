//! The engine's error taxonomy.
//!
//! A single tagged-variant error type is shared by the shell session, the
//! sandbox manager, and the HTTP server. Each variant maps to an HTTP status
//! in [`crate::server::error`] and carries enough detail for a caller to
//! decide whether the sandbox is still usable.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the sandbox execution engine.
///
/// Variants are grouped by who should react to them: `InvalidState` and
/// `UnknownSandbox` are caller mistakes the caller can retry after fixing;
/// `CommandTimeout`, `SessionClosed`, and `ResultRecoveryError` mean the
/// session is desynchronized and the sandbox should be stopped and removed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested operation is not valid for the sandbox's current state
    /// (e.g. `start` on a sandbox that is already `Running`'s complement,
    /// `Stopped`, or `exec` on a sandbox that was never started).
    #[error("sandbox {id} is {state}, which does not permit this operation")]
    InvalidState { id: String, state: &'static str },

    /// No sandbox is registered under the given id.
    #[error("unknown sandbox id: {0}")]
    UnknownSandbox(String),

    /// A setup command (run once, before the session is attached) failed.
    #[error("setup commands failed: {stderr}")]
    SetupError { stderr: String },

    /// Attaching to the container's primary process failed.
    #[error("failed to attach to container: {0}")]
    AttachError(String),

    /// The completion marker for a command never appeared within the
    /// configured read-until-marker timeout.
    #[error("timed out waiting for command completion marker")]
    CommandTimeout,

    /// The attached stream closed (or the container exited) while a command
    /// was in flight.
    #[error("session stream closed unexpectedly")]
    SessionClosed,

    /// One of the out-of-band reads used to recover stdout/stderr/exit-code
    /// files failed or returned a non-zero exit code.
    #[error("failed to recover command results: {0}")]
    ResultRecoveryError(String),

    /// The underlying container runtime reported a failure unrelated to the
    /// framing protocol itself (create/start/remove/exec-create failures).
    #[error("container runtime error: {0}")]
    RuntimeError(String),

    /// A malformed request reached the HTTP control plane.
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

impl EngineError {
    /// Stable, lowercase, machine-readable name for this error's kind.
    ///
    /// Used as the `"error"` field of the HTTP error body and as the typed
    /// discriminant in-process callers can match on.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::UnknownSandbox(_) => "unknown_sandbox",
            EngineError::SetupError { .. } => "setup_error",
            EngineError::AttachError(_) => "attach_error",
            EngineError::CommandTimeout => "command_timeout",
            EngineError::SessionClosed => "session_closed",
            EngineError::ResultRecoveryError(_) => "result_recovery_error",
            EngineError::RuntimeError(_) => "runtime_error",
            EngineError::ProtocolError(_) => "protocol_error",
        }
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(e: bollard::errors::Error) -> Self {
        EngineError::RuntimeError(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::RuntimeError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_and_lowercase() {
        let err = EngineError::UnknownSandbox("abc".into());
        assert_eq!(err.kind(), "unknown_sandbox");
        assert!(err.kind().chars().all(|c| c.is_lowercase() || c == '_'));
    }

    #[test]
    fn invalid_state_message_includes_id_and_state() {
        let err = EngineError::InvalidState {
            id: "sbx-1".into(),
            state: "Stopped",
        };
        let msg = err.to_string();
        assert!(msg.contains("sbx-1"));
        assert!(msg.contains("Stopped"));
    }
}
