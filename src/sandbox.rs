//! The sandbox data model: identity, configuration, and the state machine
//! each sandbox moves through under the manager's control.

use serde::{Deserialize, Serialize};

use crate::session::ShellSession;

/// Lifecycle state of one sandbox.
///
/// `Running` is entered by `start` and is the only state in which a
/// [`ShellSession`] exists; `Created` and `Stopped` both imply no session
/// handle is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Created,
    Running,
    Stopped,
}

impl SandboxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxState::Created => "created",
            SandboxState::Running => "running",
            SandboxState::Stopped => "stopped",
        }
    }
}

/// One sandbox: its identity, its configuration, and (while `Running`) the
/// shell session driving its container.
pub struct Sandbox {
    pub id: String,
    pub image: String,
    pub setup_commands: Vec<String>,
    pub state: SandboxState,
    pub session: Option<ShellSession>,
}

impl Sandbox {
    pub fn new(id: String, image: String, setup_commands: Vec<String>) -> Self {
        Self {
            id,
            image,
            setup_commands,
            state: SandboxState::Created,
            session: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sandbox_starts_in_created_state_with_no_session() {
        let sandbox = Sandbox::new("sbx-1".into(), "shellm-sandbox:latest".into(), vec![]);
        assert_eq!(sandbox.state, SandboxState::Created);
        assert!(sandbox.session.is_none());
    }

    #[test]
    fn state_as_str_is_lowercase_snake_case() {
        assert_eq!(SandboxState::Created.as_str(), "created");
        assert_eq!(SandboxState::Running.as_str(), "running");
        assert_eq!(SandboxState::Stopped.as_str(), "stopped");
    }
}
