//! The sandbox registry: process-wide state tracking every sandbox and
//! serializing operations on each one individually.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, SandboxConfig};
use crate::error::{EngineError, Result};
use crate::runtime::DynRuntime;
use crate::sandbox::{Sandbox, SandboxState};
use crate::session::ShellSession;

/// A snapshot entry returned by [`SandboxManager::list`].
#[derive(Debug, Clone)]
pub struct SandboxSummary {
    pub id: String,
    pub state: SandboxState,
}

/// Owns every sandbox. `start`, `exec`, and `stop` for a given id are
/// serialized through that sandbox's own lock; different sandboxes run
/// fully independently. Mutations to the registry itself (create, remove)
/// hold a separate, short-lived lock.
pub struct SandboxManager {
    runtime: DynRuntime,
    sandbox_config: SandboxConfig,
    registry: Mutex<HashMap<String, Arc<Mutex<Sandbox>>>>,
}

impl SandboxManager {
    pub fn new(runtime: DynRuntime, config: &EngineConfig) -> Self {
        Self {
            runtime,
            sandbox_config: config.sandbox.clone(),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates an id and registers a sandbox in `Created` state. Does not
    /// touch the container runtime.
    pub async fn create(&self, image: String, setup_commands: Vec<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let sandbox = Sandbox::new(id.clone(), image, setup_commands);
        self.registry
            .lock()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(sandbox)));
        info!(sandbox_id = %id, "sandbox created");
        id
    }

    /// Starts a `Created` sandbox: runs setup, attaches the shell session,
    /// and transitions to `Running`. A no-op if the sandbox is already
    /// `Running`. Fails with [`EngineError::InvalidState`] if the sandbox
    /// was already stopped.
    pub async fn start(&self, id: &str) -> Result<()> {
        let entry = self.lookup(id).await?;
        let mut sandbox = entry.lock().await;

        match sandbox.state {
            SandboxState::Running => return Ok(()),
            SandboxState::Stopped => {
                return Err(EngineError::InvalidState {
                    id: id.to_string(),
                    state: "Stopped",
                });
            }
            SandboxState::Created => {}
        }

        let session = ShellSession::start(
            self.runtime.clone(),
            &sandbox.image,
            &sandbox.setup_commands,
            &self.sandbox_config,
        )
        .await;

        match session {
            Ok(session) => {
                sandbox.session = Some(session);
                sandbox.state = SandboxState::Running;
                info!(sandbox_id = %id, "sandbox started");
                Ok(())
            }
            Err(e) => {
                sandbox.state = SandboxState::Stopped;
                warn!(sandbox_id = %id, error = %e, "sandbox failed to start");
                Err(e)
            }
        }
    }

    /// Runs `cmd` against a `Running` sandbox, either inside the persistent
    /// session (`standalone = false`) or as a one-shot exec
    /// (`standalone = true`).
    pub async fn exec(
        &self,
        id: &str,
        cmd: &str,
        standalone: bool,
    ) -> Result<(String, String, i64)> {
        let entry = self.lookup(id).await?;
        let mut sandbox = entry.lock().await;

        if sandbox.state != SandboxState::Running {
            let state = sandbox.state;
            return Err(EngineError::InvalidState {
                id: id.to_string(),
                state: state_label(&state),
            });
        }
        let session = sandbox
            .session
            .as_mut()
            .expect("Running sandbox always holds a session");

        if standalone {
            session.exec_standalone(cmd).await
        } else {
            session.exec_session(cmd).await
        }
    }

    /// Stops a `Running` sandbox (a no-op otherwise, aside from removal)
    /// and, if `remove` is set, deletes its registry entry.
    pub async fn stop(&self, id: &str, remove: bool) -> Result<()> {
        let entry = self.lookup(id).await?;
        let stop_result = {
            let mut sandbox = entry.lock().await;
            if sandbox.state == SandboxState::Running {
                let result = match sandbox.session.as_mut() {
                    Some(session) => session.stop().await,
                    None => Ok(()),
                };
                // Always drop the session and mark the sandbox Stopped, even
                // if tearing it down failed — a sandbox that failed to stop
                // must not be left looking Running with a dead session.
                sandbox.session = None;
                sandbox.state = SandboxState::Stopped;
                info!(sandbox_id = %id, "sandbox stopped");
                result
            } else {
                Ok(())
            }
        };

        if remove {
            self.registry.lock().await.remove(id);
            info!(sandbox_id = %id, "sandbox removed from registry");
        }

        stop_result
    }

    /// Snapshots the current registry: every sandbox id and its state.
    pub async fn list(&self) -> Vec<SandboxSummary> {
        let registry = self.registry.lock().await;
        let mut summaries = Vec::with_capacity(registry.len());
        for (id, entry) in registry.iter() {
            let sandbox = entry.lock().await;
            summaries.push(SandboxSummary {
                id: id.clone(),
                state: sandbox.state,
            });
        }
        summaries
    }

    /// Stops and removes every still-registered sandbox. Called on server
    /// shutdown so a crash doesn't leave orphan containers behind it didn't
    /// at least attempt to reap.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.registry.lock().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id, true).await {
                warn!(sandbox_id = %id, error = %e, "failed to reap sandbox during shutdown");
            }
        }
    }

    async fn lookup(&self, id: &str) -> Result<Arc<Mutex<Sandbox>>> {
        self.registry
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSandbox(id.to_string()))
    }
}

/// Capitalized variant name for error messages, distinct from
/// [`SandboxState::as_str`]'s lowercase form used in JSON responses.
fn state_label(state: &SandboxState) -> &'static str {
    match state {
        SandboxState::Created => "Created",
        SandboxState::Running => "Running",
        SandboxState::Stopped => "Stopped",
    }
}
