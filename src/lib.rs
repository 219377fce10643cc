//! # sandboxd
//!
//! A Sandbox Execution Engine: isolated, programmatically-controlled
//! persistent shell sandboxes for shell-driving agents. A client creates a
//! sandbox from a container image, seeds it with setup commands, then
//! drives an arbitrary sequence of shell commands against a persistent
//! interactive shell inside it, observing each command's stdout, stderr,
//! and exit status. Shell state — working directory, exported variables,
//! background jobs — persists across commands within a session, unlike a
//! sequence of one-shot `docker exec` invocations.
//!
//! ## Architecture
//!
//! ### Shell Session ([`session`])
//!
//! One attached, persistent shell inside one container. Frames each command
//! by redirecting its output into files and printing a completion marker on
//! the attached stream, then recovers stdout/stderr/exit-code via out-of-
//! band execs — see [`session::ShellSession`].
//!
//! ### Sandbox Manager ([`manager`])
//!
//! The process-wide registry of sandboxes: create/start/exec/stop, with
//! per-sandbox serialization so concurrent sandboxes run fully in parallel
//! — see [`SandboxManager`].
//!
//! ### Control plane ([`server`], [`client`])
//!
//! An HTTP service exposing the manager to remote callers, and a typed
//! async client for it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sandboxd::config::EngineConfig;
//! use sandboxd::manager::SandboxManager;
//! use sandboxd::runtime::DynRuntime;
//! use sandboxd::runtime::docker::DockerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::default();
//!     let runtime: DynRuntime = Arc::new(DockerRuntime::connect(&config.docker)?);
//!     let manager = SandboxManager::new(runtime, &config);
//!
//!     let id = manager.create("shellm-sandbox:latest".to_string(), vec![]).await;
//!     manager.start(&id).await?;
//!     let (stdout, _stderr, exit_code) = manager.exec(&id, "echo hi", false).await?;
//!     println!("{stdout} (exit {exit_code})");
//!     manager.stop(&id, true).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod runtime;
pub mod sandbox;
pub mod server;
pub mod session;

pub use config::{EngineConfig, load_config};
pub use error::{EngineError, Result};
pub use manager::SandboxManager;
pub use sandbox::{Sandbox, SandboxState};
