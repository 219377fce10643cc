//! Configuration schema for the sandbox execution engine.
//!
//! Unlike a multi-backend tool, there's only one place sandboxes run
//! (Docker), so there's no tagged-enum provider selection here. The schema
//! is just the three groups of knobs the control plane, the Docker runtime,
//! and the session framing protocol each need.
//!
//! # Schema Overview
//!
//! ```text
//! EngineConfig (root)
//! ├── ServerConfig   - HTTP control-plane bind address
//! ├── DockerConfig   - Daemon connection override
//! └── SandboxConfig  - Default image and protocol timeouts
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration structure for `sandboxd`.
///
/// Every section has defaults, so an empty file (or no file at all, with
/// `--config` omitted) is a valid configuration: bind to `127.0.0.1:8080`,
/// talk to the local Docker daemon, and use the `shellm-sandbox:latest`
/// image unless a create request says otherwise.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub docker: DockerConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Bind address for the Sandbox-over-Service HTTP control plane.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind to. Default: `127.0.0.1`.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind to. Default: `8080`.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Connection settings for the Docker daemon backing every sandbox.
///
/// Left at its default, the runtime connects using the platform's usual
/// local defaults (the Unix socket on Linux/macOS, the named pipe on
/// Windows).
///
/// # Example
///
/// ```toml
/// [docker]
/// docker_host = "tcp://127.0.0.1:2375"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    /// Overrides the daemon address. Supports `${VAR}` and `${VAR:-default}`
    /// environment expansion, same as every other string field in this file.
    pub docker_host: Option<String>,
}

/// Defaults applied when a create-sandbox request doesn't specify them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Image used when a create request omits one.
    ///
    /// Default: `shellm-sandbox:latest`.
    #[serde(default = "default_image")]
    pub default_image: String,

    /// How long, in seconds, a command waits for its completion marker
    /// before the session gives up and reports
    /// [`EngineError::CommandTimeout`](crate::error::EngineError::CommandTimeout).
    ///
    /// Accepts 10-20; default 20.
    #[serde(default = "default_marker_timeout_secs")]
    pub marker_timeout_secs: u64,

    /// How long, in fractional seconds, the stream reader waits for more
    /// bytes before deciding the container has gone quiet. Used to end a
    /// drain when no marker is expected (setup commands, stream cleanup).
    ///
    /// Default: 0.5.
    #[serde(default = "default_drain_inactivity_secs")]
    pub drain_inactivity_secs: f64,

    /// Per-frame read timeout, in seconds, for the out-of-band execs used
    /// to recover command results and clean up temp files.
    ///
    /// Default: 10.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            default_image: default_image(),
            marker_timeout_secs: default_marker_timeout_secs(),
            drain_inactivity_secs: default_drain_inactivity_secs(),
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }
}

fn default_image() -> String {
    "shellm-sandbox:latest".to_string()
}

fn default_marker_timeout_secs() -> u64 {
    20
}

fn default_drain_inactivity_secs() -> f64 {
    0.5
}

fn default_exec_timeout_secs() -> u64 {
    10
}
