//! The container runtime contract.
//!
//! [`ContainerRuntime`] is the capability the engine requires of whatever is
//! running containers underneath it: create/start/remove by id, a duplex
//! attach stream for the persistent shell, and one-shot execs with
//! demultiplexed output and an inspectable exit code. [`docker::DockerRuntime`]
//! is the only production implementation (backed by `bollard`), but the trait
//! exists so the shell-session framing protocol in [`crate::session`] can be
//! unit-tested against an in-memory fake without a Docker daemon.

pub mod docker;
#[cfg(test)]
pub mod fake;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncWrite;

use crate::error::Result;

/// A chunk of output from the container, tagged by which stream it came
/// from. The shell session only cares about raw bytes (everything is
/// multiplexed onto one accumulated buffer for marker scanning), but
/// standalone execs need stdout and stderr kept apart.
#[derive(Debug, Clone)]
pub enum OutputChunk {
    Stdout(Bytes),
    Stderr(Bytes),
}

impl OutputChunk {
    /// The raw bytes, regardless of which stream they came from. The shell
    /// session only ever uses this for marker scanning and drain timing,
    /// where the two streams are already multiplexed onto one channel.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            OutputChunk::Stdout(b) | OutputChunk::Stderr(b) => b,
        }
    }
}

/// The writable half of an attached container stream.
pub type AttachWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// A stream of output chunks from an attached container stream.
pub type AttachStream = Pin<Box<dyn Stream<Item = Result<OutputChunk>> + Send>>;

/// The result of one standalone (out-of-band) exec.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i64,
}

/// Everything the engine needs from a container runtime.
///
/// Implementations are expected to be cheaply cloneable handles (an `Arc`
/// around a client, or similar) since every sandbox holds one.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates (but does not start) a container from `image` running an
    /// interactive shell as its primary process, with a TTY and stdin open.
    async fn create_container(&self, image: &str) -> Result<String>;

    /// Starts a previously created container.
    async fn start_container(&self, container_id: &str) -> Result<()>;

    /// Force-removes a container, regardless of its running state.
    async fn remove_container(&self, container_id: &str) -> Result<()>;

    /// Attaches to the container's primary process, returning a duplex
    /// stream: writes go to the shell's stdin, reads yield whatever the
    /// shell writes to stdout/stderr (both streams are multiplexed here;
    /// the caller only uses this for marker synchronization).
    async fn attach(&self, container_id: &str) -> Result<(AttachWriter, AttachStream)>;

    /// Runs a one-shot command inside the container, outside of any
    /// attached session, collecting its demultiplexed output and exit code.
    ///
    /// `read_timeout` bounds each individual read of the exec's output
    /// stream, not the call as a whole — a command that keeps producing
    /// output is never killed just for running long, only one that goes
    /// silent for longer than `read_timeout`.
    async fn exec(
        &self,
        container_id: &str,
        cmd: Vec<String>,
        read_timeout: Duration,
    ) -> Result<ExecOutput>;
}

/// A type-erased, shareable container runtime handle.
pub type DynRuntime = std::sync::Arc<dyn ContainerRuntime>;
