//! An in-process [`ContainerRuntime`] backed by local `/bin/sh` processes.
//!
//! Used only by tests. Rather than stub out canned responses, this spawns a
//! real persistent shell per "container" (`tokio::process`) and reads/writes
//! its stdio exactly as the Docker runtime reads/writes an attached stream.
//! That means the framing protocol in [`crate::session`] gets exercised
//! against a real shell without requiring a Docker daemon in CI.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};

use super::{AttachStream, AttachWriter, ContainerRuntime, ExecOutput, OutputChunk};
use crate::error::{EngineError, Result};

struct FakeContainer {
    child: Child,
}

/// Test double for [`ContainerRuntime`]. Each "container id" is a UUID
/// mapping to a live `/bin/sh` child process.
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, Arc<Mutex<FakeContainer>>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
        }
    }

    /// Number of containers currently tracked (created and not yet
    /// removed). Exposed for tests asserting nothing leaks past a failed
    /// `ShellSession::start`.
    pub async fn container_count(&self) -> usize {
        self.containers.lock().await.len()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_container(&self, _image: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let child = Command::new("/bin/sh")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        self.containers
            .lock()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(FakeContainer { child })));
        Ok(id)
    }

    async fn start_container(&self, _container_id: &str) -> Result<()> {
        // The fake spawns the shell already-running at create time.
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        if let Some(container) = self.containers.lock().await.remove(container_id) {
            let mut guard = container.lock().await;
            let _ = guard.child.start_kill();
            let _ = guard.child.wait().await;
        }
        Ok(())
    }

    async fn attach(&self, container_id: &str) -> Result<(AttachWriter, AttachStream)> {
        let container = self
            .containers
            .lock()
            .await
            .get(container_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSandbox(container_id.to_string()))?;

        let mut guard = container.lock().await;
        let stdin = guard
            .child
            .stdin
            .take()
            .ok_or_else(|| EngineError::AttachError("stdin already taken".into()))?;
        let mut stdout = guard
            .child
            .stdout
            .take()
            .ok_or_else(|| EngineError::AttachError("stdout already taken".into()))?;
        let mut stderr = guard
            .child
            .stderr
            .take()
            .ok_or_else(|| EngineError::AttachError("stderr already taken".into()))?;
        drop(guard);

        let (tx, rx) = mpsc::unbounded_channel::<Result<OutputChunk>>();

        let tx_out = tx.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx_out
                            .send(Ok(OutputChunk::Stdout(Bytes::copy_from_slice(&buf[..n]))))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx
                            .send(Ok(OutputChunk::Stderr(Bytes::copy_from_slice(&buf[..n]))))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let stream: AttachStream = Box::pin(UnboundedReceiverStream(rx));
        Ok((Box::pin(stdin), stream))
    }

    async fn exec(
        &self,
        _container_id: &str,
        cmd: Vec<String>,
        read_timeout: Duration,
    ) -> Result<ExecOutput> {
        let mut child = Command::new(&cmd[0])
            .args(&cmd[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut out_buf = [0u8; 4096];
        let mut err_buf = [0u8; 4096];

        while !stdout_done || !stderr_done {
            tokio::select! {
                res = stdout_pipe.read(&mut out_buf), if !stdout_done => {
                    match res.map_err(|e| EngineError::RuntimeError(e.to_string()))? {
                        0 => stdout_done = true,
                        n => stdout.extend_from_slice(&out_buf[..n]),
                    }
                }
                res = stderr_pipe.read(&mut err_buf), if !stderr_done => {
                    match res.map_err(|e| EngineError::RuntimeError(e.to_string()))? {
                        0 => stderr_done = true,
                        n => stderr.extend_from_slice(&err_buf[..n]),
                    }
                }
                _ = tokio::time::sleep(read_timeout) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(EngineError::CommandTimeout);
                }
            }
        }

        let status = tokio::time::timeout(read_timeout, child.wait())
            .await
            .map_err(|_| EngineError::CommandTimeout)?
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1) as i64,
        })
    }
}

/// Minimal adapter from an unbounded mpsc receiver to a `Stream`.
struct UnboundedReceiverStream<T>(mpsc::UnboundedReceiver<T>);

impl<T> Stream for UnboundedReceiverStream<T> {
    type Item = T;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.0.poll_recv(cx)
    }
}
