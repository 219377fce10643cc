//! Docker-backed [`ContainerRuntime`].

use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    AttachContainerOptions, Config as ContainerConfig, CreateContainerOptions, LogOutput,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::StreamExt;

use super::{AttachStream, AttachWriter, ContainerRuntime, ExecOutput, OutputChunk};
use crate::config::DockerConfig;
use crate::error::{EngineError, Result};

/// Talks to a Docker daemon via `bollard`.
///
/// One `DockerRuntime` is shared (via `Arc`) across every sandbox; `bollard`'s
/// `Docker` handle is itself a cheap, cloneable client over a connection
/// pool, so this holds no per-sandbox state.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the configured Docker daemon: a TCP/HTTP host if one is
    /// set, otherwise the platform's local defaults (`/var/run/docker.sock`
    /// on Linux, the named pipe on Windows).
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = if let Some(host) = &config.docker_host {
            Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| EngineError::RuntimeError(e.to_string()))?
        } else {
            Docker::connect_with_local_defaults()
                .map_err(|e| EngineError::RuntimeError(e.to_string()))?
        };
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_container(&self, image: &str) -> Result<String> {
        let config = ContainerConfig {
            image: Some(image.to_string()),
            cmd: Some(vec!["/bin/bash".to_string()]),
            tty: Some(true),
            open_stdin: Some(true),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        Ok(response.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        self.docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;
        Ok(())
    }

    async fn attach(&self, container_id: &str) -> Result<(AttachWriter, AttachStream)> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(false),
            detach_keys: None,
        };

        let attached = self
            .docker
            .attach_container(container_id, Some(options))
            .await
            .map_err(|e| EngineError::AttachError(e.to_string()))?;

        let stream = attached.output.map(|item| {
            item.map(|chunk| match chunk {
                LogOutput::StdOut { message } => OutputChunk::Stdout(message),
                LogOutput::StdErr { message } => OutputChunk::Stderr(message),
                LogOutput::StdIn { message } | LogOutput::Console { message } => {
                    OutputChunk::Stdout(message)
                }
            })
            .map_err(|e| EngineError::RuntimeError(format!("session stream error: {e}")))
        });

        Ok((attached.input, Box::pin(stream)))
    }

    async fn exec(
        &self,
        container_id: &str,
        cmd: Vec<String>,
        read_timeout: Duration,
    ) -> Result<ExecOutput> {
        let exec_options = CreateExecOptions {
            cmd: Some(cmd),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            attach_stdin: Some(false),
            tty: Some(false),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container_id, exec_options)
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        let start_res = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();

        if let StartExecResults::Attached { mut output, .. } = start_res {
            loop {
                match tokio::time::timeout(read_timeout, output.next()).await {
                    Ok(Some(msg)) => match msg.map_err(|e| EngineError::RuntimeError(e.to_string()))? {
                        LogOutput::StdOut { message } => stdout.extend_from_slice(&message),
                        LogOutput::StdErr { message } => stderr.extend_from_slice(&message),
                        _ => {}
                    },
                    Ok(None) => break,
                    Err(_) => return Err(EngineError::CommandTimeout),
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| EngineError::RuntimeError(e.to_string()))?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspect.exit_code.unwrap_or(-1),
        })
    }
}
