//! The persistent-shell execution protocol.
//!
//! [`ShellSession`] owns one attached container stream and multiplexes an
//! arbitrary sequence of shell commands over it, recovering each command's
//! stdout, stderr, and exit code despite the stream being an interleaved,
//! unframed byte pipe. It does this by redirecting each command's output
//! into files inside the container, printing a unique marker on the stream
//! once the command group finishes, and reading the files back through
//! out-of-band execs — the stream itself is only ever used to synchronize.
//!
//! Callers never touch `exec_session`/`exec_standalone` concurrently: the
//! [`crate::manager::SandboxManager`] serializes all operations on a given
//! sandbox behind one lock, so this type does no internal locking of its
//! own.

mod frame;
mod io;

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::error::{EngineError, Result};
use crate::runtime::{AttachStream, AttachWriter, DynRuntime};
use frame::CommandRecord;

/// Read timeout for the one-shot setup exec, run before `exec_timeout` is
/// known (the session doesn't exist yet). Setup commands may legitimately
/// take longer than a single command's budget (package installs, builds),
/// so this is generous rather than tied to the per-sandbox config.
const SETUP_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// One attached, persistent shell inside one container.
pub struct ShellSession {
    runtime: DynRuntime,
    container_id: String,
    writer: AttachWriter,
    stream: AttachStream,
    counter: u64,
    marker_timeout: Duration,
    drain_inactivity: Duration,
    exec_timeout: Duration,
}

impl ShellSession {
    /// Creates the container, runs setup commands (if any) as a single
    /// out-of-band exec, attaches to the shell, and disables TTY echo.
    ///
    /// The container is removed (best-effort) if anything after creation
    /// fails, so a failed `start` never leaks a container behind it.
    pub async fn start(
        runtime: DynRuntime,
        image: &str,
        setup_commands: &[String],
        config: &SandboxConfig,
    ) -> Result<Self> {
        let container_id = runtime.create_container(image).await?;

        match Self::finish_start(&runtime, &container_id, setup_commands, config).await {
            Ok((writer, stream, drain_inactivity)) => Ok(Self {
                runtime,
                container_id,
                writer,
                stream,
                counter: 0,
                marker_timeout: Duration::from_secs(config.marker_timeout_secs),
                drain_inactivity,
                exec_timeout: Duration::from_secs(config.exec_timeout_secs),
            }),
            Err(e) => {
                if let Err(remove_err) = runtime.remove_container(&container_id).await {
                    warn!(
                        container_id = %container_id,
                        error = %remove_err,
                        "failed to remove container after start failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Everything after `create_container`: starting, setup, attach, and
    /// echo suppression. Split out so [`start`] has one place to remove the
    /// container on any failure here.
    async fn finish_start(
        runtime: &DynRuntime,
        container_id: &str,
        setup_commands: &[String],
        config: &SandboxConfig,
    ) -> Result<(AttachWriter, AttachStream, Duration)> {
        runtime.start_container(container_id).await?;

        if !setup_commands.is_empty() {
            let argv = frame::compose_setup_exec(setup_commands);
            let output = runtime
                .exec(container_id, argv, SETUP_READ_TIMEOUT)
                .await?;
            if output.exit_code != 0 {
                return Err(EngineError::SetupError {
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
        }

        let (mut writer, mut stream) = runtime.attach(container_id).await?;

        let drain_inactivity = Duration::from_secs_f64(config.drain_inactivity_secs);
        writer.write_all(b"stty -echo\n").await?;
        writer.flush().await?;
        io::drain_stream(&mut stream, drain_inactivity).await?;

        Ok((writer, stream, drain_inactivity))
    }

    /// Runs `cmd` against the persistent shell, preserving working
    /// directory, exported variables, and background jobs across calls.
    ///
    /// A command whose stripped text begins with `#` is a no-op: it
    /// returns `("", "", 0)` without ever reaching the container.
    pub async fn exec_session(&mut self, cmd: &str) -> Result<(String, String, i64)> {
        self.counter += 1;
        if cmd.trim_start().starts_with('#') {
            return Ok((String::new(), String::new(), 0));
        }

        let record = CommandRecord::new(self.counter);
        let frame_line = record.compose_frame_line(cmd);

        self.writer.write_all(frame_line.as_bytes()).await?;
        self.writer.flush().await?;

        io::read_until_marker(&mut self.stream, &record.marker, self.marker_timeout).await?;

        let stdout = self.cat_result_file(&record.stdout_file).await?;
        let stderr = self.cat_result_file(&record.stderr_file).await?;
        let exitcode_text = self.cat_result_file(&record.exitcode_file).await?;
        let exit_code = exitcode_text.trim().parse::<i64>().unwrap_or(-1);

        self.spawn_cleanup(&record);
        io::drain_stream(&mut self.stream, self.drain_inactivity).await?;

        Ok((stdout, stderr, exit_code))
    }

    /// Runs `cmd` as a fresh one-shot exec in the container, outside the
    /// session. Shares no state (working directory, exports) with
    /// `exec_session`. The timeout is per-read, not over the call as a
    /// whole: a command that keeps producing output runs as long as it
    /// needs to, and only goes silent for `exec_timeout` before it's killed.
    pub async fn exec_standalone(&self, cmd: &str) -> Result<(String, String, i64)> {
        let argv = vec!["/bin/bash".to_string(), "-c".to_string(), cmd.to_string()];
        let output = self
            .runtime
            .exec(&self.container_id, argv, self.exec_timeout)
            .await?;

        Ok((
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            output.exit_code,
        ))
    }

    /// Best-effort teardown: let the shell exit on its own, then force-
    /// remove the container regardless of whether it did. Every step is
    /// independent; a failure in one does not skip the others.
    pub async fn stop(&mut self) -> Result<()> {
        if self.writer.write_all(b"exit\n").await.is_ok() {
            let _ = self.writer.flush().await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.runtime.remove_container(&self.container_id).await
    }

    async fn cat_result_file(&self, path: &str) -> Result<String> {
        let output = self
            .runtime
            .exec(
                &self.container_id,
                vec!["cat".to_string(), path.to_string()],
                self.exec_timeout,
            )
            .await?;
        if output.exit_code != 0 {
            return Err(EngineError::ResultRecoveryError(format!(
                "reading {path} exited {}",
                output.exit_code
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Fires the `rm` of this command's result files without waiting for it:
    /// best-effort, detached, result ignored. A leaked temp file is visible
    /// only as `/tmp` growth, never as a correctness issue, so there's no
    /// reason for a command's caller to pay for this exec's round trip.
    fn spawn_cleanup(&self, record: &CommandRecord) {
        let mut argv = vec!["rm".to_string(), "-f".to_string()];
        argv.extend(record.result_files().iter().map(|f| f.to_string()));
        let runtime = self.runtime.clone();
        let container_id = self.container_id.clone();
        let exec_timeout = self.exec_timeout;
        tokio::spawn(async move {
            if let Err(e) = runtime.exec(&container_id, argv, exec_timeout).await {
                debug!(sandbox_id = %container_id, error = %e, "cleanup exec failed, leaving temp files behind");
            }
        });
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        warn!(
            container_id = %self.container_id,
            "shell session dropped without an explicit stop(); container may still be running"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;
    use std::sync::Arc;

    async fn start_session(runtime: DynRuntime) -> Result<ShellSession> {
        ShellSession::start(runtime, "irrelevant", &[], &SandboxConfig::default()).await
    }

    #[tokio::test]
    async fn comment_only_command_still_advances_the_counter() {
        let runtime: DynRuntime = Arc::new(FakeRuntime::new());
        let mut session = start_session(runtime).await.unwrap();

        session.exec_session("# just a comment").await.unwrap();
        assert_eq!(session.counter, 1);

        session.exec_session("echo hi").await.unwrap();
        assert_eq!(session.counter, 2);
    }

    #[tokio::test]
    async fn failed_setup_does_not_leak_the_container() {
        let fake = Arc::new(FakeRuntime::new());
        let runtime: DynRuntime = fake.clone();
        let setup_commands = vec!["false".to_string()];

        let result = ShellSession::start(
            runtime,
            "irrelevant",
            &setup_commands,
            &SandboxConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(EngineError::SetupError { .. })));
        assert_eq!(fake.container_count().await, 0);
    }
}
