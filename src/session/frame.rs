//! Command framing: turning a shell command into the line the session reads
//! back results from, and turning setup commands into the one-shot exec
//! that seeds a freshly created container.

/// Everything derived from a command's monotonic id: the three result
/// files and the completion marker. Ephemeral — built on entry to
/// [`super::ShellSession::exec_session`] and discarded on return.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub id: u64,
    pub stdout_file: String,
    pub stderr_file: String,
    pub exitcode_file: String,
    pub marker: String,
}

impl CommandRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            stdout_file: format!("/tmp/stdout_{id}.txt"),
            stderr_file: format!("/tmp/stderr_{id}.txt"),
            exitcode_file: format!("/tmp/exitcode_{id}.txt"),
            marker: format!("COMMAND_DONE_{id}"),
        }
    }

    /// Wraps `cmd` in a command group that redirects its own stdout/stderr
    /// to this record's files, captures its exit code, and prints the
    /// completion marker. The braces keep `cmd`'s own redirections intact
    /// and let `cd`/exports in `cmd` affect the enclosing shell, which a
    /// subshell (`( … )`) would not.
    pub fn compose_frame_line(&self, cmd: &str) -> String {
        format!(
            "{{ {cmd} ; }} > {} 2> {}; echo $? > {}; echo '{}'\n",
            self.stdout_file, self.stderr_file, self.exitcode_file, self.marker
        )
    }

    /// The three on-container files this record owns, for cleanup.
    pub fn result_files(&self) -> [&str; 3] {
        [&self.stdout_file, &self.stderr_file, &self.exitcode_file]
    }
}

/// Builds the argv for the one-shot setup exec: `/bin/bash -c <joined>`,
/// with setup commands joined by ` && `. This argv goes straight to the
/// container runtime's exec-create call (no shell tokenizes it first), so
/// the joined text is passed through exactly as written — same as
/// [`super::ShellSession::exec_standalone`]'s own one-shot execs.
pub fn compose_setup_exec(setup_commands: &[String]) -> Vec<String> {
    let joined = setup_commands.join(" && ");
    vec!["/bin/bash".to_string(), "-c".to_string(), joined]
}
