use std::{
    ffi::OsStr,
    io::Read,
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

use anyhow::Context as _;

use crate::foundation::error::{FilmgrainError, FilmgrainResult};

const POLL_START: Duration = Duration::from_millis(5);
const POLL_MAX: Duration = Duration::from_millis(100);
/// How long to keep collecting output after a timed-out child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Exit status and fully captured output of one child process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8.
    pub stderr: String,
}

impl ProcessOutput {
    /// Exit code zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external program once and classifies the outcome. No retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Invoker that waits for the child indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child and fail with [`FilmgrainError::Timeout`] once `timeout` elapses.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured wait bound.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` with `args` and require exit code zero.
    ///
    /// A nonzero exit becomes [`FilmgrainError::ToolExecution`] carrying both streams verbatim.
    pub fn run<I, S>(&self, program: impl AsRef<OsStr>, args: I) -> FilmgrainResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let output = self.capture(program, args)?;
        if output.success() {
            return Ok(output);
        }

        tracing::warn!(
            program = %program.to_string_lossy(),
            exit_code = ?output.exit_code,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "external tool failed"
        );
        Err(FilmgrainError::ToolExecution {
            program: program.to_string_lossy().into_owned(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run `program` with `args` and return whatever it produced, whatever its exit code.
    pub fn capture<I, S>(
        &self,
        program: impl AsRef<OsStr>,
        args: I,
    ) -> FilmgrainResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let name = program.to_string_lossy().into_owned();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.timeout.is_some() {
            own_process_group(&mut command);
        }

        let mut child = command
            .spawn()
            .map_err(|source| FilmgrainError::Launch {
                program: name.clone(),
                source,
            })?;
        tracing::debug!(program = %name, pid = child.id(), "spawned external tool");

        // Both pipes drain concurrently so a chatty child cannot block on a full pipe.
        let stdout_drain = drain(child.stdout.take());
        let stderr_drain = drain(child.stderr.take());

        let status = match self.timeout {
            None => Some(
                child
                    .wait()
                    .with_context(|| format!("wait for '{name}' to finish"))?,
            ),
            Some(limit) => wait_with_deadline(&mut child, limit, &name)?,
        };

        let Some(status) = status else {
            // Grandchildren outside our reach may still hold the pipes; never wait on them.
            let stderr = collect_drain(stderr_drain, Some(DRAIN_GRACE), &name, "stderr")
                .unwrap_or_default();
            tracing::warn!(program = %name, stderr = %stderr, "external tool timed out");
            return Err(FilmgrainError::Timeout {
                program: name,
                after: self.timeout.unwrap_or_default(),
            });
        };

        let stdout = collect_drain(stdout_drain, None, &name, "stdout")?;
        let stderr = collect_drain(stderr_drain, None, &name, "stderr")?;

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Return `true` when `program --help` can be run successfully.
pub fn tool_responds(program: impl AsRef<OsStr>) -> bool {
    Command::new(program)
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

type Drain = Option<Receiver<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let read = pipe.read_to_end(&mut bytes).map(|_| bytes);
            // The receiver is gone when the caller stopped waiting.
            let _ = tx.send(read);
        });
        rx
    })
}

/// Wait for a drain thread, at most `limit` when given.
fn collect_drain(
    drain: Drain,
    limit: Option<Duration>,
    program: &str,
    stream: &str,
) -> FilmgrainResult<String> {
    let Some(rx) = drain else {
        return Ok(String::new());
    };
    let received = match limit {
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        Some(limit) => rx.recv_timeout(limit),
    };
    let bytes = match received {
        Ok(read) => read.with_context(|| format!("read {program} {stream}"))?,
        Err(RecvTimeoutError::Timeout) => {
            tracing::debug!(program, stream, "stream still open after kill, abandoning it");
            return Ok(String::new());
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(anyhow::anyhow!("{program} {stream} drain thread panicked").into());
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Poll until the child exits or `limit` passes. `None` means it was killed.
fn wait_with_deadline(
    child: &mut Child,
    limit: Duration,
    program: &str,
) -> FilmgrainResult<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    let mut poll = POLL_START;
    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("poll '{program}'"))?
        {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            kill_tree(child);
            child
                .wait()
                .with_context(|| format!("reap '{program}' after kill"))?;
            return Ok(None);
        }

        std::thread::sleep(poll.min(deadline - now));
        poll = (poll * 2).min(POLL_MAX);
    }
}

/// A group of its own lets a timeout take down wrapper scripts and whatever they forked.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt as _;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill the child and, on unix, the process group it leads.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let killed = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(err) = killed {
            tracing::debug!(error = %err, "could not signal process group");
        }
    }
    // The child may exit between try_wait and kill; kill then reports an error we ignore.
    let _ = child.kill();
}

#[cfg(test)]
#[path = "../../tests/unit/process/invoker.rs"]
mod tests;
