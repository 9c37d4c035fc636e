//! Child process execution.

use std::io::{self, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::render::CommandLine;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for the output readers once a timed-out child is killed.
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

/// How a single invocation is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Pipe stdout/stderr back to the runner instead of inheriting them.
    pub capture: bool,
    /// Kill the child once this much wall time has passed.
    pub timeout: Option<Duration>,
}

/// Result of running one command to completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Exit code; `None` when the process never started or was killed by a
    /// signal.
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.status == Some(0) && !self.timed_out && self.launch_error.is_none()
    }

    /// Outcome for a process that could not be started.
    pub fn launch_failed(err: impl std::fmt::Display) -> Self {
        Self {
            launch_error: Some(err.to_string()),
            ..Self::default()
        }
    }

    /// One-line reason for a failure; `None` on success.
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(err) = &self.launch_error {
            return Some(format!("failed to launch: {err}"));
        }
        if self.timed_out {
            return Some(format!("timed out after {:.1}s", self.elapsed.as_secs_f64()));
        }
        match self.status {
            Some(0) => None,
            Some(code) => Some(format!("exit status {code}")),
            None => Some("terminated by signal".to_string()),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }
}

/// Seam between the sweep loop and the operating system.
pub trait Executor {
    fn execute(&mut self, command: &CommandLine, options: &ExecOptions) -> Outcome;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&mut self, command: &CommandLine, options: &ExecOptions) -> Outcome {
        execute(command, options)
    }
}

/// Run `command` to completion, blocking the caller.
///
/// Never panics and never returns an error: launch and wait failures are
/// reported through [`Outcome::launch_error`].
pub fn execute(command: &CommandLine, options: &ExecOptions) -> Outcome {
    let start = Instant::now();
    let mut outcome = match run_child(command, options) {
        Ok(outcome) => outcome,
        Err(err) => Outcome::launch_failed(err),
    };
    outcome.elapsed = start.elapsed();
    outcome
}

fn run_child(command: &CommandLine, options: &ExecOptions) -> io::Result<Outcome> {
    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null());
    if options.capture {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }
    // With a timeout the child leads its own process group, so the kill also
    // reaches whatever it started (genai-perf runs perf_analyzer). Without one
    // it stays in ours and still gets the terminal's Ctrl-C.
    #[cfg(unix)]
    if options.timeout.is_some() {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;
    log::debug!(target: "sweep::exec", "spawned pid {}", child.id());

    // Drain pipes on their own threads so a chatty child cannot block on a
    // full pipe while we wait for it.
    let stdout_rx = child.stdout.take().map(spawn_reader);
    let stderr_rx = child.stderr.take().map(spawn_reader);

    let (status, timed_out) = match wait_child(&mut child, options.timeout) {
        Ok(done) => done,
        Err(err) => {
            kill_tree(&mut child, options.timeout.is_some());
            let _ = child.wait();
            return Err(err);
        }
    };

    // A killed child may leave descendants holding the pipes; don't wait on
    // them forever.
    let drain = timed_out.then_some(DRAIN_AFTER_KILL);
    Ok(Outcome {
        status: status.code(),
        stdout: stdout_rx.map(|rx| collect_reader(rx, drain)).transpose()?,
        stderr: stderr_rx.map(|rx| collect_reader(rx, drain)).transpose()?,
        launch_error: None,
        timed_out,
        elapsed: Duration::ZERO,
    })
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if start.elapsed() >= timeout {
            log::warn!(
                target: "sweep::exec",
                "pid {} exceeded {:.1}s, killing",
                child.id(),
                timeout.as_secs_f64()
            );
            kill_tree(child, true);
            return Ok((child.wait()?, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child`, and its whole process group when it leads one.
fn kill_tree(child: &mut Child, own_group: bool) {
    #[cfg(unix)]
    if own_group {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group was created by
            // process_group(0) at spawn and the child is not yet reaped.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc == 0 {
                return;
            }
            log::debug!(
                target: "sweep::exec",
                "killpg({pgid}) failed: {}",
                io::Error::last_os_error()
            );
        }
    }
    #[cfg(not(unix))]
    let _ = own_group;
    let _ = child.kill();
}

type ReaderResult = (io::Result<usize>, Vec<u8>);

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> mpsc::Receiver<ReaderResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let res = stream.read_to_end(&mut buf);
        let _ = tx.send((res, buf));
    });
    rx
}

fn collect_reader(
    rx: mpsc::Receiver<ReaderResult>,
    deadline: Option<Duration>,
) -> io::Result<String> {
    let received = match deadline {
        None => rx.recv().map_err(|_| reader_vanished()),
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(received) => Ok(received),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    target: "sweep::exec",
                    "output still held open {:.1}s after kill, dropping it",
                    limit.as_secs_f64()
                );
                return Ok(String::new());
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(reader_vanished()),
        },
    };
    let (res, buf) = received?;
    res?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn reader_vanished() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "output reader vanished")
}
