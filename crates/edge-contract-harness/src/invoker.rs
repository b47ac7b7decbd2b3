// crates/edge-contract-harness/src/invoker.rs
// ============================================================================
// Module: CLI Invoker
// Description: Runs external tools and captures their output.
// Purpose: Uniform process execution with redacted, structured logging.
// Dependencies: std::process, serde_json
// ============================================================================

//! ## Overview
//! [`Invoker`] executes a [`CommandSpec`] and returns a [`CommandOutput`].
//! [`Invoker::run`] turns a non-zero exit into [`ToolFailure`];
//! [`Invoker::run_unchecked`] hands back the output of a failing tool for
//! callers that assert on error text. Every call is logged with a redacted
//! command line, the working directory, exit code, and duration.
//!
//! Invariants:
//! - A missing working directory is reported before anything is spawned.
//! - Values of sensitive variables never appear in logged command lines.
//! - A timed-out child is killed; whatever it wrote before the deadline is
//!   attached to [`HarnessError::Timeout`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io;
use std::io::Read;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crate::error::HarnessError;
use crate::error::InvocationError;
use crate::error::ToolFailure;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Variable-name fragments whose values are redacted in logs.
const SENSITIVE_MARKERS: [&str; 4] = ["token", "key", "secret", "password"];

/// Flag prefixes that carry `name=value` pairs.
const PAIR_FLAG_PREFIXES: [&str; 2] = ["-var=", "-backend-config="];

/// Replacement text for redacted values.
const REDACTED: &str = "<redacted>";

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// How long a killed child's pipes may take to close before their output
/// is taken as-is.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Read chunk size for output pipes.
const READ_CHUNK: usize = 8192;

// ============================================================================
// SECTION: Command Spec
// ============================================================================

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Environment overrides layered on the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Optional wall-clock limit.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Starts a spec for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets a wall-clock limit.
    #[must_use]
    pub const fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Renders the command line with sensitive values redacted.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program)];
        parts.extend(self.args.iter().map(|arg| quote(&redact_arg(arg))));
        parts.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Stdout followed by stderr.
    pub combined: String,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Output captured from a command killed at its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialOutput {
    /// Stdout written before the kill.
    pub stdout: String,
    /// Stderr written before the kill.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

// ============================================================================
// SECTION: Invoker
// ============================================================================

/// Executes commands and records invocation events.
#[derive(Clone)]
pub struct Invoker {
    /// Event destination.
    sink: SharedSink,
}

impl Invoker {
    /// Creates an invoker that logs to `sink`.
    #[must_use]
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
        }
    }

    /// Returns the event sink.
    #[must_use]
    pub const fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Runs a command and requires a zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Invocation`] when the tool cannot start,
    /// [`HarnessError::Timeout`] when the limit elapses, and
    /// [`HarnessError::ToolFailure`] on a non-zero exit.
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, HarnessError> {
        let output = self.run_unchecked(spec)?;
        if output.success() {
            return Ok(output);
        }
        let command = spec.display();
        self.sink.record(
            &HarnessEvent::new("command_failure", "invoker", EventOutcome::Failed)
                .with("command", command.clone())
                .with("status", output.status)
                .with("output", output.combined.clone()),
        );
        Err(ToolFailure {
            command,
            status: output.status,
            output: output.combined,
        }
        .into())
    }

    /// Runs a command and returns its output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Invocation`] when the tool cannot start and
    /// [`HarnessError::Timeout`] when the limit elapses.
    pub fn run_unchecked(&self, spec: &CommandSpec) -> Result<CommandOutput, HarnessError> {
        let command = spec.display();
        let cwd = spec.cwd.as_ref().map(|dir| dir.display().to_string());
        match execute(spec) {
            Ok(output) => {
                let outcome =
                    if output.success() { EventOutcome::Ok } else { EventOutcome::Failed };
                self.sink.record(
                    &HarnessEvent::new("command", "invoker", outcome)
                        .with("command", command)
                        .with("cwd", cwd)
                        .with("status", output.status)
                        .with("duration_ms", duration_ms(output.duration)),
                );
                Ok(output)
            }
            Err(err) => {
                self.sink.record(
                    &HarnessEvent::new("command", "invoker", EventOutcome::Failed)
                        .with("command", command)
                        .with("cwd", cwd)
                        .with("error", err.to_string()),
                );
                Err(err)
            }
        }
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Spawns the command, drains its pipes, and waits for exit.
fn execute(spec: &CommandSpec) -> Result<CommandOutput, HarnessError> {
    if let Some(dir) = &spec.cwd
        && !dir.is_dir()
    {
        return Err(InvocationError::MissingWorkingDir {
            path: dir.clone(),
        }
        .into());
    }
    let mut command = Command::new(&spec.program);
    command.args(&spec.args).envs(&spec.env);
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        command.current_dir(dir);
    }
    let started = Instant::now();
    let mut child = command.spawn().map_err(|err| spawn_error(&spec.program, &err))?;
    let stdout = child.stdout.take().map(PipeReader::spawn);
    let stderr = child.stderr.take().map(PipeReader::spawn);
    let status = match wait_child(&mut child, spec, started) {
        Ok(status) => status,
        Err(HarnessError::Timeout {
            what,
            waited,
            ..
        }) => {
            return Err(HarnessError::Timeout {
                what,
                waited,
                partial: Some(PartialOutput {
                    stdout: PipeReader::drain_killed(stdout),
                    stderr: PipeReader::drain_killed(stderr),
                }),
            });
        }
        Err(err) => return Err(err),
    };
    let stdout = PipeReader::join(stdout)?;
    let stderr = PipeReader::join(stderr)?;
    let mut combined = stdout.clone();
    combined.push_str(&stderr);
    Ok(CommandOutput {
        status: status.code(),
        stdout,
        stderr,
        combined,
        duration: started.elapsed(),
    })
}

/// Waits for the child, killing it when the command's time limit elapses.
fn wait_child(
    child: &mut Child,
    spec: &CommandSpec,
    started: Instant,
) -> Result<ExitStatus, HarnessError> {
    let Some(limit) = spec.timeout else {
        return Ok(child.wait()?);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(HarnessError::Timeout {
                what: spec.display(),
                waited: started.elapsed(),
                partial: None,
            });
        }
        thread::sleep(WAIT_POLL);
    }
}

// ============================================================================
// SECTION: Output Pipes
// ============================================================================

/// A pipe drained on a background thread into a shared buffer.
struct PipeReader {
    /// Bytes read so far.
    buffer: Arc<Mutex<Vec<u8>>>,
    /// Reader thread.
    handle: JoinHandle<io::Result<()>>,
}

impl PipeReader {
    /// Starts draining `pipe`.
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            let mut chunk = [0_u8; READ_CHUNK];
            loop {
                let read = match pipe.read(&mut chunk) {
                    Ok(read) => read,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                };
                if read == 0 {
                    return Ok(());
                }
                if let Ok(mut guard) = shared.lock() {
                    guard.extend_from_slice(&chunk[..read]);
                }
            }
        });
        Self {
            buffer,
            handle,
        }
    }

    /// Waits for end of stream and returns everything read.
    fn join(reader: Option<Self>) -> Result<String, HarnessError> {
        let Some(Self {
            buffer,
            handle,
        }) = reader
        else {
            return Ok(String::new());
        };
        handle.join().map_err(|_| io::Error::other("output reader panicked"))??;
        Ok(lossy(&buffer))
    }

    /// Joins the reader of a killed child, waiting at most [`DRAIN_GRACE`]
    /// for the pipe to close. A grandchild that inherited the pipe can keep
    /// it open; its reader is then left detached.
    fn drain_killed(reader: Option<Self>) -> String {
        let Some(Self {
            buffer,
            handle,
        }) = reader
        else {
            return String::new();
        };
        let deadline = Instant::now() + DRAIN_GRACE;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(WAIT_POLL);
        }
        if handle.is_finished() {
            let _ = handle.join();
        }
        lossy(&buffer)
    }
}

/// Returns the buffered bytes as lossy UTF-8.
fn lossy(buffer: &Mutex<Vec<u8>>) -> String {
    buffer.lock().map(|guard| String::from_utf8_lossy(&guard).into_owned()).unwrap_or_default()
}

/// Classifies a spawn failure.
fn spawn_error(program: &str, err: &io::Error) -> HarnessError {
    let program = program.to_string();
    match err.kind() {
        io::ErrorKind::NotFound => InvocationError::NotFound {
            program,
        },
        io::ErrorKind::PermissionDenied => InvocationError::PermissionDenied {
            program,
        },
        _ => InvocationError::Spawn {
            program,
            message: err.to_string(),
        },
    }
    .into()
}

/// Converts a duration to whole milliseconds for events.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Redacts the value of a `name=value` argument with a sensitive name.
#[must_use]
pub fn redact_arg(arg: &str) -> String {
    let (prefix, rest) = PAIR_FLAG_PREFIXES
        .iter()
        .find_map(|prefix| arg.strip_prefix(prefix).map(|rest| (*prefix, rest)))
        .unwrap_or(("", arg));
    let Some((name, _)) = rest.split_once('=') else {
        return arg.to_string();
    };
    if is_sensitive_name(name) { format!("{prefix}{name}={REDACTED}") } else { arg.to_string() }
}

/// Returns true when a variable name suggests a secret.
#[must_use]
pub fn is_sensitive_name(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Quotes an argument containing whitespace for display.
fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("'{arg}'")
    } else {
        arg.to_string()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
