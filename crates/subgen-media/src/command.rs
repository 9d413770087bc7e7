//! External tool command builders and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ToolError;

/// Number of stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// How long to keep draining stderr after the tool itself has exited.
/// A backgrounded grandchild can hold the pipe open indefinitely.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a command for a program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().to_string_lossy())
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments after -i
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Allow experimental encoders (older FFmpeg builds gate `aac` behind this).
    pub fn strict_experimental(self) -> Self {
        self.output_arg("-strict").output_arg("experimental")
    }

    /// Build the argument list.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push("-y".to_string());
        args.push("-v".to_string());
        args.push("error".to_string());

        // Machine-readable progress on stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Turn the builder into a runnable command for the given binary.
    pub fn into_tool_command(self, program: impl Into<String>) -> ToolCommand {
        let args = self.build_args();
        ToolCommand::new(program).args(args)
    }
}

/// Result of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    /// Last lines written to stderr
    pub stderr_tail: String,
    pub elapsed: Duration,
}

/// Runs tool commands with an optional deadline and cancellation signal.
///
/// The owning task is suspended until the child exits. On deadline or
/// cancellation the child is killed and the run fails.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cancellation signal. The run is aborted once the value becomes `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set a deadline. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput, ToolError> {
        self.run_with_stderr(cmd, |_| {}).await
    }

    /// Run a command, handing every stderr line to `on_line`.
    pub async fn run_with_stderr<F>(
        &self,
        cmd: &ToolCommand,
        mut on_line: F,
    ) -> Result<ToolOutput, ToolError>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let program = cmd.program().to_string();
        let resolved = check_tool(&program)?;

        debug!("Running {} {}", program, cmd.get_args().join(" "));
        let start = Instant::now();

        let mut child = Command::new(&resolved)
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            ToolError::Io(std::io::Error::other("stderr not captured"))
        })?;

        let mut stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                on_line(&line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let status = match self.wait_for_completion(&mut child, &program).await {
            Ok(status) => status,
            Err(e) => {
                stderr_task.abort();
                return Err(e);
            }
        };

        let stderr_tail =
            match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut stderr_task).await {
                Ok(joined) => joined.unwrap_or_default(),
                Err(_) => {
                    warn!(program = %program, "stderr still open after exit, detaching");
                    stderr_task.abort();
                    String::new()
                }
            };
        let elapsed = start.elapsed();

        if status.success() {
            debug!(
                program = %program,
                duration_ms = elapsed.as_millis() as u64,
                "External tool finished"
            );
            Ok(ToolOutput {
                exit_code: status.code(),
                stderr_tail,
                elapsed,
            })
        } else {
            warn!(
                program = %program,
                exit_code = ?status.code(),
                "External tool exited with non-zero status"
            );
            Err(ToolError::Exited {
                program,
                exit_code: status.code(),
                stderr: stderr_tail,
            })
        }
    }

    /// Wait for the child, racing the deadline and the cancellation signal.
    async fn wait_for_completion(
        &self,
        child: &mut Child,
        program: &str,
    ) -> Result<ExitStatus, ToolError> {
        let mut cancel_rx = self.cancel_rx.clone();
        let timeout = self.timeout;

        let cancelled = async {
            match cancel_rx.as_mut() {
                Some(rx) => {
                    // A dropped sender can never cancel.
                    if rx.wait_for(|cancel| *cancel).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = deadline => WaitOutcome::TimedOut(timeout.unwrap_or_default()),
            _ = cancelled => WaitOutcome::Cancelled,
        };

        match outcome {
            WaitOutcome::Exited(status) => Ok(status?),
            WaitOutcome::TimedOut(limit) => {
                warn!(
                    "{} timed out after {} seconds, killing process",
                    program,
                    limit.as_secs()
                );
                let _ = child.kill().await;
                Err(ToolError::Timeout {
                    program: program.to_string(),
                    timeout: limit,
                })
            }
            WaitOutcome::Cancelled => {
                info!("{} cancelled, killing process", program);
                let _ = child.kill().await;
                Err(ToolError::Cancelled {
                    program: program.to_string(),
                })
            }
        }
    }
}

/// Resolve a tool by name or path.
pub fn check_tool(program: &str) -> Result<PathBuf, ToolError> {
    which::which(program).map_err(|_| ToolError::NotFound {
        program: program.to_string(),
    })
}
