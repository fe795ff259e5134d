use crate::domain::CompatError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

pub const DEFAULT_SIMULATOR_TIMEOUT: Duration = Duration::from_secs(300);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one simulator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl SimulationOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn status_text(&self) -> String {
        self.exit_code.map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to execute '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("failed waiting for '{}': {source}", program.display())]
    Wait {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {stream} of '{}'", program.display())]
    Capture {
        program: PathBuf,
        stream: &'static str,
    },
    #[error("'{}' timed out after {}s", program.display(), timeout.as_secs_f64())]
    TimedOut { program: PathBuf, timeout: Duration },
}

impl From<RunnerError> for CompatError {
    fn from(error: RunnerError) -> Self {
        let message = error.to_string();
        match error {
            RunnerError::Spawn { .. } | RunnerError::Wait { .. } | RunnerError::Capture { .. } => {
                CompatError::io_system("IO.SIMULATOR_EXEC", message)
            }
            RunnerError::TimedOut { .. } => CompatError::io_system("IO.SIMULATOR_TIMEOUT", message),
        }
    }
}

/// Seam between the harness and the simulator so drivers can be exercised
/// without spawning processes.
pub trait SimulationRunner {
    fn run(&self, model_path: &Path) -> Result<SimulationOutput, RunnerError>;

    /// Rendered command, used in failure messages.
    fn describe(&self) -> String;
}

/// Runs `<program> <model-path>` and captures its output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Some(DEFAULT_SIMULATOR_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn wait(&self, child: &mut Child, started_at: Instant) -> Result<ExitStatus, RunnerError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| RunnerError::Wait {
                program: self.program.clone(),
                source,
            });
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(source) => {
                    terminate_and_reap(child);
                    return Err(RunnerError::Wait {
                        program: self.program.clone(),
                        source,
                    });
                }
            }

            if started_at.elapsed() >= timeout {
                terminate_and_reap(child);
                return Err(RunnerError::TimedOut {
                    program: self.program.clone(),
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Waits for one captured stream within whatever is left of the timeout.
    fn collect(
        &self,
        reader: Option<Receiver<Vec<u8>>>,
        stream: &'static str,
        started_at: Instant,
    ) -> Result<String, RunnerError> {
        let capture_error = || RunnerError::Capture {
            program: self.program.clone(),
            stream,
        };
        let reader = reader.ok_or_else(capture_error)?;

        let bytes = match self.timeout {
            None => reader.recv().map_err(|_| capture_error())?,
            Some(timeout) => {
                let remaining = timeout.saturating_sub(started_at.elapsed());
                match reader.recv_timeout(remaining.max(POLL_INTERVAL)) {
                    Ok(bytes) => bytes,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(RunnerError::TimedOut {
                            program: self.program.clone(),
                            timeout,
                        });
                    }
                    Err(RecvTimeoutError::Disconnected) => return Err(capture_error()),
                }
            }
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl SimulationRunner for ProcessRunner {
    fn run(&self, model_path: &Path) -> Result<SimulationOutput, RunnerError> {
        let mut child = Command::new(&self.program)
            .arg(model_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let started_at = Instant::now();

        // Both pipes are drained concurrently. Readers are never joined: a
        // process forked by the simulator may hold the pipes past the deadline.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = self.wait(&mut child, started_at)?;
        let stdout = self.collect(stdout_reader, "stdout", started_at)?;
        let stderr = self.collect(stderr_reader, "stderr", started_at)?;

        Ok(SimulationOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }

    fn describe(&self) -> String {
        self.program.display().to_string()
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = stream.read_to_end(&mut buffer);
        let _ = sender.send(buffer);
    });
    receiver
}

fn terminate_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
