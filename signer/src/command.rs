//! External command execution with a bounded runtime.
//!
//! The signer shells out to gpg; routing every invocation through
//! [`CommandExecutor`] keeps that seam mockable and puts the timeout policy in
//! one place.

use crate::error::{Result, SignerError};
use log::debug;
use std::io::{self, Read, Write};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs `program` with `args` and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`Output::status`].
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned, its output cannot
    /// be collected, or it exceeds the executor's timeout.
    fn run(&self, program: &str, args: &[String]) -> Result<Output>;

    /// Runs `program` with `args`, writing `input` to its stdin.
    ///
    /// Used to hand secrets to a tool without placing them in its argument
    /// vector.
    ///
    /// # Errors
    ///
    /// As for [`CommandExecutor::run`], and if `input` cannot be written.
    fn run_with_input(&self, program: &str, args: &[String], input: &[u8]) -> Result<Output>;
}

/// Executes commands on the host system, killing any that overrun.
///
/// Output is drained while the command runs, so a tool that writes more than
/// a pipe buffer does not stall until the timeout.
///
/// # Examples
///
/// ```no_run
/// use release_signer::command::{CommandExecutor, SystemCommandExecutor};
/// use std::time::Duration;
///
/// let executor = SystemCommandExecutor::new(Duration::from_secs(10));
/// let output = executor.run("gpg", &["--version".to_owned()])?;
/// assert!(output.status.success());
/// # Ok::<(), release_signer::error::SignerError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that bounds each invocation by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Return the per-invocation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn execute(&self, program: &str, args: &[String], input: Option<&[u8]>) -> Result<Output> {
        debug!("running {program} with {} argument(s)", args.len());

        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        if let (Some(bytes), Some(mut pipe)) = (input, child.stdin.take()) {
            // A tool that exits without reading its input closes the pipe.
            match pipe.write_all(bytes) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(err.into());
                }
            }
        }

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: collect(stdout)?,
                stderr: collect(stderr)?,
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(SignerError::CommandTimeout {
                    program: program.to_owned(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        self.execute(program, args, None)
    }

    fn run_with_input(&self, program: &str, args: &[String], input: &[u8]) -> Result<Output> {
        self.execute(program, args, Some(input))
    }
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer).map(|_| buffer)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = reader else {
        return Ok(Vec::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader panicked"))??;
    Ok(bytes)
}

/// Return trimmed stderr, or a placeholder when the tool printed nothing.
pub(crate) fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        match output.status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_owned(),
        }
    } else {
        trimmed.to_owned()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn system_executor_captures_output() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(5));
        let output = executor
            .run("sh", &["-c".to_owned(), "echo out; echo err >&2".to_owned()])
            .expect("sh should run");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[test]
    fn system_executor_drains_output_larger_than_a_pipe_buffer() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(10));
        let output = executor
            .run(
                "sh",
                &[
                    "-c".to_owned(),
                    "head -c 200000 /dev/zero; head -c 100000 /dev/zero >&2".to_owned(),
                ],
            )
            .expect("large output should not time out");
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 200_000);
        assert_eq!(output.stderr.len(), 100_000);
    }

    #[test]
    fn system_executor_pipes_input_to_stdin() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(5));
        let output = executor
            .run_with_input("sh", &["-c".to_owned(), "cat".to_owned()], b"s3cret")
            .expect("cat should run");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"s3cret");
    }

    #[test]
    fn unread_input_is_not_an_error() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(5));
        let output = executor
            .run_with_input("sh", &["-c".to_owned(), "exit 0".to_owned()], b"ignored")
            .expect("sh should run");
        assert!(output.status.success());
    }

    #[test]
    fn system_executor_reports_non_zero_exit_as_output() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(5));
        let output = executor
            .run("sh", &["-c".to_owned(), "exit 3".to_owned()])
            .expect("sh should run");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(stderr_message(&output), "exited with status 3");
    }

    #[test]
    fn system_executor_kills_overrunning_commands() {
        let executor = SystemCommandExecutor::new(Duration::from_millis(200));
        let err = executor
            .run("sleep", &["5".to_owned()])
            .expect_err("sleep should time out");
        assert!(
            matches!(&err, SignerError::CommandTimeout { program, .. } if program == "sleep"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(1));
        let err = executor
            .run("release-signer-no-such-program", &[])
            .expect_err("spawn should fail");
        assert!(matches!(err, SignerError::Io(_)));
    }
}
