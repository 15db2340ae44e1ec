//! Synchronous shell invocation for external tools (formatters, linters,
//! type-checkers, diff generators).
//!
//! Every check runs through [`run_shell`]: `sh -c <command>` in the repository
//! root, stdout and stderr captured on dedicated reader threads, and an
//! optional timeout enforced by a waiter thread. A timeout kills the child and
//! surfaces as [`HookError::ToolTimeout`]; callers treat it exactly like a
//! non-zero exit.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::{HookError, Result};

/// Output is capped to this many bytes, keeping the tail.
pub const MAX_OUTPUT: usize = 10 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, trimmed and capped to [`MAX_OUTPUT`].
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        let output = if stderr.is_empty() {
            stdout.to_string()
        } else if stdout.is_empty() {
            stderr.to_string()
        } else {
            format!("{stdout}\n{stderr}")
        };
        cap_tail(&output, MAX_OUTPUT).to_string()
    }

    pub fn describe_exit(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Run `command` through `sh -c` in `cwd`.
///
/// `None` timeout means wait indefinitely.
pub fn run_shell(
    command: &str,
    cwd: &Path,
    env: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<ShellOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|source| HookError::ToolSpawn {
        command: command.to_string(),
        source,
    })?;
    let child_pid = child.id();

    // Readers on their own threads so a chatty tool cannot fill the pipe
    // buffer and deadlock against our wait().
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || read_all(stdout_handle));
    let stderr_thread = std::thread::spawn(move || read_all(stderr_handle));

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });
            match rx.recv_timeout(limit) {
                Ok(result) => result?,
                Err(_) => {
                    // The waiter and reader threads unblock once the killed
                    // process exits and its pipes close.
                    kill_process(child_pid);
                    return Err(HookError::ToolTimeout {
                        command: command.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            }
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(ShellOutput {
        code: status.code(),
        stdout,
        stderr,
    })
}

fn read_all<R: Read>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Keep at most `max` bytes from the end of `s`, on a char boundary.
fn cap_tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Quote `value` for safe interpolation into a `sh -c` command line.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '+' | ':' | '@'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
