use std::fmt;
use std::time::Duration;

/// Structured error type for container runtime operations.
///
/// `ContainerNotFound` is kept separate from every other failure so that
/// teardown paths can treat "already gone" as a consistent state.
#[derive(Debug)]
pub enum RuntimeError {
    /// Runtime command timed out.
    Timeout { command: String, timeout: Duration },

    /// Runtime command ran but returned non-zero exit.
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Runtime binary couldn't be executed (not in PATH, permission denied).
    ExecFailed {
        command: String,
        source: std::io::Error,
    },

    /// Container doesn't exist (parsed from "No such container" stderr).
    ContainerNotFound { container: String },

    /// Runtime answered with output we could not interpret.
    Malformed { command: String, reason: String },
}

impl RuntimeError {
    /// Create a timeout error.
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        RuntimeError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Create a command-failed error from an `std::process::Output`.
    ///
    /// Output whose stderr reports a missing container maps to
    /// [`RuntimeError::ContainerNotFound`] instead.
    pub fn failed(cmd: impl Into<String>, container: &str, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_not_found_message(&stderr) {
            return RuntimeError::ContainerNotFound {
                container: container.to_string(),
            };
        }
        RuntimeError::CommandFailed {
            command: cmd.into(),
            stderr,
            exit_code: output.status.code(),
        }
    }

    /// Create a command-failed error from a stderr string and optional exit code.
    pub fn cmd_failed(
        cmd: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        RuntimeError::CommandFailed {
            command: cmd.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Create an exec-failed error (binary not found / permission denied).
    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        RuntimeError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn not_found(container: impl Into<String>) -> Self {
        RuntimeError::ContainerNotFound {
            container: container.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::ContainerNotFound { .. })
    }
}

/// Docker reports missing containers with slightly different wording depending
/// on the subcommand.
fn is_not_found_message(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("No such object")
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Timeout { command, timeout } => {
                write!(
                    f,
                    "Timed out running '{}' (exceeded {} seconds)",
                    command,
                    timeout.as_secs()
                )
            }
            RuntimeError::CommandFailed {
                command,
                stderr,
                exit_code,
            } => {
                if let Some(code) = exit_code {
                    write!(f, "'{}' failed (exit code {}): {}", command, code, stderr)
                } else {
                    write!(f, "'{}' failed: {}", command, stderr)
                }
            }
            RuntimeError::ExecFailed { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
            RuntimeError::ContainerNotFound { container } => {
                write!(f, "No such container: {}", container)
            }
            RuntimeError::Malformed { command, reason } => {
                write!(f, "Unexpected output from '{}': {}", command, reason)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::ExecFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_docker_not_found_wording() {
        assert!(is_not_found_message(
            "Error response from daemon: No such container: abc123"
        ));
        assert!(is_not_found_message("Error: No such object: abc123"));
        assert!(!is_not_found_message("permission denied"));
    }

    #[test]
    fn display_includes_exit_code() {
        let err = RuntimeError::cmd_failed("docker stop abc", "boom", Some(1));
        assert_eq!(err.to_string(), "'docker stop abc' failed (exit code 1): boom");
        assert!(!err.is_not_found());
        assert!(RuntimeError::not_found("abc").is_not_found());
    }
}
