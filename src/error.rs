// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::runtime::RuntimeError;
use miette::Diagnostic;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(warden::config::validation),
        help("Run `warden validate` for detailed validation errors")
    )]
    Validation(String),

    #[error("Missing authentication token")]
    #[diagnostic(
        code(warden::config::token),
        help("Set `discord_token` in the config file or export WARDEN_TOKEN")
    )]
    MissingToken,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("User {0} already has a container")]
    #[diagnostic(code(warden::lifecycle::already_exists))]
    AlreadyExists(String),

    #[error("User {0} is blacklisted")]
    #[diagnostic(code(warden::lifecycle::blacklisted))]
    AlreadyBlacklisted(String),

    #[error("User {user} must wait {}s before creating another container", whole_seconds(.retry_after))]
    #[diagnostic(code(warden::lifecycle::cooldown))]
    CoolingDown { user: String, retry_after: Duration },

    #[error("No container for user {0}")]
    #[diagnostic(code(warden::lifecycle::not_found))]
    NotFound(String),

    #[error("Permission denied")]
    #[diagnostic(code(warden::lifecycle::permission_denied))]
    PermissionDenied,

    #[error("Container runtime error: {0}")]
    #[diagnostic(
        code(warden::runtime::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Runtime(#[from] RuntimeError),

    #[error("Storage error: {0}")]
    #[diagnostic(code(warden::storage::error))]
    Storage(String),

    #[error("Database error: {0}")]
    #[diagnostic(
        code(warden::database::error),
        help("See recovery suggestions based on the specific error type")
    )]
    Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Seconds rounded up, never below one.
pub(crate) fn whole_seconds(duration: &Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

/// Coarse classification used by callers that only care about the outcome
/// category of a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    AlreadyBlacklisted,
    CoolingDown,
    NotFound,
    PermissionDenied,
    RuntimeFailure,
    StorageFailure,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::AlreadyBlacklisted(_) => ErrorKind::AlreadyBlacklisted,
            Error::CoolingDown { .. } => ErrorKind::CoolingDown,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::PermissionDenied => ErrorKind::PermissionDenied,
            Error::Runtime(_) => ErrorKind::RuntimeFailure,
            Error::Storage(_) | Error::Database(_) => ErrorKind::StorageFailure,
            Error::Config(_)
            | Error::Validation(_)
            | Error::MissingToken
            | Error::Parse(_)
            | Error::Yaml(_)
            | Error::Io(_) => ErrorKind::Config,
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::MissingToken => Some(
                "Add `discord_token: <token>` to the config or pass --token".to_string(),
            ),
            Error::Config(msg) if msg.contains("Could not find") => Some(
                "Create warden.yaml in the working directory or pass --config <path>".to_string(),
            ),
            Error::Config(_) | Error::Validation(_) => {
                Some("Validate your config with: warden validate".to_string())
            }
            Error::Runtime(RuntimeError::ExecFailed { .. }) => {
                Some("Is the docker CLI installed and on PATH?".to_string())
            }
            Error::Runtime(_) => Some("Check that Docker is running: docker ps".to_string()),
            Error::Database(e) => {
                // tokio_rusqlite wraps the rusqlite error opaquely, so match on text.
                let err_str = e.to_string();
                if err_str.contains("database is locked") || err_str.contains("SQLITE_BUSY") {
                    Some(
                        "Another warden instance may be using this database. Stop it before starting a new one.".to_string(),
                    )
                } else if err_str.contains("database disk image is malformed")
                    || err_str.contains("SQLITE_CORRUPT")
                {
                    Some(
                        "Database corrupted. Back it up and try recovery:\n  sqlite3 containers.db '.recover' | sqlite3 containers.recovered.db".to_string(),
                    )
                } else {
                    Some("Check the database path and its file permissions".to_string())
                }
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_share_a_kind() {
        assert_eq!(
            Error::Storage("disk full".into()).kind(),
            ErrorKind::StorageFailure
        );
        assert_eq!(
            Error::Database(tokio_rusqlite::Error::ConnectionClosed).kind(),
            ErrorKind::StorageFailure
        );
    }

    #[test]
    fn runtime_not_found_is_still_a_runtime_failure_kind() {
        let err = Error::from(RuntimeError::ContainerNotFound {
            container: "abc".into(),
        });
        assert_eq!(err.kind(), ErrorKind::RuntimeFailure);
    }

    #[test]
    fn missing_token_has_hint() {
        let text = Error::MissingToken.with_suggestion();
        assert!(text.contains("Hint:"));
        assert!(text.contains("--token"));
    }

    #[test]
    fn cooldown_rounds_wait_up_to_whole_seconds() {
        let err = Error::CoolingDown {
            user: "42".into(),
            retry_after: Duration::from_millis(8_200),
        };
        assert_eq!(err.kind(), ErrorKind::CoolingDown);
        assert_eq!(
            err.to_string(),
            "User 42 must wait 9s before creating another container"
        );
        assert_eq!(whole_seconds(&Duration::from_millis(10)), 1);
        assert_eq!(whole_seconds(&Duration::from_secs(10)), 10);
    }

    #[test]
    fn permission_denied_message_is_generic() {
        assert_eq!(Error::PermissionDenied.to_string(), "Permission denied");
    }
}
