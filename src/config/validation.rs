use super::Config;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Size notation the Docker CLI accepts for `--memory`: a number, an
/// optional space, then an optional k/m/g/t/p multiplier with optional
/// `i` and `b` suffixes (`512m`, `4gb`, `1.5GiB`, `1t`).
fn memory_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)[0-9]+(\.[0-9]+)* ?[kmgtp]?i?b?$").expect("valid regex")
    })
}

/// Docker container names must match `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn name_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex"))
}

impl Config {
    /// Validate everything except the token.
    pub fn validate(&self) -> Result<()> {
        if self.image_name.trim().is_empty() {
            return Err(Error::Validation("'image_name' must not be empty".to_string()));
        }

        if !self.cpu_limit.is_finite() || self.cpu_limit <= 0.0 {
            return Err(Error::Validation(format!(
                "'cpu_limit' must be a positive number of cores, got {}",
                self.cpu_limit
            )));
        }

        if !memory_pattern().is_match(self.memory_limit.trim()) {
            return Err(Error::Validation(format!(
                "'memory_limit' must look like \"4g\", \"512mb\" or \"1t\", got '{}'",
                self.memory_limit
            )));
        }

        if !name_prefix_pattern().is_match(&self.container_name_prefix) {
            return Err(Error::Validation(format!(
                "'container_name_prefix' '{}' is not a valid container name",
                self.container_name_prefix
            )));
        }

        if self.command_prefix.is_empty() {
            return Err(Error::Validation("'command_prefix' must not be empty".to_string()));
        }

        for (field, value) in [
            ("endpoint_poll_interval", self.endpoint_poll_interval),
            ("docker_timeout", self.docker_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Validation(format!("'{}' must be greater than zero", field)));
            }
        }

        if self.admin_ids.is_empty() {
            tracing::warn!("No admin_ids configured; blacklist commands will be refused for everyone");
        }

        Ok(())
    }

    /// Validation for serving: everything in [`Config::validate`] plus a token.
    pub fn validate_for_serve(&self) -> Result<()> {
        if self.token().is_none() {
            return Err(Error::MissingToken);
        }
        self.validate()
    }
}
