//! Chat command handling.
//!
//! The [`Dispatcher`] turns one incoming message into at most one reply. It
//! enforces the server context rules and maps every lifecycle outcome to a
//! short human-readable message. Administrator identities are never revealed.

mod parse;

pub use parse::{mention, parse_user_ref, Command, BLACKLIST_USAGE, UNBLACKLIST_USAGE};

use crate::error::{whole_seconds, Error};
use crate::lifecycle::{
    CreatedContainer, LifecycleManager, ResourceLimits, StatusOutcome, TeardownOutcome,
};
use crate::runtime::short_id;
use std::fmt::Write;
use std::sync::Arc;

/// Who sent a message and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub user_id: String,
    /// `None` for direct messages.
    pub guild_id: Option<String>,
}

impl Invocation {
    pub fn in_guild(user_id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            guild_id: Some(guild_id.into()),
        }
    }

    pub fn direct(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            guild_id: None,
        }
    }
}

pub struct Dispatcher {
    manager: Arc<LifecycleManager>,
    prefix: String,
    guild_id: Option<String>,
}

impl Dispatcher {
    pub fn new(manager: Arc<LifecycleManager>, prefix: impl Into<String>, guild_id: Option<String>) -> Self {
        Self {
            manager,
            prefix: prefix.into(),
            guild_id,
        }
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    /// Handle one message. `None` means the text was not a command.
    pub async fn dispatch(&self, invocation: &Invocation, text: &str) -> Option<String> {
        let command = Command::parse(text, &self.prefix)?;
        tracing::debug!("User {} issued {:?}", invocation.user_id, command);
        Some(self.execute(invocation, command).await)
    }

    async fn execute(&self, invocation: &Invocation, command: Command) -> String {
        let user = invocation.user_id.as_str();
        let who = mention(user);

        match command {
            Command::Create => {
                if let Some(refusal) = self.refuse_outside_guild(invocation) {
                    return refusal;
                }
                match self.manager.create(user).await {
                    Ok(created) => self.created_reply(&created),
                    Err(e) => self.error_reply(&who, "create container", &e),
                }
            }
            Command::Delete => match self.manager.delete(user).await {
                Ok(TeardownOutcome::Removed) => format!("{}, your container has been deleted.", who),
                Ok(TeardownOutcome::AlreadyGone) => {
                    format!("{}, your container no longer exists.", who)
                }
                Ok(TeardownOutcome::ClearedWithWarning(e)) => format!(
                    "{}, your container record was cleared, but the runtime reported: {}",
                    who, e
                ),
                Err(e) => self.error_reply(&who, "delete container", &e),
            },
            Command::Status => match self.manager.status(user).await {
                Ok(StatusOutcome::Live(status)) => {
                    let mut reply = String::from("Container Status\n");
                    let _ = writeln!(reply, "Container: `{}`", short_id(&status.container_id));
                    let _ = writeln!(reply, "Name: {}", status.container_name);
                    let _ = writeln!(reply, "Status: {}", status.status);
                    reply.push_str(&limits_lines(&status.limits));
                    reply
                }
                Ok(StatusOutcome::Vanished) => format!("{}, your container no longer exists.", who),
                Err(e) => self.error_reply(&who, "get container status", &e),
            },
            Command::Help => self.help_text(self.manager.is_admin(user)),
            Command::Ping => "Pong!".to_string(),
            Command::Start => self.disabled_reply(&who, "start"),
            Command::Stop => self.disabled_reply(&who, "stop"),
            Command::Blacklist { target, reason } => {
                match self.manager.blacklist(user, &target, &reason).await {
                    Ok(outcome) => {
                        let mut reply = format!("{} has been blacklisted.", mention(&target));
                        match outcome.teardown {
                            Some(TeardownOutcome::ClearedWithWarning(e)) => {
                                let _ = write!(
                                    reply,
                                    " Their container record was cleared, but the runtime reported: {}",
                                    e
                                );
                            }
                            Some(_) => reply.push_str(" Their container has been removed."),
                            None => {}
                        }
                        if !reason.is_empty() {
                            let _ = write!(reply, " Reason: {}", reason);
                        }
                        reply
                    }
                    Err(Error::PermissionDenied) => self.permission_reply(&who),
                    Err(e) => format!("Error blacklisting user: {}", e),
                }
            }
            Command::Unblacklist { target } => match self.manager.unblacklist(user, &target).await {
                Ok(true) => format!("{} has been unblacklisted.", mention(&target)),
                Ok(false) => format!("{} was not blacklisted.", mention(&target)),
                Err(Error::PermissionDenied) => self.permission_reply(&who),
                Err(e) => format!("Error unblacklisting user: {}", e),
            },
            Command::Usage(usage) => format!("Usage: `{}{}`", self.prefix, usage),
            Command::Unknown(name) => format!(
                "Unknown command `{}{}`. Try `{}help`.",
                self.prefix, name, self.prefix
            ),
        }
    }

    fn refuse_outside_guild(&self, invocation: &Invocation) -> Option<String> {
        let Some(guild) = invocation.guild_id.as_deref() else {
            return Some("Commands must be used in a server, not in DMs.".to_string());
        };
        match self.guild_id.as_deref() {
            Some(allowed) if allowed != guild => {
                Some("This bot is not available in this server.".to_string())
            }
            _ => None,
        }
    }

    fn created_reply(&self, created: &CreatedContainer) -> String {
        let mut reply = String::from("Container Created\n");
        let _ = writeln!(reply, "Container ID: `{}`", short_id(&created.record.container_id));
        let _ = writeln!(reply, "Name: {}", created.record.container_name);
        reply.push_str(&limits_lines(&created.limits));
        if let Some(ssh) = &created.endpoints.ssh {
            let _ = write!(reply, "\nTmate SSH: `{}`", ssh);
        }
        if let Some(web) = &created.endpoints.web {
            let _ = write!(reply, "\nSSHX URL: `{}`", web);
        }
        reply
    }

    fn error_reply(&self, who: &str, action: &str, error: &Error) -> String {
        match error {
            Error::AlreadyBlacklisted(_) => {
                format!("{}, you are blacklisted from using this service.", who)
            }
            Error::AlreadyExists(_) => format!(
                "{}, you already have a container running. Use `{}delete` to remove it first.",
                who, self.prefix
            ),
            Error::CoolingDown { retry_after, .. } => format!(
                "{}, please wait {}s before creating another container.",
                who,
                whole_seconds(retry_after)
            ),
            Error::NotFound(_) => format!("{}, you don't have a container.", who),
            Error::PermissionDenied => self.permission_reply(who),
            other => format!("{}, failed to {}: {}", who, action, other),
        }
    }

    fn permission_reply(&self, who: &str) -> String {
        format!("{}, you do not have permission to use this command.", who)
    }

    fn disabled_reply(&self, who: &str, name: &str) -> String {
        format!(
            "{}, the `{}{}` command has been temporarily disabled.",
            who, self.prefix, name
        )
    }

    fn help_text(&self, is_admin: bool) -> String {
        let p = &self.prefix;
        let mut text = String::from("Bot Commands\n\nUser Commands\n");
        let _ = writeln!(text, "`{}create` - Create a new container", p);
        let _ = writeln!(text, "`{}delete` - Delete your container", p);
        let _ = writeln!(text, "`{}status` - Check your container status", p);
        let _ = writeln!(text, "`{}help` - Show this help menu", p);
        text.push_str("\nTemporarily Disabled\n");
        let _ = writeln!(text, "`{}start` - Temporarily disabled", p);
        let _ = write!(text, "`{}stop` - Temporarily disabled", p);
        if is_admin {
            text.push_str("\n\nAdmin Commands\n");
            let _ = writeln!(text, "`{}{}` - Blacklist a user", p, BLACKLIST_USAGE);
            let _ = write!(text, "`{}{}` - Unblacklist a user", p, UNBLACKLIST_USAGE);
        }
        text
    }
}

fn limits_lines(limits: &ResourceLimits) -> String {
    let unit = if limits.cpus == 1.0 { "core" } else { "cores" };
    format!(
        "CPU Limit: {} {}\nMemory Limit: {}",
        limits.cpus, unit, limits.memory
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_lines() {
        let limits = ResourceLimits {
            cpus: 2.0,
            memory: "4g".to_string(),
        };
        assert_eq!(limits_lines(&limits), "CPU Limit: 2 cores\nMemory Limit: 4g");
        let limits = ResourceLimits {
            cpus: 0.5,
            memory: "1g".to_string(),
        };
        assert!(limits_lines(&limits).starts_with("CPU Limit: 0.5 cores"));
    }

    #[test]
    fn test_invocation_constructors() {
        assert_eq!(Invocation::direct("1").guild_id, None);
        assert_eq!(Invocation::in_guild("1", "9").guild_id.as_deref(), Some("9"));
    }
}
