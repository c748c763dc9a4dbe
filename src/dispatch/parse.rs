/// A chat command after prefix stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create,
    Delete,
    Status,
    Help,
    Ping,
    /// Disabled; always answered with a fixed reply.
    Start,
    /// Disabled; always answered with a fixed reply.
    Stop,
    Blacklist { target: String, reason: String },
    Unblacklist { target: String },
    /// Known command with missing or malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

pub const BLACKLIST_USAGE: &str = "blacklist @user [reason]";
pub const UNBLACKLIST_USAGE: &str = "unblacklist @user";

impl Command {
    /// Parse `text` if it starts with `prefix`. Text without the prefix is
    /// ordinary chat and yields `None`.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let body = text.trim_start().strip_prefix(prefix)?;
        let mut words = body.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();

        let command = match name.as_str() {
            "create" => Command::Create,
            "delete" => Command::Delete,
            "status" => Command::Status,
            "help" => Command::Help,
            "ping" => Command::Ping,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "blacklist" => match words.next().and_then(parse_user_ref) {
                Some(target) => Command::Blacklist {
                    target,
                    reason: words.collect::<Vec<_>>().join(" "),
                },
                None => Command::Usage(BLACKLIST_USAGE),
            },
            "unblacklist" => match words.next().and_then(parse_user_ref) {
                Some(target) => Command::Unblacklist { target },
                None => Command::Usage(UNBLACKLIST_USAGE),
            },
            _ => Command::Unknown(name),
        };
        Some(command)
    }
}

/// Accept `<@123>`, `<@!123>` or a bare numeric id.
pub fn parse_user_ref(token: &str) -> Option<String> {
    let id = match token.strip_prefix("<@") {
        Some(rest) => {
            let rest = rest.strip_suffix('>')?;
            rest.strip_prefix('!').unwrap_or(rest)
        }
        None => token,
    };
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Render a user id as a mention.
pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_simple_commands() {
        assert_eq!(Command::parse("!create", "!"), Some(Command::Create));
        assert_eq!(Command::parse("  !Status extra", "!"), Some(Command::Status));
        assert_eq!(Command::parse("$help", "$"), Some(Command::Help));
    }

    #[test]
    fn test_ignores_unprefixed_text() {
        assert_eq!(Command::parse("create", "!"), None);
        assert_eq!(Command::parse("!", "!"), None);
        assert_eq!(Command::parse("", "!"), None);
    }

    #[test]
    fn test_blacklist_with_mention_and_reason() {
        assert_eq!(
            Command::parse("!blacklist <@!42> spamming the   channel", "!"),
            Some(Command::Blacklist {
                target: "42".to_string(),
                reason: "spamming the channel".to_string(),
            })
        );
        assert_eq!(
            Command::parse("!blacklist 42", "!"),
            Some(Command::Blacklist {
                target: "42".to_string(),
                reason: String::new(),
            })
        );
    }

    #[test]
    fn test_missing_target_yields_usage() {
        assert_eq!(
            Command::parse("!blacklist", "!"),
            Some(Command::Usage(BLACKLIST_USAGE))
        );
        assert_eq!(
            Command::parse("!unblacklist @someone", "!"),
            Some(Command::Usage(UNBLACKLIST_USAGE))
        );
    }

    #[test]
    fn test_user_refs() {
        assert_eq!(parse_user_ref("<@123>").as_deref(), Some("123"));
        assert_eq!(parse_user_ref("<@!123>").as_deref(), Some("123"));
        assert_eq!(parse_user_ref("123").as_deref(), Some("123"));
        assert_eq!(parse_user_ref("<@123"), None);
        assert_eq!(parse_user_ref("<@>"), None);
        assert_eq!(parse_user_ref("abc"), None);
    }

    #[test]
    fn test_unknown_command_is_reported() {
        assert_eq!(
            Command::parse("!launch", "!"),
            Some(Command::Unknown("launch".to_string()))
        );
    }
}
