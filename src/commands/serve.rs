use crate::output::UserOutput;
use container_warden::{Config, Dispatcher, Invocation, LifecycleManager};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

/// One line of gateway input.
#[derive(Debug, PartialEq, Eq)]
enum GatewayEvent {
    Message { invocation: Invocation, text: String },
    Departed { user_id: String },
}

/// `depart <user_id>` or `<user_id> <guild_id|-> <message...>`.
fn parse_line(line: &str) -> Option<GatewayEvent> {
    let line = line.trim();
    let (first, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();

    if first == "depart" {
        let user_id = rest.split_whitespace().next()?;
        return Some(GatewayEvent::Departed {
            user_id: user_id.to_string(),
        });
    }

    let (guild, text) = rest.split_once(char::is_whitespace)?;
    let invocation = if guild == "-" {
        Invocation::direct(first)
    } else {
        Invocation::in_guild(first, guild)
    };
    Some(GatewayEvent::Message {
        invocation,
        text: text.trim().to_string(),
    })
}

pub async fn run_serve(config: &Config, out: &dyn UserOutput) -> anyhow::Result<()> {
    config.validate_for_serve()?;

    let (store, runtime) = super::open_backends(config).await?;
    let (manager, report) = LifecycleManager::bootstrap(store, runtime, config).await?;

    out.status(&format!(
        "Loaded {} containers from database ({} dropped)",
        manager.view().len(),
        report.dropped.len()
    ));
    if !report.orphans.is_empty() {
        out.warning(&format!(
            "{} orphaned container(s) found, {} removed",
            report.orphans.len(),
            report.orphans_removed
        ));
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(manager),
        config.command_prefix.clone(),
        config.guild_id.clone(),
    ));

    out.status("Ready. Reading events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: JoinSet<Option<String>> = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(&line) {
                    Some(GatewayEvent::Message { invocation, text }) => {
                        let dispatcher = Arc::clone(&dispatcher);
                        in_flight.spawn(async move { dispatcher.dispatch(&invocation, &text).await });
                    }
                    Some(GatewayEvent::Departed { user_id }) => {
                        let dispatcher = Arc::clone(&dispatcher);
                        in_flight.spawn(async move {
                            dispatcher.manager().on_user_departed(&user_id).await;
                            None
                        });
                    }
                    None => out.error(&format!("Malformed input line: {}", line)),
                }
            }
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                print_reply(done, out);
            }
        }
    }

    // Drain requests still running when input closed
    while let Some(done) = in_flight.join_next().await {
        print_reply(done, out);
    }

    Ok(())
}

fn print_reply(done: Result<Option<String>, tokio::task::JoinError>, out: &dyn UserOutput) {
    match done {
        Ok(Some(reply)) => {
            out.status(&reply);
            out.blank();
        }
        Ok(None) => {}
        Err(e) => out.error(&format!("Request handler failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_guild_message() {
        assert_eq!(
            parse_line("42 777 !blacklist <@9> too loud"),
            Some(GatewayEvent::Message {
                invocation: Invocation::in_guild("42", "777"),
                text: "!blacklist <@9> too loud".to_string(),
            })
        );
    }

    #[test]
    fn test_parses_direct_message() {
        assert_eq!(
            parse_line("42 - !create"),
            Some(GatewayEvent::Message {
                invocation: Invocation::direct("42"),
                text: "!create".to_string(),
            })
        );
    }

    #[test]
    fn test_parses_departure() {
        assert_eq!(
            parse_line("depart 42"),
            Some(GatewayEvent::Departed {
                user_id: "42".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_incomplete_lines() {
        assert_eq!(parse_line("42"), None);
        assert_eq!(parse_line("42 777"), None);
        assert_eq!(parse_line("depart"), None);
    }
}
