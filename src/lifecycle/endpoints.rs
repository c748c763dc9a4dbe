//! Connection endpoint extraction from container output.
//!
//! The sandbox image starts a tmate session and an sshx session on boot and
//! prints their connection strings. Both appear asynchronously, so the output
//! is polled until both are present or the wait bound elapses.

use crate::runtime::ContainerRuntime;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("valid regex")
    })
}

fn web_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https://sshx\.io/s/[^\s`'\x22]+").expect("valid regex"))
}

/// Remove terminal control sequences.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ansi_pattern().replace_all(text, "")
}

/// Connection strings found in a container's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// Remote shell invocation, e.g. `ssh AbC123@nyc1.tmate.io`.
    pub ssh: Option<String>,
    /// Web terminal URL.
    pub web: Option<String>,
}

impl Endpoints {
    pub fn is_complete(&self) -> bool {
        self.ssh.is_some() && self.web.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ssh.is_none() && self.web.is_none()
    }

    /// Scan raw output. The last occurrence of each endpoint wins, matching
    /// what a user scrolling the console would see.
    pub fn extract(output: &str) -> Self {
        let mut found = Self::default();
        for raw_line in output.lines() {
            let line = strip_ansi(raw_line);
            let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\r');
            if line.starts_with("ssh ") && line.contains('@') {
                found.ssh = Some(line.to_string());
            } else if let Some(url) = web_url_pattern().find(line) {
                found.web = Some(url.as_str().to_string());
            }
        }
        found
    }

    fn merge(&mut self, newer: Endpoints) {
        if newer.ssh.is_some() {
            self.ssh = newer.ssh;
        }
        if newer.web.is_some() {
            self.web = newer.web;
        }
    }
}

/// Poll the container's output until both endpoints are found or `wait`
/// elapses. Never fails: whatever was found by the deadline is returned.
pub async fn wait_for_endpoints(
    runtime: &dyn ContainerRuntime,
    container_id: &str,
    wait: Duration,
    poll_interval: Duration,
) -> Endpoints {
    let deadline = Instant::now() + wait;
    let mut found = Endpoints::default();

    loop {
        match runtime.logs(container_id).await {
            Ok(bytes) => {
                found.merge(Endpoints::extract(&String::from_utf8_lossy(&bytes)));
                if found.is_complete() {
                    return found;
                }
            }
            Err(e) if e.is_not_found() => {
                debug!("Container {} vanished while waiting for endpoints", container_id);
                return found;
            }
            Err(e) => {
                debug!("Reading logs of {} failed: {}", container_id, e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(
                "Endpoint wait for {} elapsed (ssh: {}, web: {})",
                container_id,
                found.ssh.is_some(),
                found.web.is_some()
            );
            return found;
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
