//! Core configuration types.
//!
//! This module contains the root [`Config`] struct loaded from `warden.yaml`
//! (or a legacy `config.json`, which parses as YAML).

use super::serde_duration;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// What to do with labelled runtime containers that have no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Skip the runtime listing entirely.
    Ignore,
    /// Log each orphan at warn level.
    #[default]
    Report,
    /// Stop and remove each orphan.
    Remove,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat gateway authentication token. Required to serve.
    #[serde(default)]
    pub discord_token: Option<String>,

    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Image every user container is created from.
    pub image_name: String,

    /// CPU limit as a fraction of cores (2.0 = two cores).
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: f64,

    /// Memory limit in Docker notation ("4g", "512m").
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    /// Users allowed to run blacklist/unblacklist.
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub admin_ids: BTreeSet<String>,

    /// Restrict container creation to a single server.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub guild_id: Option<String>,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Container names are `{prefix}-{user_id}-{unix_seconds}`.
    #[serde(default = "default_name_prefix")]
    pub container_name_prefix: String,

    /// Upper bound on waiting for connection endpoints after creation.
    #[serde(default = "default_endpoint_wait", with = "serde_duration")]
    pub endpoint_wait: Duration,

    #[serde(default = "default_poll_interval", with = "serde_duration")]
    pub endpoint_poll_interval: Duration,

    /// Minimum spacing between two `create` requests from one user. Zero
    /// disables the limit.
    #[serde(default = "default_create_cooldown", with = "serde_duration")]
    pub create_cooldown: Duration,

    /// Per-command timeout for runtime CLI calls.
    #[serde(default = "default_docker_timeout", with = "serde_duration")]
    pub docker_timeout: Duration,

    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_cpu_limit() -> f64 {
    2.0
}

fn default_memory_limit() -> String {
    "4g".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("containers.db")
}

fn default_name_prefix() -> String {
    "discord-bot".to_string()
}

fn default_endpoint_wait() -> Duration {
    Duration::from_secs(6)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_create_cooldown() -> Duration {
    Duration::from_secs(10)
}

fn default_docker_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Chat platforms hand out numeric snowflakes, but configs written by hand
/// often quote them. Accept both and normalize to strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        }
    }
}

fn deserialize_ids<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<RawId> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(String::from).collect())
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(raw.map(String::from).filter(|s| !s.is_empty()))
}

impl Config {
    /// Minimal config around an image, with every other field defaulted.
    pub fn with_image(image_name: impl Into<String>) -> Self {
        Self {
            discord_token: None,
            command_prefix: default_command_prefix(),
            image_name: image_name.into(),
            cpu_limit: default_cpu_limit(),
            memory_limit: default_memory_limit(),
            admin_ids: BTreeSet::new(),
            guild_id: None,
            database_path: default_database_path(),
            container_name_prefix: default_name_prefix(),
            endpoint_wait: default_endpoint_wait(),
            endpoint_poll_interval: default_poll_interval(),
            create_cooldown: default_create_cooldown(),
            docker_timeout: default_docker_timeout(),
            orphan_policy: OrphanPolicy::default(),
        }
    }

    /// The token, if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.discord_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
