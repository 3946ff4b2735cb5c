//! Startup configuration.
//!
//! Values come from an optional JSON file named by `GATEHOUSE_CONFIG`
//! (`{ "token": "...", "whitelist": 123, "guild": 456 }`), then from
//! `GATEHOUSE_*` environment variables, which take precedence.

use crate::error::{Error, Result};
use gatehouse_ledger::{RoleId, WhitelistSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Configuration for a gatehouse node.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Directory holding the ledger database
    pub data_dir: PathBuf,

    /// Bot token for the platform REST API
    pub token: String,

    /// Guild the bot manages
    pub guild_id: u64,

    /// Role that marks whitelisted members
    pub whitelist_role: RoleId,

    /// Platform REST API base URL
    pub api_base: String,

    /// Command socket path (for the gateway bridge and gatehouse-admin)
    pub command_socket: PathBuf,

    /// Inspection API listen address
    pub http_addr: SocketAddr,

    /// Bound on each role grant request
    pub grant_timeout: Duration,

    /// Record untracked role holders as founders at startup
    pub bootstrap_founders: bool,
}

/// Shape of the optional JSON config file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    token: Option<String>,
    whitelist: Option<u64>,
    guild: Option<u64>,
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup("GATEHOUSE_CONFIG") {
            Some(path) => read_file_config(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let data_dir = PathBuf::from(
            lookup("GATEHOUSE_DATA_DIR").unwrap_or_else(|| "./gatehouse-data".to_string()),
        );

        let token = lookup("GATEHOUSE_TOKEN")
            .or(file.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config("GATEHOUSE_TOKEN is not set".into()))?;

        let guild_id = match lookup("GATEHOUSE_GUILD") {
            Some(raw) => parse("GATEHOUSE_GUILD", &raw)?,
            None => file
                .guild
                .ok_or_else(|| Error::Config("GATEHOUSE_GUILD is not set".into()))?,
        };

        let whitelist_role = match lookup("GATEHOUSE_WHITELIST_ROLE") {
            Some(raw) => parse("GATEHOUSE_WHITELIST_ROLE", &raw)?,
            None => file
                .whitelist
                .map(RoleId)
                .ok_or_else(|| Error::Config("GATEHOUSE_WHITELIST_ROLE is not set".into()))?,
        };

        let api_base = lookup("GATEHOUSE_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let command_socket = lookup("GATEHOUSE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("command.sock"));

        let http_addr = parse(
            "GATEHOUSE_HTTP_ADDR",
            &lookup("GATEHOUSE_HTTP_ADDR").unwrap_or_else(|| "127.0.0.1:8088".to_string()),
        )?;

        let grant_timeout = match lookup("GATEHOUSE_GRANT_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse("GATEHOUSE_GRANT_TIMEOUT_MS", &raw)?),
            None => gatehouse_ledger::service::DEFAULT_GRANT_TIMEOUT,
        };

        let bootstrap_founders = match lookup("GATEHOUSE_BOOTSTRAP_FOUNDERS") {
            Some(raw) => parse_bool("GATEHOUSE_BOOTSTRAP_FOUNDERS", &raw)?,
            None => false,
        };

        Ok(Self {
            data_dir,
            token,
            guild_id,
            whitelist_role,
            api_base,
            command_socket,
            http_addr,
            grant_timeout,
            bootstrap_founders,
        })
    }

    /// Settings handed to the whitelist service.
    pub fn whitelist_settings(&self) -> WhitelistSettings {
        WhitelistSettings::new(self.whitelist_role).with_grant_timeout(self.grant_timeout)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid config file {}: {}", path.display(), e)))
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {}: {}", key, e)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("invalid {}: {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_only() {
        let config = BotConfig::from_lookup(lookup(&[
            ("GATEHOUSE_TOKEN", "secret"),
            ("GATEHOUSE_GUILD", "10"),
            ("GATEHOUSE_WHITELIST_ROLE", "20"),
            ("GATEHOUSE_DATA_DIR", "/tmp/gh"),
            ("GATEHOUSE_BOOTSTRAP_FOUNDERS", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.guild_id, 10);
        assert_eq!(config.whitelist_role, RoleId(20));
        assert_eq!(config.command_socket, PathBuf::from("/tmp/gh/command.sock"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.grant_timeout, Duration::from_secs(10));
        assert!(config.bootstrap_founders);
    }

    #[test]
    fn file_values_overridden_by_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token":"from-file","whitelist":7,"guild":8}"#).unwrap();

        let config = BotConfig::from_lookup(lookup(&[
            ("GATEHOUSE_CONFIG", path.to_str().unwrap()),
            ("GATEHOUSE_GUILD", "99"),
        ]))
        .unwrap();

        assert_eq!(config.token, "from-file");
        assert_eq!(config.whitelist_role, RoleId(7));
        assert_eq!(config.guild_id, 99);
    }

    #[test]
    fn missing_token_is_config_error() {
        let result = BotConfig::from_lookup(lookup(&[
            ("GATEHOUSE_GUILD", "1"),
            ("GATEHOUSE_WHITELIST_ROLE", "2"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let base = [
            ("GATEHOUSE_TOKEN", "t"),
            ("GATEHOUSE_GUILD", "1"),
            ("GATEHOUSE_WHITELIST_ROLE", "not-a-role"),
        ];
        assert!(matches!(BotConfig::from_lookup(lookup(&base)), Err(Error::Config(_))));

        let base = [
            ("GATEHOUSE_TOKEN", "t"),
            ("GATEHOUSE_GUILD", "1"),
            ("GATEHOUSE_WHITELIST_ROLE", "2"),
            ("GATEHOUSE_HTTP_ADDR", "nowhere"),
        ];
        assert!(matches!(BotConfig::from_lookup(lookup(&base)), Err(Error::Config(_))));
    }
}
