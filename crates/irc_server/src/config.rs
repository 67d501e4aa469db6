//! Startup configuration, loaded once and treated as immutable for the life
//! of the process.
//!
//! Grounded in `original_source/pyircd/config.py`'s flat property bag (it
//! just slurps a JSON document and exposes its keys as attributes) and in
//! `spec.md` §6's configuration key table. The serialization format itself
//! is out of core scope per `spec.md` §1; this crate follows the teacher's
//! `serde` + `toml` stack rather than JSON (see `DESIGN.md`).

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

/// One configured operator credential, compared literally by `OPER`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OperCredential {
    pub name: String,
    pub pw: String,
}

/// A remote peer eligible for server-to-server linking.
///
/// Parsed so the config file can declare them, but nothing in this core
/// dials out to a peer — linking is a forward extension per `spec.md` §1.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LinkPeer {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Ambient resource limits that sit alongside the core protocol config.
/// None of these are named in `spec.md`'s key table; they exist so the
/// server has sane bounds without hardcoding them, and default to values
/// that never trip unless the operator opts in.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LimitsConfig {
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_message_length: default_max_message_length(),
            backlog: default_backlog(),
        }
    }
}

fn default_max_message_length() -> usize {
    512
}

fn default_backlog() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server name; appears as the source of server-originated messages.
    pub hostname: String,
    /// TCP listen port.
    pub port: u16,
    /// Advertised in RPL_ISUPPORT and RPL_WHOISSERVER.
    pub netname: String,
    /// Server description in RPL_WHOISSERVER.
    pub info: String,
    /// Newline-separated MOTD body.
    pub motd: String,
    /// Operator credentials, compared literally.
    #[serde(default)]
    pub opers: Vec<OperCredential>,
    /// Peer linking, out of core scope beyond being parsed.
    #[serde(default)]
    pub allowed_links: Vec<LinkPeer>,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Loads and parses the TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// `host:port` pair to pass to `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let toml_src = r#"
            hostname = "example.com"
            port = 6667
            netname = "ExampleNet"
            info = "An example IRC server"
            motd = "line one\nline two"

            [[opers]]
            name = "test"
            pw = "testpass"
        "#;
        let config: Config = toml::from_str(toml_src).expect("parses");
        assert_eq!(config.hostname, "example.com");
        assert_eq!(config.opers.len(), 1);
        assert_eq!(config.opers[0].name, "test");
        assert_eq!(config.limits.max_message_length, 512);
    }
}
