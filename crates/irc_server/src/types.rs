//! Shared identifiers used across the registry, channels and users.

use std::fmt;

/// Monotonic, never-reused identifier assigned to a connection on accept.
///
/// Stays stable across the lifetime of the `User` that connection becomes.
pub type UserId = u64;

/// Channel names are matched case-sensitively here (the original ASCII
/// casemapping from `RPL_ISUPPORT` is advertised but not enforced beyond
/// lowercasing the registry key).
pub type ChannelName = String;

pub type Nick = String;

/// Tagged union for where an outbound message "came from", per the design
/// note in the spec: sometimes the server itself, sometimes a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Server,
    User { nick: Nick, username: String, host: String },
}

impl Source {
    pub fn user(nick: impl Into<String>, username: impl Into<String>, host: impl Into<String>) -> Self {
        Source::User {
            nick: nick.into(),
            username: username.into(),
            host: host.into(),
        }
    }

    /// Render this source the way it is written after the leading `:` on
    /// the wire: either the configured server hostname, or `nick!user@host`.
    pub fn render(&self, server_name: &str) -> String {
        match self {
            Source::Server => server_name.to_string(),
            Source::User { nick, username, host } => format!("{nick}!{username}@{host}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Server => write!(f, "<server>"),
            Source::User { nick, username, host } => write!(f, "{nick}!{username}@{host}"),
        }
    }
}

/// A channel name begins with `#` (network-wide) or `&` (local-only).
pub fn is_channel_name(name: &str) -> bool {
    name.starts_with('#') || name.starts_with('&')
}
