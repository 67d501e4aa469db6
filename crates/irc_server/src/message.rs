//! Wire codec: one IRC line ↔ a structured [`Message`].
//!
//! Grounded in `original_source/pyircd/message.py`'s `msg_from_string` /
//! `Message.__str__` (the split-then-join algorithm this module mirrors) and
//! in `manuelpont94-irc/crates/irc_server/src/parsers.rs`'s RFC 2812 ABNF,
//! which validates individual tokens (nicknames, channel names, ...) at the
//! call sites that need it rather than re-deriving the top-level split.

use crate::errors::IrcError;
use crate::types::Source;

/// A parsed (or about-to-be-serialized) IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub source: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl Message {
    pub fn new(command: impl Into<String>) -> Self {
        Message {
            source: None,
            command: command.into(),
            params: Vec::new(),
            trailing: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Builds a message sourced by `source`, used for every server-
    /// generated, user-originated event (JOIN/PART/PRIVMSG/MODE/TOPIC/...).
    pub fn from_source(source: &Source, server_name: &str, command: impl Into<String>) -> Self {
        Message::new(command).with_source(source.render(server_name))
    }

    /// Parses one CRLF-framed (or already-trimmed) inbound line.
    ///
    /// Tolerates stray leading/trailing whitespace. Fails only on a
    /// structurally empty line, matching `spec.md` §4.1.
    pub fn parse(line: &str) -> Result<Message, IrcError> {
        let line = line.trim_matches(|c| c == '\r' || c == '\n').trim();
        if line.is_empty() {
            return Err(IrcError::InvalidMessage);
        }

        let (source, rest) = if let Some(stripped) = line.strip_prefix(':') {
            match stripped.split_once(' ') {
                Some((src, remainder)) => (Some(src.to_string()), remainder.trim_start()),
                None => return Err(IrcError::InvalidMessage),
            }
        } else {
            (None, line)
        };

        if rest.is_empty() {
            return Err(IrcError::InvalidMessage);
        }

        let (mut tokens, trailing) = tokenize(rest);
        if tokens.is_empty() {
            return Err(IrcError::InvalidMessage);
        }
        let command = tokens.remove(0).to_ascii_uppercase();

        Ok(Message {
            source,
            command,
            params: tokens,
            trailing,
        })
    }

    /// Serializes this message back into a CRLF-terminated wire line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(src) = &self.source {
            out.push(':');
            out.push_str(src);
            out.push(' ');
        }
        out.push_str(&self.command);
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        if let Some(trailing) = &self.trailing {
            out.push_str(" :");
            out.push_str(trailing);
        }
        out.push_str("\r\n");
        out
    }
}

/// Splits a space-separated token stream into middle tokens plus an
/// optional trailing (colon-introduced) parameter.
///
/// Shared by [`Message::parse`] (where the first token is later peeled off
/// as the command) and by the numeric-reply renderer in
/// [`crate::numerics`], which re-splits an already-formatted reply body —
/// the same two-phase algorithm `original_source/pyircd/user.py`'s
/// `send_numeric` uses via `irc_msg_split`.
pub(crate) fn tokenize(s: &str) -> (Vec<String>, Option<String>) {
    let mut tokens = Vec::new();
    let mut remaining = s;
    loop {
        let trimmed = remaining.trim_start_matches(' ');
        if trimmed.is_empty() {
            return (tokens, None);
        }
        if let Some(trailing) = trimmed.strip_prefix(':') {
            return (tokens, Some(trailing.to_string()));
        }
        match trimmed.split_once(' ') {
            Some((tok, rest)) => {
                tokens.push(tok.to_string());
                remaining = rest;
            }
            None => {
                tokens.push(trimmed.to_string());
                return (tokens, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_command() {
        let msg = Message::parse("JOIN #lobby").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#lobby".to_string()]);
        assert_eq!(msg.trailing, None);
    }

    #[test]
    fn parses_trailing_param() {
        let msg = Message::parse("USER alice 0 * :Alice A").unwrap();
        assert_eq!(msg.command, "USER");
        assert_eq!(msg.params, vec!["alice", "0", "*"]);
        assert_eq!(msg.trailing.as_deref(), Some("Alice A"));
    }

    #[test]
    fn parses_source_prefix() {
        let msg = Message::parse(":alice!alice@127.0.0.1 PRIVMSG #lobby :hi").unwrap();
        assert_eq!(msg.source.as_deref(), Some("alice!alice@127.0.0.1"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#lobby".to_string()]);
        assert_eq!(msg.trailing.as_deref(), Some("hi"));
    }

    #[test]
    fn tolerates_stray_whitespace() {
        let msg = Message::parse("  JOIN  #lobby  \r\n").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#lobby".to_string()]);
    }

    #[test]
    fn empty_line_is_invalid() {
        assert!(matches!(Message::parse(""), Err(IrcError::InvalidMessage)));
        assert!(matches!(Message::parse("   "), Err(IrcError::InvalidMessage)));
    }

    #[test]
    fn empty_trailing_round_trips() {
        let msg = Message::parse("PART #x :").unwrap();
        assert_eq!(msg.trailing.as_deref(), Some(""));
        assert_eq!(msg.render(), "PART #x :\r\n");
    }

    #[test]
    fn round_trip_law() {
        let cases = [
            "JOIN #lobby",
            "PRIVMSG #lobby :hi there",
            ":alice!alice@127.0.0.1 PART #lobby :goodbye",
            "NICK alice",
        ];
        for case in cases {
            let parsed = Message::parse(case).unwrap();
            let rendered = parsed.render();
            let reparsed = Message::parse(&rendered).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {case:?}");
        }
    }
}
