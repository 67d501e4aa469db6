//! A registered client: the state that exists once the registration FSM in
//! [`crate::registry`] has seen both `NICK` and `USER`.
//!
//! Grounded in `original_source/pyircd/user.py`'s `User` class — its
//! `hostmask`/`identifier` properties, its `modes` list (here a set, per
//! `spec.md` §9 open-question resolution #1), and `can_set_own_mode`.

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::types::UserId;

#[derive(Debug)]
pub struct User {
    pub unique_id: UserId,
    pub nick: String,
    pub username: String,
    pub real_name: String,
    pub host: String,
    pub modes: HashSet<char>,
    /// Ordered set of joined channel names (join order), per `spec.md` §3.
    pub channels: Vec<String>,
    /// Outbound sender, mirrored from the owning `Connection` so the
    /// registry can deliver lines to this user without a second lookup.
    pub tx: mpsc::Sender<String>,
}

impl User {
    pub fn new(
        unique_id: UserId,
        nick: String,
        username: String,
        real_name: String,
        host: String,
        tx: mpsc::Sender<String>,
    ) -> Self {
        User {
            unique_id,
            nick,
            username,
            real_name,
            host,
            modes: HashSet::new(),
            channels: Vec::new(),
            tx,
        }
    }

    pub fn hostmask(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    pub fn identifier(&self) -> String {
        format!("{}!{}@{}", self.nick, self.username, self.host)
    }

    pub fn in_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn join_channel(&mut self, name: String) {
        if !self.in_channel(&name) {
            self.channels.push(name);
        }
    }

    pub fn leave_channel(&mut self, name: &str) {
        self.channels.retain(|c| !c.eq_ignore_ascii_case(name));
    }

    /// Operator status (`O`) can only be bestowed by a successful `OPER`;
    /// every other letter is self-settable via user `MODE`.
    pub fn can_set_own_mode(mode: char) -> bool {
        mode != 'o' && mode != 'O'
    }

    pub fn mode_string(&self) -> String {
        let mut modes: Vec<char> = self.modes.iter().copied().collect();
        modes.sort_unstable();
        modes.into_iter().collect()
    }

    pub fn send_line(&self, line: String) {
        if let Err(e) = self.tx.try_send(line) {
            log::warn!("user {}: outbound queue full or closed: {e}", self.nick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user() -> User {
        let (tx, _rx) = mpsc::channel(4);
        User::new(1, "alice".into(), "alice".into(), "Alice A".into(), "127.0.0.1".into(), tx)
    }

    #[test]
    fn identifier_matches_rfc_format() {
        let user = make_user();
        assert_eq!(user.identifier(), "alice!alice@127.0.0.1");
        assert_eq!(user.hostmask(), "alice@127.0.0.1");
    }

    #[test]
    fn cannot_self_grant_operator() {
        assert!(!User::can_set_own_mode('o'));
        assert!(!User::can_set_own_mode('O'));
        assert!(User::can_set_own_mode('i'));
        assert!(User::can_set_own_mode('w'));
    }

    #[test]
    fn join_is_idempotent_in_membership_list() {
        let mut user = make_user();
        user.join_channel("#lobby".into());
        user.join_channel("#lobby".into());
        assert_eq!(user.channels, vec!["#lobby".to_string()]);
    }
}
