//! Error taxonomy mapped to numeric replies at the user-session boundary.
//!
//! Mirrors `original_source/pyircd/errors.py`'s exception hierarchy and the
//! `handler`/`min_params` decorators in `user.py`, reimplemented as a plain
//! discriminated result type per the spec's redesign note: no decorator
//! machinery, just a match at the dispatch boundary (see `handlers::dispatch`).

use thiserror::Error;

use crate::numerics::Numeric;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrcError {
    #[error("no such nick/channel: {0}")]
    NoSuchUser(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("not enough parameters for {0}")]
    InsufficientParams(String),

    #[error("bad channel key: {0}")]
    BadKey(String),

    #[error("channel full: {0}")]
    ChannelFull(String),

    #[error("channel op needed: {0}")]
    NeedChanOp(String),

    #[error("nickname in use: {0}")]
    NickInUse(String),

    #[error("users don't match")]
    UsersDontMatch,

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("user not in channel: {user} {channel}")]
    UserNotInChannel { user: String, channel: String },

    #[error("invalid message")]
    InvalidMessage,
}

impl IrcError {
    /// The error-translator middleware from `spec.md` §4.4/§7: maps this
    /// error to the numeric reply it's surfaced as, plus the numeric's
    /// positional args (the recipient nick is prepended separately by
    /// [`Numeric::render`]).
    pub fn to_numeric(&self) -> (Numeric, Vec<String>) {
        match self {
            IrcError::NoSuchUser(t) => (Numeric::ErrNoSuchNick, vec![t.clone()]),
            IrcError::NoSuchChannel(c) => (Numeric::ErrNoSuchChannel, vec![c.clone()]),
            IrcError::InvalidChannel(c) => (Numeric::ErrBadChanMask, vec![c.clone()]),
            IrcError::InsufficientParams(cmd) => (Numeric::ErrNeedMoreParams, vec![cmd.clone()]),
            IrcError::BadKey(c) => (Numeric::ErrBadChannelKey, vec![c.clone()]),
            IrcError::ChannelFull(c) => (Numeric::ErrChannelIsFull, vec![c.clone()]),
            IrcError::NeedChanOp(c) => (Numeric::ErrChanOpPrivsNeeded, vec![c.clone()]),
            IrcError::NickInUse(n) => (Numeric::ErrNicknameInUse, vec![n.clone()]),
            IrcError::UsersDontMatch => (Numeric::ErrUsersDontMatch, vec![]),
            IrcError::NotOnChannel(c) => (Numeric::ErrNotOnChannel, vec![c.clone()]),
            IrcError::UserNotInChannel { user, channel } => {
                (Numeric::ErrUserNotInChannel, vec![user.clone(), channel.clone()])
            }
            IrcError::InvalidMessage => unreachable!("InvalidMessage is handled at the parser, never surfaced as a numeric"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_the_numerics_in_the_error_taxonomy_table() {
        assert_eq!(IrcError::NoSuchUser("bob".into()).to_numeric().0, Numeric::ErrNoSuchNick);
        assert_eq!(IrcError::NoSuchChannel("#x".into()).to_numeric().0, Numeric::ErrNoSuchChannel);
        assert_eq!(IrcError::InvalidChannel("bad".into()).to_numeric().0, Numeric::ErrBadChanMask);
        assert_eq!(IrcError::BadKey("#x".into()).to_numeric().0, Numeric::ErrBadChannelKey);
        assert_eq!(IrcError::ChannelFull("#x".into()).to_numeric().0, Numeric::ErrChannelIsFull);
        assert_eq!(IrcError::NeedChanOp("#x".into()).to_numeric().0, Numeric::ErrChanOpPrivsNeeded);
        assert_eq!(IrcError::NickInUse("bob".into()).to_numeric().0, Numeric::ErrNicknameInUse);
        assert_eq!(IrcError::UsersDontMatch.to_numeric().0, Numeric::ErrUsersDontMatch);
    }
}
