//! Per-connection state: the scratch a client carries before it becomes a
//! registered [`crate::user::User`], plus its outbound line queue.
//!
//! Grounded in `original_source/pyircd/con.py`'s `IRCCon` (the `nick_done`/
//! `user_done` flags, the pre-reg `nick`/`username`/`real_name` scratch, the
//! address-derived `host`) and in the per-connection outbound channel idea
//! from `manuelpont94-irc/crates/irc_server/src/user_state.rs`'s
//! `tx_outbound: Sender<...>` field — generalized here to every connection,
//! not just registered users, since `PING`/numerics must flow before
//! registration completes too.

use tokio::sync::mpsc;

use crate::types::UserId;

/// Bounded outbound queue depth per connection. A slow reader can lag the
/// server by at most this many lines before its writer task backpressures
/// the registry lock holder — see `spec.md` §5 and `DESIGN.md`.
pub const OUTBOUND_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRegistration,
    Registered,
    Closed,
}

/// Pre-registration scratch, reset to nothing once the FSM completes.
#[derive(Debug, Default, Clone)]
pub struct PreRegScratch {
    pub nick: Option<String>,
    pub username: Option<String>,
    pub real_name: Option<String>,
    pub pass: Option<String>,
    pub nick_done: bool,
    pub user_done: bool,
}

#[derive(Debug)]
pub struct Connection {
    pub unique_id: UserId,
    pub remote_host: String,
    pub state: ConnectionState,
    pub pre_reg: PreRegScratch,
    /// Outbound line sender; the writer task half of this channel owns the
    /// socket's write half and drains it strictly in send order.
    pub tx: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(unique_id: UserId, remote_host: String, tx: mpsc::Sender<String>) -> Self {
        Connection {
            unique_id,
            remote_host,
            state: ConnectionState::AwaitingRegistration,
            pre_reg: PreRegScratch::default(),
            tx,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == ConnectionState::Registered
    }

    /// Nick to address numerics to before registration completes: the
    /// conventional `*` placeholder, matching `spec.md` §8 scenario 2.
    pub fn display_nick(&self) -> &str {
        self.pre_reg.nick.as_deref().unwrap_or("*")
    }

    /// Queues one already-rendered line for delivery; drops it (logging is
    /// the caller's responsibility) if the writer task's receiver is gone.
    pub fn send_line(&self, line: String) {
        if let Err(e) = self.tx.try_send(line) {
            log::warn!("connection {}: outbound queue full or closed: {e}", self.unique_id);
        }
    }
}
