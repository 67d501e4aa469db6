//! Command dispatch: the registration FSM's pre-registration inputs, and the
//! registered-user verb table, with its two middlewares applied inline.
//!
//! Grounded in `original_source/pyircd/user.py`'s `handler`/`min_params`
//! decorators and its per-verb `handle_*` methods, and in
//! `original_source/pyircd/con.py`'s `found_terminator` (the pre-registration
//! routing, and `PING` intercepted ahead of everything else). Reimplemented
//! per `spec.md` §9's redesign note as ordinary function composition — no
//! decorator/macro machinery: [`min_params`] is the first middleware, and the
//! second (the error translator) is inlined into each `crate::registry`
//! method rather than centralized, because `PRIVMSG`/`JOIN`'s per-target
//! partial-failure semantics (`spec.md` §7) need a distinct numeric per
//! target within a single command, which a single `Result`-returning call
//! can't carry.

use crate::connection::{Connection, ConnectionState};
use crate::message::Message;
use crate::numerics::Numeric;
use crate::registry::Registry;

/// Minimum count of "arguments" (params plus trailing, if present) a verb
/// requires before its handler runs, per `spec.md` §4.4's table.
fn min_params(command: &str) -> usize {
    match command {
        "PRIVMSG" => 2,
        "JOIN" => 1,
        "PART" => 1,
        "QUIT" => 0,
        "NAMES" => 0,
        "TOPIC" => 1,
        "WHO" => 1,
        "WHOIS" => 1,
        "MODE" => 1,
        "OPER" => 2,
        "MOTD" => 0,
        "PING" => 1,
        _ => 0,
    }
}

fn all_args(msg: &Message) -> Vec<&str> {
    let mut args: Vec<&str> = msg.params.iter().map(String::as_str).collect();
    if let Some(trailing) = &msg.trailing {
        args.push(trailing);
    }
    args
}

/// Routes one parsed inbound line for `conn`. Called once per complete line
/// read off the socket, after the read loop's framing has stripped CRLF.
pub fn dispatch(registry: &Registry, conn: &mut Connection, msg: Message) {
    log::debug!("conn {}: dispatching {}", conn.unique_id, msg.command);

    // PING is handled identically whether or not registration is complete,
    // matching `con.py`'s interception ahead of the FSM split.
    if msg.command == "PING" {
        let arg = all_args(&msg).first().copied().unwrap_or("");
        conn.send_line(format!("PONG :{arg}\r\n"));
        return;
    }

    if !conn.is_registered() {
        dispatch_pre_registration(registry, conn, msg);
    } else {
        dispatch_registered(registry, conn, msg);
    }
}

fn dispatch_pre_registration(registry: &Registry, conn: &mut Connection, msg: Message) {
    match msg.command.as_str() {
        "NICK" => {
            let Some(nick) = all_args(&msg).first().copied() else {
                return; // NICK with no argument: silently dropped, as for any malformed pre-reg input
            };
            registry.handle_nick(conn, nick);
        }
        "USER" => {
            // Requires exactly 4 args total: username, mode, unused, real
            // name — the last of which may arrive as a trailing param or as
            // a plain fourth middle param (`con.py`'s `len(msg.params) != 4`
            // accepts either form).
            let args = all_args(&msg);
            if args.len() != 4 {
                let line = Numeric::ErrNeedMoreParams
                    .render(registry_server_name(registry), conn.display_nick(), &["USER"])
                    .render();
                conn.send_line(line);
                return;
            }
            let username = args[0].to_string();
            let real_name = args[3].to_string();
            registry.handle_user(conn, &username, &real_name);
        }
        "PASS" => {
            if let Some(pw) = all_args(&msg).first().copied() {
                registry.handle_pass(conn, pw);
            }
        }
        // SERVER (peer links) and anything else: silently dropped, per
        // `spec.md` §4.3 — out of this core's scope.
        _ => return,
    }

    if conn.pre_reg.nick_done && conn.pre_reg.user_done {
        registry.try_finish_registration(conn);
    }
}

fn registry_server_name(registry: &Registry) -> &str {
    &registry.config.hostname
}

fn dispatch_registered(registry: &Registry, conn: &mut Connection, msg: Message) {
    let command = msg.command.as_str();
    let args = all_args(&msg);
    if args.len() < min_params(command) {
        let line = Numeric::ErrNeedMoreParams
            .render(registry_server_name(registry), conn.display_nick(), &[command])
            .render();
        conn.send_line(line);
        return;
    }

    // Every positional read below indexes `args` (params with any trailing
    // folded on as the last element), never `msg.params` directly — a
    // required argument supplied as the trailing param (e.g. `TOPIC
    // :#lobby`) passes the `min_params` gate above but has no entry in
    // `msg.params`, so indexing that directly would panic.
    let user_id = conn.unique_id;
    match command {
        "PRIVMSG" => registry.privmsg(user_id, args[0], args[1]),
        "JOIN" => {
            let channels = args[0];
            let keys = args.get(1).copied().unwrap_or("");
            registry.join(user_id, channels, keys);
        }
        "PART" => {
            let channel = args[0];
            let reason = args.get(1).copied();
            registry.part(user_id, channel, reason);
        }
        "QUIT" => {
            let reason = args.first().copied();
            registry.quit_user(user_id, reason);
            conn.state = ConnectionState::Closed;
        }
        "NAMES" => {
            let channels = args.first().copied();
            registry.names(user_id, channels);
        }
        "TOPIC" => {
            let channel = args[0];
            let new_topic = args.get(1).copied();
            registry.topic(user_id, channel, new_topic);
        }
        "WHO" => registry.who(user_id, args[0]),
        "WHOIS" => registry.whois(user_id, args[0]),
        "MODE" => {
            let target = args[0];
            let rest: Vec<String> = args[1..].iter().map(|s| s.to_string()).collect();
            registry.mode(user_id, target, &rest);
        }
        "OPER" => registry.try_make_oper(user_id, args[0], args[1]),
        "MOTD" => registry.send_motd(user_id),
        _ => {
            let line = Numeric::ErrUnknownCommand
                .render(registry_server_name(registry), conn.display_nick(), &[command])
                .render();
            conn.send_line(line);
        }
    }
}
