//! Server registry: the directory binding connections → users → channels,
//! and the only place that ever holds more than one of those at once.
//!
//! Grounded in `original_source/pyircd/net.py`'s `IRCNet` (`connect_user`,
//! `quit_user`, `join_user_to_channel`, `try_make_oper`, `send_motd`,
//! `send_isupport`, `send_whois_data`) and in the concurrency design this
//! expansion settles on (see `SPEC_FULL.md` §5 and `DESIGN.md`): one
//! `std::sync::Mutex<RegistryInner>` locked once per inbound command. Every
//! outbound line is pushed through `User::send_line`/`Connection::send_line`
//! (a non-blocking `mpsc::Sender::try_send`), so nothing ever awaits while
//! the lock is held — there is no suspension point to race against.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::channel::Channel;
use crate::config::Config;
use crate::connection::Connection;
use crate::errors::IrcError;
use crate::message::Message;
use crate::numerics::Numeric;
use crate::parsers::channel_parser;
use crate::types::{is_channel_name, Source, UserId};
use crate::user::User;

fn casemap(nick: &str) -> String {
    nick.to_ascii_uppercase()
}

fn full_match<'a>(
    parser: impl Fn(&'a str) -> nom::IResult<&'a str, &'a str>,
    input: &'a str,
) -> bool {
    matches!(parser(input), Ok((rem, _)) if rem.is_empty())
}

struct RegistryInner {
    users: HashMap<UserId, User>,
    used_nicks: HashSet<String>,
    channels: HashMap<String, Channel>,
    next_id: UserId,
}

pub struct Registry {
    pub config: Config,
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Registry {
            config,
            inner: Mutex::new(RegistryInner {
                users: HashMap::new(),
                used_nicks: HashSet::new(),
                channels: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn new_connection_id(&self) -> UserId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    fn server_name(&self) -> &str {
        &self.config.hostname
    }

    // ---- registration FSM --------------------------------------------

    /// `NICK <n>`. Returns `true` on success; on collision sends
    /// `ERR_NICKNAMEINUSE` directly to the connection and returns `false`.
    ///
    /// `spec.md` §4.3 only defines a collision check here — there is no
    /// syntax-reject numeric in this core's catalog (no `ERR_ERRONEUSNICKNAME`),
    /// so `nickname_parser`'s grammar is not applied to `NICK` itself.
    pub fn handle_nick(&self, conn: &mut Connection, nick: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        if inner.used_nicks.contains(&casemap(nick)) {
            drop(inner);
            let line = Numeric::ErrNicknameInUse
                .render(self.server_name(), conn.display_nick(), &[nick])
                .render();
            conn.send_line(line);
            return false;
        }
        drop(inner);
        conn.pre_reg.nick = Some(nick.to_string());
        conn.pre_reg.nick_done = true;
        true
    }

    /// `PASS <pw>`. Accepted unconditionally and stashed; see `DESIGN.md`
    /// for why this core never validates it against anything.
    pub fn handle_pass(&self, conn: &mut Connection, pass: &str) {
        conn.pre_reg.pass = Some(pass.to_string());
    }

    /// `USER <username> <mode> <unused> :<real name>`.
    pub fn handle_user(
        &self,
        conn: &mut Connection,
        username: &str,
        real_name: &str,
    ) {
        conn.pre_reg.username = Some(username.to_string());
        conn.pre_reg.real_name = Some(real_name.to_string());
        conn.pre_reg.user_done = true;
    }

    /// Attempts to finalize registration once both `NICK` and `USER` are
    /// done. Re-checks the nick for a race lost between `NICK` acceptance
    /// and now; on collision, resets `nick_done` so the client can retry.
    pub fn try_finish_registration(&self, conn: &mut Connection) -> Option<UserId> {
        if !(conn.pre_reg.nick_done && conn.pre_reg.user_done) {
            return None;
        }
        let nick = conn.pre_reg.nick.clone().unwrap();
        let username = conn.pre_reg.username.clone().unwrap();
        let real_name = conn.pre_reg.real_name.clone().unwrap();
        let host = conn.remote_host.clone();

        let mut inner = self.inner.lock().unwrap();
        if inner.used_nicks.contains(&casemap(&nick)) {
            drop(inner);
            conn.pre_reg.nick_done = false;
            conn.pre_reg.nick = None;
            let line = Numeric::ErrNicknameInUse
                .render(self.server_name(), "*", &[&nick])
                .render();
            conn.send_line(line);
            return None;
        }

        let id = conn.unique_id;
        inner.used_nicks.insert(casemap(&nick));
        let user = User::new(id, nick.clone(), username.clone(), real_name, host.clone(), conn.tx.clone());
        inner.users.insert(id, user);
        drop(inner);

        conn.state = crate::connection::ConnectionState::Registered;
        self.send_welcome_burst(id, &nick, &username, &host);
        self.send_isupport(id);
        self.send_motd(id);
        Some(id)
    }

    fn send_welcome_burst(&self, id: UserId, nick: &str, username: &str, host: &str) {
        let server = self.server_name().to_string();
        let inner = self.inner.lock().unwrap();
        let Some(user) = inner.users.get(&id) else { return };
        user.send_line(Numeric::RplWelcome.render(&server, nick, &[nick, username, host]).render());
        user.send_line(
            Numeric::RplYourHost
                .render(&server, nick, &[&server, crate::SERVER_VERSION])
                .render(),
        );
        user.send_line(Numeric::RplCreated.render(&server, nick, &["in the past."]).render());
        user.send_line(
            Numeric::RplMyInfo
                .render(&server, nick, &[&server, crate::SERVER_VERSION, "Oiws", "beIklmnost"])
                .render(),
        );
    }

    // ---- directory lookups ---------------------------------------------

    pub fn get_user_by_nick(&self, nick: &str) -> Result<UserId, IrcError> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .values()
            .find(|u| u.nick.eq_ignore_ascii_case(nick))
            .map(|u| u.unique_id)
            .ok_or_else(|| IrcError::NoSuchUser(nick.to_string()))
    }

    fn require_channel<'a>(inner: &'a RegistryInner, name: &str) -> Result<&'a Channel, IrcError> {
        inner
            .channels
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| IrcError::NoSuchChannel(name.to_string()))
    }

    // ---- helpers for sending -------------------------------------------

    fn send_num(&self, inner: &RegistryInner, id: UserId, num: Numeric, args: &[&str]) {
        if let Some(user) = inner.users.get(&id) {
            user.send_line(num.render(self.server_name(), &user.nick, args).render());
        }
    }

    /// The error-translator middleware (`spec.md` §4.4): surfaces `err` to
    /// `id` as the numeric its taxonomy entry names, per `IrcError::to_numeric`.
    fn fail(&self, inner: &RegistryInner, id: UserId, err: IrcError) {
        let (num, args) = err.to_numeric();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.send_num(inner, id, num, &args);
    }

    fn broadcast(&self, inner: &RegistryInner, chan: &Channel, msg: &Message, exclude: Option<UserId>) {
        let line = msg.render();
        for uid in &chan.users {
            if Some(*uid) == exclude {
                continue;
            }
            if let Some(user) = inner.users.get(uid) {
                user.send_line(line.clone());
            }
        }
    }

    // ---- PRIVMSG --------------------------------------------------------

    pub fn privmsg(&self, sender: UserId, targets: &str, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        for target in targets.split(',') {
            if target.is_empty() {
                continue;
            }
            if is_channel_name(target) {
                match Self::require_channel(&inner, target) {
                    Ok(_) => {
                        let source = inner.users.get(&sender).map(|u| Source::user(&u.nick, &u.username, &u.host));
                        let Some(source) = source else { continue };
                        let msg = Message::from_source(&source, self.server_name(), "PRIVMSG")
                            .with_params(vec![target.to_string()])
                            .with_trailing(text.to_string());
                        let chan = inner.channels.get(&target.to_ascii_lowercase()).unwrap();
                        self.broadcast(&inner, chan, &msg, Some(sender));
                    }
                    Err(e) => self.fail(&inner, sender, e),
                }
            } else {
                match inner
                    .users
                    .values()
                    .find(|u| u.nick.eq_ignore_ascii_case(target))
                    .map(|u| u.unique_id)
                {
                    Some(target_id) => {
                        let source = inner.users.get(&sender).map(|u| Source::user(&u.nick, &u.username, &u.host));
                        let Some(source) = source else { continue };
                        let msg = Message::from_source(&source, self.server_name(), "PRIVMSG")
                            .with_params(vec![target.to_string()])
                            .with_trailing(text.to_string());
                        if let Some(target_user) = inner.users.get(&target_id) {
                            target_user.send_line(msg.render());
                        }
                    }
                    None => self.fail(&inner, sender, IrcError::NoSuchUser(target.to_string())),
                }
            }
        }
    }

    // ---- JOIN / PART ----------------------------------------------------

    pub fn join(&self, user_id: UserId, channels: &str, keys: &str) {
        let chan_names: Vec<&str> = channels.split(',').filter(|c| !c.is_empty()).collect();
        let chan_keys: Vec<&str> = if keys.is_empty() { Vec::new() } else { keys.split(',').collect() };

        for (i, chan_name) in chan_names.into_iter().enumerate() {
            let key = chan_keys.get(i).copied();
            self.join_one(user_id, chan_name, key);
        }
    }

    fn join_one(&self, user_id: UserId, chan_name: &str, key: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let lower = chan_name.to_ascii_lowercase();

        if !inner.channels.contains_key(&lower) {
            if !is_channel_name(chan_name) || chan_name.len() > 32 || !full_match(channel_parser, chan_name) {
                self.fail(&inner, user_id, IrcError::InvalidChannel(chan_name.to_string()));
                return;
            }
            inner.channels.insert(lower.clone(), Channel::new(chan_name.to_string()));
        }
        let created_now = inner.channels.get(&lower).unwrap().users.is_empty();

        {
            let chan = inner.channels.get(&lower).unwrap();
            if chan.is_member(user_id) {
                return; // already in, no-op
            }
            if let Some(chan_key) = &chan.key {
                if key != Some(chan_key.as_str()) {
                    self.fail(&inner, user_id, IrcError::BadKey(chan_name.to_string()));
                    return;
                }
            }
            if chan.is_full() {
                self.fail(&inner, user_id, IrcError::ChannelFull(chan_name.to_string()));
                return;
            }
        }

        let source = match inner.users.get(&user_id) {
            Some(u) => Source::user(&u.nick, &u.username, &u.host),
            None => return,
        };

        {
            let chan = inner.channels.get_mut(&lower).unwrap();
            chan.add_member(user_id);
        }
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.join_channel(chan_name.to_string());
        }

        let join_msg = Message::from_source(&source, self.server_name(), "JOIN")
            .with_params(vec![chan_name.to_string()]);
        {
            let chan = inner.channels.get(&lower).unwrap();
            self.broadcast(&inner, chan, &join_msg, None);
        }

        if created_now {
            inner.channels.get_mut(&lower).unwrap().add_user_mode(user_id, 'o');
            let nick = inner.users.get(&user_id).map(|u| u.nick.clone()).unwrap_or_default();
            let op_msg = Message::from_source(&Source::Server, self.server_name(), "MODE")
                .with_params(vec![chan_name.to_string(), "+o".to_string(), nick]);
            let chan = inner.channels.get(&lower).unwrap();
            self.broadcast(&inner, chan, &op_msg, None);
        }

        self.send_topic(&mut inner, user_id, &lower, chan_name);
        self.send_names(&mut inner, user_id, &lower, chan_name);
    }

    /// `NoSuchChannel` is silently ignored per the dispatcher's `PART` row;
    /// only a known channel the user isn't a member of gets `ERR_NOTONCHANNEL`.
    pub fn part(&self, user_id: UserId, chan_name: &str, reason: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let lower = chan_name.to_ascii_lowercase();
        let Some(chan) = inner.channels.get(&lower) else {
            return;
        };
        if !chan.is_member(user_id) {
            self.fail(&inner, user_id, IrcError::NotOnChannel(chan_name.to_string()));
            return;
        }

        let source = match inner.users.get(&user_id) {
            Some(u) => Source::user(&u.nick, &u.username, &u.host),
            None => return,
        };

        let mut msg = Message::from_source(&source, self.server_name(), "PART")
            .with_params(vec![chan_name.to_string()]);
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            msg = msg.with_trailing(reason.to_string());
        }

        {
            let chan = inner.channels.get(&lower).unwrap();
            self.broadcast(&inner, chan, &msg, None);
        }

        inner.channels.get_mut(&lower).unwrap().remove_member(user_id);
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.leave_channel(chan_name);
        }

        if inner.channels.get(&lower).is_some_and(|c| c.is_empty()) {
            inner.channels.remove(&lower);
        }
    }

    // ---- QUIT -----------------------------------------------------------

    pub fn quit_user(&self, user_id: UserId, reason: Option<&str>) {
        let reason = reason.unwrap_or("Client Quit").to_string();
        let mut inner = self.inner.lock().unwrap();
        let Some(nick) = inner.users.get(&user_id).map(|u| u.nick.clone()) else {
            return;
        };
        let member_channels: Vec<String> = inner
            .users
            .get(&user_id)
            .map(|u| u.channels.clone())
            .unwrap_or_default();

        for chan_name in member_channels {
            self.part_for_quit(&mut inner, user_id, &chan_name, &reason);
        }

        inner.users.remove(&user_id);
        inner.used_nicks.remove(&casemap(&nick));
    }

    fn part_for_quit(&self, inner: &mut RegistryInner, user_id: UserId, chan_name: &str, reason: &str) {
        let lower = chan_name.to_ascii_lowercase();
        let Some(chan) = inner.channels.get(&lower) else { return };
        if !chan.is_member(user_id) {
            return;
        }
        let source = match inner.users.get(&user_id) {
            Some(u) => Source::user(&u.nick, &u.username, &u.host),
            None => return,
        };
        let msg = Message::from_source(&source, self.server_name(), "QUIT").with_trailing(reason.to_string());
        let others: Vec<UserId> = chan.users.iter().copied().filter(|u| *u != user_id).collect();
        let line = msg.render();
        for uid in others {
            if let Some(user) = inner.users.get(&uid) {
                user.send_line(line.clone());
            }
        }
        inner.channels.get_mut(&lower).unwrap().remove_member(user_id);
        if inner.channels.get(&lower).is_some_and(|c| c.is_empty()) {
            inner.channels.remove(&lower);
        }
    }

    // ---- NAMES ------------------------------------------------------------

    pub fn names(&self, user_id: UserId, channels: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let targets: Vec<String> = match channels {
            Some(list) => list.split(',').filter(|c| !c.is_empty()).map(String::from).collect(),
            None => inner
                .users
                .get(&user_id)
                .map(|u| u.channels.clone())
                .unwrap_or_default(),
        };
        for chan_name in targets {
            let lower = chan_name.to_ascii_lowercase();
            if inner.channels.contains_key(&lower) {
                self.send_names(&mut inner, user_id, &lower, &chan_name);
            } else {
                self.fail(&inner, user_id, IrcError::NoSuchChannel(chan_name.clone()));
            }
        }
    }

    fn send_names(&self, inner: &mut RegistryInner, user_id: UserId, lower: &str, chan_name: &str) {
        let names: Vec<String> = {
            let chan = inner.channels.get(lower).unwrap();
            chan.users
                .iter()
                .map(|uid| {
                    let prefix = chan.mode_prefix(*uid);
                    let nick = inner.users.get(uid).map(|u| u.nick.as_str()).unwrap_or("?");
                    format!("{prefix}{nick}")
                })
                .collect()
        };
        let joined = names.join(" ");
        self.send_num(inner, user_id, Numeric::RplNamReply, &[chan_name, &joined]);
        self.send_num(inner, user_id, Numeric::RplEndOfNames, &[chan_name]);
    }

    // ---- TOPIC --------------------------------------------------------------

    pub fn topic(&self, user_id: UserId, chan_name: &str, new_topic: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let lower = chan_name.to_ascii_lowercase();
        if !inner.channels.contains_key(&lower) {
            self.fail(&inner, user_id, IrcError::NoSuchChannel(chan_name.to_string()));
            return;
        }
        match new_topic {
            None => self.send_topic(&mut inner, user_id, &lower, chan_name),
            Some(new_topic) => {
                let is_op = inner.channels.get(&lower).unwrap().mode_on_user(user_id, 'o');
                if !is_op {
                    self.fail(&inner, user_id, IrcError::NeedChanOp(chan_name.to_string()));
                    return;
                }
                let source = match inner.users.get(&user_id) {
                    Some(u) => Source::user(&u.nick, &u.username, &u.host),
                    None => return,
                };
                if new_topic.is_empty() {
                    inner.channels.get_mut(&lower).unwrap().topic = None;
                } else {
                    inner.channels.get_mut(&lower).unwrap().topic = Some(new_topic.to_string());
                    let msg = Message::from_source(&source, self.server_name(), "TOPIC")
                        .with_params(vec![chan_name.to_string()])
                        .with_trailing(new_topic.to_string());
                    let chan = inner.channels.get(&lower).unwrap();
                    self.broadcast(&inner, chan, &msg, None);
                }
            }
        }
    }

    fn send_topic(&self, inner: &mut RegistryInner, user_id: UserId, lower: &str, chan_name: &str) {
        let topic = inner.channels.get(lower).unwrap().topic.clone();
        match topic {
            Some(topic) => self.send_num(inner, user_id, Numeric::RplTopic, &[chan_name, &topic]),
            None => self.send_num(inner, user_id, Numeric::RplNoTopic, &[chan_name]),
        }
    }

    // ---- WHO / WHOIS --------------------------------------------------------

    pub fn who(&self, user_id: UserId, chan_name: &str) {
        let inner = self.inner.lock().unwrap();
        let lower = chan_name.to_ascii_lowercase();
        let Some(chan) = inner.channels.get(&lower) else {
            self.fail(&inner, user_id, IrcError::NoSuchChannel(chan_name.to_string()));
            return;
        };
        let server = self.server_name().to_string();
        for uid in &chan.users {
            let Some(member) = inner.users.get(uid) else { continue };
            let prefix = chan.mode_prefix(*uid);
            self.send_num(
                &inner,
                user_id,
                Numeric::RplWhoReply,
                &[chan_name, &member.username, &member.host, &server, &member.nick, prefix, &member.real_name],
            );
        }
        self.send_num(&inner, user_id, Numeric::RplEndOfWho, &[chan_name]);
    }

    pub fn whois(&self, user_id: UserId, targets: &str) {
        let info = self.config.info.clone();
        let netname = self.config.netname.clone();
        for target in targets.split(',').filter(|t| !t.is_empty()) {
            let inner = self.inner.lock().unwrap();
            let Some(t) = inner.users.values().find(|u| u.nick.eq_ignore_ascii_case(target)) else {
                self.fail(&inner, user_id, IrcError::NoSuchUser(target.to_string()));
                continue;
            };
            let (nick, username, host, real_name, channels) =
                (t.nick.clone(), t.username.clone(), t.host.clone(), t.real_name.clone(), t.channels.join(" "));

            self.send_num(&inner, user_id, Numeric::RplWhoisUser, &[&nick, &username, &host, &real_name]);
            self.send_num(&inner, user_id, Numeric::RplWhoisServer, &[&nick, &netname, &info]);
            self.send_num(&inner, user_id, Numeric::RplWhoisIdle, &[&nick, "0"]);
            self.send_num(&inner, user_id, Numeric::RplWhoisChannels, &[&nick, &channels]);
            self.send_num(&inner, user_id, Numeric::RplEndOfWhois, &[&nick]);
        }
    }

    // ---- MODE -----------------------------------------------------------

    pub fn mode(&self, user_id: UserId, target: &str, rest: &[String]) {
        if is_channel_name(target) {
            self.channel_mode(user_id, target, rest);
        } else {
            self.user_mode(user_id, target, rest);
        }
    }

    fn channel_mode(&self, user_id: UserId, chan_name: &str, rest: &[String]) {
        let mut inner = self.inner.lock().unwrap();
        let lower = chan_name.to_ascii_lowercase();
        if !inner.channels.contains_key(&lower) {
            self.fail(&inner, user_id, IrcError::NoSuchChannel(chan_name.to_string()));
            return;
        }

        if rest.is_empty() {
            let is_op = inner.channels.get(&lower).unwrap().mode_on_user(user_id, 'o');
            let (letters, params) = inner.channels.get(&lower).unwrap().mode_query(is_op);
            let params_str = params.join(" ");
            self.send_num(&inner, user_id, Numeric::RplChannelModeIs, &[chan_name, &letters, &params_str]);
            return;
        }

        let modestring = &rest[0];
        let mode_params = &rest[1..];
        let mut sign = match modestring.chars().next() {
            Some('+') => 1i8,
            Some('-') => -1i8,
            _ => 0i8,
        };
        if sign == 0 {
            return; // query prefix reserved, no-op per spec.md §4.5
        }

        let is_op = inner.channels.get(&lower).unwrap().mode_on_user(user_id, 'o');
        if !is_op {
            self.fail(&inner, user_id, IrcError::NeedChanOp(chan_name.to_string()));
            return;
        }

        let source = match inner.users.get(&user_id) {
            Some(u) => Source::user(&u.nick, &u.username, &u.host),
            None => return,
        };

        let mut param_iter = mode_params.iter();
        for ch in modestring.chars() {
            match ch {
                '+' => sign = 1,
                '-' => sign = -1,
                c => self.apply_channel_mode(&mut inner, user_id, &lower, chan_name, &source, sign, c, &mut param_iter),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_channel_mode<'a>(
        &self,
        inner: &mut RegistryInner,
        user_id: UserId,
        lower: &str,
        chan_name: &str,
        source: &Source,
        sign: i8,
        mode_char: char,
        params: &mut impl Iterator<Item = &'a String>,
    ) {
        let sign_char = if sign > 0 { '+' } else { '-' };

        if crate::channel::SIMPLE_MODES.contains(&mode_char) {
            if sign > 0 {
                inner.channels.get_mut(lower).unwrap().modes.insert(mode_char);
            } else {
                inner.channels.get_mut(lower).unwrap().modes.remove(&mode_char);
            }
            let msg = Message::from_source(source, self.server_name(), "MODE")
                .with_params(vec![chan_name.to_string(), format!("{sign_char}{mode_char}")]);
            let chan = inner.channels.get(lower).unwrap();
            self.broadcast(inner, chan, &msg, None);
            return;
        }

        if mode_char == 'l' {
            if sign > 0 {
                let Some(param) = params.next() else {
                    self.fail(inner, user_id, IrcError::InsufficientParams("MODE".to_string()));
                    return;
                };
                if let Ok(limit) = param.parse::<usize>() {
                    inner.channels.get_mut(lower).unwrap().limit = Some(limit);
                    let msg = Message::from_source(source, self.server_name(), "MODE").with_params(vec![
                        chan_name.to_string(),
                        "+l".to_string(),
                        limit.to_string(),
                    ]);
                    let chan = inner.channels.get(lower).unwrap();
                    self.broadcast(inner, chan, &msg, None);
                }
                // non-integer: silently leave limit unchanged, per spec.md §8.
            } else {
                inner.channels.get_mut(lower).unwrap().limit = None;
                let msg = Message::from_source(source, self.server_name(), "MODE")
                    .with_params(vec![chan_name.to_string(), "-l".to_string()]);
                let chan = inner.channels.get(lower).unwrap();
                self.broadcast(inner, chan, &msg, None);
            }
            return;
        }

        if mode_char == 'k' {
            if sign > 0 {
                let Some(param) = params.next() else {
                    self.fail(inner, user_id, IrcError::InsufficientParams("MODE".to_string()));
                    return;
                };
                inner.channels.get_mut(lower).unwrap().key = Some(param.clone());
                let msg = Message::from_source(source, self.server_name(), "MODE").with_params(vec![
                    chan_name.to_string(),
                    "+k".to_string(),
                    param.clone(),
                ]);
                let chan = inner.channels.get(lower).unwrap();
                self.broadcast(inner, chan, &msg, None);
            } else {
                inner.channels.get_mut(lower).unwrap().key = None;
                let _ = params.next(); // an accompanying param on -k is accepted and ignored
                let msg = Message::from_source(source, self.server_name(), "MODE")
                    .with_params(vec![chan_name.to_string(), "-k".to_string()]);
                let chan = inner.channels.get(lower).unwrap();
                self.broadcast(inner, chan, &msg, None);
            }
            return;
        }

        if mode_char == 'b' || mode_char == 'e' {
            if sign > 0 {
                let Some(mask) = params.next() else {
                    self.fail(inner, user_id, IrcError::InsufficientParams("MODE".to_string()));
                    return;
                };
                let chan = inner.channels.get_mut(lower).unwrap();
                if mode_char == 'b' {
                    chan.add_ban_mask(mask.clone());
                } else {
                    chan.add_except_mask(mask.clone());
                }
                let msg = Message::from_source(source, self.server_name(), "MODE").with_params(vec![
                    chan_name.to_string(),
                    format!("+{mode_char}"),
                    mask.clone(),
                ]);
                let chan = inner.channels.get(lower).unwrap();
                self.broadcast(inner, chan, &msg, None);
            } else if let Some(mask) = params.next() {
                let chan = inner.channels.get_mut(lower).unwrap();
                if mode_char == 'b' {
                    chan.remove_ban_mask(mask);
                } else {
                    chan.remove_except_mask(mask);
                }
                let msg = Message::from_source(source, self.server_name(), "MODE").with_params(vec![
                    chan_name.to_string(),
                    format!("-{mode_char}"),
                    mask.clone(),
                ]);
                let chan = inner.channels.get(lower).unwrap();
                self.broadcast(inner, chan, &msg, None);
            }
            // missing mask on remove: no-op, per spec.md §4.5.
            return;
        }

        if crate::channel::USER_MODES.contains(&mode_char) {
            let Some(target_nick) = params.next() else {
                self.fail(inner, user_id, IrcError::InsufficientParams("MODE".to_string()));
                return;
            };
            let target_id = inner.users.values().find(|u| u.nick.eq_ignore_ascii_case(target_nick)).map(|u| u.unique_id);
            match target_id {
                Some(tid) if inner.channels.get(lower).unwrap().is_member(tid) => {
                    if sign > 0 {
                        inner.channels.get_mut(lower).unwrap().add_user_mode(tid, mode_char);
                    } else {
                        inner.channels.get_mut(lower).unwrap().remove_user_mode(tid, mode_char);
                    }
                    let target_user_nick = inner.users.get(&tid).unwrap().nick.clone();
                    let msg = Message::from_source(source, self.server_name(), "MODE").with_params(vec![
                        chan_name.to_string(),
                        format!("{sign_char}{mode_char}"),
                        target_user_nick,
                    ]);
                    let chan = inner.channels.get(lower).unwrap();
                    self.broadcast(inner, chan, &msg, None);
                }
                _ => self.fail(inner, user_id, IrcError::UserNotInChannel { user: target_nick.clone(), channel: chan_name.to_string() }),
            }
        }
    }

    fn user_mode(&self, user_id: UserId, target_nick: &str, rest: &[String]) {
        let mut inner = self.inner.lock().unwrap();
        let Some(own_nick) = inner.users.get(&user_id).map(|u| u.nick.clone()) else {
            return;
        };
        if !own_nick.eq_ignore_ascii_case(target_nick) {
            self.fail(&inner, user_id, IrcError::UsersDontMatch);
            return;
        }
        if rest.is_empty() {
            let modes = inner.users.get(&user_id).unwrap().mode_string();
            self.send_num(&inner, user_id, Numeric::RplUModeIs, &[&modes]);
            return;
        }

        let modestring = &rest[0];
        let mut sign = match modestring.chars().next() {
            Some('+') => 1i8,
            Some('-') => -1i8,
            _ => return,
        };
        for ch in modestring.chars() {
            match ch {
                '+' => sign = 1,
                '-' => sign = -1,
                m if User::can_set_own_mode(m) => {
                    let user = inner.users.get_mut(&user_id).unwrap();
                    if sign > 0 {
                        user.modes.insert(m);
                    } else {
                        user.modes.remove(&m);
                    }
                }
                _ => {} // 'o'/'O' rejected silently, per spec.md §4.4.
            }
        }
    }

    // ---- OPER -------------------------------------------------------------

    pub fn try_make_oper(&self, user_id: UserId, name: &str, pass: &str) {
        let mut inner = self.inner.lock().unwrap();
        let matched = self.config.opers.iter().any(|o| o.name == name && o.pw == pass);
        if matched {
            if let Some(user) = inner.users.get_mut(&user_id) {
                user.modes.insert('O');
            }
            self.send_num(&inner, user_id, Numeric::RplYoureOper, &[]);
        } else {
            log::warn!("failed OPER attempt for name={name}");
            self.send_num(&inner, user_id, Numeric::ErrPasswdMismatch, &[]);
        }
    }

    // ---- MOTD / ISUPPORT ----------------------------------------------------

    pub fn send_isupport(&self, user_id: UserId) {
        let inner = self.inner.lock().unwrap();
        self.send_num(&inner, user_id, Numeric::RplISupport, &[&self.config.netname]);
    }

    pub fn send_motd(&self, user_id: UserId) {
        let inner = self.inner.lock().unwrap();
        self.send_num(&inner, user_id, Numeric::RplMotdStart, &[self.server_name()]);
        for line in self.config.motd.lines() {
            self.send_num(&inner, user_id, Numeric::RplMotd, &[line]);
        }
        self.send_num(&inner, user_id, Numeric::RplEndOfMotd, &[]);
    }
}
