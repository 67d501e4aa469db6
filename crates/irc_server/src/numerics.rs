//! Numeric reply catalog: (number, format template, trailing-param flag),
//! plus the render algorithm that turns one into an outbound [`Message`].
//!
//! Templates are copied verbatim from `original_source/pyircd/numerics.py`
//! (its `NumericReply` table), which is the concrete source `spec.md` §6's
//! catalog was distilled from. Several templates embed a literal `:` in the
//! middle of the format string (e.g. RPL_ISUPPORT), which is why rendering
//! is a two-phase format-then-resplit, not naive positional substitution —
//! see `send_numeric` in `original_source/pyircd/user.py`.

use crate::message::{tokenize, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Numeric {
    RplWelcome,
    RplYourHost,
    RplCreated,
    RplMyInfo,
    RplISupport,
    RplUModeIs,
    RplWhoisUser,
    RplWhoisServer,
    RplEndOfWho,
    RplWhoisIdle,
    RplEndOfWhois,
    RplWhoisChannels,
    RplChannelModeIs,
    RplNoTopic,
    RplTopic,
    RplWhoReply,
    RplNamReply,
    RplEndOfNames,
    RplMotd,
    RplMotdStart,
    RplEndOfMotd,
    RplYoureOper,
    ErrNoSuchNick,
    ErrNoSuchChannel,
    ErrUnknownCommand,
    ErrNicknameInUse,
    ErrUserNotInChannel,
    ErrNotOnChannel,
    ErrNeedMoreParams,
    ErrPasswdMismatch,
    ErrChannelIsFull,
    ErrBadChannelKey,
    ErrBadChanMask,
    ErrChanOpPrivsNeeded,
    ErrUsersDontMatch,
}

impl Numeric {
    pub fn code(self) -> u16 {
        use Numeric::*;
        match self {
            RplWelcome => 1,
            RplYourHost => 2,
            RplCreated => 3,
            RplMyInfo => 4,
            RplISupport => 5,
            RplUModeIs => 221,
            RplWhoisUser => 311,
            RplWhoisServer => 312,
            RplEndOfWho => 315,
            RplWhoisIdle => 317,
            RplEndOfWhois => 318,
            RplWhoisChannels => 319,
            RplChannelModeIs => 324,
            RplNoTopic => 331,
            RplTopic => 332,
            RplWhoReply => 352,
            RplNamReply => 353,
            RplEndOfNames => 366,
            RplMotd => 372,
            RplMotdStart => 375,
            RplEndOfMotd => 376,
            RplYoureOper => 381,
            ErrNoSuchNick => 401,
            ErrNoSuchChannel => 403,
            ErrUnknownCommand => 421,
            ErrNicknameInUse => 433,
            ErrUserNotInChannel => 441,
            ErrNotOnChannel => 442,
            ErrNeedMoreParams => 461,
            ErrPasswdMismatch => 464,
            ErrChannelIsFull => 471,
            ErrBadChannelKey => 475,
            ErrBadChanMask => 476,
            ErrChanOpPrivsNeeded => 482,
            ErrUsersDontMatch => 502,
        }
    }

    fn template(self) -> &'static str {
        use Numeric::*;
        match self {
            RplWelcome => ":Welcome to the Internet Relay Network {}!{}@{}",
            RplYourHost => ":Your host is {}, running version {}",
            RplCreated => ":This server was created {}",
            RplMyInfo => "{} {} {} {}",
            RplISupport => "PREFIX=(ov)@+ CHANTYPES=#& NETWORK={} CASEMAPPING=ascii CHANMODES=beI,k,l,imnst EXCEPTS=e CHANNELLEN=32 :are supported by this server",
            RplUModeIs => "+{}",
            RplWhoisUser => "{} {} {} * :{}",
            RplWhoisServer => "{} {} :{}",
            RplEndOfWho => "{} :End of WHO List",
            RplWhoisIdle => "{} {} :seconds idle",
            RplEndOfWhois => "{} :End of WHOIS list",
            RplWhoisChannels => "{} :{}",
            RplChannelModeIs => "{} +{} {}",
            RplNoTopic => "{} :No topic is set",
            RplTopic => "{} :{}",
            RplWhoReply => "{} {} {} {} {} H{} :0 {}",
            RplNamReply => "= {} :{}",
            RplEndOfNames => "{} :End of NAMES List",
            RplMotd => ":- {}",
            RplMotdStart => ":- {} Message of the day - ",
            RplEndOfMotd => ":End of MOTD",
            RplYoureOper => ":You are now an IRC operator",
            ErrNoSuchNick => "{} :No such nick/channel",
            ErrNoSuchChannel => "{} :No such channel",
            ErrUnknownCommand => "{} :Unknown command",
            ErrNicknameInUse => "{} :Nickname already in use",
            ErrUserNotInChannel => "{} {} :They aren't on that channel",
            ErrNotOnChannel => "{} :You're not on that channel",
            ErrNeedMoreParams => "{} :Not enough parameters",
            ErrPasswdMismatch => ":Password incorrect",
            ErrChannelIsFull => "{} :Cannot join channel (+l)",
            ErrBadChannelKey => "{} :Cannot join channel (+k)",
            ErrBadChanMask => "{} :Bad Channel Mask",
            ErrChanOpPrivsNeeded => "{} :You're not channel operator",
            ErrUsersDontMatch => ":Can't change mode for other users",
        }
    }

    /// Renders this numeric into a full outbound [`Message`], addressed to
    /// `recipient_nick` (or `"*"` before registration), formatted against
    /// `args` in positional order.
    ///
    /// Mirrors `User.send_numeric`: format the template, then re-split the
    /// *result* exactly like an inbound line (no source-stripping, since a
    /// numeric body never carries one), then prepend the recipient's nick.
    pub fn render(self, server_name: &str, recipient_nick: &str, args: &[&str]) -> Message {
        let formatted = format_template(self.template(), args);
        let (mut params, trailing) = tokenize(&formatted);
        params.insert(0, recipient_nick.to_string());

        let mut msg = Message::new(format!("{:03}", self.code()))
            .with_source(server_name)
            .with_params(params);
        if let Some(trailing) = trailing {
            msg = msg.with_trailing(trailing);
        }
        msg
    }
}

/// Positional `{}` substitution, in the style of the template strings
/// copied from `original_source/pyircd/numerics.py`.
fn format_template(template: &str, args: &[&str]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'}') {
            chars.next();
            if let Some(arg) = args.next() {
                result.push_str(arg);
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_welcome() {
        let msg = Numeric::RplWelcome.render(
            "example.com",
            "alice",
            &["alice", "alice", "127.0.0.1"],
        );
        assert_eq!(
            msg.render(),
            ":example.com 001 alice :Welcome to the Internet Relay Network alice!alice@127.0.0.1\r\n"
        );
    }

    #[test]
    fn renders_isupport_with_embedded_colon() {
        let msg = Numeric::RplISupport.render("example.com", "alice", &["ExampleNet"]);
        assert_eq!(msg.command, "005");
        assert_eq!(msg.params[0], "alice");
        assert!(msg.params.contains(&"NETWORK=ExampleNet".to_string()));
        assert_eq!(msg.trailing.as_deref(), Some("are supported by this server"));
    }

    #[test]
    fn renders_channel_full_error() {
        let msg = Numeric::ErrChannelIsFull.render("example.com", "bob", &["#small"]);
        assert_eq!(
            msg.render(),
            ":example.com 471 bob #small :Cannot join channel (+l)\r\n"
        );
    }

    #[test]
    fn renders_bad_key_error() {
        let msg = Numeric::ErrBadChannelKey.render("example.com", "bob", &["#vault"]);
        assert_eq!(
            msg.render(),
            ":example.com 475 bob #vault :Cannot join channel (+k)\r\n"
        );
    }

    #[test]
    fn renders_nick_in_use_pre_registration() {
        let msg = Numeric::ErrNicknameInUse.render("example.com", "*", &["alice"]);
        assert_eq!(
            msg.render(),
            ":example.com 433 * alice :Nickname already in use\r\n"
        );
    }

    #[test]
    fn renders_no_arg_numeric() {
        let msg = Numeric::RplYoureOper.render("example.com", "alice", &[]);
        assert_eq!(
            msg.render(),
            ":example.com 381 alice :You are now an IRC operator\r\n"
        );
    }
}
