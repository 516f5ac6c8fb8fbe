//! Chat session state
//!
//! Protocol state for one connection to the chat server, kept free of I/O
//! so the bridge only has to move lines in and out.

use super::irc::{ctcp_action, is_ctcp, IrcMessage};
use super::policy::should_forward;
use super::ChatConfig;

/// Suffix appended to the nickname when the server reports a collision
pub const NICK_COLLISION_SUFFIX: char = '^';

/// What the bridge should do in response to a server line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write a line back to the server
    Send(String),
    /// Broadcast text to the hub
    Forward(String),
    /// Registration completed
    Registered,
}

/// Per-connection chat protocol state
#[derive(Debug)]
pub struct ChatSession {
    nickname: String,
    password: Option<String>,
    channel: String,
    tag: String,
    registered: bool,
}

impl ChatSession {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            nickname: config.nickname.clone(),
            password: config.password.clone().filter(|p| !p.is_empty()),
            channel: config.channel.clone(),
            tag: config.tag.clone(),
            registered: false,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Lines sent right after connecting
    pub fn registration(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(password) = &self.password {
            lines.push(format!("PASS {}", password));
        }
        lines.push(format!("NICK {}", self.nickname));
        lines.push(format!("USER {} 0 * :{}", self.nickname, self.nickname));
        lines
    }

    /// React to one line from the server
    pub fn handle(&mut self, msg: &IrcMessage) -> Vec<SessionAction> {
        match msg.command.as_str() {
            "PING" => {
                let token = msg.params.last().map(String::as_str).unwrap_or_default();
                vec![SessionAction::Send(format!("PONG :{}", token))]
            }
            // RPL_WELCOME
            "001" => {
                self.registered = true;
                tracing::info!(nickname = %self.nickname, "Signed on to chat server");
                vec![
                    SessionAction::Registered,
                    SessionAction::Send(format!("JOIN {}", self.channel)),
                ]
            }
            // ERR_NICKNAMEINUSE
            "433" if !self.registered => {
                let old = self.nickname.clone();
                self.nickname.push(NICK_COLLISION_SUFFIX);
                tracing::warn!(old = %old, new = %self.nickname, "Nickname in use, retrying");
                vec![SessionAction::Send(format!("NICK {}", self.nickname))]
            }
            "JOIN" => {
                if self.is_self(msg.nick()) {
                    tracing::debug!(channel = ?msg.param(0), "Joined channel");
                }
                Vec::new()
            }
            "NICK" => {
                if let (Some(old), Some(new)) = (msg.nick(), msg.param(0)) {
                    tracing::debug!("{} is now known as {}", old, new);
                    if self.is_self(Some(old)) {
                        self.nickname = new.to_string();
                    }
                }
                Vec::new()
            }
            "PRIVMSG" => self.handle_privmsg(msg),
            _ => {
                tracing::trace!(command = %msg.command, params = ?msg.params, "Unhandled line");
                Vec::new()
            }
        }
    }

    fn handle_privmsg(&self, msg: &IrcMessage) -> Vec<SessionAction> {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            tracing::debug!(params = ?msg.params, "Malformed PRIVMSG");
            return Vec::new();
        };
        let user = msg.nick().unwrap_or_default();

        if target.eq_ignore_ascii_case(&self.nickname) {
            tracing::debug!(user = %user, "Ignoring private message");
            return Vec::new();
        }

        if let Some(action) = ctcp_action(text) {
            tracing::debug!("* {} {}", user, action);
            return Vec::new();
        }
        if is_ctcp(text) {
            return Vec::new();
        }

        tracing::debug!("<{}> {}", user, text);

        if should_forward(text) {
            tracing::info!(user = %user, text = %text, "Forwarding chat line");
            vec![SessionAction::Forward(format!("{}: {}", self.tag, text))]
        } else {
            Vec::new()
        }
    }

    fn is_self(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|n| n.eq_ignore_ascii_case(&self.nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::new(&ChatConfig {
            nickname: "knuxbot".to_string(),
            password: Some("oauth:secret".to_string()),
            channel: "#kapellosaur".to_string(),
            ..ChatConfig::default()
        })
    }

    fn line(raw: &str) -> IrcMessage {
        IrcMessage::parse(raw).unwrap()
    }

    #[test]
    fn test_registration_lines() {
        assert_eq!(
            session().registration(),
            vec![
                "PASS oauth:secret",
                "NICK knuxbot",
                "USER knuxbot 0 * :knuxbot",
            ]
        );
    }

    #[test]
    fn test_registration_without_password() {
        let session = ChatSession::new(&ChatConfig {
            nickname: "knuxbot".to_string(),
            password: Some(String::new()),
            ..ChatConfig::default()
        });
        assert_eq!(session.registration()[0], "NICK knuxbot");
    }

    #[test]
    fn test_welcome_joins_channel() {
        let mut session = session();
        let actions = session.handle(&line(":tmi.twitch.tv 001 knuxbot :Welcome, GLHF!"));

        assert!(session.is_registered());
        assert_eq!(
            actions,
            vec![
                SessionAction::Registered,
                SessionAction::Send("JOIN #kapellosaur".to_string()),
            ]
        );
    }

    #[test]
    fn test_ping_pong() {
        let mut session = session();
        assert_eq!(
            session.handle(&line("PING :tmi.twitch.tv")),
            vec![SessionAction::Send("PONG :tmi.twitch.tv".to_string())]
        );
    }

    #[test]
    fn test_nick_collision_appends_suffix() {
        let mut session = session();

        let actions = session.handle(&line(":srv 433 * knuxbot :Nickname is already in use"));
        assert_eq!(actions, vec![SessionAction::Send("NICK knuxbot^".to_string())]);

        let actions = session.handle(&line(":srv 433 * knuxbot^ :Nickname is already in use"));
        assert_eq!(actions, vec![SessionAction::Send("NICK knuxbot^^".to_string())]);
        assert_eq!(session.nickname(), "knuxbot^^");
    }

    #[test]
    fn test_nick_collision_after_registration_is_ignored() {
        let mut session = session();
        session.handle(&line(":srv 001 knuxbot :Welcome"));
        assert!(session.handle(&line(":srv 433 * knuxbot :in use")).is_empty());
        assert_eq!(session.nickname(), "knuxbot");
    }

    #[test]
    fn test_forwards_accepted_channel_message() {
        let mut session = session();
        let actions = session.handle(&line(":alice!alice@host PRIVMSG #kapellosaur :ABCD WXYZ"));
        assert_eq!(
            actions,
            vec![SessionAction::Forward("KNUK TATS: ABCD WXYZ".to_string())]
        );
    }

    #[test]
    fn test_drops_rejected_channel_message() {
        let mut session = session();
        assert!(session
            .handle(&line(":alice!alice@host PRIVMSG #kapellosaur :hello everyone"))
            .is_empty());
    }

    #[test]
    fn test_ignores_private_message() {
        let mut session = session();
        assert!(session
            .handle(&line(":alice!alice@host PRIVMSG knuxbot :ABCD WXYZ"))
            .is_empty());
    }

    #[test]
    fn test_ignores_actions() {
        let mut session = session();
        assert!(session
            .handle(&line(":alice!alice@host PRIVMSG #kapellosaur :\u{1}ACTION ABCD WXYZ\u{1}"))
            .is_empty());
    }

    #[test]
    fn test_tracks_own_nick_change() {
        let mut session = session();
        session.handle(&line(":knuxbot!knuxbot@host NICK knuxbot2"));
        assert_eq!(session.nickname(), "knuxbot2");

        // Someone else renaming does not affect us
        session.handle(&line(":alice!alice@host NICK alice2"));
        assert_eq!(session.nickname(), "knuxbot2");
    }
}
