//! WhatsApp JID 解析与规范化

use std::fmt;
use std::str::FromStr;

use crate::error::{MessengerError, Result};
use crate::utils::phone::digits_only;

/// Server for individual user accounts.
pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
/// Server for group chats.
pub const GROUP_SERVER: &str = "g.us";
/// Legacy user server still seen in exported contact lists.
const LEGACY_USER_SERVER: &str = "c.us";

const KNOWN_SERVERS: &[&str] = &[
    DEFAULT_USER_SERVER,
    GROUP_SERVER,
    LEGACY_USER_SERVER,
    "broadcast",
    "lid",
    "newsletter",
];

/// A WhatsApp address: `user[:device]@server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Jid {
    pub user: String,
    pub device: Option<u16>,
    pub server: String,
}

impl Jid {
    /// A user JID on the default server.
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            device: None,
            server: DEFAULT_USER_SERVER.to_string(),
        }
    }

    /// Parse a fully qualified JID.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = |detail: &str| MessengerError::InvalidIdentifier {
            value: raw.to_string(),
            detail: detail.to_string(),
        };

        let (local, server) = raw
            .split_once('@')
            .ok_or_else(|| invalid("missing '@server' part"))?;
        if server.contains('@') {
            return Err(invalid("more than one '@'"));
        }
        let server = server.to_ascii_lowercase();
        if !KNOWN_SERVERS.contains(&server.as_str()) {
            return Err(invalid("unknown server"));
        }

        let (user, device) = match local.split_once(':') {
            Some((user, device)) => {
                let device = device
                    .parse::<u16>()
                    .map_err(|_| invalid("device part is not a number"))?;
                (user, Some(device))
            }
            None => (local, None),
        };
        if user.is_empty() {
            return Err(invalid("empty user part"));
        }

        // c.us 是旧格式，统一为 s.whatsapp.net
        let server = if server == LEGACY_USER_SERVER {
            DEFAULT_USER_SERVER.to_string()
        } else {
            server
        };

        Ok(Self {
            user: user.to_string(),
            device,
            server,
        })
    }

    /// Resolve a recipient given as either a JID or a phone number.
    ///
    /// Values containing `@` are parsed as JIDs; anything else is stripped to
    /// digits and addressed on the default user server.
    pub fn resolve(recipient: &str) -> Result<Self> {
        if recipient.contains('@') {
            return Self::parse(recipient);
        }
        let digits = digits_only(recipient);
        if digits.is_empty() {
            return Err(MessengerError::InvalidIdentifier {
                value: recipient.to_string(),
                detail: "no digits in phone number".to_string(),
            });
        }
        Ok(Self::user(digits))
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }

    /// The same account without a device suffix.
    #[must_use]
    pub fn to_non_device(&self) -> Self {
        Self {
            user: self.user.clone(),
            device: None,
            server: self.server.clone(),
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            Some(device) => write!(f, "{}:{device}@{}", self.user, self.server),
            None => write!(f, "{}@{}", self.user, self.server),
        }
    }
}

impl FromStr for Jid {
    type Err = MessengerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
