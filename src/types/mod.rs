//! This module contains types used throughout the POP3 session and the reply pipeline.

mod email;
mod outcome;

pub use self::email::ParsedEmail;
pub use self::outcome::MailboxResult;

/// From section [5 of RFC 1939](https://tools.ietf.org/html/rfc1939#section-5).
///
/// Each message in the maildrop is assigned a message-number, starting at 1. Message-numbers are
/// only valid within the session that assigned them: once a session ends, the server may
/// renumber the remaining messages.
pub type Seq = u32;

/// The maildrop listing returned by `STAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// Number of messages in the maildrop, not counting those marked as deleted.
    pub count: u32,
    /// Size of the maildrop in octets.
    pub size: u64,
}

/// One maildrop entry exactly as `RETR` returned it: header and body lines with line endings
/// removed and byte-stuffing undone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMessage {
    lines: Vec<String>,
}

impl RawMessage {
    pub fn new(lines: Vec<String>) -> Self {
        RawMessage { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        RawMessage::new(text.lines().map(String::from).collect())
    }
}
