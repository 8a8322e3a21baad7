//! The retrieval loop: pull player replies out of the shared mailbox and delete the ones taken.

use std::fmt;
use std::io::{Read, Write};

use chrono::Utc;

use crate::body::{self, QuoteTrimmer};
use crate::client::{Client, Session};
use crate::config::MailboxConfig;
use crate::error::{Error, ParseError, Result};
use crate::mime;
use crate::types::{MailboxResult, ParsedEmail, Seq};

/// Why a well-formed email was left on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The email could not be turned into a letter.
    Unparsable(ParseError),
    /// `To` does not mention the mailbox, so this is not a reply to it.
    NotAddressedToMailbox { to: String },
    /// `From` mentions the mailbox: one of our own outgoing messages.
    OwnMessage { from: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Rejection::Unparsable(ref e) => fmt::Display::fmt(e, f),
            Rejection::NotAddressedToMailbox { ref to } => {
                write!(f, "Email not addressed to mailbox. To: {}", to)
            }
            Rejection::OwnMessage { ref from } => write!(f, "System email from: {}", from),
        }
    }
}

/// Syncs one mailbox.
///
/// Each run opens its own session, so runs share no state; they should still not overlap
/// against the same mailbox, since each one commits its own deletions on `QUIT`.
#[derive(Debug)]
pub struct MailboxSync<'a> {
    config: &'a MailboxConfig,
    trimmer: QuoteTrimmer,
}

impl<'a> MailboxSync<'a> {
    pub fn new(config: &'a MailboxConfig) -> Self {
        MailboxSync {
            config,
            trimmer: QuoteTrimmer::new(&config.signature_names),
        }
    }

    /// Connects to the configured server and runs the sync.
    ///
    /// Never fails: problems that end the session are reported in the result's `errors`.
    pub fn run(&self) -> MailboxResult {
        tracing::info!(host = %self.config.host, port = self.config.port, "connecting");
        match self.config.client_builder().connect() {
            Ok(client) => self.run_on(client),
            Err(e) => {
                tracing::error!(error = %e, "mailbox sync aborted");
                MailboxResult::new(Vec::new(), vec![e.to_string()])
            }
        }
    }

    /// Runs the sync over an already connected client whose greeting is still unread.
    pub fn run_on<T: Read + Write>(&self, client: Client<T>) -> MailboxResult {
        let mut emails = Vec::new();
        let errors = match self.drive(client, &mut emails) {
            Ok(()) => {
                tracing::info!(count = emails.len(), "retrieved new messages");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "mailbox sync aborted");
                vec![e.to_string()]
            }
        };
        MailboxResult::new(emails, errors)
    }

    fn drive<T: Read + Write>(
        &self,
        mut client: Client<T>,
        emails: &mut Vec<ParsedEmail>,
    ) -> Result<()> {
        client.read_greeting()?;
        tracing::info!(user = %self.config.username, "authenticating");
        let mut session = client
            .login(&self.config.username, &self.config.password)
            .map_err(|(e, _)| e)?;

        let count = session.stat()?.count;
        tracing::info!(count, "messages in mailbox");

        for msg in 1..=count {
            self.take(&mut session, msg, emails)?;
        }

        tracing::debug!("closing connection");
        session.quit()
    }

    /// Handles message `msg`, appending it to `emails` if accepted. Skipped messages are left on
    /// the server.
    fn take<T: Read + Write>(
        &self,
        session: &mut Session<T>,
        msg: Seq,
        emails: &mut Vec<ParsedEmail>,
    ) -> Result<()> {
        tracing::debug!(msg, "retrieving message");
        let raw = match session.retr(msg) {
            Ok(raw) => raw,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(msg, error = %e, "failed to retrieve message");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut email = match self.accept(mime::parse(raw.lines())) {
            Ok(email) => email,
            Err(rejection) => {
                tracing::info!(msg, reason = %rejection, "leaving message untouched");
                return Ok(());
            }
        };
        email.display_name = email.sender_name();
        email.message_id = format!("{}-{}", msg, Utc::now().timestamp());
        tracing::info!(
            msg,
            from = %email.from,
            display_name = %email.display_name,
            "accepted message"
        );
        emails.push(email);

        match session.dele(msg) {
            Ok(()) => Ok(()),
            Err(Error::NoResponse(reply)) => {
                tracing::warn!(msg, %reply, "could not mark message as deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Builds the letter and applies the mailbox filters, in order.
    pub fn accept(
        &self,
        parts: mime::MessageParts,
    ) -> ::std::result::Result<ParsedEmail, Rejection> {
        let email = body::extract(parts, &self.trimmer).map_err(Rejection::Unparsable)?;
        if !self.config.mentions_mailbox(&email.to) {
            return Err(Rejection::NotAddressedToMailbox { to: email.to });
        }
        if self.config.mentions_mailbox(&email.from) {
            return Err(Rejection::OwnMessage { from: email.from });
        }
        Ok(email)
    }
}
