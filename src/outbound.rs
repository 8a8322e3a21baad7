//! Relaying game letters out through a mail transport.

use std::fmt::Display;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, Message, SendmailTransport, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};

/// A letter to send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Sender override; the mailer's default sender is used when absent.
    #[serde(default)]
    pub from: Option<String>,
}

/// What happened to a send request. Serializes as `{success, message}` or `{success, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    fn sent() -> Self {
        SendOutcome {
            success: true,
            message: Some("Email sent successfully".to_string()),
            error: None,
        }
    }

    fn failed<S: Into<String>>(error: S) -> Self {
        SendOutcome {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| String::from(r#"{"success":false,"error":"serialization failed"}"#))
    }
}

/// Sends [`OutboundMail`] through any lettre transport.
#[derive(Debug)]
pub struct Mailer<T> {
    transport: T,
    default_from: String,
}

impl Mailer<SmtpTransport> {
    /// Relays through an SMTP server without TLS or authentication.
    pub fn smtp<S: Into<String>>(host: &str, port: u16, default_from: S) -> Self {
        let transport = SmtpTransport::builder_dangerous(host).port(port).build();
        Mailer::new(transport, default_from)
    }
}

impl Mailer<SendmailTransport> {
    /// Hands messages to the local `sendmail` binary.
    pub fn sendmail<S: Into<String>>(default_from: S) -> Self {
        Mailer::new(SendmailTransport::new(), default_from)
    }
}

impl<T> Mailer<T>
where
    T: Transport,
    T::Error: Display,
{
    pub fn new<S: Into<String>>(transport: T, default_from: S) -> Self {
        Mailer {
            transport,
            default_from: default_from.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `mail` as a UTF-8 plain-text message.
    ///
    /// An invalid recipient and every transport failure come back as an unsuccessful outcome.
    pub fn send(&self, mail: &OutboundMail) -> SendOutcome {
        let to: Address = match mail.to.trim().parse() {
            Ok(to) => to,
            Err(e) => {
                tracing::warn!(to = %mail.to, error = %e, "rejected recipient");
                return SendOutcome::failed("Invalid recipient email address");
            }
        };
        let from_text = mail.from.as_deref().unwrap_or(&self.default_from);
        let from: Mailbox = match from_text.parse() {
            Ok(from) => from,
            Err(e) => return SendOutcome::failed(format!("Invalid sender address: {}", e)),
        };

        let message = Message::builder()
            .from(from)
            .to(Mailbox::new(None, to))
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone());
        let message = match message {
            Ok(message) => message,
            Err(e) => return SendOutcome::failed(format!("Failed to build email: {}", e)),
        };

        match self.transport.send(&message) {
            Ok(_) => {
                tracing::info!(to = %mail.to, "email sent");
                SendOutcome::sent()
            }
            Err(e) => {
                tracing::error!(to = %mail.to, error = %e, "email failed to send");
                SendOutcome::failed(format!("Failed to send email: {}", e))
            }
        }
    }

    /// Sends a JSON `{to, subject, body, from?}` request.
    pub fn send_json(&self, payload: &str) -> SendOutcome {
        tracing::debug!(%payload, "send request");
        match serde_json::from_str::<OutboundMail>(payload) {
            Ok(mail) => self.send(&mail),
            Err(e) => {
                tracing::warn!(error = %e, "malformed send request");
                SendOutcome::failed("Missing required fields: to, subject, body")
            }
        }
    }
}
