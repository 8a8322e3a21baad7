//! A mail gateway for a text game's post office.
//!
//! Players reply by email to a shared mailbox. [`MailboxSync`] logs in to that mailbox over
//! plaintext POP3 ([RFC 1939](https://tools.ietf.org/html/rfc1939)), turns every reply into a
//! [`ParsedEmail`] whose body is the letter shown in game, and deletes the replies it took.
//! [`outbound::Mailer`] sends letters the other way, and [`store::FileStore`] keeps game files.
//!
//! # Usage
//!
//! ```no_run
//! use postoffice::{MailboxConfig, MailboxSync};
//!
//! let config = MailboxConfig::new("pop.example.com", "post_office@example.com", "password");
//! let result = MailboxSync::new(&config).run();
//! for email in result.emails() {
//!     println!("{} -> {}", email.display_name, email.body);
//! }
//! println!("{}", result.to_json());
//! ```
//!
//! The protocol layer can also be driven by hand. Connecting gives a [`Client`], logging in
//! gives a [`Session`], and [`Session::quit`] consumes the session:
//!
//! ```no_run
//! # use postoffice::ClientBuilder;
//! # fn main() -> postoffice::Result<()> {
//! let client = ClientBuilder::new("pop.example.com", 110).connect()?;
//! let mut session = client.login("post_office", "password").map_err(|e| e.0)?;
//! let stat = session.stat()?;
//! for msg in 1..=stat.count {
//!     let raw = session.retr(msg)?;
//!     println!("{}", postoffice::mime::parse(raw.lines()).subject);
//! }
//! session.quit()?;
//! # Ok(())
//! # }
//! ```

mod parse;
mod reader;

pub mod body;
pub mod client;
mod client_builder;
pub mod config;
pub mod error;
pub mod mime;
pub mod outbound;
pub mod store;
pub mod sync;
pub mod types;

pub use crate::client::{Client, Connection, Session};
pub use crate::client_builder::ClientBuilder;
pub use crate::config::MailboxConfig;
pub use crate::error::{Error, Result};
pub use crate::sync::MailboxSync;
pub use crate::types::*;

#[cfg(test)]
mod mock_stream;
