//! Errors that can occur while talking to a POP3 server or handling a retrieved message.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result;

/// A convenience wrapper around `Result` for `postoffice::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur in the POP3 client.
///
/// Everything except [`Error::NoResponse`] ends the session: the caller should stop issuing
/// commands and must not expect pending `DELE`s to be committed.
#[derive(Debug)]
pub enum Error {
    /// The TCP connection could not be opened (refused, unreachable, or timed out).
    Connect(IoError),
    /// An `io::Error` that occurred while reading or writing an established session. Read and
    /// write timeouts are reported here.
    Io(IoError),
    /// The connection was terminated unexpectedly.
    ConnectionLost,
    /// The server sent something that does not fit the protocol, such as a bad greeting or a
    /// malformed `STAT` reply.
    Protocol(String),
    /// The server rejected `USER` or `PASS`.
    Auth(String),
    /// A `-ERR` reply to a per-message command (`RETR`, `DELE`, `RSET`, `NOOP`).
    NoResponse(String),
    /// A command argument would have broken the line framing.
    Validate(ValidateError),
}

impl Error {
    /// Whether this error leaves the session unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NoResponse(_))
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Connect(ref e) => write!(f, "Connection failed: {}", e),
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            Error::ConnectionLost => f.write_str("Connection lost"),
            Error::Protocol(ref data) => write!(f, "Protocol error: {}", data),
            Error::Auth(ref data) => write!(f, "Authentication failed: {}", data),
            Error::NoResponse(ref data) => write!(f, "No Response: {}", data),
            Error::Validate(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Connect(ref e) | Error::Io(ref e) => Some(e),
            Error::Validate(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Why a retrieved message could not be turned into a usable email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `From:` header was found.
    MissingFrom,
    /// The composed body came out empty.
    MissingBody,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::MissingFrom => f.write_str("Email missing From header"),
            ParseError::MissingBody => f.write_str("Email missing body"),
        }
    }
}

impl StdError for ParseError {}

/// An invalid character found in a command argument.
#[derive(Debug)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(f, "Invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn only_no_response_is_recoverable() {
        assert!(!Error::NoResponse("-ERR no such message".into()).is_fatal());
        assert!(Error::ConnectionLost.is_fatal());
        assert!(Error::Auth("-ERR bad password".into()).is_fatal());
        assert!(Error::Io(IoError::new(ErrorKind::TimedOut, "timed out")).is_fatal());
    }

    #[test]
    fn display_includes_server_text() {
        let e = Error::Protocol("Server greeting failed: -ERR busy".into());
        assert_eq!(e.to_string(), "Protocol error: Server greeting failed: -ERR busy");
        assert_eq!(
            ValidateError('\n').to_string(),
            "Invalid character in input: '\\n'"
        );
    }
}
