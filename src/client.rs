use bufstream::BufStream;
use std::io::{BufRead, Read, Write};
use std::ops::{Deref, DerefMut};

use super::error::{Error, Result, ValidateError};
use super::parse::{parse_stat, parse_status, Status};
use super::reader::{read_message, strip_line_ending};
use super::types::{RawMessage, Seq, Stat};

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

fn validate_str(value: &str) -> Result<&str> {
    if value.contains('\n') {
        return Err(Error::Validate(ValidateError('\n')));
    }
    if value.contains('\r') {
        return Err(Error::Validate(ValidateError('\r')));
    }
    Ok(value)
}

/// An authenticated POP3 session, in the TRANSACTION state of
/// [RFC 1939](https://tools.ietf.org/html/rfc1939#section-5).
///
/// Messages marked with [`Session::dele`] are only removed from the maildrop once
/// [`Session::quit`] completes. Dropping a session without quitting closes the connection and
/// leaves every message in place.
#[derive(Debug)]
pub struct Session<T: Read + Write> {
    conn: Connection<T>,
}

/// A connected POP3 client that has not yet logged in.
///
/// Call [`Client::login`] to move to a [`Session`].
#[derive(Debug)]
pub struct Client<T: Read + Write> {
    conn: Connection<T>,
}

/// The buffered command stream shared by [`Client`] and [`Session`].
#[derive(Debug)]
pub struct Connection<T: Read + Write> {
    pub(crate) stream: BufStream<T>,
    greeting_read: bool,
}

// `Deref` instances are so we can make use of the same underlying primitives in Client and
// Session
impl<T: Read + Write> Deref for Client<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Client<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

impl<T: Read + Write> Deref for Session<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Session<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

// hand the client back on failure so the caller can retry or quit on the same connection
macro_rules! ok_or_unauth_client_err {
    ($r:expr, $self:expr) => {
        match $r {
            Ok(o) => o,
            Err(e) => return Err((e, $self)),
        }
    };
}

impl<T: Read + Write> Client<T> {
    /// Creates a new client over an already connected stream.
    ///
    /// The server greeting has not been consumed yet; either call [`Client::read_greeting`] or
    /// let [`Client::login`] do it.
    pub fn new(stream: T) -> Client<T> {
        Client {
            conn: Connection {
                stream: BufStream::new(stream),
                greeting_read: false,
            },
        }
    }

    /// Reads the server greeting and returns the text after `+OK`.
    ///
    /// Anything other than a positive greeting is a [`Error::Protocol`].
    pub fn read_greeting(&mut self) -> Result<String> {
        let line = self.read_reply_line()?;
        self.greeting_read = true;
        match parse_status(&line) {
            (Status::Ok, text) => {
                tracing::debug!(greeting = %text, "server greeting received");
                Ok(text.to_string())
            }
            (Status::Err, _) => Err(Error::Protocol(format!("Server greeting failed: {}", line))),
        }
    }

    /// Logs in with `USER` and `PASS`.
    ///
    /// On failure the client is handed back alongside the error. A rejected name or password
    /// is an [`Error::Auth`].
    pub fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> ::std::result::Result<Session<T>, (Error, Client<T>)> {
        if !self.greeting_read {
            ok_or_unauth_client_err!(self.read_greeting(), self);
        }
        let username = ok_or_unauth_client_err!(validate_str(username), self);
        let password = ok_or_unauth_client_err!(validate_str(password), self);

        let reply = ok_or_unauth_client_err!(
            self.run_command_and_read_reply(&format!("USER {}", username)),
            self
        );
        if let (Status::Err, _) = parse_status(&reply) {
            return Err((Error::Auth(format!("USER command failed: {}", reply)), self));
        }
        let reply = ok_or_unauth_client_err!(
            self.run_command_and_read_reply(&format!("PASS {}", password)),
            self
        );
        if let (Status::Err, _) = parse_status(&reply) {
            return Err((Error::Auth(format!("PASS command failed: {}", reply)), self));
        }
        tracing::debug!(user = %username, "authenticated");

        Ok(Session { conn: self.conn })
    }
}

impl<T: Read + Write> Session<T> {
    /// Returns the number of messages in the maildrop and its size in octets.
    pub fn stat(&mut self) -> Result<Stat> {
        let reply = self.run_command_and_read_reply("STAT")?;
        parse_stat(&reply)
    }

    /// Retrieves message `msg` in full.
    ///
    /// A `-ERR` reply is an [`Error::NoResponse`], which does not end the session.
    pub fn retr(&mut self, msg: Seq) -> Result<RawMessage> {
        self.run_command_and_check_ok(&format!("RETR {}", msg))?;
        let lines = read_message(&mut self.conn.stream);
        tracing::trace!(msg, lines = lines.len(), "message read");
        Ok(RawMessage::new(lines))
    }

    /// Marks message `msg` as deleted. The deletion takes effect on [`Session::quit`].
    pub fn dele(&mut self, msg: Seq) -> Result<()> {
        self.run_command_and_check_ok(&format!("DELE {}", msg)).map(|_| ())
    }

    /// Unmarks every message marked as deleted in this session.
    pub fn rset(&mut self) -> Result<()> {
        self.run_command_and_check_ok("RSET").map(|_| ())
    }

    /// Does nothing; the server just replies positively.
    pub fn noop(&mut self) -> Result<()> {
        self.run_command_and_check_ok("NOOP").map(|_| ())
    }

    /// Ends the session, committing any deletions, and closes the connection.
    ///
    /// A negative reply means the server could not remove the marked messages.
    pub fn quit(mut self) -> Result<()> {
        let reply = self.run_command_and_read_reply("QUIT")?;
        match parse_status(&reply) {
            (Status::Ok, _) => Ok(()),
            (Status::Err, _) => Err(Error::Protocol(format!("QUIT failed: {}", reply))),
        }
    }
}

impl<T: Read + Write> Connection<T> {
    /// Runs a command and returns its reply line if the status is `+OK`.
    pub(crate) fn run_command_and_check_ok(&mut self, command: &str) -> Result<String> {
        let reply = self.run_command_and_read_reply(command)?;
        match parse_status(&reply) {
            (Status::Ok, _) => Ok(reply),
            (Status::Err, _) => Err(Error::NoResponse(reply)),
        }
    }

    /// Runs a command and returns its single reply line, whatever its status.
    pub(crate) fn run_command_and_read_reply(&mut self, command: &str) -> Result<String> {
        self.run_command(command)?;
        self.read_reply_line()
    }

    fn run_command(&mut self, command: &str) -> Result<()> {
        self.write_line(command.as_bytes())?;
        if command.starts_with("PASS ") {
            tracing::trace!("C: PASS ****");
        } else {
            tracing::trace!("C: {}", command);
        }
        Ok(())
    }

    fn read_reply_line(&mut self) -> Result<String> {
        let mut v = Vec::new();
        self.readline(&mut v)?;
        let line = String::from_utf8_lossy(strip_line_ending(&v)).into_owned();
        tracing::trace!("S: {}", line);
        Ok(line)
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = self.stream.read_until(LF, into)?;
        if read == 0 {
            return Err(Error::ConnectionLost);
        }
        Ok(read)
    }

    fn write_line(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf)?;
        self.stream.write_all(&[CR, LF])?;
        self.stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock_stream::{transcript, MockStream};
    use super::*;

    fn session(response: &str) -> (Session<MockStream>, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        let mock = MockStream::new(format!("+OK ready\r\n+OK\r\n+OK\r\n{}", response).into_bytes());
        let written = mock.written();
        let session = Client::new(mock).login("user", "secret").unwrap();
        written.borrow_mut().clear();
        (session, written)
    }

    #[test]
    fn read_greeting() {
        let mut client = Client::new(MockStream::new(b"+OK POP3 server ready\r\n".to_vec()));
        assert_eq!(client.read_greeting().unwrap(), "POP3 server ready");
    }

    #[test]
    fn bad_greeting_is_protocol_error() {
        let mut client = Client::new(MockStream::new(b"-ERR too busy\r\n".to_vec()));
        match client.read_greeting() {
            Err(Error::Protocol(msg)) => assert_eq!(msg, "Server greeting failed: -ERR too busy"),
            other => panic!("unexpected greeting result: {:?}", other),
        }
    }

    #[test]
    fn readline_delay_read() {
        let mock = MockStream::new(b"+OK slow server\r\n".to_vec()).with_delay();
        let mut client = Client::new(mock);
        assert_eq!(client.read_greeting().unwrap(), "slow server");
    }

    #[test]
    fn readline_eof() {
        let mut client = Client::new(MockStream::default().with_eof());
        match client.read_greeting() {
            Err(Error::ConnectionLost) => {}
            other => panic!("EOF read did not return connection lost: {:?}", other),
        }
    }

    #[test]
    fn readline_err() {
        let mut client = Client::new(MockStream::default().with_err());
        match client.read_greeting() {
            Err(Error::Io(_)) => {}
            other => panic!("read error was not reported as io: {:?}", other),
        }
    }

    #[test]
    fn login() {
        let mock = MockStream::new(b"+OK ready\r\n+OK user accepted\r\n+OK logged in\r\n".to_vec());
        let written = mock.written();
        Client::new(mock).login("post_office@example.com", "hunter2").unwrap();
        assert_eq!(
            transcript(&written),
            "USER post_office@example.com\r\nPASS hunter2\r\n",
            "Invalid login commands"
        );
    }

    #[test]
    fn login_rejected_password() {
        let mock = MockStream::new(b"+OK ready\r\n+OK\r\n-ERR invalid password\r\n".to_vec());
        match Client::new(mock).login("user", "wrong") {
            Err((Error::Auth(msg), _client)) => {
                assert_eq!(msg, "PASS command failed: -ERR invalid password")
            }
            Err((e, _)) => panic!("unexpected error: {:?}", e),
            Ok(_) => panic!("login should have failed"),
        }
    }

    #[test]
    fn login_rejected_user_skips_pass() {
        let mock = MockStream::new(b"+OK ready\r\n-ERR unknown mailbox\r\n".to_vec());
        let written = mock.written();
        match Client::new(mock).login("nobody", "pw") {
            Err((Error::Auth(msg), _)) => assert_eq!(msg, "USER command failed: -ERR unknown mailbox"),
            _ => panic!("login should have failed on USER"),
        }
        assert_eq!(transcript(&written), "USER nobody\r\n");
    }

    #[test]
    fn login_refuses_line_breaks() {
        let mock = MockStream::new(b"+OK ready\r\n".to_vec());
        let written = mock.written();
        match Client::new(mock).login("user\r\nDELE 1", "pw") {
            Err((Error::Validate(ValidateError('\n')), _)) => {}
            _ => panic!("line break in user name was not rejected"),
        }
        assert!(written.borrow().is_empty());
    }

    #[test]
    fn stat() {
        let (mut session, written) = session("+OK 2 500\r\n");
        assert_eq!(session.stat().unwrap(), Stat { count: 2, size: 500 });
        assert_eq!(transcript(&written), "STAT\r\n");
    }

    #[test]
    fn retr() {
        let (mut session, written) =
            session("+OK 40 octets\r\nFrom: a@b.c\r\n\r\nHi there\r\n.\r\n+OK\r\n");
        let message = session.retr(3).unwrap();
        assert_eq!(message.lines(), &["From: a@b.c", "", "Hi there"]);
        session.noop().unwrap();
        assert_eq!(transcript(&written), "RETR 3\r\nNOOP\r\n");
    }

    #[test]
    fn retr_missing_message_keeps_session() {
        let (mut session, _) = session("-ERR no such message\r\n+OK 1 10\r\n");
        match session.retr(9) {
            Err(ref e @ Error::NoResponse(_)) => assert!(!e.is_fatal()),
            other => panic!("unexpected retr result: {:?}", other),
        }
        assert_eq!(session.stat().unwrap().count, 1);
    }

    #[test]
    fn dele_and_rset() {
        let (mut session, written) = session("+OK marked\r\n-ERR already deleted\r\n+OK\r\n");
        session.dele(1).unwrap();
        assert!(matches!(session.dele(1), Err(Error::NoResponse(_))));
        session.rset().unwrap();
        assert_eq!(transcript(&written), "DELE 1\r\nDELE 1\r\nRSET\r\n");
    }

    #[test]
    fn quit() {
        let (session, written) = session("+OK bye\r\n");
        session.quit().unwrap();
        assert_eq!(transcript(&written), "QUIT\r\n");
    }

    #[test]
    fn quit_failure_is_reported() {
        let (session, _) = session("-ERR some deleted messages not removed\r\n");
        assert!(matches!(session.quit(), Err(Error::Protocol(_))));
    }
}
