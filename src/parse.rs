use lazy_static::lazy_static;
use regex::Regex;

use super::error::{Error, Result};
use super::types::Stat;

lazy_static! {
    static ref STAT_RE: Regex = Regex::new(r"^\+OK\s+(\d+)\s+(\d+)").unwrap();
}

/// Status indicator of a single-line server reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Ok,
    Err,
}

/// Splits a reply line into its status indicator and the text after it.
///
/// Anything that does not begin with `+OK` counts as a failure, including garbage and `-ERR`.
pub(crate) fn parse_status(line: &str) -> (Status, &str) {
    match line.strip_prefix("+OK") {
        Some(rest) => (Status::Ok, rest.trim()),
        None => (Status::Err, line.strip_prefix("-ERR").unwrap_or(line).trim()),
    }
}

/// Parses a `STAT` reply of the form `+OK <count> <size>`.
pub(crate) fn parse_stat(line: &str) -> Result<Stat> {
    let cap = STAT_RE
        .captures(line)
        .ok_or_else(|| Error::Protocol(format!("STAT command failed: {}", line)))?;
    let number = |i: usize| cap.get(i).map(|m| m.as_str()).unwrap_or("");
    let count = number(1)
        .parse()
        .map_err(|_| Error::Protocol(format!("STAT count out of range: {}", line)))?;
    let size = number(2)
        .parse()
        .map_err(|_| Error::Protocol(format!("STAT size out of range: {}", line)))?;
    Ok(Stat { count, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_of_replies() {
        assert_eq!(parse_status("+OK 2 messages"), (Status::Ok, "2 messages"));
        assert_eq!(parse_status("+OK"), (Status::Ok, ""));
        assert_eq!(parse_status("-ERR no such message"), (Status::Err, "no such message"));
        assert_eq!(parse_status("* garbage"), (Status::Err, "* garbage"));
        assert_eq!(parse_status(" +OK"), (Status::Err, "+OK"));
    }

    #[test]
    fn stat_reply() {
        assert_eq!(parse_stat("+OK 2 500").unwrap(), Stat { count: 2, size: 500 });
        assert_eq!(parse_stat("+OK 0 0 extra").unwrap(), Stat::default());
    }

    #[test]
    fn stat_rejects_malformed() {
        for line in &["+OK", "+OK two 500", "-ERR locked", "+OK 99999999999 1"] {
            match parse_stat(line) {
                Err(Error::Protocol(_)) => {}
                other => panic!("expected protocol error for {:?}, got {:?}", line, other),
            }
        }
    }
}
