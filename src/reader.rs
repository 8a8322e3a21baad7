//! Reading of POP3 multi-line responses.
//!
//! A multi-line response is a run of lines ended by a line holding a single `.`, as described in
//! [RFC 1939 section 3](https://tools.ietf.org/html/rfc1939#section-3). Lines that begin with the
//! termination octet are byte-stuffed by the server; the extra `.` is removed here.

use std::io::BufRead;

const LF: u8 = 0x0a;

/// Reads the body of one multi-line response from `stream`.
///
/// The terminating `.` line is consumed but not returned, and each returned line has its line
/// ending (CRLF or bare LF) removed. If the stream ends or fails before the terminator arrives,
/// whatever was read up to that point is returned.
pub fn read_message<R: BufRead>(stream: &mut R) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match stream.read_until(LF, &mut buf) {
            Ok(0) => {
                tracing::debug!(lines = lines.len(), "stream ended before terminator");
                break;
            }
            Err(e) => {
                tracing::debug!(lines = lines.len(), error = %e, "read failed before terminator");
                break;
            }
            Ok(_) => {}
        }
        if buf == b".\r\n" || buf == b".\n" {
            break;
        }
        let line = String::from_utf8_lossy(strip_line_ending(&buf));
        lines.push(unstuff(&line).to_string());
    }
    lines
}

/// Strips every trailing CR and LF octet.
pub(crate) fn strip_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\r' || line[end - 1] == LF) {
        end -= 1;
    }
    &line[..end]
}

fn unstuff(line: &str) -> &str {
    if line.starts_with("..") {
        &line[1..]
    } else {
        line
    }
}
