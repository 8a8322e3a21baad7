//! Extraction of the addressing headers and the plain-text body from a raw message.
//!
//! The parser is a line-driven state machine. It never looks at more than the current line, so
//! every transition can be exercised without a socket:
//!
//! ```text
//!            blank line, no boundary
//!   Header ---------------------------> Plain
//!     |
//!     | blank line, boundary declared
//!     v
//!   PartBoundary <----- "--boundary" (from any state below)
//!     |
//!     | Content-Type: text/plain
//!     v
//!   SkipSubHeader --- blank line or content line ---> TextBody
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ADDRESS_HEADER_RE: Regex = Regex::new(r"(?i)^(to|from|subject):\s*(.+)$").unwrap();
    static ref BOUNDARY_RE: Regex =
        Regex::new(r#"(?i)boundary=(?:"([^"]+)"|([^";\s]+))"#).unwrap();
    static ref TEXT_PLAIN_RE: Regex = Regex::new(r"(?i)Content-Type:\s*text/plain").unwrap();
    static ref SUB_HEADER_RE: Regex = Regex::new(r"^[A-Za-z-]+:").unwrap();
    static ref BASE64_CTE_RE: Regex =
        Regex::new(r"(?i)^Content-Transfer-Encoding:\s*base64").unwrap();
}

/// Where the parser is within the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Top-level headers, up to the first blank line.
    Header,
    /// Body of a message without a MIME boundary; every line is kept.
    Plain,
    /// Inside a part that is not text/plain, or before the first part.
    PartBoundary,
    /// Headers of a text/plain part.
    SkipSubHeader,
    /// Content of a text/plain part. Blank and header-shaped lines are dropped.
    TextBody,
}

/// Addressing headers and the raw text body of one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageParts {
    pub to: String,
    pub from: String,
    pub subject: String,
    /// Text body lines joined with CRLF and trimmed. Still transfer-encoded if the sender used
    /// quoted-printable.
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    To,
    From,
    Subject,
}

/// Incremental parser over the lines of a [`RawMessage`](crate::types::RawMessage).
#[derive(Debug)]
pub struct EmailParser {
    state: State,
    parts: MessageParts,
    // the header whose folded continuation lines are still being collected
    folding: Option<Field>,
    boundaries: Vec<String>,
    body: Vec<String>,
    part: Vec<String>,
    part_base64: bool,
}

impl Default for EmailParser {
    fn default() -> Self {
        EmailParser::new()
    }
}

impl EmailParser {
    pub fn new() -> Self {
        EmailParser {
            state: State::Header,
            parts: MessageParts::default(),
            folding: None,
            boundaries: Vec::new(),
            body: Vec::new(),
            part: Vec::new(),
            part_base64: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Consumes one line, without its line ending.
    pub fn feed(&mut self, line: &str) {
        match self.state {
            State::Header => self.header_line(line),
            State::Plain => self.body.push(line.to_string()),
            _ => self.multipart_line(line),
        }
    }

    pub fn finish(mut self) -> MessageParts {
        self.flush_part();
        self.parts.body = self.body.join("\r\n").trim().to_string();
        self.parts
    }

    fn header_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.state = if self.boundaries.is_empty() {
                State::Plain
            } else {
                State::PartBoundary
            };
            return;
        }

        if self.boundaries.is_empty() {
            if let Some(boundary) = boundary_param(line) {
                self.boundaries.push(boundary);
            }
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(field) = self.folding {
                let value = self.field_mut(field);
                value.push(' ');
                value.push_str(line.trim());
            }
            return;
        }

        self.folding = None;
        if let Some(cap) = ADDRESS_HEADER_RE.captures(line) {
            let field = match cap[1].to_ascii_lowercase().as_str() {
                "to" => Field::To,
                "from" => Field::From,
                _ => Field::Subject,
            };
            let value = cap[2].trim();
            let slot = self.field_mut(field);
            if slot.is_empty() && !value.is_empty() {
                slot.push_str(value);
                self.folding = Some(field);
            }
        }
    }

    fn multipart_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if self.is_delimiter(trimmed) {
            self.flush_part();
            self.state = State::PartBoundary;
            return;
        }
        if TEXT_PLAIN_RE.is_match(line) {
            self.flush_part();
            self.state = State::SkipSubHeader;
            return;
        }

        match self.state {
            State::PartBoundary => {
                if let Some(boundary) = boundary_param(line) {
                    if !self.boundaries.contains(&boundary) {
                        tracing::trace!(%boundary, "nested multipart");
                        self.boundaries.push(boundary);
                    }
                }
            }
            State::SkipSubHeader => {
                if trimmed.is_empty() {
                    self.state = State::TextBody;
                } else if SUB_HEADER_RE.is_match(line) {
                    if BASE64_CTE_RE.is_match(line) {
                        self.part_base64 = true;
                    }
                } else if line.starts_with(' ') || line.starts_with('\t') {
                    // folded sub-header parameter
                } else {
                    self.state = State::TextBody;
                    self.part.push(line.to_string());
                }
            }
            State::TextBody => {
                // header-shaped lines are dropped until the next delimiter
                if !trimmed.is_empty() && !SUB_HEADER_RE.is_match(line) {
                    self.part.push(line.to_string());
                }
            }
            State::Header | State::Plain => unreachable!("not a multipart state"),
        }
    }

    fn is_delimiter(&self, trimmed: &str) -> bool {
        trimmed
            .strip_prefix("--")
            .map(|rest| self.boundaries.iter().any(|b| rest.starts_with(b.as_str())))
            .unwrap_or(false)
    }

    fn flush_part(&mut self) {
        let lines = std::mem::take(&mut self.part);
        let base64 = std::mem::replace(&mut self.part_base64, false);
        if lines.is_empty() {
            return;
        }
        if base64 {
            let joined: String = lines.concat().split_whitespace().collect();
            match STANDARD.decode(joined.as_bytes()) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    self.body.extend(
                        text.lines()
                            .filter(|l| !l.trim().is_empty())
                            .map(String::from),
                    );
                    return;
                }
                Err(e) => tracing::debug!(error = %e, "text part is not valid base64, keeping it as-is"),
            }
        }
        self.body.extend(lines);
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::To => &mut self.parts.to,
            Field::From => &mut self.parts.from,
            Field::Subject => &mut self.parts.subject,
        }
    }
}

fn boundary_param(line: &str) -> Option<String> {
    let cap = BOUNDARY_RE.captures(line)?;
    cap.get(1)
        .or_else(|| cap.get(2))
        .map(|m| m.as_str().to_string())
}

/// Parses a whole message.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> MessageParts {
    let mut parser = EmailParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}
