//! Turning a raw text body into the letter delivered to the game.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;
use crate::mime::MessageParts;
use crate::types::ParsedEmail;

lazy_static! {
    static ref QP_MARKER_RE: Regex = Regex::new(r"=\r?\n|=[0-9A-F]{2}").unwrap();
    static ref REPLY_OPENER_RE: Regex = Regex::new(r"(?-u)On\s+\w+,\s+\w+\s+\d+,\s+\d{4}").unwrap();
    static ref QUOTED_LINE_RE: Regex = Regex::new(r"(?m)^>").unwrap();
    static ref SIG_SEPARATOR_RE: Regex = Regex::new(r"(?m)^--\s*$").unwrap();
    static ref REGARDS_RE: Regex = Regex::new(r"(?mi)^Best regards,").unwrap();
    static ref RECIPIENT_RE: Regex = Regex::new(r"(?i)a message from\s+(\w+)").unwrap();
}

/// Decodes quoted-printable text, but only if it carries a soft line break or an `=XX` escape
/// with uppercase hex.
///
/// Text without either marker comes back unchanged. Once decoding runs, lowercase escapes are
/// decoded too. A lone `=` that starts neither is kept as
/// a literal character.
pub fn decode_quoted_printable(text: &str) -> String {
    if !QP_MARKER_RE.is_match(text) {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        // soft line break, allowing transport padding between '=' and the line ending
        let mut j = i + 1;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if bytes.get(j) == Some(&b'\r') && bytes.get(j + 1) == Some(&b'\n') {
            i = j + 2;
            continue;
        }
        if bytes.get(j) == Some(&b'\n') {
            i = j + 1;
            continue;
        }

        match (bytes.get(i + 1).and_then(hex), bytes.get(i + 2).and_then(hex)) {
            (Some(hi), Some(lo)) => {
                out.push(hi << 4 | lo);
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: &u8) -> Option<u8> {
    (*b as char).to_digit(16).map(|d| d as u8)
}

/// Cuts quoted history and signatures off a reply.
///
/// The markers are tried in a fixed order: a dated "On <day>, <month> <n>, <year>" opener, a
/// `>` quoted line, a `--` signature separator, a "Best regards," sign-off, then a line starting
/// with one of the configured signature names. The first kind that occurs anywhere in the text
/// decides the cut, even if a later kind occurs earlier in the text.
#[derive(Debug, Clone)]
pub struct QuoteTrimmer {
    markers: Vec<Regex>,
}

impl QuoteTrimmer {
    /// `signature_names` are matched case-insensitively at the start of a line. Empty names are
    /// ignored.
    pub fn new<S: AsRef<str>>(signature_names: &[S]) -> Self {
        let mut markers = vec![
            REPLY_OPENER_RE.clone(),
            QUOTED_LINE_RE.clone(),
            SIG_SEPARATOR_RE.clone(),
            REGARDS_RE.clone(),
        ];
        let names: Vec<String> = signature_names
            .iter()
            .map(|n| n.as_ref().trim())
            .filter(|n| !n.is_empty())
            .map(regex::escape)
            .collect();
        if !names.is_empty() {
            let pattern = format!(r"(?mi)^(?:{})", names.join("|"));
            match Regex::new(&pattern) {
                Ok(re) => markers.push(re),
                Err(e) => tracing::warn!(error = %e, "ignoring signature names"),
            }
        }
        QuoteTrimmer { markers }
    }

    /// Returns the reply text before the first applicable marker, trimmed.
    pub fn trim<'a>(&self, text: &'a str) -> &'a str {
        for marker in &self.markers {
            if let Some(m) = marker.find(text) {
                return text[..m.start()].trim();
            }
        }
        text.trim()
    }
}

impl Default for QuoteTrimmer {
    fn default() -> Self {
        QuoteTrimmer::new(&["Applied Computer Services"])
    }
}

/// Wraps a reply in the letter form shown to players.
pub fn compose_letter(from: &str, reply: &str) -> String {
    format!("A letter from {}.\n\nIt reads,\n\n{}", from.trim(), reply)
        .trim()
        .to_string()
}

/// Finds the player named in a "a message from <name>" phrase.
pub fn extract_recipient(body: &str) -> Option<&str> {
    RECIPIENT_RE
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Builds the delivered email from parsed message parts.
///
/// The body is decoded, stripped of quoted history and wrapped as a letter. The email is
/// rejected if it has no sender or the letter comes out empty.
pub fn extract(parts: MessageParts, trimmer: &QuoteTrimmer) -> Result<ParsedEmail, ParseError> {
    let MessageParts {
        to,
        from,
        subject,
        body,
    } = parts;

    let decoded = decode_quoted_printable(&body);
    let reply = trimmer.trim(&decoded);
    let letter = compose_letter(&from, reply);

    let recipient = match extract_recipient(&letter) {
        Some(name) => {
            tracing::debug!(recipient = name, "extracted recipient");
            name.to_string()
        }
        None => String::new(),
    };

    if from.is_empty() {
        return Err(ParseError::MissingFrom);
    }
    if letter.is_empty() {
        return Err(ParseError::MissingBody);
    }

    Ok(ParsedEmail {
        to,
        from,
        subject,
        body: letter,
        recipient,
        ..ParsedEmail::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qp_without_markers_is_untouched() {
        let text = "a = b\r\nprice: 5=five\r\n==";
        assert_eq!(decode_quoted_printable(text), text);
        assert_eq!(decode_quoted_printable(&decode_quoted_printable(text)), text);
    }

    #[test]
    fn lowercase_hex_alone_does_not_trigger_decoding() {
        let text = "see https://x.example/?id=be12 ok";
        assert_eq!(decode_quoted_printable(text), text);
    }

    #[test]
    fn qp_escapes_and_soft_breaks() {
        assert_eq!(
            decode_quoted_printable("caf=C3=A9 is a very long line that=\r\n wraps"),
            "café is a very long line that wraps"
        );
        assert_eq!(decode_quoted_printable("soft=  \nbreak=21"), "softbreak!");
        assert_eq!(decode_quoted_printable("x=3d=3Dy = z"), "x==y = z");
    }

    #[test]
    fn trims_at_dated_reply_opener() {
        let trimmer = QuoteTrimmer::default();
        let text = "Sure, see you there.\r\n\r\nOn Fri, Jan 23, 2026 at 10:00 AM Post Office wrote:\r\n> hello";
        assert_eq!(trimmer.trim(text), "Sure, see you there.");
    }

    #[test]
    fn reply_opener_is_ascii_only() {
        let trimmer = QuoteTrimmer::default();
        let text = "Danke!\r\nOn Fr, Jän 23, 2026 schrieb Post Office:";
        assert_eq!(trimmer.trim(text), text);
        assert_eq!(trimmer.trim("Danke!\r\nOn Fr, Jan 23, 2026 schrieb:"), "Danke!");
    }

    #[test]
    fn quoted_line_outranks_later_sign_off() {
        let trimmer = QuoteTrimmer::default();
        let text = "My reply\r\n> quoted text\r\nBest regards,\r\nBob";
        assert_eq!(trimmer.trim(text), "My reply");
    }

    #[test]
    fn priority_beats_position() {
        // the sign-off comes first in the text, but quoted lines are checked first
        let trimmer = QuoteTrimmer::default();
        let text = "Thanks!\r\nBest regards,\r\nBob\r\n> earlier message";
        assert_eq!(trimmer.trim(text), "Thanks!\r\nBest regards,\r\nBob");
    }

    #[test]
    fn trims_signature_markers() {
        let trimmer = QuoteTrimmer::default();
        assert_eq!(trimmer.trim("See you\r\n-- \r\nBob Smith"), "See you");
        assert_eq!(trimmer.trim("See you\nbest regards, Bob"), "See you");
        assert_eq!(
            trimmer.trim("See you\r\nAPPLIED COMPUTER SERVICES\r\n555-1234"),
            "See you"
        );
        assert_eq!(trimmer.trim("  nothing to cut  "), "nothing to cut");
    }

    #[test]
    fn custom_signature_names() {
        let trimmer = QuoteTrimmer::new(&["Acme Corp.", ""]);
        assert_eq!(trimmer.trim("Hi\nAcme Corp. Sales"), "Hi");
        assert_eq!(trimmer.trim("Hi\nAcme Corpx"), "Hi\nAcme Corpx");
        assert_eq!(trimmer.trim("Hi\nApplied Computer Services"), "Hi\nApplied Computer Services");
    }

    #[test]
    fn letter_format() {
        assert_eq!(
            compose_letter(" bob@example.com ", "Hello!"),
            "A letter from bob@example.com.\n\nIt reads,\n\nHello!"
        );
        assert_eq!(
            compose_letter("bob@example.com", ""),
            "A letter from bob@example.com.\n\nIt reads,"
        );
    }

    #[test]
    fn recipient_phrase() {
        assert_eq!(
            extract_recipient("I got A Message From   Frodo yesterday"),
            Some("Frodo")
        );
        assert_eq!(extract_recipient("a message from"), None);
    }

    #[test]
    fn extract_builds_letter() {
        let parts = MessageParts {
            to: "post_office@example.com".into(),
            from: "Bob <bob@example.com>".into(),
            subject: "Re: a message from Gimli".into(),
            body: "Tell him I said hi=21\r\nThis was a message from Gimli\r\n> old".into(),
        };
        let email = extract(parts, &QuoteTrimmer::default()).unwrap();
        assert_eq!(
            email.body,
            "A letter from Bob <bob@example.com>.\n\nIt reads,\n\nTell him I said hi!\r\nThis was a message from Gimli"
        );
        assert_eq!(email.recipient, "Gimli");
        assert_eq!(email.subject, "Re: a message from Gimli");
        assert!(email.message_id.is_empty());
    }

    #[test]
    fn extract_requires_sender() {
        let parts = MessageParts {
            body: "hello".into(),
            ..MessageParts::default()
        };
        assert_eq!(
            extract(parts, &QuoteTrimmer::default()),
            Err(ParseError::MissingFrom)
        );
    }
}
