use serde::Serialize;

/// A player reply pulled out of the mailbox.
///
/// `body` is the composed letter ("A letter from ... It reads, ..."), not the raw message body.
/// `display_name` and `message_id` stay empty until the mailbox sync accepts the email.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    /// Player name found in a "a message from <name>" phrase of the body, if any.
    pub recipient: String,
    pub display_name: String,
    pub message_id: String,
}

impl ParsedEmail {
    /// Name to show as the letter's sender.
    ///
    /// Prefers the recipient token extracted from the body, then the local part of the `From`
    /// address, then the whole `From` value.
    pub fn sender_name(&self) -> String {
        if !self.recipient.is_empty() {
            return self.recipient.clone();
        }
        let from = self.from.trim();
        if let Some(local) = angle_local_part(from) {
            return local.to_string();
        }
        match from.find('@') {
            Some(at) if at > 0 => from[..at].to_string(),
            _ => from.to_string(),
        }
    }
}

/// The text between the first `<` and the next `@`, as in `Name <local@host>`.
fn angle_local_part(from: &str) -> Option<&str> {
    let open = from.find('<')?;
    let rest = &from[open + 1..];
    let at = rest.find('@')?;
    if at == 0 {
        return None;
    }
    Some(&rest[..at])
}
