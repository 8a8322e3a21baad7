use super::ParsedEmail;
use serde::Serialize;

/// What one mailbox sync produced.
///
/// `count` always equals the number of emails and `success` is true exactly when `errors` is
/// empty; both are derived in [`MailboxResult::new`] and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxResult {
    success: bool,
    emails: Vec<ParsedEmail>,
    count: usize,
    errors: Vec<String>,
}

impl MailboxResult {
    pub fn new(emails: Vec<ParsedEmail>, errors: Vec<String>) -> Self {
        MailboxResult {
            success: errors.is_empty(),
            count: emails.len(),
            emails,
            errors,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn emails(&self) -> &[ParsedEmail] {
        &self.emails
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_emails(self) -> Vec<ParsedEmail> {
        self.emails
    }

    pub fn to_json(&self) -> String {
        // a struct of strings, bools and integers always serializes
        serde_json::to_string(self).unwrap_or_else(|_| {
            String::from(r#"{"success":false,"emails":[],"count":0,"errors":["serialization failed"]}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields_follow_contents() {
        let ok = MailboxResult::new(vec![ParsedEmail::default(); 2], vec![]);
        assert!(ok.success());
        assert_eq!(ok.count(), 2);

        let failed = MailboxResult::new(vec![], vec!["Connection failed".into()]);
        assert!(!failed.success());
        assert_eq!(failed.count(), 0);
    }

    #[test]
    fn json_shape() {
        let result = MailboxResult::new(vec![], vec!["boom".into()]);
        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "emails": [],
                "count": 0,
                "errors": ["boom"],
            })
        );
    }
}
