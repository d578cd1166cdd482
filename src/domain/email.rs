use crate::domain::category::Category;

/// IMAP UID of a message in the selected mailbox.
pub type MessageId = u32;

pub const NO_SUBJECT: &str = "(no subject)";
pub const EMPTY_BODY_PLACEHOLDER: &str = "No text content found.";

/// One remote mail item after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub subject: String,
    /// Raw `Display Name <addr>` form of the From header.
    pub sender: String,
    pub sender_email: String,
    /// Local time, human formatted; the raw header when it could not be parsed.
    pub date: String,
    pub body: String,
    pub has_image: bool,
    pub category: Option<Category>,
}

impl Message {
    /// Display name part of `sender`, quotes removed. Falls back to the raw sender.
    pub fn sender_name(&self) -> String {
        let name = match self.sender.split_once('<') {
            Some((name, _)) => name,
            None => self.sender.as_str(),
        };
        let name = name.trim().replace('"', "");
        if name.is_empty() {
            self.sender_email.clone()
        } else {
            name
        }
    }
}

/// Address part of a `Name <addr>` string, or the input unchanged.
pub fn extract_address(sender: &str) -> String {
    match sender.split_once('<') {
        Some((_, rest)) => rest.replace('>', "").trim().to_string(),
        None => sender.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn sample(id: MessageId, sender: &str, subject: &str, body: &str) -> Message {
    Message {
        id,
        subject: subject.to_string(),
        sender: sender.to_string(),
        sender_email: extract_address(sender),
        date: "Jan 01, 09:00 AM".to_string(),
        body: body.to_string(),
        has_image: false,
        category: None,
    }
}
