use lettre::Message as OutgoingMessage;
use lettre::address::AddressError;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;

use crate::mail::store::{Credentials, MailConnector, MailError, MailStore};

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Invalid address {address:?}: {source}")]
    Address {
        address: String,
        source: AddressError,
    },

    #[error("Could not build draft: {0}")]
    Build(#[from] lettre::error::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("No drafts mailbox accepted the message: {0}")]
    Rejected(MailError),
}

/// A reply to be stored as a draft.
#[derive(Debug, Clone)]
pub struct Draft<'a> {
    pub from: &'a str,
    pub to: &'a str,
    /// Subject of the message being answered.
    pub original_subject: &'a str,
    pub body: &'a str,
}

pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim_start();
    if trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

fn mailbox(address: &str) -> Result<Mailbox, DraftError> {
    address.parse().map_err(|source| DraftError::Address {
        address: address.to_string(),
        source,
    })
}

/// RFC 822 bytes of a plain text UTF-8 draft.
pub fn build_draft(draft: &Draft<'_>) -> Result<Vec<u8>, DraftError> {
    let msg = OutgoingMessage::builder()
        .from(mailbox(draft.from)?)
        .to(mailbox(draft.to)?)
        .subject(reply_subject(draft.original_subject))
        .header(ContentType::TEXT_PLAIN)
        .body(draft.body.to_string())?;
    Ok(msg.formatted())
}

/// Append to the first mailbox that accepts the draft; returns its name.
pub fn append_draft(
    store: &mut dyn MailStore,
    raw: &[u8],
    mailboxes: &[&str],
) -> Result<String, DraftError> {
    let mut last_err = MailError::Protocol("no drafts mailbox configured".into());
    for name in mailboxes {
        match store.append(name, raw) {
            Ok(()) => {
                log::info!("draft saved to {name}");
                return Ok((*name).to_string());
            }
            Err(e) => {
                log::warn!("append to {name} failed: {e}");
                last_err = e;
            }
        }
    }
    Err(DraftError::Rejected(last_err))
}

/// Build the draft, open a connection, append it, close the connection.
pub fn save_draft(
    connector: &dyn MailConnector,
    credentials: &Credentials,
    draft: &Draft<'_>,
    mailboxes: &[&str],
) -> Result<String, DraftError> {
    let raw = build_draft(draft)?;
    let mut store = connector.connect(credentials)?;
    let result = append_draft(store.as_mut(), &raw, mailboxes);
    if let Err(e) = store.close() {
        log::warn!("closing mailbox: {e}");
    }
    result
}
