use std::fmt;

use crate::domain::email::MessageId;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Network or TLS failure before a session existed.
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Login failed: {0}")]
    Auth(String),

    /// A command failed on an established session.
    #[error("Mailbox error: {0}")]
    Protocol(String),

    #[error("Message {0} not found")]
    NotFound(MessageId),
}

pub type MailResult<T> = Result<T, MailError>;

/// Account address and app password. Held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub address: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// Local part of the address, used as a fallback signature name.
    pub fn local_part(&self) -> &str {
        self.address.split('@').next().unwrap_or(&self.address)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Server-side search criteria for the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFilter {
    #[default]
    All,
    Unread,
}

impl SearchFilter {
    pub fn as_imap(self) -> &'static str {
        match self {
            SearchFilter::All => "ALL",
            SearchFilter::Unread => "UNSEEN",
        }
    }
}

/// An authenticated connection with INBOX selected.
pub trait MailStore {
    /// Matching ids in ascending store order.
    fn search(&mut self, filter: SearchFilter) -> MailResult<Vec<MessageId>>;

    /// Full RFC 822 bytes of one message, without setting `\Seen`.
    fn fetch_raw(&mut self, id: MessageId) -> MailResult<Vec<u8>>;

    fn append(&mut self, mailbox: &str, raw_message: &[u8]) -> MailResult<()>;

    /// Close the mailbox and log out. The store is unusable afterwards.
    fn close(&mut self) -> MailResult<()>;
}

/// Opens a fresh [`MailStore`] for one batch of operations.
pub trait MailConnector {
    fn connect(&self, credentials: &Credentials) -> MailResult<Box<dyn MailStore>>;
}
