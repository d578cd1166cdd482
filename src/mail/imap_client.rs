use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};

use crate::config::Config;
use crate::domain::email::MessageId;
use crate::mail::store::{
    Credentials, MailConnector, MailError, MailResult, MailStore, SearchFilter,
};

type TlsSession = imap::Session<TlsStream<TcpStream>>;

/// Connects to an IMAPS server with address + app password login.
pub struct ImapConnector {
    pub server: String,
    pub port: u16,
}

impl ImapConnector {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.imap_server.clone(), cfg.imap_port)
    }
}

impl MailConnector for ImapConnector {
    fn connect(&self, credentials: &Credentials) -> MailResult<Box<dyn MailStore>> {
        log::debug!("connecting to {}:{}", self.server, self.port);
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Connection(e.to_string()))?;
        let client = imap::connect((self.server.as_str(), self.port), self.server.as_str(), &tls)
            .map_err(|e| MailError::Connection(format!("{}:{}: {e}", self.server, self.port)))?;

        let mut session = client
            .login(&credentials.address, &credentials.secret)
            .map_err(|(e, _client)| MailError::Auth(e.to_string()))?;

        if let Err(e) = session.select("INBOX") {
            let _ = session.logout();
            return Err(MailError::Protocol(format!("select INBOX: {e}")));
        }

        Ok(Box::new(ImapStore {
            session: Some(session),
        }))
    }
}

pub struct ImapStore {
    session: Option<TlsSession>,
}

impl ImapStore {
    fn session(&mut self) -> MailResult<&mut TlsSession> {
        self.session
            .as_mut()
            .ok_or_else(|| MailError::Protocol("session already closed".into()))
    }
}

impl MailStore for ImapStore {
    fn search(&mut self, filter: SearchFilter) -> MailResult<Vec<MessageId>> {
        let uids = self
            .session()?
            .uid_search(filter.as_imap())
            .map_err(|e| MailError::Protocol(format!("search {}: {e}", filter.as_imap())))?;
        let mut uids: Vec<MessageId> = uids.into_iter().collect();
        uids.sort_unstable(); // ascending
        Ok(uids)
    }

    fn fetch_raw(&mut self, id: MessageId) -> MailResult<Vec<u8>> {
        let fetches = self
            .session()?
            .uid_fetch(id.to_string(), "(UID BODY.PEEK[])")
            .map_err(|e| MailError::Protocol(format!("fetch {id}: {e}")))?;
        fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or(MailError::NotFound(id))
    }

    fn append(&mut self, mailbox: &str, raw_message: &[u8]) -> MailResult<()> {
        self.session()?
            .append(mailbox, raw_message)
            .map_err(|e| MailError::Protocol(format!("append to {mailbox}: {e}")))
    }

    fn close(&mut self) -> MailResult<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        if let Err(e) = session.close() {
            log::debug!("CLOSE failed: {e}");
        }
        session
            .logout()
            .map_err(|e| MailError::Protocol(format!("logout: {e}")))
    }
}

impl Drop for ImapStore {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.close();
        }
    }
}
