//! State of one logged-in user: credentials, the current inbox page and the
//! reply drafts generated for it.
//!
//! A [`Session`] only exists after a successful first fetch and is dropped on
//! logout; nothing in it is written to disk.

use std::collections::HashMap;

use crate::classify::orchestrator::{Classifier, TriageReport};
use crate::config::{Config, PAGE_SIZES};
use crate::domain::category::rank_of;
use crate::domain::email::{Message, MessageId};
use crate::domain::stats::{InboxStats, inbox_stats};
use crate::llm::{GenerationError, TextGenerator, assistant};
use crate::mail::drafts::{Draft, DraftError, save_draft};
use crate::mail::normalize::NormalizeOptions;
use crate::mail::ocr::ImageTextExtractor;
use crate::mail::paginator::{FetchedPage, PageRequest, fetch_page_from};
use crate::mail::store::{Credentials, MailConnector, MailResult, SearchFilter};

const TOP_SENDERS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unsupported page size {0}")]
    InvalidPageSize(usize),

    #[error("No message {0} on this page")]
    UnknownMessage(MessageId),

    #[error("No reply has been generated for message {0}")]
    NoReply(MessageId),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

/// View settings applied on the next fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub page_size: usize,
    pub filter: SearchFilter,
    pub ocr_enabled: bool,
    pub min_image_bytes: usize,
}

impl SessionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            page_size: cfg.page_size,
            filter: SearchFilter::All,
            ocr_enabled: cfg.ocr.enabled,
            min_image_bytes: cfg.ocr.min_image_bytes,
        }
    }
}

/// A generated reply kept for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub notes: String,
    pub body: String,
    /// Mailbox the draft was appended to, once saved.
    pub saved_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub shown: usize,
    pub total: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct Session {
    credentials: Credentials,
    user_name: String,
    current_page: u32,
    settings: SessionSettings,
    messages: Vec<Message>,
    total_count: usize,
    replies: HashMap<MessageId, ReplyDraft>,
}

impl Session {
    /// Fetch page 1; the session exists only if that succeeds.
    pub fn login(
        connector: &dyn MailConnector,
        credentials: Credentials,
        user_name: Option<&str>,
        settings: SessionSettings,
        ocr: Option<&dyn ImageTextExtractor>,
    ) -> MailResult<Session> {
        let user_name = user_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| credentials.local_part().to_string(), str::to_string);

        let mut session = Session {
            credentials,
            user_name,
            current_page: 1,
            settings,
            messages: Vec::new(),
            total_count: 0,
            replies: HashMap::new(),
        };
        session.refresh(connector, ocr)?;
        log::info!("logged in as {}", session.credentials.address);
        Ok(session)
    }

    /// Re-fetch the current page. On error the previous page stays in place.
    pub fn refresh(
        &mut self,
        connector: &dyn MailConnector,
        ocr: Option<&dyn ImageTextExtractor>,
    ) -> MailResult<RefreshSummary> {
        let req = PageRequest {
            page: self.current_page,
            limit: self.settings.page_size,
            filter: self.settings.filter,
        };
        let opts = NormalizeOptions {
            ocr: if self.settings.ocr_enabled { ocr } else { None },
            min_image_bytes: self.settings.min_image_bytes,
        };

        let FetchedPage {
            messages,
            total,
            skipped,
        } = fetch_page_from(connector, &self.credentials, &req, &opts)?;

        self.messages = messages;
        self.total_count = total;
        Ok(RefreshSummary {
            shown: self.messages.len(),
            total,
            skipped,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// At least one, even for an empty mailbox.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(self.settings.page_size.max(1));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// Move to an older page. Takes effect on the next refresh.
    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    /// Move to a newer page. Takes effect on the next refresh.
    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn go_to_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), SessionError> {
        if !PAGE_SIZES.contains(&size) {
            return Err(SessionError::InvalidPageSize(size));
        }
        self.settings.page_size = size;
        // keep the page inside the new range
        self.current_page = self.current_page.min(self.total_pages());
        Ok(())
    }

    pub fn set_filter(&mut self, filter: SearchFilter) {
        if self.settings.filter != filter {
            self.settings.filter = filter;
            self.current_page = 1;
        }
    }

    pub fn set_ocr(&mut self, enabled: bool) {
        self.settings.ocr_enabled = enabled;
    }

    /// Messages ordered by category priority, untriaged last; ties keep page order.
    pub fn messages_by_priority(&self) -> Vec<&Message> {
        let mut sorted: Vec<&Message> = self.messages.iter().collect();
        sorted.sort_by_key(|m| rank_of(m.category));
        sorted
    }

    pub fn triage_all(&mut self, classifier: &Classifier<'_>) -> TriageReport {
        classifier.triage_all(&mut self.messages)
    }

    pub fn stats(&self) -> InboxStats {
        inbox_stats(&self.messages, TOP_SENDERS)
    }

    pub fn ask(&self, model: &dyn TextGenerator, question: &str) -> Result<String, GenerationError> {
        assistant::ask_inbox(model, &self.messages, question)
    }

    pub fn summarize(
        &self,
        model: &dyn TextGenerator,
        id: MessageId,
    ) -> Result<String, SessionError> {
        let m = self.message(id).ok_or(SessionError::UnknownMessage(id))?;
        Ok(assistant::summarize(model, &m.body)?)
    }

    pub fn briefing(&self, model: &dyn TextGenerator) -> String {
        assistant::briefing_script(model, &self.user_name, &self.messages)
    }

    /// Generate and remember a reply. A failed generation leaves any
    /// earlier draft for the message untouched.
    pub fn generate_reply(
        &mut self,
        model: &dyn TextGenerator,
        id: MessageId,
        notes: &str,
    ) -> Result<&ReplyDraft, SessionError> {
        let m = self.message(id).ok_or(SessionError::UnknownMessage(id))?;
        let body = assistant::draft_reply(model, &m.body, notes, &self.user_name)?;
        self.replies.insert(
            id,
            ReplyDraft {
                notes: notes.to_string(),
                body,
                saved_to: None,
            },
        );
        Ok(&self.replies[&id])
    }

    pub fn reply(&self, id: MessageId) -> Option<&ReplyDraft> {
        self.replies.get(&id)
    }

    /// Append the generated reply for `id` to the drafts mailbox.
    pub fn save_reply(
        &mut self,
        connector: &dyn MailConnector,
        id: MessageId,
        mailboxes: &[&str],
    ) -> Result<String, SessionError> {
        let m = self.message(id).ok_or(SessionError::UnknownMessage(id))?;
        let reply = self.replies.get(&id).ok_or(SessionError::NoReply(id))?;
        let draft = Draft {
            from: &self.credentials.address,
            to: &m.sender_email,
            original_subject: &m.subject,
            body: &reply.body,
        };
        let mailbox = save_draft(connector, &self.credentials, &draft, mailboxes)?;
        if let Some(r) = self.replies.get_mut(&id) {
            r.saved_to = Some(mailbox.clone());
        }
        Ok(mailbox)
    }

    /// End the session, discarding credentials and all cached state.
    pub fn logout(self) {
        log::info!("logged out {}", self.credentials.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::RuleSet;
    use crate::domain::category::Category;
    use crate::llm::tests::ScriptedGenerator;
    use crate::mail::paginator::tests::{FakeConnector, FakeStore};
    use crate::mail::store::MailError;

    fn settings(page_size: usize) -> SessionSettings {
        SessionSettings {
            page_size,
            filter: SearchFilter::All,
            ocr_enabled: false,
            min_image_bytes: 5000,
        }
    }

    fn creds() -> Credentials {
        Credentials::new("sam@example.com", "app-password")
    }

    fn login(connector: &FakeConnector, page_size: usize) -> Session {
        Session::login(connector, creds(), None, settings(page_size), None).unwrap()
    }

    fn ids(s: &Session) -> Vec<MessageId> {
        s.messages().iter().map(|m| m.id).collect()
    }

    #[test]
    fn login_fetches_first_page() {
        let connector = FakeConnector::new(FakeStore::with_messages(23));
        let s = login(&connector, 10);
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.total_count(), 23);
        assert_eq!(s.total_pages(), 3);
        assert_eq!(ids(&s), (14..=23).rev().collect::<Vec<_>>());
        assert_eq!(s.user_name(), "sam");
    }

    #[test]
    fn failed_login_creates_no_session() {
        let mut connector = FakeConnector::new(FakeStore::with_messages(3));
        connector.refuse = true;
        let err = Session::login(&connector, creds(), Some("Sam"), settings(10), None).unwrap_err();
        assert!(matches!(err, MailError::Auth(_)));
    }

    #[test]
    fn paging_replaces_messages_wholesale() {
        let connector = FakeConnector::new(FakeStore::with_messages(23));
        let mut s = login(&connector, 10);

        assert!(!s.prev_page());
        assert!(s.next_page());
        assert!(s.next_page());
        assert!(!s.next_page(), "page 3 is the last");
        s.refresh(&connector, None).unwrap();
        assert_eq!(ids(&s), vec![3, 2, 1]);
        assert_eq!(s.total_count(), 23);

        assert!(s.go_to_page(1));
        s.refresh(&connector, None).unwrap();
        assert_eq!(ids(&s).len(), 10);
    }

    #[test]
    fn failed_refresh_keeps_previous_page() {
        let connector = FakeConnector::new(FakeStore::with_messages(5));
        let mut s = login(&connector, 10);
        connector.store.borrow_mut().fail_search = true;
        assert!(s.refresh(&connector, None).is_err());
        assert_eq!(s.messages().len(), 5);
    }

    #[test]
    fn refresh_resets_categories() {
        let connector = FakeConnector::new(FakeStore::with_messages(2));
        let mut s = login(&connector, 10);
        let rules = RuleSet::default();
        let model = ScriptedGenerator::failing();
        s.triage_all(&Classifier::new(&rules, &model));
        assert!(s.messages().iter().all(|m| m.category == Some(Category::Personal)));

        s.refresh(&connector, None).unwrap();
        assert!(s.messages().iter().all(|m| m.category.is_none()));
    }

    #[test]
    fn page_size_validated_and_page_clamped() {
        let connector = FakeConnector::new(FakeStore::with_messages(23));
        let mut s = login(&connector, 5);
        assert!(s.go_to_page(5));
        assert!(matches!(
            s.set_page_size(7),
            Err(SessionError::InvalidPageSize(7))
        ));
        s.set_page_size(20).unwrap();
        assert_eq!(s.total_pages(), 2);
        assert_eq!(s.current_page(), 2);
    }

    #[test]
    fn filter_change_returns_to_first_page() {
        let connector = FakeConnector::new(FakeStore::with_messages(23));
        connector.store.borrow_mut().unread.extend([3, 20]);
        let mut s = login(&connector, 10);
        s.next_page();
        s.set_filter(SearchFilter::Unread);
        assert_eq!(s.current_page(), 1);
        s.refresh(&connector, None).unwrap();
        assert_eq!(ids(&s), vec![20, 3]);
        assert_eq!(s.total_count(), 2);
    }

    #[test]
    fn priority_order_puts_untriaged_last() {
        let connector = FakeConnector::new(FakeStore::with_messages(3));
        let mut s = login(&connector, 10);
        s.messages[0].category = Some(Category::Newsletter);
        s.messages[2].category = Some(Category::SecurityAlert);
        let order: Vec<_> = s.messages_by_priority().iter().map(|m| m.id).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn replies_are_keyed_by_message_and_saved() {
        let connector = FakeConnector::new(FakeStore::with_messages(3));
        let mut s = login(&connector, 10);

        let model = ScriptedGenerator::answering(&["Sure, see you then.\n\nSam"]);
        let reply = s.generate_reply(&model, 2, "agree").unwrap();
        assert_eq!(reply.notes, "agree");
        assert!(model.prompts.borrow()[0].contains("body 2"));

        assert!(matches!(
            s.save_reply(&connector, 1, &["Drafts"]),
            Err(SessionError::NoReply(1))
        ));

        let mailbox = s.save_reply(&connector, 2, &["[Gmail]/Drafts", "Drafts"]).unwrap();
        assert_eq!(mailbox, "[Gmail]/Drafts");
        assert_eq!(s.reply(2).unwrap().saved_to.as_deref(), Some("[Gmail]/Drafts"));

        let store = connector.store.borrow();
        let raw = String::from_utf8_lossy(&store.appended[0].1);
        assert!(raw.contains("To: s2@example.com"));
        assert!(raw.contains("Subject: Re: message 2"));
    }

    #[test]
    fn failed_generation_keeps_earlier_reply() {
        let connector = FakeConnector::new(FakeStore::with_messages(3));
        let mut s = login(&connector, 10);
        let model = ScriptedGenerator::answering(&["first draft"]);
        s.generate_reply(&model, 3, "n").unwrap();
        assert!(s.generate_reply(&model, 3, "n2").is_err());
        assert_eq!(s.reply(3).unwrap().body, "first draft");
        assert!(matches!(
            s.generate_reply(&model, 99, "n"),
            Err(SessionError::UnknownMessage(99))
        ));
    }

    #[test]
    fn explicit_name_used_for_signature() {
        let connector = FakeConnector::new(FakeStore::with_messages(1));
        let s = Session::login(&connector, creds(), Some(" Sam Doe "), settings(10), None).unwrap();
        assert_eq!(s.user_name(), "Sam Doe");
        s.logout();
    }
}
