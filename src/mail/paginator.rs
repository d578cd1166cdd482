use std::ops::Range;

use crate::domain::email::{Message, MessageId};
use crate::mail::normalize::{NormalizeOptions, normalize};
use crate::mail::store::{Credentials, MailConnector, MailResult, MailStore, SearchFilter};

/// One page of the inbox, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based; 0 is read as 1.
    pub page: u32,
    pub limit: usize,
    pub filter: SearchFilter,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub messages: Vec<Message>,
    /// Number of messages matching the filter on the server.
    pub total: usize,
    /// Ids in the window that could not be fetched or parsed.
    pub skipped: usize,
}

/// Index range into the ascending id list that holds newest-first page `page`.
///
/// Page 1 ends at `total`, page 2 at `total - limit`, and so on; pages past the
/// oldest message are empty.
pub fn page_window(total: usize, page: u32, limit: usize) -> Range<usize> {
    let page = page.max(1) as usize;
    let skipped_newer = (page - 1).saturating_mul(limit);
    let end = total.saturating_sub(skipped_newer);
    let start = end.saturating_sub(limit);
    start..end
}

/// Ids of `page`, newest first.
pub fn select_page(ids: &[MessageId], page: u32, limit: usize) -> Vec<MessageId> {
    let window = page_window(ids.len(), page, limit);
    ids[window].iter().rev().copied().collect()
}

/// Search, then fetch and normalize only the ids of the requested page.
///
/// A failing search aborts the whole call. Individual messages that fail to
/// fetch or parse are skipped and counted.
pub fn fetch_page(
    store: &mut dyn MailStore,
    req: &PageRequest,
    opts: &NormalizeOptions<'_>,
) -> MailResult<FetchedPage> {
    let ids = store.search(req.filter)?;
    let total = ids.len();
    let page_ids = select_page(&ids, req.page, req.limit);

    if page_ids.is_empty() {
        log::info!("page {} is empty ({total} messages match)", req.page);
        return Ok(FetchedPage {
            messages: Vec::new(),
            total,
            skipped: 0,
        });
    }

    let mut messages = Vec::with_capacity(page_ids.len());
    let mut skipped = 0;

    for id in page_ids {
        let raw = match store.fetch_raw(id) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("skipping message {id}: {e}");
                skipped += 1;
                continue;
            }
        };
        match normalize(id, &raw, opts) {
            Ok(m) => messages.push(m),
            Err(e) => {
                log::warn!("skipping unparseable message {id}: {e}");
                skipped += 1;
            }
        }
    }

    log::info!(
        "fetched page {} ({} messages, {skipped} skipped, {total} total)",
        req.page,
        messages.len()
    );

    Ok(FetchedPage {
        messages,
        total,
        skipped,
    })
}

/// Open a connection, fetch one page, and close the connection again.
pub fn fetch_page_from(
    connector: &dyn MailConnector,
    credentials: &Credentials,
    req: &PageRequest,
    opts: &NormalizeOptions<'_>,
) -> MailResult<FetchedPage> {
    let mut store = connector.connect(credentials)?;
    let result = fetch_page(store.as_mut(), req, opts);
    if let Err(e) = store.close() {
        log::warn!("closing mailbox: {e}");
    }
    result
}
