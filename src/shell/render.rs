use std::io::{self, Write};

use crossterm::style::{Color, Stylize};

use crate::classify::orchestrator::TriageReport;
use crate::domain::category::{Category, UNTRIAGED_COLOR};
use crate::domain::email::Message;
use crate::domain::stats::InboxStats;
use crate::mail::decoders::truncate_chars;
use crate::mail::store::SearchFilter;
use crate::session::{RefreshSummary, ReplyDraft, Session};

const SENDER_WIDTH: usize = 24;
const BADGE_WIDTH: usize = 18;

/// Plain-text views of the session; badges are colored when `color` is set.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub color: bool,
}

fn hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

impl Renderer {
    fn badge(&self, category: Option<Category>) -> String {
        let (label, color) = match category {
            Some(c) => (c.as_str(), c.color()),
            None => ("Untriaged", UNTRIAGED_COLOR),
        };
        let text = format!("{:<BADGE_WIDTH$}", format!("[{label}]"));
        match hex_color(color) {
            Some(c) if self.color => text.with(c).to_string(),
            _ => text,
        }
    }

    pub fn header(&self, out: &mut dyn Write, session: &Session) -> io::Result<()> {
        let filter = match session.settings().filter {
            SearchFilter::All => "all",
            SearchFilter::Unread => "unread",
        };
        writeln!(
            out,
            "Inbox {} | {} | page {}/{} | {} messages | ocr {}",
            session.credentials().address,
            filter,
            session.current_page(),
            session.total_pages(),
            session.total_count(),
            if session.settings().ocr_enabled { "on" } else { "off" },
        )
    }

    pub fn list(&self, out: &mut dyn Write, session: &Session) -> io::Result<()> {
        self.header(out, session)?;
        let messages = session.messages_by_priority();
        if messages.is_empty() {
            return writeln!(out, "  (no messages)");
        }
        for m in messages {
            self.list_row(out, m)?;
        }
        Ok(())
    }

    fn list_row(&self, out: &mut dyn Write, m: &Message) -> io::Result<()> {
        let sender = m.sender_name();
        writeln!(
            out,
            "{:>7}  {} {:<18} {:<SENDER_WIDTH$} {}{}",
            m.id,
            self.badge(m.category),
            m.date,
            truncate_chars(&sender, SENDER_WIDTH),
            m.subject,
            if m.has_image { "  [img]" } else { "" },
        )
    }

    pub fn message(
        &self,
        out: &mut dyn Write,
        m: &Message,
        reply: Option<&ReplyDraft>,
    ) -> io::Result<()> {
        writeln!(out, "#{} {}", m.id, m.subject)?;
        writeln!(out, "From: {}", m.sender)?;
        writeln!(out, "Date: {}", m.date)?;
        writeln!(out, "Category: {}", self.badge(m.category).trim_end())?;
        writeln!(out)?;
        writeln!(out, "{}", m.body)?;

        if let Some(r) = reply {
            writeln!(out)?;
            match &r.saved_to {
                Some(mailbox) => writeln!(out, "--- reply (saved to {mailbox}) ---")?,
                None => writeln!(out, "--- reply (not saved) ---")?,
            }
            writeln!(out, "{}", r.body)?;
        }
        Ok(())
    }

    pub fn refresh(&self, out: &mut dyn Write, summary: &RefreshSummary) -> io::Result<()> {
        write!(out, "Fetched {} of {} messages", summary.shown, summary.total)?;
        if summary.skipped > 0 {
            write!(out, " ({} could not be read)", summary.skipped)?;
        }
        writeln!(out)
    }

    pub fn triage(&self, out: &mut dyn Write, report: &TriageReport) -> io::Result<()> {
        writeln!(
            out,
            "Triaged: {} by rule, {} by model, {} defaulted to Personal",
            report.by_rule, report.by_model, report.defaulted
        )
    }

    pub fn stats(&self, out: &mut dyn Write, stats: &InboxStats) -> io::Result<()> {
        writeln!(out, "Categories:")?;
        for (label, count) in &stats.categories {
            writeln!(out, "  {label:<BADGE_WIDTH$} {count}")?;
        }
        writeln!(out, "Top senders:")?;
        for (sender, count) in &stats.top_senders {
            writeln!(out, "  {count:>3}  {sender}")?;
        }
        Ok(())
    }
}
