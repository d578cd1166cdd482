use chrono::{DateTime, Local, TimeZone};
use mailparse::{DispositionType, MailHeaderMap, MailParseError, ParsedMail};

use crate::domain::email::{
    EMPTY_BODY_PLACEHOLDER, Message, MessageId, NO_SUBJECT, extract_address,
};
use crate::mail::decoders::{decode_mime_words, decode_subject, decode_text, html_to_text};
use crate::mail::ocr::{DEFAULT_MIN_IMAGE_BYTES, ImageTextExtractor, worth_scanning};

pub const IMAGE_TEXT_MARKER: &str = "[IMAGE TEXT DETECTED]";
const DATE_FORMAT: &str = "%b %d, %I:%M %p";

/// What the normalizer may do beyond plain decoding.
#[derive(Clone, Copy)]
pub struct NormalizeOptions<'a> {
    /// `None` disables image scanning.
    pub ocr: Option<&'a dyn ImageTextExtractor>,
    pub min_image_bytes: usize,
}

impl Default for NormalizeOptions<'_> {
    fn default() -> Self {
        Self {
            ocr: None,
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
        }
    }
}

/// Build a [`Message`] from raw RFC 822 bytes.
///
/// Only a message whose top level cannot be parsed is an error; bad parts,
/// charsets and images degrade to whatever could be recovered.
pub fn normalize(
    id: MessageId,
    raw: &[u8],
    opts: &NormalizeOptions<'_>,
) -> Result<Message, MailParseError> {
    let parsed = mailparse::parse_mail(raw)?;

    let subject = parsed
        .headers
        .get_first_header("Subject")
        .map(|h| decode_subject(h.get_value_raw()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let sender = parsed
        .headers
        .get_first_header("From")
        .map(|h| decode_mime_words("From", h.get_value_raw()))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let sender_email = extract_address(&sender);

    let date = parsed
        .headers
        .get_first_value("Date")
        .map(|d| format_date(&d))
        .unwrap_or_default();

    let mut body = BodyBuilder::default();
    walk_parts(&parsed, opts, &mut body);

    log::debug!(
        "normalized message {id}: {} text parts, image text: {}",
        body.text_parts,
        body.has_image
    );

    Ok(Message {
        id,
        subject,
        sender,
        sender_email,
        date,
        body: body.finish(),
        has_image: body.has_image,
        category: None,
    })
}

/// Local `Jan 05, 03:04 PM` rendering of a Date header, or the header itself.
pub fn format_date(raw: &str) -> String {
    parse_date(raw)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_date(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Local));
    }
    // dateparse yields 0 for input it cannot make sense of
    match mailparse::dateparse(raw) {
        Ok(epoch) if epoch != 0 => Local.timestamp_opt(epoch, 0).single(),
        _ => None,
    }
}

#[derive(Default)]
struct BodyBuilder {
    text: String,
    text_parts: usize,
    has_image: bool,
}

impl BodyBuilder {
    fn push_text(&mut self, s: &str) {
        self.text.push_str(s);
        self.text.push('\n');
        self.text_parts += 1;
    }

    fn push_image_text(&mut self, s: &str) {
        self.text
            .push_str(&format!("\n\n{IMAGE_TEXT_MARKER}:\n{s}\n"));
        self.has_image = true;
    }

    fn finish(&self) -> String {
        if self.text.trim().is_empty() {
            EMPTY_BODY_PLACEHOLDER.to_string()
        } else {
            self.text.clone()
        }
    }
}

fn walk_parts(part: &ParsedMail<'_>, opts: &NormalizeOptions<'_>, out: &mut BodyBuilder) {
    if !part.subparts.is_empty() {
        for sp in &part.subparts {
            walk_parts(sp, opts, out);
        }
        return;
    }

    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }

    let mime = part.ctype.mimetype.to_ascii_lowercase();
    match mime.as_str() {
        "text/plain" => {
            if let Some(text) = decoded_text(part) {
                out.push_text(&text);
            }
        }
        "text/html" => {
            if let Some(html) = decoded_text(part) {
                out.push_text(&html_to_text(&html));
            }
        }
        m if m.starts_with("image/") => {
            let Some(ocr) = opts.ocr else {
                return;
            };
            let Ok(bytes) = part.get_body_raw() else {
                log::debug!("undecodable {m} part skipped");
                return;
            };
            if !worth_scanning(bytes.len(), opts.min_image_bytes) {
                return;
            }
            let text = ocr.extract_text(&bytes);
            if !text.is_empty() {
                out.push_image_text(&text);
            }
        }
        _ => {}
    }
}

fn decoded_text(part: &ParsedMail<'_>) -> Option<String> {
    let bytes = match part.get_body_raw() {
        Ok(b) => b,
        Err(e) => {
            log::debug!("bad transfer encoding: {e}");
            return None;
        }
    };
    // mailparse reports us-ascii when no charset is given; treat that as utf-8
    let declared = part.ctype.params.get("charset").map(String::as_str);
    Some(decode_text(&bytes, declared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use std::cell::RefCell;

    struct RecordingOcr {
        seen: RefCell<Vec<usize>>,
        reply: &'static str,
    }

    impl RecordingOcr {
        fn new(reply: &'static str) -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                reply,
            }
        }
    }

    impl ImageTextExtractor for RecordingOcr {
        fn extract_text(&self, image_bytes: &[u8]) -> String {
            self.seen.borrow_mut().push(image_bytes.len());
            self.reply.to_string()
        }
    }

    fn with_image(image_len: usize, disposition: &str) -> Vec<u8> {
        format!(
            "From: A <a@example.com>\r\n\
             Subject: pic\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
             \r\n\
             --XX\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             see image\r\n\
             --XX\r\n\
             Content-Type: image/png\r\n\
             Content-Transfer-Encoding: base64\r\n\
             Content-Disposition: {disposition}\r\n\
             \r\n\
             {}\r\n\
             --XX--\r\n",
            general_purpose::STANDARD.encode(vec![7u8; image_len])
        )
        .into_bytes()
    }

    #[test]
    fn plain_and_html_concatenated_in_order() {
        let raw = b"From: \"Jane\" <jane@example.com>\r\n\
Subject: =?UTF-8?Q?caf=C3=A9?=\r\n\
Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"B\"\r\n\
\r\n\
--B\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
plain first\r\n\
--B\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>html <i>second</i></p>\r\n\
--B--\r\n";
        let m = normalize(7, raw, &NormalizeOptions::default()).unwrap();
        assert_eq!(m.id, 7);
        assert_eq!(m.subject, "café");
        assert_eq!(m.sender_email, "jane@example.com");
        let plain = m.body.find("plain first").unwrap();
        let html = m.body.find("second").unwrap();
        assert!(plain < html);
        assert!(!m.body.contains("<p>"));
        assert!(!m.has_image);
        assert_eq!(m.category, None);
    }

    #[test]
    fn missing_text_gets_placeholder() {
        let raw = b"From: a@example.com\r\nContent-Type: application/octet-stream\r\n\r\nxyz";
        let m = normalize(1, raw, &NormalizeOptions::default()).unwrap();
        assert_eq!(m.body, EMPTY_BODY_PLACEHOLDER);
        assert_eq!(m.subject, NO_SUBJECT);
        assert_eq!(m.sender, "a@example.com");
    }

    #[test]
    fn attachments_are_skipped() {
        let raw = b"Subject: s\r\n\
Content-Type: multipart/mixed; boundary=\"B\"\r\n\
\r\n\
--B\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=notes.txt\r\n\
\r\n\
secret attachment\r\n\
--B--\r\n";
        let m = normalize(1, raw, &NormalizeOptions::default()).unwrap();
        assert!(!m.body.contains("secret attachment"));
        assert_eq!(m.body, EMPTY_BODY_PLACEHOLDER);
    }

    #[test]
    fn small_images_never_reach_ocr() {
        let ocr = RecordingOcr::new("TEXT IN IMAGE");
        let opts = NormalizeOptions {
            ocr: Some(&ocr),
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
        };

        let m = normalize(1, &with_image(3000, "inline"), &opts).unwrap();
        assert!(ocr.seen.borrow().is_empty());
        assert!(!m.has_image);

        let m = normalize(2, &with_image(6000, "inline"), &opts).unwrap();
        assert_eq!(*ocr.seen.borrow(), vec![6000]);
        assert!(m.has_image);
        assert!(m.body.contains(IMAGE_TEXT_MARKER));
        assert!(m.body.contains("TEXT IN IMAGE"));
        assert!(m.body.starts_with("see image"));
    }

    #[test]
    fn empty_ocr_result_does_not_flag_image() {
        let ocr = RecordingOcr::new("");
        let opts = NormalizeOptions {
            ocr: Some(&ocr),
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
        };
        let m = normalize(1, &with_image(6000, "inline"), &opts).unwrap();
        assert_eq!(ocr.seen.borrow().len(), 1);
        assert!(!m.has_image);
        assert!(!m.body.contains(IMAGE_TEXT_MARKER));
    }

    #[test]
    fn attached_images_are_not_scanned() {
        let ocr = RecordingOcr::new("TEXT");
        let opts = NormalizeOptions {
            ocr: Some(&ocr),
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
        };
        let raw = with_image(6000, "attachment; filename=scan.png");
        let m = normalize(1, &raw, &opts).unwrap();
        assert!(ocr.seen.borrow().is_empty());
        assert!(!m.has_image);
    }

    #[test]
    fn ocr_disabled_skips_images() {
        let m = normalize(1, &with_image(6000, "inline"), &NormalizeOptions::default()).unwrap();
        assert!(!m.has_image);
    }

    #[test]
    fn unparseable_date_kept_verbatim() {
        assert_eq!(format_date("sometime last week"), "sometime last week");
        assert_eq!(format_date("garbage"), "garbage");
        assert!(!format_date("Tue, 1 Jul 2025 10:00:00 +0000").contains("+0000"));
    }

    #[test]
    fn empty_date_stays_empty() {
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("   "), "   ");
    }

    #[test]
    fn rfc2822_date_is_reformatted() {
        let shown = format_date("Tue, 1 Jul 2025 10:00:00 +0000");
        let expected = DateTime::parse_from_rfc2822("Tue, 1 Jul 2025 10:00:00 +0000")
            .unwrap()
            .with_timezone(&Local)
            .format(DATE_FORMAT)
            .to_string();
        assert_eq!(shown, expected);
        assert!(!shown.starts_with("Jan 01"));
    }
}
