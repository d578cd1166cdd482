use charset::Charset;

/// Render width handed to html2text; whitespace is collapsed afterwards anyway.
const HTML_RENDER_WIDTH: usize = 1_000;

pub fn decode_subject(raw: &[u8]) -> String {
    decode_mime_words("Subject", raw)
}

/// Decode an RFC 2047 header value; lossy UTF-8 when the header does not parse.
pub fn decode_mime_words(name: &str, raw: &[u8]) -> String {
    // mailparse expects a full "Key: value" header line
    let mut line = format!("{name}: ").into_bytes();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Decode `bytes` with the declared charset, falling back to lossy UTF-8
/// when the label is unknown or the input is malformed for it.
pub fn decode_text(bytes: &[u8], declared: Option<&str>) -> String {
    let label = declared.map(str::trim).filter(|l| !l.is_empty());
    let Some(label) = label else {
        return String::from_utf8_lossy(bytes).into_owned();
    };

    match Charset::for_label(label.as_bytes()) {
        Some(cs) => {
            let (text, had_errors) = cs.decode_without_bom_handling(bytes);
            if had_errors {
                log::debug!("malformed {label} input, redecoding as utf-8");
                String::from_utf8_lossy(bytes).into_owned()
            } else {
                text.into_owned()
            }
        }
        None => {
            log::debug!("unknown charset {label:?}, decoding as utf-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Visible text of an HTML document on one line.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::config::plain()
        .string_from_read(html.as_bytes(), HTML_RENDER_WIDTH)
        .unwrap_or_else(|e| {
            log::debug!("html render failed ({e}), stripping tags");
            strip_html_minimal(html)
        });
    collapse_whitespace(&rendered)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_html_minimal(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// First `n` characters of `s` (not bytes).
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
