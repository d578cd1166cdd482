use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::SpeechConfig;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
/// The endpoint rejects longer inputs, so text is sent in pieces.
const MAX_CHUNK_CHARS: usize = 100;

/// Best-effort speech synthesis; `None` means "no audio".
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Option<Vec<u8>>;
}

/// MP3 from the Google Translate speech endpoint.
pub struct GoogleTts {
    http: Client,
    lang: String,
}

impl GoogleTts {
    pub fn new(lang: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            lang: lang.into(),
        })
    }

    pub fn from_config(cfg: &SpeechConfig) -> reqwest::Result<Self> {
        Self::new(cfg.lang.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> reqwest::Result<Vec<u8>> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let bytes = self
            .http
            .get(TTS_ENDPOINT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.lang.as_str()),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        let chunks = split_for_speech(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return None;
        }
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            match self.fetch_chunk(chunk, idx, chunks.len()) {
                Ok(bytes) => audio.extend_from_slice(&bytes),
                Err(e) => {
                    log::warn!("speech synthesis failed: {e}");
                    return None;
                }
            }
        }
        Some(audio)
    }
}

/// Split on whitespace into pieces of at most `max_chars` characters.
/// A single word longer than the limit is cut.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_limit_and_keep_words() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = split_for_speech(text, 14);
        assert!(chunks.iter().all(|c| c.chars().count() <= 14));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn long_words_are_cut() {
        let chunks = split_for_speech("abcdefghij xy", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_for_speech("  \n ", 100).is_empty());
    }
}
