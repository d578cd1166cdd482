use std::io::{Cursor, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::ImageFormat;

use crate::config::OcrConfig;

/// Best-effort optical text recognition. An empty string means "no text found",
/// whatever the reason.
pub trait ImageTextExtractor {
    fn extract_text(&self, image_bytes: &[u8]) -> String;
}

/// Images at or below this many decoded bytes are treated as icons or tracking pixels.
pub const DEFAULT_MIN_IMAGE_BYTES: usize = 5000;

pub fn worth_scanning(len: usize, min_bytes: usize) -> bool {
    len > min_bytes
}

/// Runs the `tesseract` command line engine on a PNG re-encoding of the image.
pub struct TesseractOcr {
    command: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &OcrConfig) -> Self {
        Self::new(cfg.command.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    fn run(&self, image_bytes: &[u8]) -> Result<String, String> {
        let img = image::load_from_memory(image_bytes).map_err(|e| format!("decode: {e}"))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| format!("re-encode: {e}"))?;

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("spawn {}: {e}", self.command))?;

        let deadline = Instant::now() + self.timeout;
        let result = self.collect(&mut child, png, deadline);
        if result.is_err() {
            // reap the engine whatever state it is in
            let _ = child.kill();
            let _ = child.wait();
        }
        result
    }

    fn collect(
        &self,
        child: &mut Child,
        png: Vec<u8>,
        deadline: Instant,
    ) -> Result<String, String> {
        // both pipes are serviced on side threads so neither can stall the wait loop
        let mut stdin = child.stdin.take().ok_or("no stdin")?;
        let writer = thread::spawn(move || stdin.write_all(&png));

        let mut stdout = child.stdout.take().ok_or("no stdout")?;
        let reader = thread::spawn(move || {
            let mut out = String::new();
            stdout.read_to_string(&mut out).map(|_| out)
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    return Err(format!("timed out after {:?}", self.timeout));
                }
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(e) => return Err(format!("wait: {e}")),
            }
        };

        if let Ok(Err(e)) = writer.join() {
            log::debug!("{} stopped reading its input: {e}", self.command);
        }
        if !status.success() {
            return Err(format!("exited with {status}"));
        }

        reader
            .join()
            .map_err(|_| "reader thread panicked".to_string())?
            .map_err(|e| format!("stdout: {e}"))
    }
}

impl ImageTextExtractor for TesseractOcr {
    fn extract_text(&self, image_bytes: &[u8]) -> String {
        match self.run(image_bytes) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                log::warn!("OCR failed: {e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert!(!worth_scanning(3000, DEFAULT_MIN_IMAGE_BYTES));
        assert!(!worth_scanning(5000, DEFAULT_MIN_IMAGE_BYTES));
        assert!(worth_scanning(6000, DEFAULT_MIN_IMAGE_BYTES));
    }

    #[test]
    fn corrupt_bytes_yield_empty_text() {
        let ocr = TesseractOcr::new("tesseract", Duration::from_secs(1));
        assert_eq!(ocr.extract_text(b"definitely not an image"), "");
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut png = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn missing_engine_yields_empty_text() {
        let ocr = TesseractOcr::new("no-such-ocr-binary-xyz", Duration::from_secs(1));
        assert_eq!(ocr.extract_text(&png(4, 4)), "");
    }

    #[cfg(unix)]
    #[test]
    fn engine_exiting_without_reading_input_returns_promptly() {
        let image = png(64, 64);
        for command in ["true", "false"] {
            let ocr = TesseractOcr::new(command, Duration::from_secs(10));
            let started = Instant::now();
            assert_eq!(ocr.extract_text(&image), "");
            assert!(started.elapsed() < Duration::from_secs(5), "{command} stalled");
        }
    }
}
