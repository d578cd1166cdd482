use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::rules::RuleSet;
use crate::mail::ocr::DEFAULT_MIN_IMAGE_BYTES;

/// Page sizes the inbox view offers.
pub const PAGE_SIZES: [usize; 4] = [5, 10, 15, 20];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub imap_server: String,
    pub imap_port: u16,
    pub drafts_mailbox: String,
    pub drafts_fallback_mailbox: String,
    pub page_size: usize,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub classifier: RuleSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            imap_server: "imap.gmail.com".to_string(),
            imap_port: 993,
            drafts_mailbox: "[Gmail]/Drafts".to_string(),
            drafts_fallback_mailbox: "Drafts".to_string(),
            page_size: 10,
            ocr: OcrConfig::default(),
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            classifier: RuleSet::default(),
        }
    }
}

impl Config {
    pub fn drafts_mailboxes(&self) -> [&str; 2] {
        [
            self.drafts_mailbox.as_str(),
            self.drafts_fallback_mailbox.as_str(),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    /// Initial state of image scanning for a new session.
    pub enabled: bool,
    pub min_image_bytes: usize,
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
            command: "tesseract".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub lang: String,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mail_triage"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load the config at `path` (or the default location). A missing file is
/// replaced by a template holding the defaults, which are then used.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = Config::default();
        if let Err(e) = write_template(&path, &cfg) {
            log::warn!("could not write config template {}: {e:#}", path.display());
        } else {
            log::info!("created config template at {}", path.display());
        }
        return Ok(cfg);
    }

    let s = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&s).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    if !PAGE_SIZES.contains(&cfg.page_size) {
        anyhow::bail!(
            "page_size must be one of {:?}, got {}",
            PAGE_SIZES,
            cfg.page_size
        );
    }
    Ok(cfg)
}

fn write_template(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}
