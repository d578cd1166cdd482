use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::tty::IsTty;

use mail_triage::config::{PAGE_SIZES, load_config};
use mail_triage::llm::ollama::OllamaClient;
use mail_triage::mail::imap_client::ImapConnector;
use mail_triage::mail::ocr::TesseractOcr;
use mail_triage::mail::store::{Credentials, SearchFilter};
use mail_triage::session::{Session, SessionSettings};
use mail_triage::shell::render::Renderer;
use mail_triage::shell::{Services, run_shell};
use mail_triage::speech::GoogleTts;

const PASSWORD_ENV: &str = "MAIL_TRIAGE_PASSWORD";

#[derive(Parser)]
#[command(name = "mail_triage")]
#[command(about = "Inbox triage over IMAP with a local language model", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/mail_triage/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Account address; asked for when missing
    #[arg(long)]
    user: Option<String>,

    /// Name used to sign replies (defaults to the address local part)
    #[arg(long)]
    name: Option<String>,

    #[arg(long, value_parser = parse_page_size)]
    page_size: Option<usize>,

    /// Start with only unread messages
    #[arg(long)]
    unread: bool,

    /// Start with image text recognition on
    #[arg(long)]
    ocr: bool,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if PAGE_SIZES.contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be one of {PAGE_SIZES:?}"))
    }
}

fn prompt(input: &mut dyn BufRead, label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("no input for {}", label.trim_end_matches([' ', ':']));
    }
    Ok(line.trim().to_string())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref()).context("Configuration error")?;

    let mut settings = SessionSettings::from_config(&cfg);
    if let Some(n) = cli.page_size {
        settings.page_size = n;
    }
    if cli.unread {
        settings.filter = SearchFilter::Unread;
    }
    if cli.ocr {
        settings.ocr_enabled = true;
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let address = match cli.user {
        Some(u) => u,
        None => prompt(&mut input, "Email address: ")?,
    };
    let secret = match std::env::var(PASSWORD_ENV) {
        Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => prompt(&mut input, "App password: ")?,
    };
    if address.is_empty() || secret.is_empty() {
        bail!("an address and an app password are required");
    }
    let credentials = Credentials::new(address, secret);

    let connector = ImapConnector::from_config(&cfg);
    let model = OllamaClient::from_config(&cfg.llm).context("Building model client")?;
    let ocr = TesseractOcr::from_config(&cfg.ocr);
    let speech = GoogleTts::from_config(&cfg.speech).context("Building speech client")?;

    let session = Session::login(
        &connector,
        credentials,
        cli.name.as_deref(),
        settings,
        Some(&ocr),
    )
    .context("Login failed")?;

    let services = Services {
        connector: &connector,
        model: &model,
        ocr: Some(&ocr),
        speech: &speech,
        config: &cfg,
        settings,
    };
    let renderer = Renderer {
        color: io::stdout().is_tty(),
    };
    let mut out = io::stdout().lock();
    run_shell(&services, session, &mut input, &mut out, renderer)?;
    Ok(())
}
