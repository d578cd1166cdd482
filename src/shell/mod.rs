//! Line-oriented front end over a [`Session`].
//!
//! Every command runs to completion before the next prompt. Mailbox failures
//! are printed as errors; model and speech failures degrade to a fixed
//! message. Nothing typed at the prompt can end the loop except `logout`,
//! end of input or a failed re-login after `reset`.

pub mod commands;
pub mod render;

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::classify::orchestrator::Classifier;
use crate::config::Config;
use crate::llm::TextGenerator;
use crate::mail::ocr::ImageTextExtractor;
use crate::mail::store::MailConnector;
use crate::session::{Session, SessionError, SessionSettings};
use crate::speech::SpeechSynthesizer;

use commands::{ShellCommand, Toggle, parse_line};
use render::Renderer;

pub const SUMMARY_FALLBACK: &str = "Summary unavailable right now.";
pub const REPLY_FALLBACK: &str = "Could not generate a reply right now.";
pub const ANSWER_FALLBACK: &str = "Could not answer right now.";

/// External capabilities the shell hands to session operations.
pub struct Services<'a> {
    pub connector: &'a dyn MailConnector,
    pub model: &'a dyn TextGenerator,
    pub ocr: Option<&'a dyn ImageTextExtractor>,
    pub speech: &'a dyn SpeechSynthesizer,
    pub config: &'a Config,
    /// Settings a fresh session starts with, including command line overrides.
    pub settings: SessionSettings,
}

enum Flow {
    Continue,
    Reset,
    Quit,
}

pub fn run_shell(
    services: &Services<'_>,
    mut session: Session,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    renderer: Renderer,
) -> io::Result<()> {
    renderer.list(out, &session)?;

    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            session.logout();
            return Ok(());
        }

        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{}", e.render())?;
                continue;
            }
        };
        log::debug!("command {cmd:?}");

        match execute(cmd, &mut session, services, renderer, out)? {
            Flow::Continue => {}
            Flow::Quit => {
                session.logout();
                writeln!(out, "Logged out.")?;
                return Ok(());
            }
            Flow::Reset => {
                let credentials = session.credentials().clone();
                let name = session.user_name().to_string();
                session.logout();
                match Session::login(
                    services.connector,
                    credentials,
                    Some(&name),
                    services.settings,
                    services.ocr,
                ) {
                    Ok(fresh) => {
                        session = fresh;
                        writeln!(out, "Session reset.")?;
                        renderer.list(out, &session)?;
                    }
                    Err(e) => {
                        writeln!(out, "Could not log in again: {e}")?;
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn execute(
    cmd: ShellCommand,
    session: &mut Session,
    services: &Services<'_>,
    r: Renderer,
    out: &mut dyn Write,
) -> io::Result<Flow> {
    match cmd {
        ShellCommand::List => r.list(out, session)?,

        ShellCommand::Show { id } => match session.message(id) {
            Some(m) => r.message(out, m, session.reply(id))?,
            None => writeln!(out, "{}", SessionError::UnknownMessage(id))?,
        },

        ShellCommand::Next => {
            if session.next_page() {
                refresh_and_list(session, services, r, out)?;
            } else {
                writeln!(out, "Already on the last page.")?;
            }
        }

        ShellCommand::Prev => {
            if session.prev_page() {
                refresh_and_list(session, services, r, out)?;
            } else {
                writeln!(out, "Already on the first page.")?;
            }
        }

        ShellCommand::Page { n } => {
            if session.go_to_page(n) {
                refresh_and_list(session, services, r, out)?;
            } else if n == session.current_page() {
                writeln!(out, "Already on page {n}.")?;
            } else {
                writeln!(out, "Pages run from 1 to {}.", session.total_pages())?;
            }
        }

        ShellCommand::Refresh => refresh_and_list(session, services, r, out)?,

        ShellCommand::Filter { filter } => {
            session.set_filter(filter.into());
            refresh_and_list(session, services, r, out)?;
        }

        ShellCommand::Size { n } => match session.set_page_size(n) {
            Ok(()) => refresh_and_list(session, services, r, out)?,
            Err(e) => writeln!(out, "{e}")?,
        },

        ShellCommand::Ocr { state } => {
            session.set_ocr(state == Toggle::On);
            writeln!(
                out,
                "Image text recognition {}; `refresh` to apply.",
                if state == Toggle::On { "on" } else { "off" }
            )?;
        }

        ShellCommand::Triage => {
            let classifier = Classifier::new(&services.config.classifier, services.model);
            let report = session.triage_all(&classifier);
            r.triage(out, &report)?;
            r.list(out, session)?;
        }

        ShellCommand::Summarize { id, audio } => match session.summarize(services.model, id) {
            Ok(summary) => {
                writeln!(out, "{summary}")?;
                if let Some(path) = audio {
                    speak(services.speech, &summary, &path, out)?;
                }
            }
            Err(e @ SessionError::UnknownMessage(_)) => writeln!(out, "{e}")?,
            Err(e) => {
                log::warn!("summary of {id} failed: {e}");
                writeln!(out, "{SUMMARY_FALLBACK}")?;
            }
        },

        ShellCommand::Reply { id, notes } => {
            match session.generate_reply(services.model, id, &notes.join(" ")) {
                Ok(reply) => {
                    writeln!(out, "{}", reply.body)?;
                    writeln!(out, "\n(`save {id}` stores it as a draft)")?;
                }
                Err(e @ SessionError::UnknownMessage(_)) => writeln!(out, "{e}")?,
                Err(e) => {
                    log::warn!("reply to {id} failed: {e}");
                    writeln!(out, "{REPLY_FALLBACK}")?;
                }
            }
        }

        ShellCommand::Save { id } => {
            let mailboxes = services.config.drafts_mailboxes();
            match session.save_reply(services.connector, id, &mailboxes) {
                Ok(mailbox) => writeln!(out, "Draft saved to {mailbox}.")?,
                Err(e) => writeln!(out, "Could not save draft: {e}")?,
            }
        }

        ShellCommand::Ask { question } => match session.ask(services.model, &question.join(" ")) {
            Ok(answer) => writeln!(out, "{}", answer.trim())?,
            Err(e) => {
                log::warn!("question failed: {e}");
                writeln!(out, "{ANSWER_FALLBACK}")?;
            }
        },

        ShellCommand::Brief { audio } => {
            let script = session.briefing(services.model);
            writeln!(out, "{script}")?;
            if let Some(path) = audio {
                speak(services.speech, &script, &path, out)?;
            }
        }

        ShellCommand::Stats => r.stats(out, &session.stats())?,

        ShellCommand::Reset => return Ok(Flow::Reset),
        ShellCommand::Logout => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn refresh_and_list(
    session: &mut Session,
    services: &Services<'_>,
    r: Renderer,
    out: &mut dyn Write,
) -> io::Result<()> {
    match session.refresh(services.connector, services.ocr) {
        Ok(summary) => {
            r.refresh(out, &summary)?;
            r.list(out, session)
        }
        Err(e) => {
            log::error!("refresh failed: {e}");
            writeln!(out, "Could not fetch messages: {e}")
        }
    }
}

fn speak(
    speech: &dyn SpeechSynthesizer,
    text: &str,
    path: &Path,
    out: &mut dyn Write,
) -> io::Result<()> {
    let Some(audio) = speech.synthesize(text) else {
        return writeln!(out, "Audio unavailable.");
    };
    match std::fs::write(path, audio) {
        Ok(()) => writeln!(out, "Audio written to {}.", path.display()),
        Err(e) => writeln!(out, "Could not write {}: {e}", path.display()),
    }
}
