use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::email::MessageId;
use crate::mail::store::SearchFilter;

/// One line typed at the shell prompt.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    /// List the current page, highest priority first
    #[command(alias = "ls")]
    List,

    /// Show one message and its generated reply, if any
    Show { id: MessageId },

    /// Go to the next (older) page
    #[command(alias = "n")]
    Next,

    /// Go to the previous (newer) page
    #[command(alias = "p")]
    Prev,

    /// Jump to a page
    Page { n: u32 },

    /// Fetch the current page again
    #[command(alias = "r")]
    Refresh,

    /// Show all messages or only unread ones
    Filter {
        #[arg(value_enum)]
        filter: FilterArg,
    },

    /// Messages per page (5, 10, 15 or 20)
    Size { n: usize },

    /// Turn image text recognition on or off
    Ocr {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Classify every message on the page
    Triage,

    /// Summarize a message
    Summarize {
        id: MessageId,
        /// Also write the summary as speech to this file
        #[arg(long)]
        audio: Option<PathBuf>,
    },

    /// Generate a reply from a few notes
    Reply {
        id: MessageId,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        notes: Vec<String>,
    },

    /// Save the generated reply to the drafts folder
    Save { id: MessageId },

    /// Ask a question about the messages on this page
    Ask {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        question: Vec<String>,
    },

    /// Spoken-style digest of the newest messages
    Brief {
        #[arg(long)]
        audio: Option<PathBuf>,
    },

    /// Category and sender counts for this page
    Stats,

    /// Drop all session state and log in again
    Reset,

    /// End the session and leave
    #[command(aliases = ["quit", "exit", "q"])]
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    All,
    Unread,
}

impl From<FilterArg> for SearchFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => SearchFilter::All,
            FilterArg::Unread => SearchFilter::Unread,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words).map(|l| Some(l.command))
}
