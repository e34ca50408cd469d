//! Asks on the terminal whether a failed catalog fetch should be retried.

use std::io::{BufRead, IsTerminal, Write};

use fpga_catalog_remote::{RemoteError, RetryDecision, RetryPrompt};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

pub(crate) struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    /// Without a terminal on stdin every failure cancels.
    pub(crate) fn new() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }

    fn ask(&self, url: &str, error: &RemoteError) -> std::io::Result<RetryDecision> {
        let mut stderr = std::io::stderr();
        writeln!(
            stderr,
            "{} Could not fetch {}: {}",
            "\u{26A0}".if_supports_color(Stderr, |t| t.yellow()),
            url.if_supports_color(Stderr, |t| t.cyan()),
            error,
        )?;
        write!(stderr, "Retry? [Y/n] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(match answer.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => RetryDecision::Retry,
            _ => RetryDecision::Cancel,
        })
    }
}

impl RetryPrompt for TerminalPrompt {
    fn on_fetch_error(&mut self, url: &str, error: &RemoteError) -> RetryDecision {
        if !self.interactive {
            log::warn!("Could not fetch {url}: {error}");
            return RetryDecision::Cancel;
        }
        self.ask(url, error).unwrap_or(RetryDecision::Cancel)
    }
}
