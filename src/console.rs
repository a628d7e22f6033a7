use std::io::{self, Write};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// The kiosk's only user-facing surface. Prompting and announcing are split
/// so the orchestrator and the verification gate can be driven by a scripted
/// console in tests.
#[async_trait]
pub trait Console: Send {
    /// Prints `text` without a trailing newline and reads one line.
    /// Returns None once the input stream is closed.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>>;

    fn say(&mut self, text: &str);
}

pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        print!("{text}");
        io::stdout().flush().context("failed to flush stdout")?;
        let line = self
            .lines
            .next_line()
            .await
            .context("failed to read console input")?;
        Ok(line.map(|line| line.trim_end_matches('\r').to_string()))
    }

    fn say(&mut self, text: &str) {
        println!("{text}");
    }
}
