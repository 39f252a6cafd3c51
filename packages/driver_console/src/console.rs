//! Operator-facing surfaces: the scrolling state log, the driver-name display,
//! alerts, and the name prompt.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

/// Where accepted state entries are shown.
pub trait LogView: Send {
    fn append_line(&mut self, line: &str);
    fn scroll_to_end(&mut self);
}

/// Operator-visible feedback for the registration flow.
pub trait OperatorConsole: Send + Sync {
    /// Show the current driver identity, or the placeholder when absent.
    fn show_driver_name(&self, name: Option<&str>);
    fn alert(&self, notice: Notice);
    /// A failure the operator should be able to see but that needs no action.
    fn diagnostic(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Registered,
    RegistrationFailed,
    AlreadyRegistered,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::Registered => "Driver registered successfully!",
            Notice::RegistrationFailed => "Failed to register driver.",
            Notice::AlreadyRegistered => "Driver already registered.",
        }
    }
}

pub const NO_DRIVER_PLACEHOLDER: &str = "(none)";

pub fn format_driver_name(name: Option<&str>) -> String {
    format!("Driver's Name: {}", name.unwrap_or(NO_DRIVER_PLACEHOLDER))
}

/// Plain terminal rendition: log lines on stdout, everything else on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl LogView for TerminalConsole {
    fn append_line(&mut self, line: &str) {
        write_line(&mut std::io::stdout().lock(), line);
    }

    fn scroll_to_end(&mut self) {
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!(error = %e, "failed to flush stdout");
        }
    }
}

/// A closed stdout must not take the feed down; the failure is only logged.
fn write_line(out: &mut impl Write, line: &str) -> bool {
    match writeln!(out, "{line}") {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "failed to write state line");
            false
        }
    }
}

impl OperatorConsole for TerminalConsole {
    fn show_driver_name(&self, name: Option<&str>) {
        eprintln!("{}", format_driver_name(name));
    }

    fn alert(&self, notice: Notice) {
        eprintln!("[driver-console] {}", notice.message());
    }

    fn diagnostic(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Reads operator-supplied names one line at a time.
pub struct NamePrompt<R, W> {
    lines: Lines<R>,
    out: W,
}

impl NamePrompt<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stderr> {
    pub fn stdin() -> Self {
        Self::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stderr(),
        )
    }
}

impl<R, W> NamePrompt<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    /// Prompt for a name. `None` means the operator cancelled (end of input).
    pub async fn ask(&mut self) -> Option<String> {
        let _ = self.out.write_all(b"Please enter your name: ").await;
        let _ = self.out.flush().await;
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read name from input");
                None
            }
        }
    }
}
