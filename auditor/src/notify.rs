//! Progress notification sink.
//!
//! The analysis loop reports human-readable progress through [`Notifier::emit`]
//! and never depends on whether anyone is listening. Notifications are
//! product output for observers (the CLI's stderr, the server's event stream);
//! developer diagnostics go through `tracing` instead.

use tracing::info;

/// One-way, fire-and-forget progress channel.
pub trait Notifier: Send + Sync {
    fn emit(&self, message: &str);
}

/// Notifier for the CLI: records each message as a tracing event and optionally
/// echoes it to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    pub echo: bool,
}

impl Notifier for ConsoleNotifier {
    fn emit(&self, message: &str) {
        info!(target: "auditor::progress", "{message}");
        if self.echo {
            eprintln!("{message}");
        }
    }
}

