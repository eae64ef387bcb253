//! Shared application state for the analysis server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use auditor::io::config::AuditorConfig;
use auditor::notify::Notifier;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// One progress message, as sent to event-stream clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub data: String,
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Foundry project the analyses run in.
    pub project_dir: PathBuf,
    pub config: Arc<AuditorConfig>,
    /// Broadcast sender for progress messages.
    pub event_tx: Arc<broadcast::Sender<LogEvent>>,
    /// Serializes runs that share the project's working roots.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(project_dir: PathBuf, config: AuditorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            project_dir,
            config: Arc::new(config),
            event_tx: Arc::new(event_tx),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn notifier(&self) -> BroadcastNotifier {
        BroadcastNotifier {
            tx: Arc::clone(&self.event_tx),
        }
    }
}

/// Notifier that fans progress messages out to every connected event stream.
///
/// Messages sent while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: Arc<broadcast::Sender<LogEvent>>,
}

impl Notifier for BroadcastNotifier {
    fn emit(&self, message: &str) {
        let receivers = self
            .tx
            .send(LogEvent {
                data: message.to_string(),
            })
            .unwrap_or(0);
        debug!(receivers, "progress broadcast");
    }
}
