//! Progress observers for UI integration

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::domain::model::{JobSnapshot, JobStatus};

/// Observer of orchestrator snapshots
pub trait JobObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &JobSnapshot);
}

/// Feed every snapshot published on `rx` to `observer`.
///
/// Returns once the sender is dropped.
pub async fn observe(mut rx: watch::Receiver<JobSnapshot>, observer: &dyn JobObserver) {
    loop {
        let snapshot = *rx.borrow_and_update();
        observer.on_snapshot(&snapshot);
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Console progress bar on stderr
pub struct ConsoleProgress {
    last: Mutex<Option<JobSnapshot>>,
}

impl ConsoleProgress {
    const BAR_LENGTH: usize = 20;

    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    fn render(snapshot: &JobSnapshot) -> String {
        match snapshot.status {
            JobStatus::Encoding => {
                let filled = snapshot.progress as usize * Self::BAR_LENGTH / 100;
                let bar = "#".repeat(filled) + &"-".repeat(Self::BAR_LENGTH - filled);
                format!("\r[{}] {:>3}% encoding", bar, snapshot.progress)
            }
            status => format!("\r{:<32}", status.to_string()),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl JobObserver for ConsoleProgress {
    fn on_snapshot(&self, snapshot: &JobSnapshot) {
        if let Ok(mut last) = self.last.lock() {
            if last.as_ref() == Some(snapshot) {
                return;
            }
            *last = Some(*snapshot);
        }

        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}", Self::render(snapshot));
        if snapshot.status.is_terminal() {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

/// Newline-delimited JSON progress events on stdout
pub struct JsonProgress;

impl JsonProgress {
    fn event(snapshot: &JobSnapshot) -> serde_json::Value {
        serde_json::json!({
            "event": "progress",
            "status": snapshot.status,
            "percent": snapshot.progress,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })
    }
}

impl JobObserver for JsonProgress {
    fn on_snapshot(&self, snapshot: &JobSnapshot) {
        println!("{}", Self::event(snapshot));
    }
}

/// No-op observer for when progress display is disabled
pub struct NoOpProgress;

impl JobObserver for NoOpProgress {
    fn on_snapshot(&self, _snapshot: &JobSnapshot) {}
}
