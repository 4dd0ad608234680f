//! Engine event feed: progress and log listeners with scoped subscriptions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Returned by listeners to stay subscribed or to drop out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One line of engine log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub message: String,
    /// Set when the engine itself signals an internal failure
    pub fault: bool,
}

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fault: false,
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fault: true,
        }
    }
}

/// Receives fractional progress reported during `execute`
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: f64) -> Flow;
}

/// Receives log lines reported during `execute`
pub trait LogListener: Send + Sync {
    fn on_log(&self, line: &LogLine) -> Flow;
}

impl<F> ProgressListener for F
where
    F: Fn(f64) -> Flow + Send + Sync,
{
    fn on_progress(&self, progress: f64) -> Flow {
        self(progress)
    }
}

impl<F> LogListener for F
where
    F: Fn(&LogLine) -> Flow + Send + Sync,
{
    fn on_log(&self, line: &LogLine) -> Flow {
        self(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Progress,
    Log,
}

type Registry<T> = Mutex<Vec<(u64, Arc<T>)>>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    progress: Registry<dyn ProgressListener>,
    log: Registry<dyn LogListener>,
}

impl HubInner {
    fn remove(&self, channel: Channel, id: u64) {
        match channel {
            Channel::Progress => {
                if let Ok(mut listeners) = self.progress.lock() {
                    listeners.retain(|(lid, _)| *lid != id);
                }
            }
            Channel::Log => {
                if let Ok(mut listeners) = self.log.lock() {
                    listeners.retain(|(lid, _)| *lid != id);
                }
            }
        }
    }
}

/// Listener registry shared between an engine and its observers
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to progress; the listener stays until the guard drops
    pub fn on_progress(&self, listener: Arc<dyn ProgressListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.progress.lock() {
            listeners.push((id, listener));
        }
        self.subscription(Channel::Progress, id)
    }

    /// Subscribe to log lines; the listener stays until the guard drops
    pub fn on_log(&self, listener: Arc<dyn LogListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.log.lock() {
            listeners.push((id, listener));
        }
        self.subscription(Channel::Log, id)
    }

    fn subscription(&self, channel: Channel, id: u64) -> Subscription {
        Subscription {
            hub: Arc::downgrade(&self.inner),
            channel,
            id,
        }
    }

    pub fn emit_progress(&self, progress: f64) {
        let snapshot = match self.inner.progress.lock() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for (id, listener) in snapshot {
            if listener.on_progress(progress) == Flow::Stop {
                self.inner.remove(Channel::Progress, id);
            }
        }
    }

    pub fn emit_log(&self, line: &LogLine) {
        let snapshot = match self.inner.log.lock() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for (id, listener) in snapshot {
            if listener.on_log(line) == Flow::Stop {
                self.inner.remove(Channel::Log, id);
            }
        }
    }

    /// Number of live listeners across both channels
    pub fn listener_count(&self) -> usize {
        let progress = self.inner.progress.lock().map(|l| l.len()).unwrap_or(0);
        let log = self.inner.log.lock().map(|l| l.len()).unwrap_or(0);
        progress + log
    }
}

/// Unsubscribes its listener when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    hub: Weak<HubInner>,
    channel: Channel,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.channel, self.id);
        }
    }
}
