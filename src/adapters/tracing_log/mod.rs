// Tracing notifier adapter - User-facing notices as log events

use tracing::{error, info, warn};

use crate::ports::{Notice, NoticeLevel, Notifier};

/// Emits each notice as a `tracing` event on the `gifsmith::notice` target
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(target: "gifsmith::notice", "{}", notice.message),
            NoticeLevel::Warning => warn!(target: "gifsmith::notice", "{}", notice.message),
            NoticeLevel::Error => error!(target: "gifsmith::notice", "{}", notice.message),
        }
    }
}
