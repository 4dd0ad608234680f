//! Transcoding engine lifecycle
//!
//! [`EngineAdapter`] owns the single engine handle for the process. Loading
//! is lazy and idempotent: concurrent callers queue behind one in-flight
//! initialization and all receive its outcome, the same handle or the same
//! failure.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info, warn};

use crate::error::{GifError, GifResult};
use crate::ports::{EngineLoader, TranscodeEngine};

pub mod events;
pub mod progress;

use events::EventHub;

/// Lifecycle of the engine handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    /// Teardown in progress; settles back to `Uninitialized`
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// Convert fractional progress to whole percent.
///
/// Values outside 0..=100 after truncation are reported as 0.
pub fn progress_percent(progress: f64) -> u8 {
    let percent = (progress * 100.0).trunc();
    if (0.0..=100.0).contains(&percent) {
        percent as u8
    } else {
        0
    }
}

static SHARED: OnceLock<Arc<EngineAdapter>> = OnceLock::new();

/// Bookkeeping of finished load attempts
#[derive(Debug, Default)]
struct LoadAttempts {
    finished: u64,
    last_failure: Option<String>,
}

/// Owner of the process-wide engine handle
pub struct EngineAdapter {
    loader: Arc<dyn EngineLoader>,
    init_gate: tokio::sync::Mutex<()>,
    ready: Mutex<Option<Arc<dyn TranscodeEngine>>>,
    attempts: Mutex<LoadAttempts>,
    state: Mutex<EngineState>,
    events: EventHub,
}

impl EngineAdapter {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            init_gate: tokio::sync::Mutex::new(()),
            ready: Mutex::new(None),
            attempts: Mutex::new(LoadAttempts::default()),
            state: Mutex::new(EngineState::Uninitialized),
            events: EventHub::new(),
        }
    }

    /// The process-wide adapter, created from `loader` on first use
    pub fn shared(loader: impl FnOnce() -> Arc<dyn EngineLoader>) -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new(loader()))))
    }

    pub fn state(&self) -> EngineState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(EngineState::Uninitialized)
    }

    fn set_state(&self, next: EngineState) {
        if let Ok(mut state) = self.state.lock() {
            let prev = *state;
            debug!(from = %prev, to = %next, "Engine state change");
            *state = next;
        }
    }

    /// Event feed carrying progress and log lines of every `execute`
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    fn current(&self) -> Option<Arc<dyn TranscodeEngine>> {
        self.ready.lock().ok().and_then(|slot| slot.clone())
    }

    /// Return the ready engine, loading it first if needed
    pub async fn load(&self) -> GifResult<Arc<dyn TranscodeEngine>> {
        if let Some(engine) = self.current() {
            return Ok(engine);
        }
        let seen = self.finished_attempts();

        let _gate = self.init_gate.lock().await;
        // a queued caller takes the outcome of the attempt it waited on
        if let Some(engine) = self.current() {
            return Ok(engine);
        }
        if let Some(message) = self.failure_since(seen) {
            debug!("Sharing failed engine load with queued caller");
            return Err(GifError::EngineLoad { message });
        }

        self.set_state(EngineState::Loading);
        info!("Loading transcoding engine");

        let result = self.loader.load().await;
        self.finish_attempt(result.as_ref().err().map(|err| match err {
            GifError::EngineLoad { message } => message.clone(),
            other => other.to_string(),
        }));
        match result {
            Ok(engine) => {
                if let Ok(mut slot) = self.ready.lock() {
                    *slot = Some(Arc::clone(&engine));
                }
                self.set_state(EngineState::Ready);
                info!("Transcoding engine ready");
                Ok(engine)
            }
            Err(err) => {
                self.set_state(EngineState::Uninitialized);
                warn!(error = %err, "Transcoding engine failed to load");
                Err(err)
            }
        }
    }

    fn finished_attempts(&self) -> u64 {
        self.attempts.lock().map(|a| a.finished).unwrap_or(0)
    }

    fn failure_since(&self, seen: u64) -> Option<String> {
        let attempts = self.attempts.lock().ok()?;
        if attempts.finished == seen {
            return None;
        }
        attempts.last_failure.clone()
    }

    fn finish_attempt(&self, failure: Option<String>) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.finished += 1;
            attempts.last_failure = failure;
        }
    }

    /// Tear the engine down; a no-op when nothing is loaded
    pub async fn terminate(&self) {
        let _gate = self.init_gate.lock().await;
        let engine = self.ready.lock().ok().and_then(|mut slot| slot.take());

        if let Some(engine) = engine {
            self.set_state(EngineState::Terminated);
            engine.terminate().await;
            info!("Transcoding engine terminated");
        }
        self.set_state(EngineState::Uninitialized);
    }

    fn require(&self) -> GifResult<Arc<dyn TranscodeEngine>> {
        self.current().ok_or(GifError::EngineNotLoaded)
    }

    pub async fn write_file(&self, name: &str, data: &[u8]) -> GifResult<()> {
        self.require()?.write_file(name, data).await
    }

    pub async fn read_file(&self, name: &str) -> GifResult<Vec<u8>> {
        self.require()?.read_file(name).await
    }

    pub async fn delete_file(&self, name: &str) -> GifResult<()> {
        self.require()?.delete_file(name).await
    }

    /// Run the loaded engine, delivering events through [`Self::events`]
    pub async fn execute(&self, args: &[String]) -> GifResult<i32> {
        let engine = self.require()?;
        debug!(args = ?args, "Executing engine");
        engine.execute(args, &self.events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullEngine {
        terminated: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TranscodeEngine for NullEngine {
        async fn write_file(&self, _name: &str, _data: &[u8]) -> GifResult<()> {
            Ok(())
        }
        async fn read_file(&self, name: &str) -> GifResult<Vec<u8>> {
            Err(GifError::filesystem(name, "missing"))
        }
        async fn delete_file(&self, _name: &str) -> GifResult<()> {
            Ok(())
        }
        async fn execute(&self, _args: &[String], events: &EventHub) -> GifResult<i32> {
            events.emit_progress(0.5);
            Ok(0)
        }
        async fn terminate(&self) {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingLoader {
        loads: AtomicUsize,
        terminated: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
                terminated: Arc::new(AtomicUsize::new(0)),
                fail,
            })
        }
    }

    #[async_trait]
    impl EngineLoader for CountingLoader {
        async fn load(&self) -> GifResult<Arc<dyn TranscodeEngine>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(GifError::EngineLoad {
                    message: "assets unavailable".to_string(),
                });
            }
            Ok(Arc::new(NullEngine {
                terminated: Arc::clone(&self.terminated),
            }))
        }
    }

    #[test]
    fn test_progress_percent_normalization() {
        assert_eq!(progress_percent(0.0), 0);
        assert_eq!(progress_percent(0.257), 25);
        assert_eq!(progress_percent(1.0), 100);
        assert_eq!(progress_percent(1.2), 0);
        assert_eq!(progress_percent(-0.3), 0);
        assert_eq!(progress_percent(f64::NAN), 0);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_initialization() {
        let loader = CountingLoader::new(false);
        let adapter = EngineAdapter::new(loader.clone());

        let (a, b, c) = tokio::join!(adapter.load(), adapter.load(), adapter.load());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(adapter.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn test_terminate_without_load_is_noop() {
        let loader = CountingLoader::new(false);
        let adapter = EngineAdapter::new(loader.clone());
        adapter.terminate().await;
        assert_eq!(adapter.state(), EngineState::Uninitialized);
        assert_eq!(loader.terminated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_terminate_resets_and_reload_starts_fresh() {
        let loader = CountingLoader::new(false);
        let adapter = EngineAdapter::new(loader.clone());

        adapter.load().await.unwrap();
        adapter.terminate().await;
        assert_eq!(adapter.state(), EngineState::Uninitialized);
        assert_eq!(loader.terminated.load(Ordering::SeqCst), 1);
        assert!(matches!(
            adapter.execute(&[]).await,
            Err(GifError::EngineNotLoaded)
        ));

        adapter.load().await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_failure() {
        let loader = CountingLoader::new(true);
        let adapter = EngineAdapter::new(loader.clone());

        let (a, b, c) = tokio::join!(adapter.load(), adapter.load(), adapter.load());
        for result in [a, b, c] {
            match result {
                Err(GifError::EngineLoad { message }) => {
                    assert_eq!(message, "assets unavailable")
                }
                other => panic!("expected a load failure, got {:?}", other.map(|_| ())),
            }
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.state(), EngineState::Uninitialized);

        // a later caller retries
        assert!(adapter.load().await.is_err());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_returns_to_uninitialized() {
        let loader = CountingLoader::new(true);
        let adapter = EngineAdapter::new(loader.clone());
        assert!(matches!(
            adapter.load().await,
            Err(GifError::EngineLoad { .. })
        ));
        assert_eq!(adapter.state(), EngineState::Uninitialized);
    }

    #[tokio::test]
    async fn test_execute_routes_events_through_hub() {
        let adapter = EngineAdapter::new(CountingLoader::new(false));
        adapter.load().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = adapter.events().on_progress(Arc::new(move |p: f64| {
            if let Ok(mut v) = sink.lock() {
                v.push(p);
            }
            events::Flow::Continue
        }));

        assert_eq!(adapter.execute(&[]).await.unwrap(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![0.5]);
    }
}
