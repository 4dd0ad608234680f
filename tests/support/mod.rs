//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use gifsmith::app::{EncodeOrchestrator, OrchestratorOptions};
use gifsmith::domain::model::OutputFile;
use gifsmith::engine::events::{EventHub, LogLine};
use gifsmith::engine::EngineAdapter;
use gifsmith::error::{GifError, GifResult};
use gifsmith::ports::{EngineLoader, Notice, Notifier, OutputStore, TranscodeEngine};

/// What the fake engine does on `execute`
#[derive(Clone, Default)]
pub struct Script {
    /// Emitted before waiting on the gate
    pub progress: Vec<f64>,
    /// Emitted after the gate opens
    pub logs: Vec<LogLine>,
    pub exit_code: i32,
    pub fail: bool,
    /// Write the last argument as output when exiting cleanly
    pub produce_output: bool,
}

impl Script {
    pub fn success() -> Self {
        Self {
            progress: vec![0.25, 0.5],
            produce_output: true,
            ..Self::default()
        }
    }
}

pub const GIF_BYTES: &[u8] = b"GIF89a-fake";

pub struct FakeEngine {
    files: Mutex<HashMap<String, Vec<u8>>>,
    executions: Mutex<Vec<Vec<String>>>,
    script: Mutex<Script>,
    gate: Option<Arc<Notify>>,
    pub started: Arc<Notify>,
    pub terminated: AtomicUsize,
}

impl FakeEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Self::build(script, None)
    }

    /// An engine whose `execute` blocks until the gate is notified
    pub fn gated(script: Script, gate: Arc<Notify>) -> Arc<Self> {
        Self::build(script, Some(gate))
    }

    fn build(script: Script, gate: Option<Arc<Notify>>) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(HashMap::new()),
            executions: Mutex::new(Vec::new()),
            script: Mutex::new(script),
            gate,
            started: Arc::new(Notify::new()),
            terminated: AtomicUsize::new(0),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn executions(&self) -> Vec<Vec<String>> {
        self.executions.lock().unwrap().clone()
    }

    pub fn last_args(&self) -> Vec<String> {
        self.executions().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> GifResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> GifResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| GifError::filesystem(name, "no such file"))
    }

    async fn delete_file(&self, name: &str) -> GifResult<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    async fn execute(&self, args: &[String], events: &EventHub) -> GifResult<i32> {
        self.executions.lock().unwrap().push(args.to_vec());
        let script = self.script.lock().unwrap().clone();

        for progress in &script.progress {
            events.emit_progress(*progress);
        }
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        for line in &script.logs {
            events.emit_log(line);
        }

        if script.fail {
            return Err(GifError::Execute {
                message: "worker crashed".to_string(),
            });
        }
        if script.produce_output && script.exit_code == 0 {
            if let Some(output) = args.last() {
                self.files
                    .lock()
                    .unwrap()
                    .insert(output.clone(), GIF_BYTES.to_vec());
            }
        }
        Ok(script.exit_code)
    }

    async fn terminate(&self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        self.files.lock().unwrap().clear();
    }
}

pub struct FakeLoader {
    engine: Arc<FakeEngine>,
    pub loads: AtomicUsize,
    fail: bool,
}

impl FakeLoader {
    pub fn new(engine: Arc<FakeEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            loads: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing(engine: Arc<FakeEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            loads: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> GifResult<Arc<dyn TranscodeEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GifError::EngineLoad {
                message: "core assets unavailable".to_string(),
            });
        }
        Ok(Arc::clone(&self.engine) as Arc<dyn TranscodeEngine>)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct MemoryOutputStore {
    published: Mutex<Vec<(PathBuf, OutputFile)>>,
    revoked: Mutex<Vec<PathBuf>>,
}

impl MemoryOutputStore {
    pub fn published(&self) -> Vec<(PathBuf, OutputFile)> {
        self.published.lock().unwrap().clone()
    }

    pub fn revoked(&self) -> Vec<PathBuf> {
        self.revoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputStore for MemoryOutputStore {
    async fn publish(&self, output: &OutputFile) -> GifResult<PathBuf> {
        let mut published = self.published.lock().unwrap();
        let location = PathBuf::from(format!("/mem/{}/{}", published.len(), output.name));
        published.push((location.clone(), output.clone()));
        Ok(location)
    }

    async fn revoke(&self, location: &Path) -> GifResult<()> {
        self.revoked.lock().unwrap().push(location.to_path_buf());
        Ok(())
    }
}

/// Orchestrator wired to fakes
pub struct Harness {
    pub orchestrator: Arc<EncodeOrchestrator>,
    pub engine: Arc<FakeEngine>,
    pub loader: Arc<FakeLoader>,
    pub notifier: Arc<RecordingNotifier>,
    pub outputs: Arc<MemoryOutputStore>,
}

impl Harness {
    pub fn new(engine: Arc<FakeEngine>, options: OrchestratorOptions) -> Self {
        Self::with_loader(Arc::clone(&engine), FakeLoader::new(engine), options)
    }

    pub fn with_loader(
        engine: Arc<FakeEngine>,
        loader: Arc<FakeLoader>,
        options: OrchestratorOptions,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let outputs = Arc::new(MemoryOutputStore::default());
        let adapter = Arc::new(EngineAdapter::new(
            Arc::clone(&loader) as Arc<dyn EngineLoader>
        ));
        let orchestrator = Arc::new(EncodeOrchestrator::new(
            adapter,
            Arc::clone(&outputs) as Arc<dyn OutputStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            options,
        ));
        Self {
            orchestrator,
            engine,
            loader,
            notifier,
            outputs,
        }
    }

    pub fn simple(script: Script) -> Self {
        Self::new(FakeEngine::new(script), OrchestratorOptions::default())
    }
}
