use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{AppConfig, FfmpegLoader, TempOutputStore, TomlSettingsStore, TracingNotifier};
use crate::app::encode_interactor::{EncodeOrchestrator, OrchestratorOptions};
use crate::engine::EngineAdapter;
use crate::error::GifResult;
use crate::ports::{EngineLoader, Notifier, OutputStore, SettingsStore};

pub trait AppContainer: Send + Sync {
    fn orchestrator(&self) -> Arc<EncodeOrchestrator>;
    fn settings_store(&self) -> Arc<dyn SettingsStore>;
    fn config(&self) -> &AppConfig;
    fn config_path(&self) -> &Path;
}

pub struct DefaultAppContainer {
    orchestrator: Arc<EncodeOrchestrator>,
    settings_store: Arc<dyn SettingsStore>,
    config: AppConfig,
    config_path: PathBuf,
}

impl DefaultAppContainer {
    /// Wire the production adapters from a loaded configuration
    pub fn new(config: AppConfig, config_path: PathBuf) -> GifResult<Self> {
        let binary = config.engine.binary.clone();
        let engine = EngineAdapter::shared(move || Arc::new(FfmpegLoader::new(binary)) as Arc<dyn EngineLoader>);
        let outputs = Arc::new(TempOutputStore::new()?);
        let notifier = Arc::new(TracingNotifier::new());
        let settings_store = Arc::new(TomlSettingsStore::new(config_path.clone()));

        let orchestrator = Arc::new(EncodeOrchestrator::new(
            engine,
            Arc::clone(&outputs) as Arc<dyn OutputStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            OrchestratorOptions {
                editor_enabled: config.editor.enabled,
                error_marker: config.engine.error_marker.clone(),
            },
        ));

        Ok(Self {
            orchestrator,
            settings_store: settings_store as Arc<dyn SettingsStore>,
            config,
            config_path,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn orchestrator(&self) -> Arc<EncodeOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    fn settings_store(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.settings_store)
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn config_path(&self) -> &Path {
        &self.config_path
    }
}
