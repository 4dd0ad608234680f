// Encode interactor - Orchestrates one GIF encode job at a time

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::domain::rules::FilterChainBuilder;
use crate::engine::events::{Flow, LogLine};
use crate::engine::{progress_percent, EngineAdapter};
use crate::error::{GifError, GifResult};
use crate::ports::{Notice, Notifier, OutputStore};
use crate::probe::media_info_from_log;

/// Prefix given to an input's virtual name when it collides with the output name
const INPUT_COLLISION_PREFIX: &str = "input-";

/// One encode request
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub input: InputFile,
    /// Settings snapshot; read-only for the lifetime of the job
    pub settings: EncodingSettings,
    /// Committed editor selection; `None` when nothing was edited yet
    pub selection: Option<EditSelection>,
}

/// Where a Done job's output can be retrieved
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedOutput {
    pub name: String,
    pub media_type: &'static str,
    pub size: usize,
    pub location: PathBuf,
}

/// Outcome of a job that ran
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub status: JobStatus,
    pub filter_graph: Option<String>,
    pub output: Option<PublishedOutput>,
    pub error: Option<String>,
}

/// What a submit did
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Another job holds the engine; nothing changed
    Busy,
    /// The editor must commit a selection first
    EditorRequested,
    Finished(JobReport),
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Route submits without a committed selection through the editor
    pub editor_enabled: bool,
    /// Log text that marks an engine-internal error
    pub error_marker: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            editor_enabled: false,
            error_marker: "Aborted()".to_string(),
        }
    }
}

enum Outcome {
    Done(PublishedOutput),
    Aborted,
}

/// Exclusive hold on the engine for one encode, probe or preview; released on drop
struct EngineLease<'a>(&'a AtomicBool);

impl<'a> EngineLease<'a> {
    fn try_acquire(held: &'a AtomicBool) -> Option<Self> {
        held.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(held))
    }
}

impl Drop for EngineLease<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Top-level encode state machine.
///
/// `Idle -> LoadingEngine -> LoadingInput -> Encoding -> Done | Aborted | Failed`.
/// A terminal state accepts the next submit; a busy one drops it.
pub struct EncodeOrchestrator {
    engine: Arc<EngineAdapter>,
    outputs: Arc<dyn OutputStore>,
    notifier: Arc<dyn Notifier>,
    options: OrchestratorOptions,
    state: Arc<watch::Sender<JobSnapshot>>,
    engine_held: AtomicBool,
    previous_output: Mutex<Option<PathBuf>>,
    pending_edit: Mutex<Option<EncodeRequest>>,
}

impl EncodeOrchestrator {
    pub fn new(
        engine: Arc<EngineAdapter>,
        outputs: Arc<dyn OutputStore>,
        notifier: Arc<dyn Notifier>,
        options: OrchestratorOptions,
    ) -> Self {
        let (state, _) = watch::channel(JobSnapshot::default());
        Self {
            engine,
            outputs,
            notifier,
            options,
            state: Arc::new(state),
            engine_held: AtomicBool::new(false),
            previous_output: Mutex::new(None),
            pending_edit: Mutex::new(None),
        }
    }

    /// Subscribe to state and progress changes
    pub fn watch(&self) -> watch::Receiver<JobSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        *self.state.borrow()
    }

    pub fn engine(&self) -> &Arc<EngineAdapter> {
        &self.engine
    }

    fn set_status(&self, status: JobStatus) {
        self.state.send_modify(|snapshot| {
            snapshot.status = status;
            snapshot.progress = 0;
        });
        debug!(status = %status, "Job status");
    }

    /// Move to LoadingEngine unless a job is already running
    fn claim(&self) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.status.is_busy() {
                return false;
            }
            snapshot.status = JobStatus::LoadingEngine;
            snapshot.progress = 0;
            true
        })
    }

    /// True while an encode, probe or preview is running on the engine
    pub fn is_busy(&self) -> bool {
        self.snapshot().status.is_busy() || self.engine_held.load(Ordering::Acquire)
    }

    /// Hold the engine for a probe or preview; the job status is left alone
    fn lease(&self) -> GifResult<EngineLease<'_>> {
        if self.snapshot().status.is_busy() {
            return Err(GifError::Busy);
        }
        EngineLease::try_acquire(&self.engine_held).ok_or(GifError::Busy)
    }

    /// Input being held for the editor, if any
    pub fn pending_edit(&self) -> Option<InputFile> {
        self.pending_edit
            .lock()
            .ok()
            .and_then(|pending| pending.as_ref().map(|r| r.input.clone()))
    }

    async fn revoke_previous(&self) {
        let previous = self.previous_output.lock().ok().and_then(|mut p| p.take());
        if let Some(location) = previous {
            if let Err(e) = self.outputs.revoke(&location).await {
                warn!(location = %location.display(), error = %e, "Failed to revoke previous output");
            }
        }
    }

    /// Submit an encode; runs the whole job before returning
    pub async fn submit(&self, request: EncodeRequest) -> Submission {
        if self.is_busy() {
            debug!(input = %request.input.name, "Submit dropped, job in progress");
            return Submission::Busy;
        }

        if self.options.editor_enabled && request.selection.is_none() {
            self.revoke_previous().await;
            info!(input = %request.input.name, "Waiting for editor selection");
            if let Ok(mut pending) = self.pending_edit.lock() {
                *pending = Some(request);
            }
            return Submission::EditorRequested;
        }

        let Some(_lease) = EngineLease::try_acquire(&self.engine_held) else {
            debug!(input = %request.input.name, "Submit dropped, engine in use");
            return Submission::Busy;
        };
        if !self.claim() {
            return Submission::Busy;
        }
        self.revoke_previous().await;
        Submission::Finished(self.run(request).await)
    }

    /// Resume the input held for the editor with the committed selection
    pub async fn commit_edit(&self, selection: EditSelection) -> Option<Submission> {
        let pending = self.pending_edit.lock().ok().and_then(|mut p| p.take())?;
        Some(
            self.submit(EncodeRequest {
                selection: Some(selection),
                ..pending
            })
            .await,
        )
    }

    /// Drop the input held for the editor
    pub fn cancel_edit(&self) -> bool {
        let cancelled = self
            .pending_edit
            .lock()
            .ok()
            .and_then(|mut p| p.take())
            .is_some();
        if cancelled {
            info!("Edit cancelled");
        }
        cancelled
    }

    fn virtual_names(input: &InputFile) -> (String, String) {
        let output_name = input.output_name();
        let input_name = if input.name == output_name {
            format!("{}{}", INPUT_COLLISION_PREFIX, input.name)
        } else {
            input.name.clone()
        };
        (input_name, output_name)
    }

    async fn run(&self, request: EncodeRequest) -> JobReport {
        let (input_name, output_name) = Self::virtual_names(&request.input);
        info!(input = %request.input.name, output = %output_name, "Encode job started");

        let mut filter_graph = None;
        let result = self
            .pipeline(&request, &input_name, &output_name, &mut filter_graph)
            .await;
        self.cleanup(&[&input_name, &output_name]).await;

        let report = match result {
            Ok(Outcome::Done(output)) => {
                self.set_status(JobStatus::Done);
                self.notifier.notify(Notice::info(format!(
                    "Encoded {} ({} bytes)",
                    output.name, output.size
                )));
                JobReport {
                    status: JobStatus::Done,
                    filter_graph,
                    output: Some(output),
                    error: None,
                }
            }
            Ok(Outcome::Aborted) => {
                self.set_status(JobStatus::Aborted);
                self.notifier.notify(Notice::warning(format!(
                    "Encoding {} was aborted: the engine reported an internal error",
                    request.input.name
                )));
                JobReport {
                    status: JobStatus::Aborted,
                    filter_graph,
                    output: None,
                    error: None,
                }
            }
            Err(err) => {
                self.set_status(JobStatus::Failed);
                warn!(input = %request.input.name, error = %err, "Encode job failed");
                self.notifier.notify(Notice::error(format!(
                    "Encoding {} failed: {}",
                    request.input.name, err
                )));
                JobReport {
                    status: JobStatus::Failed,
                    filter_graph,
                    output: None,
                    error: Some(err.to_string()),
                }
            }
        };
        info!(input = %request.input.name, status = %report.status, "Encode job finished");
        report
    }

    async fn pipeline(
        &self,
        request: &EncodeRequest,
        input_name: &str,
        output_name: &str,
        filter_graph: &mut Option<String>,
    ) -> GifResult<Outcome> {
        self.engine.load().await?;

        self.set_status(JobStatus::LoadingInput);
        let bytes = fetch_input(&request.input).await?;
        self.engine
            .write_file(input_name, &bytes)
            .await
            .map_err(|e| GifError::Input {
                name: request.input.name.clone(),
                message: e.to_string(),
            })?;
        drop(bytes);

        let selection = request.selection.clone().unwrap_or_default();
        let settings =
            FilterChainBuilder::effective_settings(&request.settings, selection.height_override);
        let plan = FilterChainBuilder::encode_plan(
            &settings,
            selection.crop.as_ref(),
            selection.trim.as_ref(),
            input_name,
            output_name,
        );
        info!(graph = %plan.filter_graph, "Filter graph built");
        *filter_graph = Some(plan.filter_graph.clone());

        let aborted = Arc::new(AtomicBool::new(false));
        self.set_status(JobStatus::Encoding);
        let code = {
            let state = Arc::clone(&self.state);
            let _progress = self.engine.events().on_progress(Arc::new(move |progress: f64| {
                let percent = progress_percent(progress);
                state.send_if_modified(|snapshot| {
                    if snapshot.status != JobStatus::Encoding || snapshot.progress == percent {
                        return false;
                    }
                    snapshot.progress = percent;
                    true
                });
                Flow::Continue
            }));

            let marker = self.options.error_marker.clone();
            let flag = Arc::clone(&aborted);
            let _log = self.engine.events().on_log(Arc::new(move |line: &LogLine| {
                if line.fault || line.message.contains(&marker) {
                    warn!(line = %line.message, "Engine reported an internal error");
                    flag.store(true, Ordering::SeqCst);
                    return Flow::Stop;
                }
                Flow::Continue
            }));

            self.engine.execute(&plan.args).await
        };

        if aborted.load(Ordering::SeqCst) {
            return Ok(Outcome::Aborted);
        }
        let code = code?;
        if code != 0 {
            return Err(GifError::EngineExit { code });
        }

        let data = self.engine.read_file(output_name).await?;
        let output = OutputFile::gif(output_name.to_string(), data);
        let location = self.outputs.publish(&output).await?;
        if let Ok(mut previous) = self.previous_output.lock() {
            *previous = Some(location.clone());
        }

        Ok(Outcome::Done(PublishedOutput {
            name: output.name.clone(),
            media_type: output.media_type,
            size: output.size(),
            location,
        }))
    }

    async fn cleanup(&self, names: &[&str]) {
        for name in names {
            match self.engine.delete_file(name).await {
                Ok(()) => {}
                Err(GifError::EngineNotLoaded) => {}
                Err(e) => warn!(file = %name, error = %e, "Failed to delete engine file"),
            }
        }
    }

    /// Read duration and frame size of an input
    pub async fn probe(&self, input: &InputFile) -> GifResult<MediaInfo> {
        let _lease = self.lease()?;
        self.engine.load().await?;

        let name = format!("probe-{}", input.name);
        let bytes = fetch_input(input).await?;
        self.engine.write_file(&name, &bytes).await?;
        drop(bytes);

        let lines = Arc::new(Mutex::new(Vec::new()));
        let result = {
            let sink = Arc::clone(&lines);
            let _log = self.engine.events().on_log(Arc::new(move |line: &LogLine| {
                if let Ok(mut lines) = sink.lock() {
                    lines.push(line.message.clone());
                }
                Flow::Continue
            }));
            // without an output the engine exits non-zero after printing stream facts
            self.engine
                .execute(&FilterChainBuilder::probe_args(&name))
                .await
        };
        self.cleanup(&[&name]).await;
        result?;

        let lines = lines.lock().map(|l| l.clone()).unwrap_or_default();
        let info = media_info_from_log(lines.iter().map(String::as_str))?;
        info!(
            input = %input.name,
            duration = info.duration,
            width = info.width,
            height = info.height,
            "Input probed"
        );
        Ok(info)
    }

    /// Transcode an input into a small H.264 preview
    pub async fn generate_preview(&self, input: &InputFile) -> GifResult<OutputFile> {
        let _lease = self.lease()?;
        self.engine.load().await?;

        let input_name = format!("preview-src-{}", input.name);
        let output_name = format!(
            "preview-{}",
            replace_extension(&input.name, PREVIEW_EXTENSION)
        );

        let bytes = fetch_input(input).await?;
        let result = async {
            self.engine.write_file(&input_name, &bytes).await?;
            let code = self
                .engine
                .execute(&FilterChainBuilder::preview_args(&input_name, &output_name))
                .await?;
            if code != 0 {
                return Err(GifError::EngineExit { code });
            }
            self.engine.read_file(&output_name).await
        }
        .await;
        self.cleanup(&[&input_name, &output_name]).await;

        let data = result?;
        info!(input = %input.name, bytes = data.len(), "Preview generated");
        Ok(OutputFile {
            name: replace_extension(&input.name, PREVIEW_EXTENSION),
            media_type: PREVIEW_MEDIA_TYPE,
            data,
        })
    }

    /// Terminate the engine
    pub async fn shutdown(&self) {
        self.engine.terminate().await;
        info!("Orchestrator shut down");
    }
}

async fn fetch_input(input: &InputFile) -> GifResult<Vec<u8>> {
    match &input.data {
        InputData::Bytes(bytes) => Ok(bytes.clone()),
        InputData::Path(path) => tokio::fs::read(path).await.map_err(|e| GifError::Input {
            name: input.name.clone(),
            message: format!("cannot read {}: {}", path.display(), e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_names_avoid_collision() {
        let gif = InputFile::from_bytes("loop.gif", vec![]).unwrap();
        assert_eq!(
            EncodeOrchestrator::virtual_names(&gif),
            ("input-loop.gif".to_string(), "loop.gif".to_string())
        );

        let mp4 = InputFile::from_bytes("clip.mp4", vec![]).unwrap();
        assert_eq!(
            EncodeOrchestrator::virtual_names(&mp4),
            ("clip.mp4".to_string(), "clip.gif".to_string())
        );
    }
}
