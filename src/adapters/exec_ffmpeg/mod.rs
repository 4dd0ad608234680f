//! FFmpeg execution adapter
//!
//! Runs an `ffmpeg` binary as the transcoding engine. Each loaded engine
//! gets a private temporary directory that serves as its virtual
//! filesystem; invocations run with that directory as working directory.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::engine::events::{EventHub, LogLine};
use crate::error::{GifError, GifResult};
use crate::ports::{EngineLoader, TranscodeEngine};
use crate::probe::ProgressParser;

/// Loads [`FfmpegEngine`] instances for a given binary
pub struct FfmpegLoader {
    binary: PathBuf,
}

impl FfmpegLoader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> GifResult<Arc<dyn TranscodeEngine>> {
        let status = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| GifError::EngineLoad {
                message: format!("cannot run {}: {}", self.binary.display(), e),
            })?;

        if !status.success() {
            return Err(GifError::EngineLoad {
                message: format!("{} -version exited with {}", self.binary.display(), status),
            });
        }

        let workdir = tempfile::Builder::new()
            .prefix("gifsmith-vfs-")
            .tempdir()
            .map_err(|e| GifError::EngineLoad {
                message: format!("cannot create engine filesystem: {}", e),
            })?;

        info!(binary = %self.binary.display(), vfs = %workdir.path().display(), "FFmpeg engine loaded");
        Ok(Arc::new(FfmpegEngine::new(self.binary.clone(), workdir)))
    }
}

/// An `ffmpeg` binary bound to a private working directory
pub struct FfmpegEngine {
    binary: PathBuf,
    workdir: Mutex<Option<TempDir>>,
    shutdown: watch::Sender<bool>,
}

impl FfmpegEngine {
    pub fn new(binary: PathBuf, workdir: TempDir) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            binary,
            workdir: Mutex::new(Some(workdir)),
            shutdown,
        }
    }

    fn root(&self) -> GifResult<PathBuf> {
        self.workdir
            .lock()
            .ok()
            .and_then(|dir| dir.as_ref().map(|d| d.path().to_path_buf()))
            .ok_or(GifError::EngineNotLoaded)
    }

    /// Map a virtual name to its backing path, refusing anything but a plain file name
    fn resolve(&self, name: &str) -> GifResult<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if !plain {
            return Err(GifError::filesystem(name, "not a plain file name"));
        }
        Ok(self.root()?.join(name))
    }

    fn emit_line(buffer: &mut Vec<u8>, parser: &mut ProgressParser, events: &EventHub) {
        if buffer.is_empty() {
            return;
        }
        let message = String::from_utf8_lossy(buffer).trim_end().to_string();
        buffer.clear();
        if message.is_empty() {
            return;
        }

        trace!(target: "gifsmith::engine", "{}", message);
        if let Some(progress) = parser.feed(&message) {
            events.emit_progress(progress);
        }
        events.emit_log(&LogLine::new(message));
    }

    /// Forward stderr to the event hub; stats lines end in `\r`, the rest in `\n`
    async fn pump_stderr(
        stderr: tokio::process::ChildStderr,
        mut parser: ProgressParser,
        events: &EventHub,
    ) -> std::io::Result<()> {
        let mut reader = BufReader::new(stderr);
        let mut line = Vec::with_capacity(256);

        loop {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                break;
            }
            let consumed = chunk.len();
            for &byte in chunk {
                if byte == b'\n' || byte == b'\r' {
                    Self::emit_line(&mut line, &mut parser, events);
                } else {
                    line.push(byte);
                }
            }
            reader.consume(consumed);
        }
        Self::emit_line(&mut line, &mut parser, events);
        Ok(())
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> GifResult<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| GifError::filesystem(name, e))?;
        debug!(file = name, bytes = data.len(), "Wrote engine file");
        Ok(())
    }

    async fn read_file(&self, name: &str) -> GifResult<Vec<u8>> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| GifError::filesystem(name, e))
    }

    async fn delete_file(&self, name: &str) -> GifResult<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GifError::filesystem(name, e)),
        }
    }

    async fn execute(&self, args: &[String], events: &EventHub) -> GifResult<i32> {
        let root = self.root()?;
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Err(GifError::EngineNotLoaded);
        }

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(&root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GifError::Execute {
                message: format!("cannot spawn {}: {}", self.binary.display(), e),
            })?;

        let stderr = child.stderr.take().ok_or_else(|| GifError::Execute {
            message: "engine stderr unavailable".to_string(),
        })?;
        let parser = ProgressParser::for_args(args);

        let run = async move {
            Self::pump_stderr(stderr, parser, events).await?;
            child.wait().await
        };

        let stopped = async move {
            loop {
                if shutdown.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
                if *shutdown.borrow_and_update() {
                    break;
                }
            }
        };

        let status = tokio::select! {
            status = run => status.map_err(|e| GifError::Execute { message: e.to_string() })?,
            _ = stopped => {
                return Err(GifError::Execute { message: "engine terminated during execution".to_string() });
            }
        };

        match status.code() {
            Some(code) => {
                debug!(code, "Engine invocation finished");
                Ok(code)
            }
            None => {
                warn!(status = %status, "Engine process ended without an exit code");
                events.emit_log(&LogLine::fault(format!("engine process killed: {}", status)));
                Ok(-1)
            }
        }
    }

    async fn terminate(&self) {
        self.shutdown.send_replace(true);
        let dir = self.workdir.lock().ok().and_then(|mut d| d.take());
        if let Some(dir) = dir {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(vfs = %path.display(), error = %e, "Failed to remove engine filesystem");
            }
        }
    }
}
