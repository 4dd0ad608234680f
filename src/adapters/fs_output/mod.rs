// Output store adapter - Stages encoded outputs in a process-scoped directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::domain::model::OutputFile;
use crate::error::{GifError, GifResult};
use crate::ports::OutputStore;

/// Publishes outputs as files in a private staging directory.
///
/// Locations stay valid until revoked or until the store is dropped.
pub struct TempOutputStore {
    dir: TempDir,
}

impl TempOutputStore {
    pub fn new() -> GifResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gifsmith-out-")
            .tempdir()
            .map_err(|e| GifError::OutputPublish {
                message: format!("cannot create staging directory: {}", e),
            })?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn free_location(&self, name: &str) -> PathBuf {
        let mut candidate = self.dir.path().join(name);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.dir.path().join(format!("{}-{}", n, name));
            n += 1;
        }
        candidate
    }
}

#[async_trait]
impl OutputStore for TempOutputStore {
    async fn publish(&self, output: &OutputFile) -> GifResult<PathBuf> {
        let file_name = Path::new(&output.name)
            .file_name()
            .ok_or_else(|| GifError::OutputPublish {
                message: format!("output name '{}' is not a file name", output.name),
            })?
            .to_string_lossy()
            .to_string();

        let location = self.free_location(&file_name);
        tokio::fs::write(&location, &output.data)
            .await
            .map_err(|e| GifError::OutputPublish {
                message: format!("cannot write {}: {}", location.display(), e),
            })?;

        info!(
            file = %output.name,
            media_type = output.media_type,
            bytes = output.size(),
            "Output published"
        );
        Ok(location)
    }

    async fn revoke(&self, location: &Path) -> GifResult<()> {
        if !location.starts_with(self.dir.path()) {
            debug!(location = %location.display(), "Ignoring revoke outside staging directory");
            return Ok(());
        }
        match tokio::fs::remove_file(location).await {
            Ok(()) => {
                debug!(location = %location.display(), "Output revoked");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GifError::Io(e)),
        }
    }
}
