//! Filesystem artifact store: `<dir>/<slot>.json`.
//!
//! Writes go to a sibling temp file that is renamed over the slot, so a
//! concurrent reader sees either the old artifact or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use retailsense_core::{AnalyticsError, AnalyticsResult, ArtifactStore, ModelType};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, model_type: ModelType) -> PathBuf {
        self.dir.join(format!("{}.json", model_type.slot()))
    }

    fn temp_path(&self, model_type: ModelType) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", model_type.slot()))
    }
}

fn storage_err(action: &str, path: &Path, e: io::Error) -> AnalyticsError {
    AnalyticsError::storage(format!("{action} {}: {e}", path.display()))
}

impl ArtifactStore for FsArtifactStore {
    fn save(&self, model_type: ModelType, blob: &[u8]) -> AnalyticsResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| storage_err("create", &self.dir, e))?;

        let tmp = self.temp_path(model_type);
        let target = self.slot_path(model_type);
        {
            let mut file = fs::File::create(&tmp).map_err(|e| storage_err("create", &tmp, e))?;
            file.write_all(blob).map_err(|e| storage_err("write", &tmp, e))?;
            file.sync_all().map_err(|e| storage_err("sync", &tmp, e))?;
        }
        fs::rename(&tmp, &target).map_err(|e| storage_err("rename", &target, e))?;
        debug!(path = %target.display(), bytes = blob.len(), "artifact slot written");
        Ok(())
    }

    fn load(&self, model_type: ModelType) -> AnalyticsResult<Option<Vec<u8>>> {
        let path = self.slot_path(model_type);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("read", &path, e)),
        }
    }
}
