//! File-based CheckpointRepository implementation.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Checkpoint, CheckpointRepository};
use crate::error::{Result, RuntimeError};

/// Stores each checkpoint as `checkpoint_{name}.bin` under a base directory.
///
/// Writes go to a temporary file that is renamed into place, so a crash never
/// leaves a half-written checkpoint under the real name.
#[derive(Clone, Debug)]
pub struct FileCheckpointRepository {
    base_dir: PathBuf,
}

impl FileCheckpointRepository {
    const PREFIX: &'static str = "checkpoint_";
    const EXTENSION: &'static str = "bin";

    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|source| RuntimeError::io(&base_dir, source))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}{name}.{}", Self::PREFIX, Self::EXTENSION))
    }
}

impl CheckpointRepository for FileCheckpointRepository {
    fn save(&self, name: &str, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.checkpoint_path(name);
        let temp_path = path.with_extension("bin.tmp");

        let bytes = checkpoint.to_bytes()?;
        fs::write(&temp_path, &bytes).map_err(|source| RuntimeError::io(&temp_path, source))?;
        fs::rename(&temp_path, &path).map_err(|source| RuntimeError::io(&path, source))?;

        debug!(
            target: "lockstep::runtime",
            path = %path.display(),
            frame = %checkpoint.frame,
            bytes = bytes.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|source| RuntimeError::io(&path, source))?;
        let checkpoint = Checkpoint::from_bytes(&bytes)?;
        info!(
            target: "lockstep::runtime",
            name,
            frame = %checkpoint.frame,
            "checkpoint loaded"
        );
        Ok(Some(checkpoint))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.checkpoint_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|source| RuntimeError::io(&path, source))?;
            info!(target: "lockstep::runtime", path = %path.display(), "checkpoint deleted");
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.base_dir).map_err(|source| RuntimeError::io(&self.base_dir, source))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RuntimeError::io(&self.base_dir, source))?;
            let path = entry.path();
            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(name) = filename
                    .strip_prefix(Self::PREFIX)
                    .and_then(|s| s.strip_suffix(".bin"))
            {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
