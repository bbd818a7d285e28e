//! In-memory checkpoint repository.
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{Checkpoint, CheckpointRepository};
use crate::error::{Result, RuntimeError};

/// Thread-safe but not persistent across process restarts.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointRepository {
    checkpoints: RwLock<BTreeMap<String, Checkpoint>>,
}

impl InMemoryCheckpointRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointRepository for InMemoryCheckpointRepository {
    fn save(&self, name: &str, checkpoint: &Checkpoint) -> Result<()> {
        let mut checkpoints = self
            .checkpoints
            .write()
            .map_err(|_| RuntimeError::LockPoisoned)?;
        checkpoints.insert(name.to_owned(), checkpoint.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Checkpoint>> {
        let checkpoints = self
            .checkpoints
            .read()
            .map_err(|_| RuntimeError::LockPoisoned)?;
        Ok(checkpoints.get(name).cloned())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut checkpoints = self
            .checkpoints
            .write()
            .map_err(|_| RuntimeError::LockPoisoned)?;
        checkpoints.remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let checkpoints = self
            .checkpoints
            .read()
            .map_err(|_| RuntimeError::LockPoisoned)?;
        Ok(checkpoints.keys().cloned().collect())
    }
}
