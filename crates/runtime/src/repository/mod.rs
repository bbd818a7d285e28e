//! Checkpoint persistence.
//!
//! A [`Checkpoint`] captures everything a session needs to resume: the action
//! state, the world, the recorded stream and the telemetry counters. Static
//! data (rule tables, map, config) is rebuilt from configuration and is not
//! stored.
mod file;
mod memory;

pub use file::FileCheckpointRepository;
pub use memory::InMemoryCheckpointRepository;

use lockstep_core::{ActionState, ActionStreamWriter, Frame};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};
use crate::hooks::ApmCounter;
use crate::world::WorldState;

/// Serialized session snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Next frame the session will simulate.
    pub frame: Frame,
    pub action_state: ActionState,
    pub world: WorldState,
    pub recorder: ActionStreamWriter,
    /// Stream fed from outside, with the cursor kept in `action_state`.
    pub input: Vec<u8>,
    pub apm: ApmCounter,
    /// Hex digest of the state at `frame`, checked on restore.
    pub state_hash: String,
}

impl Checkpoint {
    pub const VERSION: u32 = 1;

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let checkpoint: Self = bincode::deserialize(bytes)?;
        if checkpoint.version != Self::VERSION {
            return Err(RuntimeError::CheckpointVersion {
                found: checkpoint.version,
                expected: Self::VERSION,
            });
        }
        Ok(checkpoint)
    }
}

/// Named checkpoint storage.
pub trait CheckpointRepository: Send + Sync {
    fn save(&self, name: &str, checkpoint: &Checkpoint) -> Result<()>;

    /// Loads a checkpoint; `None` when no checkpoint has that name.
    fn load(&self, name: &str) -> Result<Option<Checkpoint>>;

    fn delete(&self, name: &str) -> Result<()>;

    /// Stored names, sorted.
    fn list(&self) -> Result<Vec<String>>;
}
