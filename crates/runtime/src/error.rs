//! Unified error type surfaced by the runtime.
//!
//! Wraps failures from the command layer, config and checkpoint I/O so callers
//! can bubble them up with consistent context.
use std::path::PathBuf;

use lockstep_core::{
    EncodeError, ErrorSeverity, ExecuteError, Frame, GameError, Owner, PlayerId, StateError,
    StreamError,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("player {player} is not assigned to a slot")]
    UnknownPlayer { player: PlayerId },

    #[error("owner slot {owner} has no player id")]
    UnassignedOwner { owner: Owner },

    #[error("unit arena is full")]
    ArenaFull,

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("malformed map row {row}: {reason}")]
    Map { row: usize, reason: &'static str },

    #[error("checkpoint encoding failed")]
    Checkpoint(#[from] bincode::Error),

    #[error("checkpoint repository lock was poisoned")]
    LockPoisoned,

    #[error("checkpoint version {found} not supported (expected {expected})")]
    CheckpointVersion { found: u32, expected: u32 },

    #[error("replay diverged at frame {frame}: {expected} != {actual}")]
    Desync {
        frame: Frame,
        expected: String,
        actual: String,
    },
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Severity of the underlying command-layer error, when there is one.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Stream(error) => error.severity(),
            Self::Execute(error) => error.severity(),
            Self::Encode(error) => error.severity(),
            Self::State(error) => error.severity(),
            Self::Desync { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Internal,
        }
    }
}
