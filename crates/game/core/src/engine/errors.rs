//! Error types for action execution and stream processing.

use crate::action::{ActionKind, DecodeError};
use crate::env::OracleError;
use crate::error::{ErrorContext, ErrorSeverity, GameError};
use crate::state::{Owner, PlayerId};

// ============================================================================
// Fatal execution errors
// ============================================================================

/// Contract violations raised by a command handler.
///
/// A conformant sender never produces these; they mean attacker-controlled
/// input or a desynchronized simulation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecuteError {
    #[error("{owner}: {kind} would select {len} units, more than a selection holds")]
    SelectionOverflow {
        owner: Owner,
        kind: ActionKind,
        len: usize,
    },

    #[error("{owner}: unrecognised control group subaction {subaction}")]
    ControlGroupSubaction { owner: Owner, subaction: u8 },

    #[error("{owner}: control group {group} would hold more than a selection")]
    ControlGroupOverflow { owner: Owner, group: u8 },

    #[error("{owner}: unrecognised cheat bits {bits:#010x}")]
    UnknownCheatFlags { owner: Owner, bits: u32 },

    #[error("{owner}: not a player slot")]
    InvalidOwner { owner: Owner },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GameError for ExecuteError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SelectionOverflow { .. } => "EXECUTE_SELECTION_OVERFLOW",
            Self::ControlGroupSubaction { .. } => "EXECUTE_CONTROL_GROUP_SUBACTION",
            Self::ControlGroupOverflow { .. } => "EXECUTE_CONTROL_GROUP_OVERFLOW",
            Self::UnknownCheatFlags { .. } => "EXECUTE_UNKNOWN_CHEAT_FLAGS",
            Self::InvalidOwner { .. } => "EXECUTE_INVALID_OWNER",
            Self::Oracle(error) => error.error_code(),
        }
    }
}

// ============================================================================
// Semantic ineligibility
// ============================================================================

/// Why a well-formed command had no effect.
///
/// Never surfaces past a handler: the command reports `false` and the stream
/// continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    #[error("nothing selected")]
    NoSelection,
    #[error("unit not owned by the issuing player")]
    NotOwned,
    #[error("no eligible unit")]
    NoEligibleUnit,
    #[error("unit is of the wrong type")]
    WrongUnitType,
    #[error("unit is busy")]
    Busy,
    #[error("already researched")]
    AlreadyResearched,
    #[error("already in progress elsewhere")]
    AlreadyInProgress,
    #[error("already at maximum level")]
    MaxLevel,
    #[error("not enough minerals or gas")]
    InsufficientResources,
    #[error("not enough supply")]
    InsufficientSupply,
    #[error("training queue full")]
    QueueFull,
    #[error("required entry missing from the rule tables")]
    MissingTableEntry,
    #[error("cheats are disabled")]
    CheatsDisabled,
    #[error("no target")]
    NoTarget,
    #[error("order is not a construction order")]
    NotBuildOrder,
    #[error("order is reserved for the simulation")]
    InternalOrder,
    #[error("more than one unit selected")]
    MultipleSelected,
    #[error("nothing to cancel")]
    NothingToCancel,
    #[error("value out of range")]
    OutOfRange,
    #[error("no change")]
    Unchanged,
    #[error("world refused the mutation")]
    WorldRefused,
}

impl GameError for Rejection {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        (*self).into()
    }
}

/// Handler outcome other than success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Failure {
    Rejected(Rejection),
    Fatal(ExecuteError),
}

impl From<Rejection> for Failure {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<ExecuteError> for Failure {
    fn from(error: ExecuteError) -> Self {
        Self::Fatal(error)
    }
}

impl From<OracleError> for Failure {
    fn from(error: OracleError) -> Self {
        Self::Fatal(error.into())
    }
}

pub(crate) type Handled = Result<(), Failure>;

// ============================================================================
// Stream errors
// ============================================================================

/// Fatal failures of the frame-gated stream reader.
///
/// The owning simulation must halt or flag a desync; the cursor is left at the
/// start of the block that failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamError {
    #[error("frame block header or payload truncated at byte {}", .context.position)]
    TruncatedBlock { context: ErrorContext },

    #[error("unknown player id {player} at byte {}", .context.position)]
    UnknownPlayer {
        player: PlayerId,
        context: ErrorContext,
    },

    #[error("record undecodable at byte {}: {source}", .context.position)]
    Decode {
        source: DecodeError,
        context: ErrorContext,
    },

    #[error("frame {}: {source}", .context.frame)]
    Execute {
        source: ExecuteError,
        context: ErrorContext,
    },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GameError for StreamError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::TruncatedBlock { context }
            | Self::UnknownPlayer { context, .. }
            | Self::Decode { context, .. }
            | Self::Execute { context, .. } => Some(context),
            Self::Oracle(_) => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TruncatedBlock { .. } => "STREAM_TRUNCATED_BLOCK",
            Self::UnknownPlayer { .. } => "STREAM_UNKNOWN_PLAYER",
            Self::Decode { source, .. } => source.error_code(),
            Self::Execute { source, .. } => source.error_code(),
            Self::Oracle(error) => error.error_code(),
        }
    }
}
