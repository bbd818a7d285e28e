//! Action state errors.
//!
//! Errors raised while configuring the player-slot mapping.

use crate::error::{ErrorSeverity, GameError};
use crate::state::{Owner, PlayerId};

/// Errors that occur while setting up [`super::ActionState`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateError {
    /// Player id outside the fixed slot table.
    #[error("player id {player} outside the {max}-slot table")]
    PlayerOutOfRange {
        player: PlayerId,
        max: usize,
    },

    /// Owner slot outside the fixed slot table.
    #[error("owner slot {owner} outside the {max}-slot table")]
    OwnerOutOfRange {
        owner: Owner,
        max: usize,
    },
}

impl GameError for StateError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PlayerOutOfRange { .. } => "STATE_PLAYER_OUT_OF_RANGE",
            Self::OwnerOutOfRange { .. } => "STATE_OWNER_OUT_OF_RANGE",
        }
    }
}
