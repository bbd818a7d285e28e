//! Action codec errors.
//!
//! Errors raised while decoding one catalogue entry from the stream or encoding
//! an action back to wire form.

use crate::codec::WireType;
use crate::error::{ErrorSeverity, GameError};
use crate::state::Frame;

use super::ActionKind;

// ============================================================================
// Decode Errors
// ============================================================================

/// Errors that occur while decoding an action record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    /// The next bytes carry a different entry's tag.
    #[error("tag does not match {kind}")]
    TagMismatch { kind: ActionKind },

    /// The record ends before parameter `index` is complete.
    #[error("{kind}: parameter {index} ({wire}) truncated")]
    Truncated {
        kind: ActionKind,
        index: usize,
        wire: WireType,
    },

    /// Parameter `index` names a table entry that does not exist.
    #[error("{kind}: parameter {index} ({wire}) does not resolve")]
    Unresolved {
        kind: ActionKind,
        index: usize,
        wire: WireType,
    },

    /// Resolved parameters did not fit the variant's fields.
    #[error("{kind}: resolved parameters do not match the variant")]
    ShapeMismatch { kind: ActionKind },

    /// No catalogue entry accepts the bytes at `position`.
    #[error("unknown action tag {tag:?} at byte {position}")]
    UnknownAction { tag: Option<u8>, position: usize },
}

impl DecodeError {
    /// Parameter index that failed, when the failure is positional.
    pub fn param_index(&self) -> Option<usize> {
        match self {
            Self::Truncated { index, .. } | Self::Unresolved { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl GameError for DecodeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TagMismatch { .. } | Self::Truncated { .. } | Self::Unresolved { .. } => {
                ErrorSeverity::Validation
            }
            Self::ShapeMismatch { .. } => ErrorSeverity::Internal,
            Self::UnknownAction { .. } => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TagMismatch { .. } => "DECODE_TAG_MISMATCH",
            Self::Truncated { .. } => "DECODE_TRUNCATED",
            Self::Unresolved { .. } => "DECODE_UNRESOLVED",
            Self::ShapeMismatch { .. } => "DECODE_SHAPE_MISMATCH",
            Self::UnknownAction { .. } => "DECODE_UNKNOWN_ACTION",
        }
    }
}

// ============================================================================
// Encode Errors
// ============================================================================

/// Errors that occur while encoding an action.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    /// Parameter `index` does not have the catalogue's declared type.
    #[error("{kind}: parameter {index} does not match the catalogue entry")]
    ParamMismatch { kind: ActionKind, index: usize },

    /// A unit list is longer than its one-byte count can express.
    #[error("{kind}: unit list of {len} exceeds 255")]
    ListTooLong { kind: ActionKind, len: usize },

    /// A player record does not fit in one frame block.
    #[error("{kind}: record of {len} bytes exceeds a frame block")]
    RecordTooLong { kind: ActionKind, len: usize },

    /// Records must be appended in non-decreasing frame order.
    #[error("frame {frame} written after frame {last}")]
    FrameOutOfOrder { frame: Frame, last: Frame },
}

impl GameError for EncodeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ParamMismatch { .. } => ErrorSeverity::Internal,
            Self::ListTooLong { .. }
            | Self::RecordTooLong { .. }
            | Self::FrameOutOfOrder { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ParamMismatch { .. } => "ENCODE_PARAM_MISMATCH",
            Self::ListTooLong { .. } => "ENCODE_LIST_TOO_LONG",
            Self::RecordTooLong { .. } => "ENCODE_RECORD_TOO_LONG",
            Self::FrameOutOfOrder { .. } => "ENCODE_FRAME_OUT_OF_ORDER",
        }
    }
}
