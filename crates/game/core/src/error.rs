//! Common error infrastructure for lockstep-core.
//!
//! This module provides shared types and traits used across all error types in the
//! crate. Domain-specific errors (`DecodeError`, `ExecuteError`, `StreamError`,
//! `Rejection`) live next to the code that produces them.
//!
//! # Severity model
//!
//! - **Recoverable**: a command the player was not allowed to issue. Contained in the
//!   handler and reflected only in its boolean result.
//! - **Validation**: bytes that did not parse as one catalogue entry. The dispatcher
//!   restores the cursor and tries the next entry.
//! - **Internal**: a collaborator behaved inconsistently.
//! - **Fatal**: a protocol contract was broken (unknown action, unknown player,
//!   selection overflow). The owning simulation must stop or flag a desync.

use crate::state::{Frame, Owner};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Semantic ineligibility - the command is dropped, the stream continues.
    Recoverable,

    /// Malformed input for one candidate decoder.
    Validation,

    /// Unexpected state inconsistency in a collaborator.
    Internal,

    /// Protocol or invariant violation; the action stream cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if processing may continue after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable | Self::Validation)
    }

    /// Returns true if the owning simulation must stop.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Contextual information attached to errors for debugging and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorContext {
    /// Player slot whose record triggered the error (if known).
    pub owner: Option<Owner>,

    /// Frame being processed.
    pub frame: Frame,

    /// Byte offset into the action stream where the failing record starts.
    pub position: usize,
}

impl ErrorContext {
    /// Creates a new error context for the given frame.
    #[must_use]
    pub const fn new(frame: Frame) -> Self {
        Self {
            owner: None,
            frame,
            position: 0,
        }
    }

    /// Attaches an owner to this context (builder pattern).
    #[must_use]
    pub const fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Attaches a stream position to this context (builder pattern).
    #[must_use]
    pub const fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

/// Common trait for all lockstep-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns the context information for this error, if available.
    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
