//! Oracle access errors.
//!
//! Errors related to oracle availability.

use crate::error::{ErrorSeverity, GameError};

/// Errors that occur when accessing Oracle data.
///
/// The engine cannot decode or execute actions without rule tables, a
/// pathfinder and configuration, so every variant is fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// TablesOracle is not available in the environment.
    #[error("TablesOracle not available")]
    TablesNotAvailable,

    /// PathOracle is not available in the environment.
    #[error("PathOracle not available")]
    PathNotAvailable,

    /// ConfigOracle is not available in the environment.
    #[error("ConfigOracle not available")]
    ConfigNotAvailable,
}

impl GameError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            TablesNotAvailable => "ORACLE_TABLES_NOT_AVAILABLE",
            PathNotAvailable => "ORACLE_PATH_NOT_AVAILABLE",
            ConfigNotAvailable => "ORACLE_CONFIG_NOT_AVAILABLE",
        }
    }
}
