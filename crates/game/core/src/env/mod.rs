//! Traits describing read-only simulation data.
//!
//! Oracles expose static rule tables, ground pathfinding and command-layer
//! configuration. The [`Env`] aggregate bundles them so the engine can access
//! everything it needs without hard coupling to concrete implementations.
mod config;
mod error;
mod map;
mod tables;

pub use config::ConfigOracle;
pub use error::OracleError;
pub use map::{PathOracle, RegionId};
pub use tables::{
    Cost, OrderFlags, OrderTypeDef, TablesOracle, TechDef, UnitTypeDef, UnitTypeFlags, UpgradeDef,
};

/// Aggregates read-only oracles required by the codec and execution engine.
pub struct Env<'a, T, P, C>
where
    T: TablesOracle + ?Sized,
    P: PathOracle + ?Sized,
    C: ConfigOracle + ?Sized,
{
    tables: Option<&'a T>,
    path: Option<&'a P>,
    config: Option<&'a C>,
}

// Oracles are borrowed; copying must not require `T: Copy`.
impl<T, P, C> Clone for Env<'_, T, P, C>
where
    T: TablesOracle + ?Sized,
    P: PathOracle + ?Sized,
    C: ConfigOracle + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, P, C> Copy for Env<'_, T, P, C>
where
    T: TablesOracle + ?Sized,
    P: PathOracle + ?Sized,
    C: ConfigOracle + ?Sized,
{
}

pub type GameEnv<'a> = Env<'a, dyn TablesOracle + 'a, dyn PathOracle + 'a, dyn ConfigOracle + 'a>;

impl<'a, T, P, C> Env<'a, T, P, C>
where
    T: TablesOracle + ?Sized,
    P: PathOracle + ?Sized,
    C: ConfigOracle + ?Sized,
{
    pub fn new(tables: Option<&'a T>, path: Option<&'a P>, config: Option<&'a C>) -> Self {
        Self {
            tables,
            path,
            config,
        }
    }

    pub fn with_all(tables: &'a T, path: &'a P, config: &'a C) -> Self {
        Self::new(Some(tables), Some(path), Some(config))
    }

    pub fn empty() -> Self {
        Self {
            tables: None,
            path: None,
            config: None,
        }
    }

    /// Returns the TablesOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::TablesNotAvailable` if no tables oracle was provided.
    pub fn tables(&self) -> Result<&'a T, OracleError> {
        self.tables.ok_or(OracleError::TablesNotAvailable)
    }

    /// Returns the PathOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::PathNotAvailable` if no path oracle was provided.
    pub fn path(&self) -> Result<&'a P, OracleError> {
        self.path.ok_or(OracleError::PathNotAvailable)
    }

    /// Returns the ConfigOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::ConfigNotAvailable` if no config oracle was provided.
    pub fn config(&self) -> Result<&'a C, OracleError> {
        self.config.ok_or(OracleError::ConfigNotAvailable)
    }

    /// Whether cheat actions take effect.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::ConfigNotAvailable` if no config oracle was provided.
    pub fn cheats_enabled(&self) -> Result<bool, OracleError> {
        Ok(self.config()?.cheats_enabled())
    }
}

impl<'a, T, P, C> Env<'a, T, P, C>
where
    T: TablesOracle + 'a,
    P: PathOracle + 'a,
    C: ConfigOracle + 'a,
{
    /// Converts this environment into a trait-object based `GameEnv` (borrows self).
    pub fn as_game_env(&self) -> GameEnv<'a> {
        let tables: Option<&'a dyn TablesOracle> = self.tables.map(|tables| tables as _);
        let path: Option<&'a dyn PathOracle> = self.path.map(|path| path as _);
        let config: Option<&'a dyn ConfigOracle> = self.config.map(|config| config as _);
        Env::new(tables, path, config)
    }
}
