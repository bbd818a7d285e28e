//! Runtime implementations of the static `lockstep-core` oracles.
//!
//! These implementations are bundled into an [`OracleBundle`] so a session can
//! build [`lockstep_core::GameEnv`] views on demand. The data is immutable for
//! the lifetime of a session; mutable state lives in the world and the action
//! state.
mod map;
mod tables;

use std::sync::Arc;

use lockstep_core::{ConfigOracle, Env, GameEnv, PathOracle, TablesOracle};

pub use map::TileMap;
pub use tables::{StaticTables, TablesData};

use crate::config::RuntimeConfig;
use crate::error::Result;

/// Shared handles to every oracle a session needs.
#[derive(Clone, Debug)]
pub struct OracleBundle {
    pub(crate) tables: Arc<StaticTables>,
    pub(crate) map: Arc<TileMap>,
    pub(crate) config: Arc<RuntimeConfig>,
}

impl OracleBundle {
    pub fn new(tables: Arc<StaticTables>, map: Arc<TileMap>, config: Arc<RuntimeConfig>) -> Self {
        Self {
            tables,
            map,
            config,
        }
    }

    /// Builds every oracle described by `config`.
    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        let tables = match &config.tables {
            Some(path) => StaticTables::load(path)?,
            None => StaticTables::standard(),
        };
        let map = TileMap::from_source(&config.map)?;
        Ok(Self::new(Arc::new(tables), Arc::new(map), Arc::new(config)))
    }

    /// Converts the bundle into the engine's oracle view.
    pub fn as_game_env(&self) -> GameEnv<'_> {
        let tables: &dyn TablesOracle = self.tables.as_ref();
        let path: &dyn PathOracle = self.map.as_ref();
        let config: &dyn ConfigOracle = self.config.as_ref();
        Env::with_all(tables, path, config)
    }

    pub fn tables(&self) -> &Arc<StaticTables> {
        &self.tables
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
