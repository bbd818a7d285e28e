//! Runtime configuration loaded from RON.
//!
//! ```ron
//! (
//!     cheats_enabled: true,
//!     formation: (ground_span: 192, air_span: 256, inner_spread: 32, obstruction_steps: 8),
//!     players: [(player: PlayerId(0), owner: Owner(0)), (player: PlayerId(1), owner: Owner(1))],
//!     map: Rows(["....", "..#."]),
//!     tables: None,
//!     starts: [(owner: Owner(0), minerals: 50, gas: 0, supply: 20)],
//!     units: [(owner: Owner(0), unit_type: UnitTypeId(7), x: 48, y: 48)],
//! )
//! ```

use std::path::{Path, PathBuf};

use lockstep_core::{CommandConfig, ConfigOracle, FormationRules, Owner, PlayerId, UnitTypeId, Xy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Wire player id to owner slot assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub player: PlayerId,
    pub owner: Owner,
}

/// Resources and supply cap an owner starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStart {
    pub owner: Owner,
    pub minerals: i32,
    pub gas: i32,
    pub supply: i32,
}

/// Unit placed before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingUnit {
    pub owner: Owner,
    pub unit_type: UnitTypeId,
    pub x: i32,
    pub y: i32,
}

impl StartingUnit {
    pub fn position(&self) -> Xy {
        Xy::new(self.x, self.y)
    }
}

/// Tile grid source for the reference map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapSource {
    /// Fully walkable map of the given size in build tiles.
    Open { width: u16, height: u16 },
    /// ASCII rows, `.` walkable and `#` blocked.
    Rows(Vec<String>),
}

impl Default for MapSource {
    fn default() -> Self {
        Self::Open {
            width: 64,
            height: 64,
        }
    }
}

/// Session configuration: command-layer tunables plus the collaborators to build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cheats_enabled: bool,
    pub formation: FormationRules,
    /// Empty means identity assignment of every slot.
    pub players: Vec<PlayerSlot>,
    pub map: MapSource,
    /// RON rule-table file; the built-in tables are used when absent.
    pub tables: Option<PathBuf>,
    /// Default tracing directive used by binaries when `RUST_LOG` is unset.
    pub log_filter: String,
    pub starts: Vec<PlayerStart>,
    /// Placed in order, so their handles are stable across runs.
    pub units: Vec<StartingUnit>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let command = CommandConfig::default();
        Self {
            cheats_enabled: command.cheats_enabled,
            formation: command.formation,
            players: Vec::new(),
            map: MapSource::default(),
            tables: None,
            log_filter: "info".to_owned(),
            starts: Vec::new(),
            units: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_ron_str(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|source| RuntimeError::Config {
            path: path.into(),
            source,
        })
    }

    /// Reads and parses a RON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| RuntimeError::io(path, source))?;
        let mut config = Self::from_ron_str(path, &content)?;
        // Table paths are relative to the config file.
        if let Some(tables) = config.tables.as_mut()
            && let Some(dir) = path.parent()
            && tables.is_relative()
        {
            *tables = dir.join(&*tables);
        }
        Ok(config)
    }

    pub fn command_config(&self) -> CommandConfig {
        CommandConfig {
            cheats_enabled: self.cheats_enabled,
            formation: self.formation,
        }
    }
}

impl ConfigOracle for RuntimeConfig {
    fn cheats_enabled(&self) -> bool {
        self.cheats_enabled
    }

    fn formation(&self) -> FormationRules {
        self.formation
    }
}
