//! Configuration oracle for exposing command-layer configuration to the engine.

use crate::config::{CommandConfig, FormationRules};

/// Provides access to runtime configuration values.
pub trait ConfigOracle: Send + Sync {
    /// Whether cheat and extended cheat actions take effect.
    fn cheats_enabled(&self) -> bool;

    /// Thresholds for the group-move formation heuristic.
    fn formation(&self) -> FormationRules {
        FormationRules::default()
    }
}

impl ConfigOracle for CommandConfig {
    fn cheats_enabled(&self) -> bool {
        self.cheats_enabled
    }

    fn formation(&self) -> FormationRules {
        self.formation
    }
}
