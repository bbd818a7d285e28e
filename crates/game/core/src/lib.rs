//! Deterministic command layer for lockstep real-time strategy simulations.
//!
//! `lockstep-core` turns the per-frame byte stream that every peer receives
//! into validated mutations of a shared simulation. It owns the wire codec and
//! action catalogue, the per-player command state (selections, control groups,
//! stream cursor) and the [`engine::ActionEngine`] that applies commands.
//!
//! The simulation itself is reached only through the [`world::World`] trait,
//! and static rules only through the oracles in [`env`]. Given the same
//! oracles, world and stream, every peer reaches the same state.
pub mod action;
pub mod codec;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod state;
pub mod world;

#[cfg(test)]
mod testing;

pub use action::{Action, ActionKind, CheatFlags, DecodeContext, DecodeError, EncodeError};
pub use config::{CommandConfig, FormationRules};
pub use engine::{
    ActionEngine, ActionStreamWriter, ExecuteError, ExecutionHook, FrameSummary, NoopHook,
    Rejection, StreamError,
};
pub use env::{
    ConfigOracle, Cost, Env, GameEnv, OracleError, OrderFlags, OrderTypeDef, PathOracle, RegionId,
    TablesOracle, TechDef, UnitTypeDef, UnitTypeFlags, UpgradeDef,
};
pub use error::{ErrorContext, ErrorSeverity, GameError};
pub use state::{
    ActionState, AllianceTable, ControlGroup, Frame, OrderId, OrderRef, Owner, PlayerId, Rect,
    Selection, Stance, StateError, TechId, TechRef, TilePos, UnitHandle, UnitId, UnitTypeId,
    UnitTypeRef, UpgradeId, UpgradeRef, VisionMask, Xy,
};
pub use world::{Cancel, Job, OrderTarget, Resources, UnitLookup, UnitStat, UnitView, World};
