//! Runtime around the `lockstep-core` command layer.
//!
//! This crate supplies reference collaborators for the command layer and a
//! [`Session`] that drives them. Consumers build a session from a
//! [`RuntimeConfig`], submit actions or feed recorded streams, and step frames.
//!
//! Modules are organized by responsibility:
//! - [`session`] hosts the driver: submit, step, replay, fork and checkpoints
//! - [`world`] is the arena-backed reference simulation
//! - [`oracle`] serves the static rule tables, tile map and config
//! - [`hooks`] observes executed commands (APM, action log)
//! - [`repository`] persists checkpoints
//! - [`inspect`] replays recorded streams for offline reports
//! - [`config`] and [`logging`] cover process setup
pub mod config;
pub mod error;
pub mod hooks;
pub mod inspect;
pub mod logging;
pub mod oracle;
pub mod repository;
pub mod session;
pub mod world;

pub use config::{MapSource, PlayerSlot, PlayerStart, RuntimeConfig, StartingUnit};
pub use error::{Result, RuntimeError};
pub use hooks::{ActionLog, ActionRecord, ApmCounter, HookRegistry, PlayerCounts, SessionHook};
pub use oracle::{OracleBundle, StaticTables, TablesData, TileMap};
pub use repository::{
    Checkpoint, CheckpointRepository, FileCheckpointRepository, InMemoryCheckpointRepository,
};
pub use session::Session;
pub use world::{ArenaWorld, PlayerLedger, Unit, WorldState};
