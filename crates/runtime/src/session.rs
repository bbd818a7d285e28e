//! Session driver: one simulation instance and its command stream.
//!
//! A [`Session`] owns the action state, the reference world and the oracles.
//! Commands reach it two ways:
//!
//! - [`Session::submit`] executes an [`Action`] built by input code straight
//!   away and records it into the session's own stream at the current frame.
//! - [`Session::feed`] appends externally produced stream bytes, which
//!   [`Session::step`] decodes and applies frame by frame.
//!
//! Replaying the recorded stream in a fresh session built on the same initial
//! world reproduces the live session's state hash; [`Session::verify_replay`]
//! checks exactly that.
use lockstep_core::{
    Action, ActionEngine, ActionKind, ActionState, ActionStreamWriter, CommandConfig,
    ExecutionHook, Frame, FrameSummary, GameError, Owner, PlayerId, Resources, UnitHandle,
    UnitTypeId, World, Xy,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::hooks::{ApmCounter, HookRegistry, SessionHook};
use crate::oracle::OracleBundle;
use crate::repository::{Checkpoint, CheckpointRepository};
use crate::world::{ArenaWorld, Unit, WorldState};

/// APM counter plus registered hooks, seen by the engine as one hook.
struct Observers<'a> {
    apm: &'a mut ApmCounter,
    hooks: &'a mut HookRegistry,
}

impl ExecutionHook for Observers<'_> {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        self.apm.on_action(frame, owner, kind, success);
        self.hooks.on_action(frame, owner, kind, success);
    }
}

#[derive(Debug)]
pub struct Session {
    oracles: OracleBundle,
    state: ActionState,
    world: ArenaWorld,
    /// Next frame to simulate.
    frame: Frame,
    input: Vec<u8>,
    recorder: ActionStreamWriter,
    apm: ApmCounter,
    hooks: HookRegistry,
}

impl Session {
    /// Creates a session at frame zero with the configured starting world.
    pub fn new(oracles: OracleBundle) -> Result<Self> {
        let world = ArenaWorld::from_config(oracles.tables().clone(), oracles.config())?;
        Self::with_world(oracles, world.state().clone())
    }

    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        Self::new(OracleBundle::from_config(config)?)
    }

    /// Creates a session at frame zero over a prepared world.
    pub fn with_world(oracles: OracleBundle, world: WorldState) -> Result<Self> {
        let state = initial_action_state(oracles.config())?;
        let world = ArenaWorld::from_state(oracles.tables().clone(), world);
        Ok(Self {
            oracles,
            state,
            world,
            frame: Frame::ZERO,
            input: Vec::new(),
            recorder: ActionStreamWriter::new(),
            apm: ApmCounter::new(),
            hooks: HookRegistry::new(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn state(&self) -> &ActionState {
        &self.state
    }

    pub fn world(&self) -> &ArenaWorld {
        &self.world
    }

    pub fn oracles(&self) -> &OracleBundle {
        &self.oracles
    }

    pub fn apm(&self) -> &ApmCounter {
        &self.apm
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn register_hook(&mut self, hook: Box<dyn SessionHook>) {
        self.hooks.register(hook);
    }

    /// Stream of every command submitted to this session.
    pub fn recorded(&self) -> &[u8] {
        self.recorder.as_bytes()
    }

    pub fn selection(&self, owner: Owner) -> &[UnitHandle] {
        self.state.selection(owner)
    }

    /// Wire player id controlling `owner`.
    pub fn player_of(&self, owner: Owner) -> Result<PlayerId> {
        (0..CommandConfig::MAX_PLAYERS as u8)
            .map(PlayerId)
            .find(|&player| self.state.owner_of(player) == Some(owner))
            .ok_or(RuntimeError::UnassignedOwner { owner })
    }

    // ========================================================================
    // World setup
    // ========================================================================

    pub fn spawn(&mut self, owner: Owner, unit_type: UnitTypeId, position: Xy) -> Result<UnitHandle> {
        self.world.spawn(owner, unit_type, position)
    }

    pub fn give(&mut self, owner: Owner, resources: Resources, supply_max: i32) {
        self.world.give(owner, resources, supply_max);
    }

    /// Destroys a unit and strikes it (and its subunit) from every selection.
    pub fn kill_unit(&mut self, unit: UnitHandle) -> Option<Unit> {
        let removed = self.world.kill(unit)?;
        self.state.on_unit_deselect(unit);
        if let Some(subunit) = removed.subunit {
            self.state.on_unit_deselect(subunit);
        }
        Some(removed)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Executes `action` for `player` now and records it at the current frame.
    ///
    /// Returns whether the command had an effect.
    ///
    /// # Errors
    ///
    /// Unknown players, actions the wire cannot carry and fatal execution
    /// errors. A fatal error leaves the command recorded.
    pub fn submit(&mut self, player: PlayerId, action: Action) -> Result<bool> {
        let owner = self
            .state
            .owner_of(player)
            .ok_or(RuntimeError::UnknownPlayer { player })?;
        self.recorder.push(self.frame, player, &action, &self.world)?;

        let env = self.oracles.as_game_env();
        let success = ActionEngine::new(&mut self.state, &mut self.world)
            .execute(env, owner, &action)
            .inspect_err(|error| {
                warn!(
                    target: "lockstep::runtime",
                    frame = %self.frame,
                    %owner,
                    code = error.error_code(),
                    %error,
                    "fatal command error"
                );
            })?;
        let mut observers = Observers {
            apm: &mut self.apm,
            hooks: &mut self.hooks,
        };
        observers.on_action(self.frame, owner, action.kind(), success);
        Ok(success)
    }

    /// Appends stream bytes for [`Session::step`] to consume.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }

    /// Applies the fed records due at the current frame, advances the world
    /// one frame and moves to the next frame.
    ///
    /// # Errors
    ///
    /// Stream protocol violations. The session stays on the failing frame.
    pub fn step(&mut self) -> Result<FrameSummary> {
        let frame = self.frame;
        let env = self.oracles.as_game_env();
        let mut observers = Observers {
            apm: &mut self.apm,
            hooks: &mut self.hooks,
        };
        let summary = ActionEngine::new(&mut self.state, &mut self.world)
            .process_frame(env, &self.input, frame, &mut observers)
            .inspect_err(|error| {
                warn!(
                    target: "lockstep::runtime",
                    %frame,
                    code = error.error_code(),
                    %error,
                    "stream rejected"
                );
            })?;

        for removed in self.world.advance() {
            self.state.on_unit_deselect(removed);
        }
        self.apm.update();
        self.hooks.frame_end(frame);
        self.frame = frame.next();

        if summary.records > 0 {
            debug!(
                target: "lockstep::runtime",
                %frame,
                blocks = summary.blocks,
                records = summary.records,
                succeeded = summary.succeeded,
                "frame applied"
            );
        }
        Ok(summary)
    }

    /// Steps until the session reaches `frame`.
    pub fn run_until(&mut self, frame: Frame) -> Result<Vec<FrameSummary>> {
        let mut summaries = Vec::new();
        while self.frame < frame {
            summaries.push(self.step()?);
        }
        Ok(summaries)
    }

    // ========================================================================
    // Replay and fork
    // ========================================================================

    /// Replays this session's recorded stream over `origin` (the world it
    /// started from) and checks the result matches.
    ///
    /// # Errors
    ///
    /// Stream errors during replay, or [`RuntimeError::Desync`] when the
    /// replayed state hash differs.
    pub fn verify_replay(&self, origin: WorldState) -> Result<Session> {
        let mut replay = Session::with_world(self.oracles.clone(), origin)?;
        replay.feed(self.recorder.as_bytes());
        replay.run_until(self.frame)?;

        let expected = self.state_hash()?;
        let actual = replay.state_hash()?;
        if expected != actual {
            return Err(RuntimeError::Desync {
                frame: self.frame,
                expected,
                actual,
            });
        }
        info!(target: "lockstep::runtime", frame = %self.frame, hash = %actual, "replay verified");
        Ok(replay)
    }

    /// Deep copy of the session with every held unit handle re-pointed at the
    /// copied world. Hooks are not carried over.
    pub fn fork(&self) -> Session {
        let world = self.world.clone();
        let mut state = self.state.clone();
        // Arena slots are cloned in place, so live handles map to themselves.
        state.remap_units(|unit| world.unit(unit).map(|_| unit));
        debug!(target: "lockstep::runtime", frame = %self.frame, "session forked");
        Session {
            oracles: self.oracles.clone(),
            state,
            world,
            frame: self.frame,
            input: self.input.clone(),
            recorder: self.recorder.clone(),
            apm: self.apm.clone(),
            hooks: HookRegistry::new(),
        }
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    /// Digest of the frame, action state (without the stream cursor) and
    /// world state.
    pub fn state_hash(&self) -> Result<String> {
        let mut state = self.state.clone();
        state.reset_stream();
        let bytes = bincode::serialize(&(self.frame, &state, self.world.state()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn checkpoint(&self, label: Option<String>) -> Result<Checkpoint> {
        Ok(Checkpoint {
            version: Checkpoint::VERSION,
            label,
            frame: self.frame,
            action_state: self.state.clone(),
            world: self.world.state().clone(),
            recorder: self.recorder.clone(),
            input: self.input.clone(),
            apm: self.apm.clone(),
            state_hash: self.state_hash()?,
        })
    }

    /// Rebuilds a session from a checkpoint, verifying its state hash.
    pub fn restore(oracles: OracleBundle, checkpoint: Checkpoint) -> Result<Self> {
        let world = ArenaWorld::from_state(oracles.tables().clone(), checkpoint.world);
        let session = Self {
            oracles,
            state: checkpoint.action_state,
            world,
            frame: checkpoint.frame,
            input: checkpoint.input,
            recorder: checkpoint.recorder,
            apm: checkpoint.apm,
            hooks: HookRegistry::new(),
        };
        let actual = session.state_hash()?;
        if actual != checkpoint.state_hash {
            return Err(RuntimeError::Desync {
                frame: checkpoint.frame,
                expected: checkpoint.state_hash,
                actual,
            });
        }
        Ok(session)
    }

    pub fn save(&self, repository: &dyn CheckpointRepository, name: &str) -> Result<()> {
        repository.save(name, &self.checkpoint(Some(name.to_owned()))?)
    }

    /// Loads and restores a named checkpoint; `None` when it does not exist.
    pub fn load(
        oracles: OracleBundle,
        repository: &dyn CheckpointRepository,
        name: &str,
    ) -> Result<Option<Self>> {
        repository
            .load(name)?
            .map(|checkpoint| Self::restore(oracles, checkpoint))
            .transpose()
    }
}

fn initial_action_state(config: &RuntimeConfig) -> Result<ActionState> {
    if config.players.is_empty() {
        return Ok(ActionState::with_identity_players());
    }
    let mut state = ActionState::new();
    for slot in &config.players {
        state.assign_player(slot.player, Some(slot.owner))?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use lockstep_core::UnitTypeRef;

    use super::*;
    use crate::config::PlayerSlot;
    use crate::oracle::StaticTables;

    fn session() -> Session {
        Session::from_config(RuntimeConfig::default()).unwrap()
    }

    #[test]
    fn submit_executes_and_records() {
        let mut session = session();
        let marine = session
            .spawn(Owner(0), StaticTables::MARINE, Xy::new(64, 64))
            .unwrap();

        let ok = session
            .submit(PlayerId(0), Action::Select { units: vec![marine] })
            .unwrap();
        assert!(ok);
        assert_eq!(session.selection(Owner(0)), &[marine]);
        assert!(!session.recorded().is_empty());
        assert_eq!(session.apm().counts(Owner(0)).unwrap().succeeded, 1);
    }

    #[test]
    fn unknown_player_is_refused_before_recording() {
        let config = RuntimeConfig {
            players: vec![PlayerSlot {
                player: PlayerId(4),
                owner: Owner(1),
            }],
            ..RuntimeConfig::default()
        };
        let mut session = Session::from_config(config).unwrap();
        let error = session
            .submit(PlayerId(0), Action::KeepAlive {})
            .unwrap_err();
        assert!(matches!(error, RuntimeError::UnknownPlayer { player: PlayerId(0) }));
        assert!(session.recorded().is_empty());
        assert_eq!(session.player_of(Owner(1)).unwrap(), PlayerId(4));
        assert!(matches!(
            session.player_of(Owner(0)),
            Err(RuntimeError::UnassignedOwner { owner: Owner(0) })
        ));
    }

    #[test]
    fn kill_unit_clears_selection() {
        let mut session = session();
        let marine = session.spawn(Owner(0), StaticTables::MARINE, Xy::ORIGIN).unwrap();
        session
            .submit(PlayerId(0), Action::Select { units: vec![marine] })
            .unwrap();
        assert!(session.kill_unit(marine).is_some());
        assert!(session.selection(Owner(0)).is_empty());
    }

    #[test]
    fn fork_is_independent() {
        let mut session = session();
        let marine = session.spawn(Owner(0), StaticTables::MARINE, Xy::ORIGIN).unwrap();
        session
            .submit(PlayerId(0), Action::Select { units: vec![marine] })
            .unwrap();

        let mut fork = session.fork();
        assert_eq!(fork.state_hash().unwrap(), session.state_hash().unwrap());
        assert_eq!(fork.selection(Owner(0)), &[marine]);

        fork.submit(PlayerId(0), Action::Stop { queue: false }).unwrap();
        fork.kill_unit(marine);
        assert_eq!(session.selection(Owner(0)), &[marine]);
        assert_ne!(fork.state_hash().unwrap(), session.state_hash().unwrap());
    }

    #[test]
    fn step_advances_frames_and_production() {
        let mut session = session();
        session.give(Owner(0), Resources::new(500, 0), 10);
        let barracks = session
            .spawn(Owner(0), StaticTables::BARRACKS, Xy::ORIGIN)
            .unwrap();
        session
            .submit(PlayerId(0), Action::Select { units: vec![barracks] })
            .unwrap();
        let marine = UnitTypeRef::resolve(session.world().tables(), StaticTables::MARINE);
        assert!(
            session
                .submit(PlayerId(0), Action::Train { unit_type: marine })
                .unwrap()
        );
        assert_eq!(session.world().resources(Owner(0)), Resources::new(450, 0));

        session.run_until(Frame(200)).unwrap();
        assert_eq!(session.frame(), Frame(200));
        assert_eq!(session.world().owned_units(Owner(0)).len(), 2);
    }

    #[test]
    fn restore_rejects_tampered_checkpoint() {
        let mut session = session();
        let scv = session.spawn(Owner(0), StaticTables::SCV, Xy::ORIGIN).unwrap();
        session.step().unwrap();

        let mut checkpoint = session.checkpoint(None).unwrap();
        let restored = Session::restore(session.oracles().clone(), checkpoint.clone()).unwrap();
        assert_eq!(restored.state_hash().unwrap(), session.state_hash().unwrap());
        assert!(restored.world().unit(scv).is_some());

        checkpoint.frame = Frame(99);
        assert!(matches!(
            Session::restore(session.oracles().clone(), checkpoint),
            Err(RuntimeError::Desync { .. })
        ));
    }
}
