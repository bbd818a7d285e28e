//! Command execution pipeline.
//!
//! The [`ActionEngine`] is the only writer of [`ActionState`]. It applies one
//! decoded [`Action`] at a time on behalf of an owner slot, and drives the
//! frame-gated stream reader that decodes and applies a whole frame's records.
//!
//! Every handler follows the same split: validate against the world and the
//! oracles without mutating anything, then commit. A handler either succeeds,
//! is rejected (semantic ineligibility, reported as `false`), or fails fatally
//! with an [`ExecuteError`].

mod admin;
mod errors;
pub mod formation;
mod hook;
mod orders;
mod production;
mod selection;
mod stream;

pub use errors::{ExecuteError, Rejection, StreamError};
pub use formation::{GroupMove, Member, plan_targets};
pub use hook::{ExecutionHook, NoopHook};
pub use stream::{ActionStreamWriter, FRAME_HEADER_LEN, FrameSummary};

use errors::{Failure, Handled};
use tracing::trace;

use crate::action::Action;
use crate::env::{GameEnv, TablesOracle, UnitTypeDef};
use crate::error::GameError;
use crate::state::{ActionState, Owner, Selection, UnitHandle};
use crate::world::{Cancel, UnitView, World};

/// Applies commands to one simulation instance.
///
/// Borrowing both halves keeps the single-writer rule explicit: nothing else
/// can touch the action state or the world while an engine is alive.
pub struct ActionEngine<'a, W: World> {
    state: &'a mut ActionState,
    world: &'a mut W,
}

impl<'a, W: World> ActionEngine<'a, W> {
    pub fn new(state: &'a mut ActionState, world: &'a mut W) -> Self {
        Self { state, world }
    }

    pub fn state(&self) -> &ActionState {
        self.state
    }

    pub fn world(&self) -> &W {
        self.world
    }

    /// Applies `action` for `owner`.
    ///
    /// Returns whether the command had an effect. `false` is the normal
    /// outcome for commands the player was not allowed to issue; only
    /// contract violations surface as errors.
    pub fn execute(
        &mut self,
        env: GameEnv<'_>,
        owner: Owner,
        action: &Action,
    ) -> Result<bool, ExecuteError> {
        if owner.index().is_none() {
            return Err(ExecuteError::InvalidOwner { owner });
        }

        match self.dispatch(&env, owner, action) {
            Ok(()) => Ok(true),
            Err(Failure::Rejected(reason)) => {
                trace!(
                    target: "lockstep::engine",
                    %owner,
                    kind = %action.kind(),
                    reason = reason.error_code(),
                    "command rejected"
                );
                Ok(false)
            }
            Err(Failure::Fatal(error)) => Err(error),
        }
    }

    fn dispatch(&mut self, env: &GameEnv<'_>, owner: Owner, action: &Action) -> Handled {
        let kind = action.kind();
        match action {
            Action::KeepAlive {} => Ok(()),

            // ===== selection =====
            Action::Select { units } => self.select(env, owner, kind, units),
            Action::ShiftSelect { units } => self.shift_select(env, owner, kind, units),
            Action::Deselect { units } => self.deselect(owner, units),
            Action::ControlGroup { subaction, group } => {
                self.control_group(env, owner, *subaction, *group)
            }

            // ===== orders =====
            Action::Build {
                order,
                tile,
                unit_type,
            } => self.build(env, owner, *order, *tile, *unit_type),
            Action::DefaultOrder {
                position,
                target,
                target_type,
                queue,
            } => self.default_order(env, owner, *position, *target, *target_type, *queue),
            Action::Order {
                position,
                target,
                target_type,
                order,
                queue,
            } => self.order(env, owner, *order, *position, *target, *target_type, *queue),
            Action::Stop { queue } => self.simple_order(env, owner, kind, *queue),
            Action::ReturnCargo { queue }
            | Action::Cloak { queue }
            | Action::Decloak { queue }
            | Action::Unsiege { queue }
            | Action::Siege { queue }
            | Action::UnloadAll { queue }
            | Action::HoldPosition { queue }
            | Action::Burrow { queue }
            | Action::Unburrow { queue } => self.simple_order(env, owner, kind, *queue),
            Action::CarrierStop {}
            | Action::ReaverStop {}
            | Action::OrderNothing {}
            | Action::Stim {} => self.simple_order(env, owner, kind, false),
            Action::MergeArchon {} => self.merge_archon(env, owner, false),
            Action::MergeDarkArchon {} => self.merge_archon(env, owner, true),
            Action::Unload { unit } => self.unload(env, owner, *unit),
            Action::Lift { position } => self.lift(env, owner, *position),

            // ===== production =====
            Action::Train { unit_type } => self.train(env, owner, *unit_type),
            Action::TrainFighter {} => self.train_fighter(env, owner),
            Action::UnitMorph { unit_type } => self.unit_morph(env, owner, *unit_type),
            Action::BuildingMorph { unit_type } => self.building_morph(env, owner, *unit_type),
            Action::Research { tech } => self.research(env, owner, *tech),
            Action::Upgrade { upgrade } => self.upgrade(env, owner, *upgrade),
            Action::CancelTrain { slot } => self.cancel(env, owner, Cancel::Train { slot: *slot }),
            Action::CancelBuildingUnit {} => self.cancel(env, owner, Cancel::Construction),
            Action::CancelMorph {} => self.cancel(env, owner, Cancel::Morph),
            Action::CancelNuke {} => self.cancel(env, owner, Cancel::Nuke),
            Action::CancelResearch {} => self.cancel(env, owner, Cancel::Research),
            Action::CancelUpgrade {} => self.cancel(env, owner, Cancel::Upgrade),
            Action::CancelAddon {} => self.cancel(env, owner, Cancel::Addon),

            // ===== match administration =====
            Action::SharedVision { mask } => self.shared_vision(owner, *mask),
            Action::SetAlliances { table } => self.set_alliances(env, owner, *table),
            Action::GameSpeed { speed } => self.game_speed(*speed),
            Action::Pause {} => self.set_paused(true),
            Action::Resume {} => self.set_paused(false),
            Action::Cheat { flags } => self.cheat(env, owner, *flags),
            Action::LeaveGame { reason } => self.leave_game(owner, *reason),
            Action::MinimapPing { position } => self.minimap_ping(env, owner, *position),
            Action::Chat { text } => self.chat(owner, text),

            // ===== extended cheats =====
            Action::CheatUnitHp { unit, value }
            | Action::CheatUnitShield { unit, value }
            | Action::CheatUnitEnergy { unit, value } => {
                self.cheat_unit_stat(env, kind, *unit, *value)
            }
            Action::CheatUpgrade {
                owner: target,
                upgrade,
                level,
            } => self.cheat_upgrade(env, *target, *upgrade, *level),
            Action::CheatTech {
                owner: target,
                tech,
                researched,
            } => self.cheat_tech(env, *target, *tech, *researched),
            Action::CheatMinerals {
                owner: target,
                amount,
            } => self.cheat_resources(env, kind, *target, *amount),
            Action::CheatGas {
                owner: target,
                amount,
            } => self.cheat_resources(env, kind, *target, *amount),
        }
    }

    // ========================================================================
    // Shared lookups
    // ========================================================================

    fn selection_mut(&mut self, owner: Owner) -> Result<&mut Selection, ExecuteError> {
        self.state
            .selection_mut(owner)
            .ok_or(ExecuteError::InvalidOwner { owner })
    }

    /// View and type definition of a live unit.
    fn typed_unit(
        &self,
        tables: &dyn TablesOracle,
        unit: UnitHandle,
    ) -> Option<(UnitView, UnitTypeDef)> {
        let view = self.world.unit(unit)?;
        let def = tables.unit_type(view.unit_type)?;
        Some((view, def))
    }

    /// The only selected unit, which must belong to `owner`.
    ///
    /// Train, build, research, upgrade, most cancels and liftoff need exactly
    /// one unit selected.
    fn single_selected_unit(
        &self,
        tables: &dyn TablesOracle,
        owner: Owner,
    ) -> Result<(UnitHandle, UnitView, UnitTypeDef), Failure> {
        let unit = match self.selected_units(owner).as_slice() {
            [] => return Err(Rejection::NoSelection.into()),
            [unit] => *unit,
            _ => return Err(Rejection::MultipleSelected.into()),
        };
        let (view, def) = self
            .typed_unit(tables, unit)
            .ok_or(Rejection::MissingTableEntry)?;
        if view.owner != owner {
            return Err(Rejection::NotOwned.into());
        }
        Ok((unit, view, def))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::CommandConfig;
    use crate::env::{ConfigOracle, Env, PathOracle};
    use crate::testing::{StubPath, StubTables, StubWorld, TABLES};

    pub(crate) struct Fixture {
        pub state: ActionState,
        pub world: StubWorld,
        pub path: StubPath,
        pub config: CommandConfig,
    }

    impl Fixture {
        pub fn new(world: StubWorld) -> Self {
            Self {
                state: ActionState::with_identity_players(),
                world,
                path: StubPath::open(4096),
                config: CommandConfig::with_cheats(true),
            }
        }

        pub fn run(&mut self, owner: Owner, action: Action) -> Result<bool, ExecuteError> {
            let tables: &dyn TablesOracle = &TABLES;
            let path: &dyn PathOracle = &self.path;
            let config: &dyn ConfigOracle = &self.config;
            let env = Env::with_all(tables, path, config);
            ActionEngine::new(&mut self.state, &mut self.world).execute(env, owner, &action)
        }

        pub fn select(&mut self, owner: Owner, units: &[u16]) {
            let units = units.iter().map(|&u| UnitHandle(u)).collect();
            assert_eq!(self.run(owner, Action::Select { units }), Ok(true));
        }
    }

    #[test]
    fn out_of_range_owner_is_fatal() {
        let mut fx = Fixture::new(StubWorld::with_units(1));
        assert_eq!(
            fx.run(Owner(12), Action::KeepAlive {}),
            Err(ExecuteError::InvalidOwner { owner: Owner(12) })
        );
    }

    #[test]
    fn keep_alive_always_succeeds() {
        let mut fx = Fixture::new(StubWorld::default());
        assert_eq!(fx.run(Owner(0), Action::KeepAlive {}), Ok(true));
    }

    #[test]
    fn missing_tables_oracle_is_fatal() {
        let mut state = ActionState::with_identity_players();
        let mut world = StubWorld::with_units(1);
        let env: GameEnv<'_> = Env::empty();
        let result = ActionEngine::new(&mut state, &mut world).execute(
            env,
            Owner(0),
            &Action::Select {
                units: vec![UnitHandle(0)],
            },
        );
        assert_eq!(
            result,
            Err(ExecuteError::Oracle(crate::env::OracleError::TablesNotAvailable))
        );
    }

    #[test]
    fn single_selected_unit_must_be_owned() {
        let mut world = StubWorld::with_units(0);
        world.spawn(Owner(1), StubTables::BARRACKS, crate::state::Xy::new(0, 0));
        let mut fx = Fixture::new(world);
        fx.select(Owner(0), &[0]);
        let marine = StubTables::unit_type_ref(StubTables::MARINE);
        assert_eq!(
            fx.run(
                Owner(0),
                Action::Train {
                    unit_type: Some(marine)
                }
            ),
            Ok(false)
        );
    }

    #[test]
    fn production_needs_exactly_one_selected_unit() {
        let mut world = StubWorld::with_units(0);
        world.spawn(Owner(0), StubTables::BARRACKS, crate::state::Xy::new(0, 0));
        world.spawn(Owner(0), StubTables::BARRACKS, crate::state::Xy::new(200, 0));
        world.give(Owner(0), 1000, 0, 20);
        let mut fx = Fixture::new(world);
        let train = || Action::Train {
            unit_type: Some(StubTables::unit_type_ref(StubTables::MARINE)),
        };

        fx.select(Owner(0), &[0, 1]);
        assert_eq!(fx.run(Owner(0), train()), Ok(false));
        assert_eq!(fx.world.units[0].queue.len(), 0);

        fx.select(Owner(0), &[1]);
        assert_eq!(fx.run(Owner(0), train()), Ok(true));
        assert_eq!(fx.world.units[1].queue.len(), 1);
    }
}
