//! Production handlers: training, morphs, research, upgrades and cancels.
//!
//! Each handler validates everything first and then commits in one step:
//! the world starts the job and the cost is debited together, so a rejected
//! command leaves both the unit and the ledger untouched.

use crate::config::CommandConfig;
use crate::env::{Cost, GameEnv, TablesOracle, UnitTypeFlags};
use crate::state::{Owner, TechRef, UnitHandle, UnitTypeRef, UpgradeRef};
use crate::world::{Cancel, Job, UnitStatus, World};

use super::errors::{Failure, Handled, Rejection};
use super::ActionEngine;

const ZERG_BUILDING: UnitTypeFlags = UnitTypeFlags::ZERG.union(UnitTypeFlags::BUILDING);

impl<W: World> ActionEngine<'_, W> {
    pub(super) fn train(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        unit_type: Option<UnitTypeRef>,
    ) -> Handled {
        let tables = env.tables()?;
        let unit_type = unit_type.ok_or(Rejection::NoTarget)?;
        let def = tables
            .unit_type(unit_type.id())
            .ok_or(Rejection::MissingTableEntry)?;
        let (unit, view, _) = self.single_selected_unit(tables, owner)?;

        if def.builder != Some(view.unit_type) {
            return Err(Rejection::WrongUnitType.into());
        }
        if view.train_queue >= CommandConfig::TRAIN_QUEUE_LEN {
            return Err(Rejection::QueueFull.into());
        }
        if self.world.supply_available(owner) < def.cost.supply {
            return Err(Rejection::InsufficientSupply.into());
        }
        self.start_job(owner, unit, Job::Train(unit_type), def.cost)
    }

    /// Interceptors and scarabs for every selected carrier and reaver; the
    /// world prices and queues them.
    pub(super) fn train_fighter(&mut self, env: &GameEnv<'_>, owner: Owner) -> Handled {
        let tables = env.tables()?;
        let mut last = Rejection::NoEligibleUnit;
        let mut trained = false;
        for unit in self.selected_units(owner) {
            let Some((view, def)) = self.typed_unit(tables, unit) else {
                continue;
            };
            if view.owner != owner
                || !def
                    .flags
                    .intersects(UnitTypeFlags::CARRIER | UnitTypeFlags::REAVER)
            {
                continue;
            }
            if view.train_queue >= CommandConfig::TRAIN_QUEUE_LEN {
                last = Rejection::QueueFull;
                continue;
            }
            match self.start_job(owner, unit, Job::TrainFighter, Cost::FREE) {
                Ok(()) => trained = true,
                Err(Failure::Rejected(reason)) => last = reason,
                Err(fatal) => return Err(fatal),
            }
        }
        if trained { Ok(()) } else { Err(last.into()) }
    }

    /// Morphs every eligible selected unit, as far as resources allow.
    pub(super) fn unit_morph(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        unit_type: Option<UnitTypeRef>,
    ) -> Handled {
        let tables = env.tables()?;
        let unit_type = unit_type.ok_or(Rejection::NoTarget)?;
        let def = tables
            .unit_type(unit_type.id())
            .ok_or(Rejection::MissingTableEntry)?;

        let eligible: Vec<UnitHandle> = self
            .state
            .selection(owner)
            .iter()
            .copied()
            .filter(|&unit| {
                self.world.unit(unit).is_some_and(|view| {
                    view.owner == owner
                        && def.builder == Some(view.unit_type)
                        && !view.status.contains(UnitStatus::MORPHING)
                })
            })
            .collect();
        if eligible.is_empty() {
            return Err(Rejection::NoEligibleUnit.into());
        }

        let mut last = Rejection::NoEligibleUnit;
        let mut morphed = false;
        for unit in eligible {
            if self.world.supply_available(owner) < def.cost.supply {
                last = Rejection::InsufficientSupply;
                break;
            }
            match self.start_job(owner, unit, Job::Morph(unit_type), def.cost) {
                Ok(()) => morphed = true,
                Err(Failure::Rejected(reason)) => last = reason,
                Err(fatal) => return Err(fatal),
            }
        }
        if morphed { Ok(()) } else { Err(last.into()) }
    }

    /// Morphs every selected zerg building that can become `unit_type`.
    pub(super) fn building_morph(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        unit_type: Option<UnitTypeRef>,
    ) -> Handled {
        let tables = env.tables()?;
        let unit_type = unit_type.ok_or(Rejection::NoTarget)?;
        let def = tables
            .unit_type(unit_type.id())
            .ok_or(Rejection::MissingTableEntry)?;
        if !def.flags.contains(ZERG_BUILDING) {
            return Err(Rejection::WrongUnitType.into());
        }

        let mut last = Rejection::NoEligibleUnit;
        let mut morphed = false;
        for unit in self.selected_units(owner) {
            let Some((view, source)) = self.typed_unit(tables, unit) else {
                continue;
            };
            if view.owner != owner
                || !source.flags.contains(ZERG_BUILDING)
                || def.builder != Some(view.unit_type)
            {
                continue;
            }
            if !view.is_idle_producer() {
                last = Rejection::Busy;
                continue;
            }
            match self.start_job(owner, unit, Job::BuildingMorph(unit_type), def.cost) {
                Ok(()) => morphed = true,
                Err(Failure::Rejected(reason)) => last = reason,
                Err(fatal) => return Err(fatal),
            }
        }
        if morphed { Ok(()) } else { Err(last.into()) }
    }

    pub(super) fn research(&mut self, env: &GameEnv<'_>, owner: Owner, tech: TechRef) -> Handled {
        let tables = env.tables()?;
        let def = tables.tech(tech.id()).ok_or(Rejection::MissingTableEntry)?;
        let (unit, view, _) = self.single_selected_unit(tables, owner)?;

        if def.researched_at != Some(view.unit_type) {
            return Err(Rejection::WrongUnitType.into());
        }
        if !view.is_idle_producer() {
            return Err(Rejection::Busy.into());
        }
        if self.world.has_tech(owner, tech) {
            return Err(Rejection::AlreadyResearched.into());
        }
        if self.job_in_progress(owner, Job::Research(tech)) {
            return Err(Rejection::AlreadyInProgress.into());
        }
        self.start_job(owner, unit, Job::Research(tech), def.cost)
    }

    pub(super) fn upgrade(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        upgrade: UpgradeRef,
    ) -> Handled {
        let tables = env.tables()?;
        let def = tables
            .upgrade(upgrade.id())
            .ok_or(Rejection::MissingTableEntry)?;
        let (unit, view, _) = self.single_selected_unit(tables, owner)?;

        if def.upgraded_at != Some(view.unit_type) {
            return Err(Rejection::WrongUnitType.into());
        }
        if !view.is_idle_producer() {
            return Err(Rejection::Busy.into());
        }
        let level = self.world.upgrade_level(owner, upgrade);
        if level >= def.max_level {
            return Err(Rejection::MaxLevel.into());
        }
        if self.job_in_progress(owner, Job::Upgrade(upgrade)) {
            return Err(Rejection::AlreadyInProgress.into());
        }
        self.start_job(owner, unit, Job::Upgrade(upgrade), def.cost_at(level))
    }

    /// Cancels work and refunds its full price.
    ///
    /// Morph and nuke cancels apply to every selected unit; the rest need a
    /// single selected unit. A morph cancel stops at the first selected unit
    /// `owner` does not own.
    pub(super) fn cancel(&mut self, env: &GameEnv<'_>, owner: Owner, cancel: Cancel) -> Handled {
        let tables = env.tables()?;
        match cancel {
            Cancel::Morph | Cancel::Nuke => {
                let mut cancelled = false;
                for unit in self.selected_units(owner) {
                    let Some(view) = self.world.unit(unit) else {
                        continue;
                    };
                    if view.owner != owner {
                        if cancel == Cancel::Morph {
                            return Err(Rejection::NotOwned.into());
                        }
                        continue;
                    }
                    cancelled |= self.cancel_on(tables, owner, unit, cancel);
                }
                if cancelled {
                    Ok(())
                } else {
                    Err(Rejection::NothingToCancel.into())
                }
            }
            Cancel::Train { slot } => {
                let (unit, view, _) = self.single_selected_unit(tables, owner)?;
                if view.train_queue == 0 {
                    return Err(Rejection::NothingToCancel.into());
                }
                let slot = if slot == Cancel::LAST_TRAIN_SLOT {
                    u16::from(view.train_queue - 1)
                } else {
                    slot
                };
                self.cancel_single(tables, owner, unit, Cancel::Train { slot })
            }
            _ => {
                let (unit, _, _) = self.single_selected_unit(tables, owner)?;
                self.cancel_single(tables, owner, unit, cancel)
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn cancel_single(
        &mut self,
        tables: &dyn TablesOracle,
        owner: Owner,
        unit: UnitHandle,
        cancel: Cancel,
    ) -> Handled {
        if self.cancel_on(tables, owner, unit, cancel) {
            Ok(())
        } else {
            Err(Rejection::NothingToCancel.into())
        }
    }

    /// Cancels on one unit and refunds `owner`; false when nothing matched.
    fn cancel_on(
        &mut self,
        tables: &dyn TablesOracle,
        owner: Owner,
        unit: UnitHandle,
        cancel: Cancel,
    ) -> bool {
        let Some(job) = self.world.cancel_production(unit, cancel) else {
            return false;
        };
        let refund = self.job_cost(tables, owner, job);
        if refund != Cost::FREE {
            let resources = self.world.resources(owner).credit(refund);
            self.world.set_resources(owner, resources);
        }
        true
    }

    /// Starts `job` on `unit` and debits `cost` from `owner`.
    fn start_job(&mut self, owner: Owner, unit: UnitHandle, job: Job, cost: Cost) -> Handled {
        let resources = self.world.resources(owner);
        if !resources.can_afford(cost) {
            return Err(Rejection::InsufficientResources.into());
        }
        if !self.world.begin_production(unit, job) {
            return Err(Rejection::WorldRefused.into());
        }
        self.world.set_resources(owner, resources.debit(cost));
        Ok(())
    }

    /// Whether any unit of `owner` is already working on `job`.
    fn job_in_progress(&self, owner: Owner, job: Job) -> bool {
        self.world
            .owned_units(owner)
            .into_iter()
            .filter_map(|unit| self.world.unit(unit))
            .any(|view| view.production == Some(job))
    }

    /// Price of a job as it stood when it was started.
    fn job_cost(&self, tables: &dyn TablesOracle, owner: Owner, job: Job) -> Cost {
        let unit_cost = |unit_type: UnitTypeRef| {
            tables
                .unit_type(unit_type.id())
                .map_or(Cost::FREE, |def| def.cost)
        };
        match job {
            Job::Train(unit_type)
            | Job::Morph(unit_type)
            | Job::BuildingMorph(unit_type)
            | Job::Addon(unit_type)
            | Job::Construction(unit_type) => unit_cost(unit_type),
            Job::Research(tech) => tables.tech(tech.id()).map_or(Cost::FREE, |def| def.cost),
            Job::Upgrade(upgrade) => tables.upgrade(upgrade.id()).map_or(Cost::FREE, |def| {
                def.cost_at(self.world.upgrade_level(owner, upgrade))
            }),
            Job::TrainFighter | Job::Nuke => Cost::FREE,
        }
    }
}
