//! Frame-driven production: job timers, completions and construction starts.
use lockstep_core::env::{OrderFlags, TablesOracle};
use lockstep_core::world::UnitStatus;
use lockstep_core::{Job, OrderTarget, Owner, UnitHandle, UnitTypeId, World};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ArenaWorld, Unit};
use crate::oracle::StaticTables;

/// A job and the frames it still needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub job: Job,
    pub remaining: u32,
}

impl Production {
    pub const fn new(job: Job, remaining: u32) -> Self {
        Self { job, remaining }
    }
}

impl ArenaWorld {
    const FIGHTER_FRAMES: u32 = 30;
    const NUKE_FRAMES: u32 = 200;

    /// Frames a job takes, derived from its price so richer work runs longer.
    pub(super) fn job_frames(&self, job: Job) -> u32 {
        let tables = self.tables.as_ref();
        let cost = match job {
            Job::Train(t)
            | Job::Morph(t)
            | Job::BuildingMorph(t)
            | Job::Addon(t)
            | Job::Construction(t) => tables.unit_type(t.id()).map(|def| def.cost),
            Job::Research(tech) => tables.tech(tech.id()).map(|def| def.cost),
            Job::Upgrade(upgrade) => tables.upgrade(upgrade.id()).map(|def| def.base_cost),
            Job::TrainFighter => return Self::FIGHTER_FRAMES,
            Job::Nuke => return Self::NUKE_FRAMES,
        };
        cost.map_or(1, |cost| 24 + (cost.minerals + cost.gas).max(0) as u32 / 2)
    }

    /// Supply a completed unit of this type adds to its owner's cap.
    pub(super) fn supply_provided(unit_type: UnitTypeId) -> i32 {
        match unit_type {
            StaticTables::SUPPLY_DEPOT => 16,
            StaticTables::COMMAND_CENTER => 20,
            StaticTables::HATCHERY | StaticTables::LAIR => 2,
            _ => 0,
        }
    }

    /// Runs one simulation frame of production and construction.
    ///
    /// Returns the units removed this frame (cancelled construction sites);
    /// the caller strikes them from every selection.
    pub fn advance(&mut self) -> Vec<UnitHandle> {
        self.start_construction();

        let mut finished = Vec::new();
        for (handle, unit) in self.state.units.iter_mut() {
            if let Some(front) = unit.train_queue.first_mut() {
                front.remaining = front.remaining.saturating_sub(1);
                if front.remaining == 0 {
                    let done = unit.train_queue.remove(0);
                    finished.push((handle, done.job));
                }
            }
            if let Some(current) = unit.production.as_mut() {
                current.remaining = current.remaining.saturating_sub(1);
                if current.remaining == 0 {
                    let job = current.job;
                    unit.production = None;
                    finished.push((handle, job));
                }
            }
        }
        for (handle, job) in finished {
            self.complete(handle, job);
        }

        let abandoned: Vec<UnitHandle> = self
            .state
            .units
            .iter()
            .filter(|(_, unit)| {
                unit.status.contains(UnitStatus::CONSTRUCTING) && unit.production.is_none()
            })
            .map(|(handle, _)| handle)
            .collect();
        for &site in &abandoned {
            debug!(target: "lockstep::world", %site, "construction site removed");
            self.kill(site);
        }
        abandoned
    }

    fn complete(&mut self, handle: UnitHandle, job: Job) {
        let Some(unit) = self.state.units.get(handle) else {
            return;
        };
        let (owner, position, old_type) = (unit.owner, unit.position, unit.unit_type);
        trace!(target: "lockstep::world", %handle, ?job, "job complete");

        match job {
            Job::Train(t) => {
                // Supply was reserved when the job started.
                if let Ok(spawned) = self.place(owner, t.id(), position, UnitStatus::COMPLETED) {
                    self.add_provided(owner, t.id());
                    debug!(target: "lockstep::world", %owner, %spawned, "unit trained");
                }
            }
            Job::TrainFighter => {
                if let Some(unit) = self.state.units.get_mut(handle) {
                    unit.fighters = unit.fighters.saturating_add(1);
                }
            }
            Job::Research(tech) => {
                if let Some(ledger) = self.ledger_mut(owner) {
                    ledger.techs.insert(tech.id());
                }
            }
            Job::Upgrade(upgrade) => {
                if let Some(ledger) = self.ledger_mut(owner) {
                    *ledger.upgrades.entry(upgrade.id()).or_default() += 1;
                }
            }
            Job::Morph(t) | Job::BuildingMorph(t) => {
                let released = self.supply_cost(old_type);
                let provided = Self::supply_provided(t.id()) - Self::supply_provided(old_type);
                if let Some(unit) = self.state.units.get_mut(handle) {
                    unit.unit_type = t.id();
                    unit.status -= UnitStatus::MORPHING;
                }
                if let Some(ledger) = self.ledger_mut(owner) {
                    ledger.supply_used -= released;
                    ledger.supply_max += provided;
                }
            }
            Job::Addon(t) => {
                let _ = self.place(owner, t.id(), position, UnitStatus::COMPLETED);
            }
            Job::Construction(t) => {
                if let Some(unit) = self.state.units.get_mut(handle) {
                    unit.status = (unit.status | UnitStatus::COMPLETED) - UnitStatus::CONSTRUCTING;
                }
                self.add_provided(owner, t.id());
            }
            Job::Nuke => {
                if let Some(unit) = self.state.units.get_mut(handle) {
                    unit.fighters = 1;
                }
            }
        }
    }

    pub(super) fn add_provided(&mut self, owner: Owner, unit_type: UnitTypeId) {
        let provided = Self::supply_provided(unit_type);
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.supply_max += provided;
        }
    }

    /// Turns pending build orders into construction sites, debiting the cost.
    /// A builder whose owner can no longer pay drops the order.
    fn start_construction(&mut self) {
        let tables = self.tables.clone();
        let pending: Vec<(UnitHandle, Owner, OrderTarget)> = self
            .state
            .units
            .iter()
            .filter(|(_, unit)| {
                unit.order.is_some_and(|order| {
                    tables
                        .order(order.id())
                        .is_some_and(|def| def.flags.contains(OrderFlags::BUILD))
                })
            })
            .map(|(handle, unit)| (handle, unit.owner, unit.order_target))
            .collect();

        for (builder, owner, target) in pending {
            let def = target
                .unit_type
                .and_then(|t| tables.unit_type(t.id()).map(|def| (t, def)));
            let resources = self.resources(owner);
            if let Some((building, def)) = def
                && resources.can_afford(def.cost)
            {
                let frames = self.job_frames(Job::Construction(building));
                if let Ok(site) =
                    self.place(owner, building.id(), target.position, UnitStatus::CONSTRUCTING)
                {
                    if let Some(ledger) = self.ledger_mut(owner) {
                        ledger.resources = resources.debit(def.cost);
                        ledger.supply_used += def.cost.supply;
                    }
                    if let Some(unit) = self.state.units.get_mut(site) {
                        unit.production = Some(Production::new(Job::Construction(building), frames));
                    }
                    debug!(target: "lockstep::world", %owner, %builder, %site, "construction started");
                }
            }
            if let Some(unit) = self.state.units.get_mut(builder) {
                Self::clear_order(unit);
            }
        }
    }

    pub(super) fn clear_order(unit: &mut Unit) {
        unit.order = None;
        unit.order_target = OrderTarget::position(unit.position);
        unit.queued_orders.clear();
    }
}
