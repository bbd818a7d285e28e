//! Reference simulation backing a session.
//!
//! [`ArenaWorld`] implements [`lockstep_core::World`] over a generational unit
//! arena and per-player ledgers. It models only what commands observe: unit
//! status, current order, production queues with frame timers and the
//! resource, supply, tech and upgrade books. There is no movement or combat.
mod arena;
mod production;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use lockstep_core::env::TablesOracle;
use lockstep_core::world::UnitStatus;
use lockstep_core::{
    AllianceTable, Cancel, CheatFlags, CommandConfig, Job, OrderId, OrderRef, OrderTarget, Owner,
    Rect, Resources, TechId, TechRef, UnitHandle, UnitId, UnitLookup, UnitStat, UnitTypeFlags,
    UnitTypeId, UnitView, UpgradeId, UpgradeRef, VisionMask, World, Xy,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use arena::Arena;
pub use production::Production;

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::oracle::StaticTables;

// ============================================================================
// Units and ledgers
// ============================================================================

/// One live unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub owner: Owner,
    pub unit_type: UnitTypeId,
    pub position: Xy,
    pub status: UnitStatus,
    pub order: Option<OrderRef>,
    pub order_target: OrderTarget,
    /// Orders appended with the queue flag, run after the current one.
    pub queued_orders: Vec<(OrderRef, OrderTarget)>,
    pub subunit: Option<UnitHandle>,
    pub production: Option<Production>,
    pub train_queue: Vec<Production>,
    /// Where trained units gather: a unit to follow, or a point.
    pub rally: Option<(Option<UnitHandle>, Xy)>,
    /// Interceptors or scarabs held.
    pub fighters: u8,
    pub hit_points: i32,
    pub shields: i32,
    pub energy: i32,
}

impl Unit {
    fn new(owner: Owner, unit_type: UnitTypeId, position: Xy, status: UnitStatus) -> Self {
        Self {
            owner,
            unit_type,
            position,
            status,
            order: None,
            order_target: OrderTarget::position(position),
            queued_orders: Vec::new(),
            subunit: None,
            production: None,
            train_queue: Vec::new(),
            rally: None,
            fighters: 0,
            hit_points: 0,
            shields: 0,
            energy: 0,
        }
    }

    fn view(&self) -> UnitView {
        UnitView {
            owner: self.owner,
            unit_type: self.unit_type,
            position: self.position,
            status: self.status,
            order: self.order,
            order_target: self.order_target.unit,
            subunit: self.subunit,
            production: self.production.map(|p| p.job),
            train_queue: self.train_queue.len() as u8,
        }
    }
}

/// Per-player books.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLedger {
    pub resources: Resources,
    pub supply_used: i32,
    pub supply_max: i32,
    pub techs: BTreeSet<TechId>,
    pub upgrades: BTreeMap<UpgradeId, u8>,
    pub alliances: AllianceTable,
    pub vision: VisionMask,
    /// A player holds this slot; set by starting books or owned units.
    pub occupied: bool,
    pub departed: Option<u8>,
}

impl PlayerLedger {
    fn new(owner: Owner) -> Self {
        Self {
            resources: Resources::default(),
            supply_used: 0,
            supply_max: 0,
            techs: BTreeSet::new(),
            upgrades: BTreeMap::new(),
            alliances: AllianceTable::solo(owner),
            vision: VisionMask::default(),
            occupied: false,
            departed: None,
        }
    }
}

/// Everything that changes during a match; serialized for checkpoints and
/// state hashes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub units: Arena<Unit>,
    pub players: [PlayerLedger; CommandConfig::MAX_PLAYERS],
    pub game_speed: u8,
    pub paused: bool,
    pub cheats: CheatFlags,
    pub chat: Vec<(Owner, String)>,
    pub pings: Vec<(Owner, Xy)>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            units: Arena::with_capacity(ArenaWorld::CAPACITY),
            players: std::array::from_fn(|i| PlayerLedger::new(Owner(i as u8))),
            game_speed: CommandConfig::MAX_GAME_SPEED,
            paused: false,
            cheats: CheatFlags::empty(),
            chat: Vec::new(),
            pings: Vec::new(),
        }
    }
}

// ============================================================================
// World
// ============================================================================

/// Arena-backed [`World`] paired with the rule tables it prices work with.
#[derive(Clone, Debug)]
pub struct ArenaWorld {
    tables: Arc<StaticTables>,
    state: WorldState,
}

impl ArenaWorld {
    /// Unit slots available; ids carry 11 index bits.
    pub const CAPACITY: u16 = 1700;

    pub fn new(tables: Arc<StaticTables>) -> Self {
        Self::from_state(tables, WorldState::default())
    }

    pub fn from_state(tables: Arc<StaticTables>, state: WorldState) -> Self {
        Self { tables, state }
    }

    /// Builds the starting world described by `config`.
    pub fn from_config(tables: Arc<StaticTables>, config: &RuntimeConfig) -> Result<Self> {
        let mut world = Self::new(tables);
        for start in &config.starts {
            world.give(
                start.owner,
                Resources::new(start.minerals, start.gas),
                start.supply,
            );
        }
        for unit in &config.units {
            world.spawn(unit.owner, unit.unit_type, unit.position())?;
        }
        Ok(world)
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn tables(&self) -> &StaticTables {
        &self.tables
    }

    pub fn unit_state(&self, unit: UnitHandle) -> Option<&Unit> {
        self.state.units.get(unit)
    }

    pub fn ledger(&self, owner: Owner) -> Option<&PlayerLedger> {
        self.state.players.get(owner.index()?)
    }

    fn ledger_mut(&mut self, owner: Owner) -> Option<&mut PlayerLedger> {
        self.state.players.get_mut(owner.index()?)
    }

    // ===== setup =====

    /// Places a completed unit, charging its supply to `owner`.
    pub fn spawn(&mut self, owner: Owner, unit_type: UnitTypeId, position: Xy) -> Result<UnitHandle> {
        let handle = self.place(owner, unit_type, position, UnitStatus::COMPLETED)?;
        let supply = self.supply_cost(unit_type);
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.supply_used += supply;
            ledger.occupied = true;
        }
        self.add_provided(owner, unit_type);
        Ok(handle)
    }

    fn place(
        &mut self,
        owner: Owner,
        unit_type: UnitTypeId,
        position: Xy,
        status: UnitStatus,
    ) -> Result<UnitHandle> {
        let def = self.tables.unit_type(unit_type);
        let mut status = status;
        if def.is_some_and(|def| def.flags.contains(UnitTypeFlags::FLYER)) {
            status |= UnitStatus::NO_COLLISION;
        }
        let mut unit = Unit::new(owner, unit_type, position, status);
        unit.hit_points = 100;
        let handle = self
            .state
            .units
            .insert(unit)
            .map_err(|_| RuntimeError::ArenaFull)?;

        if unit_type == StaticTables::SIEGE_TANK {
            let turret = Unit::new(
                owner,
                StaticTables::TANK_TURRET,
                position,
                status | UnitStatus::HIDDEN,
            );
            let turret = self
                .state
                .units
                .insert(turret)
                .map_err(|_| RuntimeError::ArenaFull)?;
            if let Some(unit) = self.state.units.get_mut(handle) {
                unit.subunit = Some(turret);
            }
        }
        debug!(target: "lockstep::world", %owner, %unit_type, %handle, "unit placed");
        Ok(handle)
    }

    /// Removes a unit (and its subunit), releasing its supply. The caller must
    /// strike it from every selection.
    pub fn kill(&mut self, unit: UnitHandle) -> Option<Unit> {
        let removed = self.state.units.remove(unit)?;
        if let Some(subunit) = removed.subunit {
            self.state.units.remove(subunit);
        }
        let mut released = self.supply_cost(removed.unit_type);
        released += removed
            .train_queue
            .iter()
            .map(|p| self.job_supply(p.job))
            .sum::<i32>();
        let provided = if removed.status.contains(UnitStatus::COMPLETED) {
            Self::supply_provided(removed.unit_type)
        } else {
            0
        };
        if let Some(ledger) = self.ledger_mut(removed.owner) {
            ledger.supply_used -= released;
            ledger.supply_max -= provided;
        }
        for (_, other) in self.state.units.iter_mut() {
            if other.order_target.unit == Some(unit) {
                other.order_target.unit = None;
            }
        }
        Some(removed)
    }

    pub fn give(&mut self, owner: Owner, resources: Resources, supply_max: i32) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.resources = resources;
            ledger.supply_max = supply_max;
            ledger.occupied = true;
        }
    }

    // ===== pricing =====

    fn supply_cost(&self, unit_type: UnitTypeId) -> i32 {
        self.tables
            .unit_type(unit_type)
            .map_or(0, |def| def.cost.supply)
    }

    /// Supply reserved while `job` is queued or running.
    fn job_supply(&self, job: Job) -> i32 {
        match job {
            Job::Train(unit_type) | Job::Morph(unit_type) => self.supply_cost(unit_type.id()),
            _ => 0,
        }
    }

    fn is_enemy(&self, owner: Owner, other: Owner) -> bool {
        other != owner && !self.alliances(owner).is_allied(other)
    }

    /// Order kinds a unit type understands, beyond plain movement.
    fn accepts(&self, unit: &Unit, order: OrderId) -> bool {
        let Some(def) = self.tables.unit_type(unit.unit_type) else {
            return false;
        };
        let flags = def.flags;
        let t = unit.unit_type;
        if def.is_building() {
            return match order {
                OrderId::STOP | OrderId::LIFTOFF | OrderId::NOTHING => true,
                OrderId::RALLY_POINT_UNIT | OrderId::RALLY_POINT_TILE => {
                    flags.contains(UnitTypeFlags::FACTORY)
                }
                _ => false,
            };
        }
        match order {
            OrderId::LIFTOFF
            | OrderId::DIE
            | OrderId::NUKE_LAUNCH
            | OrderId::RALLY_POINT_UNIT
            | OrderId::RALLY_POINT_TILE
            | OrderId::RECHARGE_SHIELDS_BATTERY
            | OrderId::PICKUP_BUNKER => false,
            OrderId::BUILD | OrderId::RETURN_CARGO => flags.contains(UnitTypeFlags::WORKER),
            OrderId::SIEGE | OrderId::UNSIEGE => t == StaticTables::SIEGE_TANK,
            OrderId::CLOAK | OrderId::DECLOAK => {
                t == StaticTables::GHOST || t == StaticTables::WRAITH
            }
            OrderId::BURROW | OrderId::UNBURROW => matches!(
                t,
                StaticTables::ZERGLING
                    | StaticTables::HYDRALISK
                    | StaticTables::DRONE
                    | StaticTables::LURKER
            ),
            OrderId::STIM => t == StaticTables::MARINE,
            OrderId::UNLOAD | OrderId::UNLOAD_ALL => t == StaticTables::DROPSHIP,
            OrderId::CARRIER_STOP => flags.contains(UnitTypeFlags::CARRIER),
            OrderId::REAVER_STOP => flags.contains(UnitTypeFlags::REAVER),
            OrderId::HEAL_MOVE => flags.contains(UnitTypeFlags::MEDIC),
            OrderId::ARCHON_WARP => flags.contains(UnitTypeFlags::HIGH_TEMPLAR),
            OrderId::DARK_ARCHON_MELD => flags.contains(UnitTypeFlags::DARK_TEMPLAR),
            StaticTables::TANK_TURRET_ATTACK => t == StaticTables::TANK_TURRET,
            _ => t != StaticTables::TANK_TURRET,
        }
    }

    /// Status change an order applies on receipt.
    fn apply_status(unit: &mut Unit, order: OrderId) {
        let (set, clear) = match order {
            OrderId::SIEGE => (UnitStatus::SIEGED, UnitStatus::empty()),
            OrderId::UNSIEGE => (UnitStatus::empty(), UnitStatus::SIEGED),
            OrderId::CLOAK => (UnitStatus::CLOAKED, UnitStatus::empty()),
            OrderId::DECLOAK => (UnitStatus::empty(), UnitStatus::CLOAKED),
            OrderId::BURROW => (UnitStatus::BURROWED, UnitStatus::empty()),
            OrderId::UNBURROW => (UnitStatus::empty(), UnitStatus::BURROWED),
            OrderId::LIFTOFF => (UnitStatus::LIFTED | UnitStatus::NO_COLLISION, UnitStatus::empty()),
            _ => return,
        };
        unit.status = (unit.status | set) - clear;
    }
}

impl UnitLookup for ArenaWorld {
    fn unit_by_id(&self, id: UnitId) -> Option<UnitHandle> {
        self.state.units.resolve(id)
    }

    fn unit_id(&self, unit: UnitHandle) -> UnitId {
        self.state.units.id_of(unit)
    }
}

impl World for ArenaWorld {
    fn unit(&self, unit: UnitHandle) -> Option<UnitView> {
        self.state.units.get(unit).map(Unit::view)
    }

    fn owned_units(&self, owner: Owner) -> Vec<UnitHandle> {
        self.state
            .units
            .iter()
            .filter(|(_, unit)| unit.owner == owner)
            .map(|(handle, _)| handle)
            .collect()
    }

    fn can_receive_order(&self, unit: UnitHandle, order: OrderRef) -> bool {
        self.state.units.get(unit).is_some_and(|unit| {
            !unit.status.contains(UnitStatus::DISABLED) && self.accepts(unit, order.id())
        })
    }

    fn default_order(&self, unit: UnitHandle, target: Option<UnitHandle>) -> Option<OrderRef> {
        let source = self.state.units.get(unit)?;
        let def = self.tables.unit_type(source.unit_type)?;
        let id = if def.flags.contains(UnitTypeFlags::FACTORY) {
            match target {
                Some(_) => OrderId::RALLY_POINT_UNIT,
                None => OrderId::RALLY_POINT_TILE,
            }
        } else if def.is_building() {
            return None;
        } else if target
            .and_then(|target| self.state.units.get(target))
            .is_some_and(|target| self.is_enemy(source.owner, target.owner))
        {
            OrderId::ATTACK_DEFAULT
        } else {
            OrderId::MOVE
        };
        OrderRef::resolve(self.tables.as_ref(), id)
    }

    fn units_in(&self, area: Rect) -> Vec<UnitHandle> {
        self.state
            .units
            .iter()
            .filter(|(_, unit)| area.contains(unit.position))
            .map(|(handle, _)| handle)
            .collect()
    }

    /// The arena has no fog of war.
    fn position_visible(&self, owner: Owner, _position: Xy) -> bool {
        owner.index().is_some()
    }

    fn issue_order(
        &mut self,
        unit: UnitHandle,
        order: OrderRef,
        target: OrderTarget,
        queue: bool,
    ) -> bool {
        let Some(unit) = self.state.units.get_mut(unit) else {
            return false;
        };
        if order.id() == OrderId::STOP {
            unit.order = None;
            unit.order_target = OrderTarget::position(unit.position);
            unit.queued_orders.clear();
            return true;
        }
        if queue && unit.order.is_some() {
            unit.queued_orders.push((order, target));
            return true;
        }
        unit.order = Some(order);
        unit.order_target = target;
        unit.queued_orders.clear();
        Self::apply_status(unit, order.id());
        true
    }

    fn clear_order_target(&mut self, unit: UnitHandle) {
        if let Some(unit) = self.state.units.get_mut(unit) {
            unit.order_target.unit = None;
        }
    }

    fn set_rally_point(&mut self, unit: UnitHandle, target: Option<UnitHandle>, position: Xy) {
        if let Some(unit) = self.state.units.get_mut(unit) {
            unit.rally = Some((target, position));
        }
    }

    fn begin_production(&mut self, unit: UnitHandle, job: Job) -> bool {
        let supply = self.job_supply(job);
        let frames = self.job_frames(job);
        let Some(producer) = self.state.units.get_mut(unit) else {
            return false;
        };
        let owner = producer.owner;
        let work = Production::new(job, frames);
        match job {
            Job::Train(_) | Job::TrainFighter => {
                if producer.train_queue.len() >= CommandConfig::TRAIN_QUEUE_LEN as usize {
                    return false;
                }
                producer.train_queue.push(work);
            }
            _ => {
                if producer.production.is_some() {
                    return false;
                }
                if matches!(job, Job::Morph(_) | Job::BuildingMorph(_)) {
                    producer.status |= UnitStatus::MORPHING;
                }
                producer.production = Some(work);
            }
        }
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.supply_used += supply;
        }
        true
    }

    fn cancel_production(&mut self, unit: UnitHandle, cancel: Cancel) -> Option<Job> {
        let producer = self.state.units.get_mut(unit)?;
        let owner = producer.owner;
        let job = match cancel {
            Cancel::Train { slot } => {
                let slot = slot as usize;
                if slot >= producer.train_queue.len() {
                    return None;
                }
                producer.train_queue.remove(slot).job
            }
            _ => {
                let current = producer.production?.job;
                let matches = matches!(
                    (cancel, current),
                    (Cancel::Research, Job::Research(_))
                        | (Cancel::Upgrade, Job::Upgrade(_))
                        | (Cancel::Morph, Job::Morph(_) | Job::BuildingMorph(_))
                        | (Cancel::Addon, Job::Addon(_))
                        | (Cancel::Construction, Job::Construction(_))
                        | (Cancel::Nuke, Job::Nuke)
                );
                if !matches {
                    return None;
                }
                producer.production = None;
                producer.status -= UnitStatus::MORPHING;
                current
            }
        };
        let supply = self.job_supply(job);
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.supply_used -= supply;
        }
        Some(job)
    }

    fn set_unit_stat(&mut self, unit: UnitHandle, stat: UnitStat, value: i32) {
        if let Some(unit) = self.state.units.get_mut(unit) {
            match stat {
                UnitStat::HitPoints => unit.hit_points = value,
                UnitStat::Shields => unit.shields = value,
                UnitStat::Energy => unit.energy = value,
            }
        }
    }

    fn resources(&self, owner: Owner) -> Resources {
        self.ledger(owner).map_or_else(Resources::default, |l| l.resources)
    }

    fn set_resources(&mut self, owner: Owner, resources: Resources) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.resources = resources;
        }
    }

    fn supply_available(&self, owner: Owner) -> i32 {
        self.ledger(owner)
            .map_or(0, |l| l.supply_max - l.supply_used)
    }

    fn has_tech(&self, owner: Owner, tech: TechRef) -> bool {
        self.ledger(owner)
            .is_some_and(|l| l.techs.contains(&tech.id()))
    }

    fn set_tech(&mut self, owner: Owner, tech: TechRef, researched: bool) {
        if let Some(ledger) = self.ledger_mut(owner) {
            if researched {
                ledger.techs.insert(tech.id());
            } else {
                ledger.techs.remove(&tech.id());
            }
        }
    }

    fn upgrade_level(&self, owner: Owner, upgrade: UpgradeRef) -> u8 {
        self.ledger(owner)
            .and_then(|l| l.upgrades.get(&upgrade.id()).copied())
            .unwrap_or(0)
    }

    fn set_upgrade_level(&mut self, owner: Owner, upgrade: UpgradeRef, level: u8) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.upgrades.insert(upgrade.id(), level);
        }
    }

    fn is_occupied(&self, owner: Owner) -> bool {
        self.ledger(owner).is_some_and(|l| l.occupied)
    }

    fn alliances(&self, owner: Owner) -> AllianceTable {
        self.ledger(owner)
            .map_or_else(|| AllianceTable::solo(owner), |l| l.alliances)
    }

    fn set_alliances(&mut self, owner: Owner, table: AllianceTable) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.alliances = table;
        }
    }

    fn shared_vision(&self, owner: Owner) -> VisionMask {
        self.ledger(owner).map_or_else(VisionMask::default, |l| l.vision)
    }

    fn set_shared_vision(&mut self, owner: Owner, mask: VisionMask) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.vision = mask;
        }
    }

    fn game_speed(&self) -> u8 {
        self.state.game_speed
    }

    fn set_game_speed(&mut self, speed: u8) {
        self.state.game_speed = speed;
    }

    fn is_paused(&self) -> bool {
        self.state.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    fn set_cheat_flags(&mut self, flags: CheatFlags) {
        self.state.cheats = flags;
    }

    fn post_chat(&mut self, owner: Owner, text: &str) {
        debug!(target: "lockstep::world", %owner, text, "chat");
        self.state.chat.push((owner, text.to_owned()));
    }

    fn minimap_ping(&mut self, owner: Owner, position: Xy) {
        self.state.pings.push((owner, position));
    }

    fn leave_game(&mut self, owner: Owner, reason: u8) {
        if let Some(ledger) = self.ledger_mut(owner) {
            ledger.departed = Some(reason);
        }
    }
}
