//! In-memory collaborators shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::action::CheatFlags;
use crate::env::{
    Cost, OrderFlags, OrderTypeDef, PathOracle, RegionId, TablesOracle, TechDef, UnitTypeDef,
    UnitTypeFlags, UpgradeDef,
};
use crate::state::{
    AllianceTable, OrderId, OrderRef, Owner, Rect, TechId, TechRef, UnitHandle, UnitId,
    UnitTypeId, UnitTypeRef, UpgradeId, UpgradeRef, VisionMask, Xy,
};
use crate::world::{
    Cancel, Job, OrderTarget, Resources, UnitLookup, UnitStat, UnitStatus, UnitView, World,
};

// ============================================================================
// Rule tables
// ============================================================================

/// Small fixed rule table covering every branch the handlers take.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubTables;

pub static TABLES: StubTables = StubTables;

impl StubTables {
    pub const MARINE: UnitTypeId = UnitTypeId(0);
    pub const SCV: UnitTypeId = UnitTypeId(7);
    pub const NUKE: UnitTypeId = UnitTypeId(14);
    pub const MEDIC: UnitTypeId = UnitTypeId(34);
    pub const HYDRALISK: UnitTypeId = UnitTypeId(38);
    pub const DARK_TEMPLAR: UnitTypeId = UnitTypeId(61);
    pub const HIGH_TEMPLAR: UnitTypeId = UnitTypeId(67);
    pub const CARRIER: UnitTypeId = UnitTypeId(72);
    pub const REAVER: UnitTypeId = UnitTypeId(83);
    pub const LURKER: UnitTypeId = UnitTypeId(103);
    pub const COMMAND_CENTER: UnitTypeId = UnitTypeId(106);
    pub const BARRACKS: UnitTypeId = UnitTypeId(111);
    pub const ACADEMY: UnitTypeId = UnitTypeId(112);
    pub const ENGINEERING_BAY: UnitTypeId = UnitTypeId(122);
    pub const HATCHERY: UnitTypeId = UnitTypeId(131);
    pub const LAIR: UnitTypeId = UnitTypeId(132);

    pub const STIM_TECH: TechId = TechId(0);
    pub const ARMOR: UpgradeId = UpgradeId(0);

    /// Turret order paired with a unit attack.
    pub const TURRET_ATTACK: OrderId = OrderId(11);

    pub fn unit_type_ref(id: UnitTypeId) -> UnitTypeRef {
        UnitTypeRef::resolve(&TABLES, id).expect("stub unit type")
    }

    pub fn order_ref(id: OrderId) -> OrderRef {
        OrderRef::resolve(&TABLES, id).expect("stub order")
    }
}

impl TablesOracle for StubTables {
    fn unit_type(&self, id: UnitTypeId) -> Option<UnitTypeDef> {
        use UnitTypeFlags as F;
        let def = match id {
            Self::MARINE => UnitTypeDef::new(id, F::MULTI_SELECTABLE, Cost::new(50, 0, 2))
                .built_by(Self::BARRACKS)
                .attacks(OrderId::ATTACK_UNIT, OrderId::ATTACK_MOVE),
            Self::MEDIC => UnitTypeDef::new(id, F::MULTI_SELECTABLE | F::MEDIC, Cost::new(50, 25, 2))
                .built_by(Self::BARRACKS)
                .attacks(OrderId::NOTHING, OrderId::NOTHING),
            Self::HIGH_TEMPLAR => UnitTypeDef::new(
                id,
                F::MULTI_SELECTABLE | F::HIGH_TEMPLAR,
                Cost::new(50, 150, 4),
            ),
            Self::DARK_TEMPLAR => UnitTypeDef::new(
                id,
                F::MULTI_SELECTABLE | F::DARK_TEMPLAR,
                Cost::new(125, 100, 4),
            )
            .attacks(OrderId::ATTACK_UNIT, OrderId::ATTACK_MOVE),
            Self::SCV => UnitTypeDef::new(
                id,
                F::MULTI_SELECTABLE | F::WORKER,
                Cost::new(50, 0, 2),
            )
            .built_by(Self::COMMAND_CENTER),
            Self::NUKE => UnitTypeDef::new(id, F::NUCLEAR_MISSILE, Cost::new(200, 200, 16)),
            Self::HYDRALISK => {
                UnitTypeDef::new(id, F::MULTI_SELECTABLE | F::ZERG, Cost::new(75, 25, 2))
                    .attacks(OrderId::ATTACK_UNIT, OrderId::ATTACK_MOVE)
            }
            Self::CARRIER => UnitTypeDef::new(
                id,
                F::MULTI_SELECTABLE | F::FLYER | F::CARRIER,
                Cost::new(350, 250, 12),
            ),
            Self::REAVER => UnitTypeDef::new(
                id,
                F::MULTI_SELECTABLE | F::REAVER,
                Cost::new(200, 100, 8),
            ),
            Self::LURKER => {
                UnitTypeDef::new(id, F::MULTI_SELECTABLE | F::ZERG, Cost::new(50, 100, 2))
                    .built_by(Self::HYDRALISK)
            }
            Self::COMMAND_CENTER => {
                UnitTypeDef::new(id, F::BUILDING | F::FACTORY, Cost::new(400, 0, 0))
                    .with_footprint(4, 3)
            }
            Self::BARRACKS => UnitTypeDef::new(id, F::BUILDING | F::FACTORY, Cost::new(150, 0, 0))
                .built_by(Self::SCV)
                .with_footprint(4, 3),
            Self::ACADEMY => UnitTypeDef::new(id, F::BUILDING, Cost::new(150, 0, 0))
                .built_by(Self::SCV)
                .with_footprint(3, 2),
            Self::ENGINEERING_BAY => UnitTypeDef::new(id, F::BUILDING, Cost::new(125, 0, 0))
                .built_by(Self::SCV)
                .with_footprint(4, 3),
            Self::HATCHERY => UnitTypeDef::new(
                id,
                F::BUILDING | F::FACTORY | F::ZERG,
                Cost::new(300, 0, 0),
            )
            .with_footprint(4, 3),
            Self::LAIR => UnitTypeDef::new(id, F::BUILDING | F::FACTORY | F::ZERG, Cost::new(150, 100, 0))
                .built_by(Self::HATCHERY)
                .with_footprint(4, 3),
            _ => return None,
        };
        Some(def)
    }

    fn tech(&self, id: TechId) -> Option<TechDef> {
        (id == Self::STIM_TECH).then_some(TechDef {
            id,
            cost: Cost::resources(100, 100),
            researched_at: Some(Self::ACADEMY),
        })
    }

    fn upgrade(&self, id: UpgradeId) -> Option<UpgradeDef> {
        (id == Self::ARMOR).then_some(UpgradeDef {
            id,
            base_cost: Cost::resources(100, 100),
            cost_per_level: Cost::resources(75, 75),
            max_level: 3,
            upgraded_at: Some(Self::ENGINEERING_BAY),
        })
    }

    fn order(&self, id: OrderId) -> Option<OrderTypeDef> {
        use OrderFlags as F;
        let def = match id {
            OrderId::MOVE => {
                OrderTypeDef::new(id, F::OBSTRUCTABLE | F::TARGETS_UNIT | F::QUEUEABLE)
            }
            OrderId::ATTACK_MOVE | OrderId::ATTACK_DEFAULT => {
                OrderTypeDef::new(id, F::OBSTRUCTABLE | F::ATTACK | F::QUEUEABLE)
            }
            OrderId::HEAL_MOVE => OrderTypeDef::new(id, F::OBSTRUCTABLE | F::QUEUEABLE),
            OrderId::RALLY_POINT_UNIT => OrderTypeDef::new(id, F::TARGETS_UNIT | F::TARGETS_SELF),
            OrderId::RALLY_POINT_TILE => OrderTypeDef::new(id, F::empty()),
            OrderId::ARCHON_WARP | OrderId::DARK_ARCHON_MELD => {
                OrderTypeDef::new(id, F::TARGETS_UNIT)
            }
            OrderId::ATTACK_UNIT => {
                OrderTypeDef::new(id, F::ATTACK | F::TARGETS_UNIT | F::QUEUEABLE)
                    .with_subunit_order(Self::TURRET_ATTACK)
            }
            Self::TURRET_ATTACK => OrderTypeDef::new(id, F::ATTACK | F::TARGETS_UNIT),
            OrderId::BUILD => OrderTypeDef::new(id, F::BUILD),
            OrderId::STIM => OrderTypeDef::new(id, F::empty()).requires(Self::STIM_TECH),
            OrderId::STOP
            | OrderId::HOLD_POSITION
            | OrderId::RETURN_CARGO
            | OrderId::SIEGE
            | OrderId::UNSIEGE
            | OrderId::CLOAK
            | OrderId::DECLOAK
            | OrderId::BURROW
            | OrderId::UNBURROW
            | OrderId::UNLOAD_ALL => OrderTypeDef::new(id, F::QUEUEABLE),
            OrderId::CARRIER_STOP
            | OrderId::REAVER_STOP
            | OrderId::NOTHING
            | OrderId::DIE
            | OrderId::LIFTOFF
            | OrderId::NUKE_LAUNCH => OrderTypeDef::new(id, F::empty()),
            OrderId::UNLOAD => OrderTypeDef::new(id, F::TARGETS_UNIT),
            _ => return None,
        };
        Some(def)
    }
}

// ============================================================================
// World
// ============================================================================

#[derive(Clone, Debug)]
pub struct StubUnit {
    pub view: UnitView,
    pub generation: u8,
    pub alive: bool,
    pub queue: Vec<Job>,
    pub stats: HashMap<UnitStat, i32>,
}

/// One accepted `issue_order` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuedOrder {
    pub unit: UnitHandle,
    pub order: OrderId,
    pub target: OrderTarget,
    pub queue: bool,
}

/// Deterministic world backed by plain vectors.
#[derive(Clone, Debug, Default)]
pub struct StubWorld {
    pub units: Vec<StubUnit>,
    pub issued: Vec<IssuedOrder>,
    pub resources: BTreeMap<u8, Resources>,
    pub supply: BTreeMap<u8, i32>,
    pub techs: BTreeSet<(u8, u8)>,
    pub upgrades: BTreeMap<(u8, u8), u8>,
    pub alliances: BTreeMap<u8, AllianceTable>,
    pub vision: BTreeMap<u8, VisionMask>,
    pub speed: u8,
    pub paused: bool,
    pub cheats: CheatFlags,
    pub chat: Vec<(Owner, String)>,
    pub pings: Vec<(Owner, Xy)>,
    pub left: Vec<(Owner, u8)>,
    /// Units that refuse every order.
    pub stubborn: BTreeSet<u16>,
    /// Owners that see nothing.
    pub blind: BTreeSet<u8>,
    /// Slots no player occupies.
    pub vacant: BTreeSet<u8>,
    pub rallies: BTreeMap<u16, (Option<UnitHandle>, Xy)>,
}

impl StubWorld {
    /// `count` completed marines owned by player 0, 32 px apart on the x axis.
    pub fn with_units(count: u16) -> Self {
        let mut world = Self {
            speed: 6,
            ..Self::default()
        };
        for i in 0..count {
            world.spawn(Owner(0), StubTables::MARINE, Xy::new(i as i32 * 32, 0));
        }
        world
    }

    pub fn spawn(&mut self, owner: Owner, unit_type: UnitTypeId, position: Xy) -> UnitHandle {
        let handle = UnitHandle(self.units.len() as u16);
        self.units.push(StubUnit {
            view: UnitView {
                owner,
                unit_type,
                position,
                status: UnitStatus::COMPLETED,
                order: None,
                order_target: None,
                subunit: None,
                production: None,
                train_queue: 0,
            },
            generation: 0,
            alive: true,
            queue: Vec::new(),
            stats: HashMap::new(),
        });
        handle
    }

    pub fn kill(&mut self, unit: UnitHandle) {
        if let Some(stub) = self.units.get_mut(unit.index()) {
            stub.alive = false;
            stub.generation = stub.generation.wrapping_add(1);
        }
    }

    pub fn view_mut(&mut self, unit: UnitHandle) -> &mut UnitView {
        &mut self.units[unit.index()].view
    }

    pub fn stat(&self, unit: UnitHandle, stat: UnitStat) -> Option<i32> {
        self.units[unit.index()].stats.get(&stat).copied()
    }

    pub fn give(&mut self, owner: Owner, minerals: i32, gas: i32, supply: i32) {
        self.resources.insert(owner.0, Resources::new(minerals, gas));
        self.supply.insert(owner.0, supply);
    }

    fn live(&self, unit: UnitHandle) -> Option<&StubUnit> {
        self.units.get(unit.index()).filter(|stub| stub.alive)
    }

    fn live_mut(&mut self, unit: UnitHandle) -> Option<&mut StubUnit> {
        self.units.get_mut(unit.index()).filter(|stub| stub.alive)
    }
}

impl UnitLookup for StubWorld {
    fn unit_by_id(&self, id: UnitId) -> Option<UnitHandle> {
        let index = id.index()?;
        let stub = self.units.get(index as usize)?;
        (stub.alive && stub.generation == id.generation()).then_some(UnitHandle(index))
    }

    fn unit_id(&self, unit: UnitHandle) -> UnitId {
        self.units
            .get(unit.index())
            .map_or(UnitId::NONE, |stub| {
                UnitId::from_parts(unit.0, stub.generation)
            })
    }
}

impl World for StubWorld {
    fn unit(&self, unit: UnitHandle) -> Option<UnitView> {
        self.live(unit).map(|stub| stub.view)
    }

    fn owned_units(&self, owner: Owner) -> Vec<UnitHandle> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, stub)| stub.alive && stub.view.owner == owner)
            .map(|(i, _)| UnitHandle(i as u16))
            .collect()
    }

    fn can_receive_order(&self, unit: UnitHandle, _order: OrderRef) -> bool {
        self.live(unit).is_some_and(|stub| {
            !stub.view.status.contains(UnitStatus::DISABLED) && !self.stubborn.contains(&unit.0)
        })
    }

    fn default_order(&self, unit: UnitHandle, target: Option<UnitHandle>) -> Option<OrderRef> {
        let view = self.live(unit)?.view;
        let flags = TABLES.unit_type(view.unit_type)?.flags;
        let id = if flags.contains(UnitTypeFlags::FACTORY) {
            match target {
                Some(_) => OrderId::RALLY_POINT_UNIT,
                None => OrderId::RALLY_POINT_TILE,
            }
        } else if flags.contains(UnitTypeFlags::BUILDING) {
            return None;
        } else {
            match target.and_then(|target| self.unit(target)) {
                Some(target) if target.owner != view.owner => OrderId::ATTACK_DEFAULT,
                _ => OrderId::MOVE,
            }
        };
        OrderRef::resolve(&TABLES, id)
    }

    fn units_in(&self, area: Rect) -> Vec<UnitHandle> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, stub)| stub.alive && area.contains(stub.view.position))
            .map(|(i, _)| UnitHandle(i as u16))
            .collect()
    }

    fn position_visible(&self, owner: Owner, _position: Xy) -> bool {
        !self.blind.contains(&owner.0)
    }

    fn issue_order(
        &mut self,
        unit: UnitHandle,
        order: OrderRef,
        target: OrderTarget,
        queue: bool,
    ) -> bool {
        let Some(stub) = self.live_mut(unit) else {
            return false;
        };
        stub.view.order = Some(order);
        stub.view.order_target = target.unit;
        self.issued.push(IssuedOrder {
            unit,
            order: order.id(),
            target,
            queue,
        });
        true
    }

    fn clear_order_target(&mut self, unit: UnitHandle) {
        if let Some(stub) = self.live_mut(unit) {
            stub.view.order_target = None;
        }
    }

    fn set_rally_point(&mut self, unit: UnitHandle, target: Option<UnitHandle>, position: Xy) {
        self.rallies.insert(unit.0, (target, position));
    }

    fn begin_production(&mut self, unit: UnitHandle, job: Job) -> bool {
        let Some(stub) = self.live_mut(unit) else {
            return false;
        };
        match job {
            Job::Train(_) | Job::TrainFighter => {
                stub.queue.push(job);
                stub.view.train_queue = stub.queue.len() as u8;
            }
            _ => {
                if stub.view.production.is_some() {
                    return false;
                }
                stub.view.production = Some(job);
            }
        }
        true
    }

    fn cancel_production(&mut self, unit: UnitHandle, cancel: Cancel) -> Option<Job> {
        let stub = self.live_mut(unit)?;
        if let Cancel::Train { slot } = cancel {
            let slot = slot as usize;
            if slot >= stub.queue.len() {
                return None;
            }
            let job = stub.queue.remove(slot);
            stub.view.train_queue = stub.queue.len() as u8;
            return Some(job);
        }
        let matches = matches!(
            (cancel, stub.view.production?),
            (Cancel::Research, Job::Research(_))
                | (Cancel::Upgrade, Job::Upgrade(_))
                | (Cancel::Morph, Job::Morph(_) | Job::BuildingMorph(_))
                | (Cancel::Addon, Job::Addon(_))
                | (Cancel::Construction, Job::Construction(_))
                | (Cancel::Nuke, Job::Nuke)
        );
        if matches {
            stub.view.production.take()
        } else {
            None
        }
    }

    fn set_unit_stat(&mut self, unit: UnitHandle, stat: UnitStat, value: i32) {
        if let Some(stub) = self.live_mut(unit) {
            stub.stats.insert(stat, value);
        }
    }

    fn resources(&self, owner: Owner) -> Resources {
        self.resources.get(&owner.0).copied().unwrap_or_default()
    }

    fn set_resources(&mut self, owner: Owner, resources: Resources) {
        self.resources.insert(owner.0, resources);
    }

    fn supply_available(&self, owner: Owner) -> i32 {
        self.supply.get(&owner.0).copied().unwrap_or_default()
    }

    fn has_tech(&self, owner: Owner, tech: TechRef) -> bool {
        self.techs.contains(&(owner.0, tech.id().0))
    }

    fn set_tech(&mut self, owner: Owner, tech: TechRef, researched: bool) {
        if researched {
            self.techs.insert((owner.0, tech.id().0));
        } else {
            self.techs.remove(&(owner.0, tech.id().0));
        }
    }

    fn upgrade_level(&self, owner: Owner, upgrade: UpgradeRef) -> u8 {
        self.upgrades
            .get(&(owner.0, upgrade.id().0))
            .copied()
            .unwrap_or_default()
    }

    fn set_upgrade_level(&mut self, owner: Owner, upgrade: UpgradeRef, level: u8) {
        self.upgrades.insert((owner.0, upgrade.id().0), level);
    }

    fn is_occupied(&self, owner: Owner) -> bool {
        owner.index().is_some() && !self.vacant.contains(&owner.0)
    }

    fn alliances(&self, owner: Owner) -> AllianceTable {
        self.alliances
            .get(&owner.0)
            .copied()
            .unwrap_or_else(|| AllianceTable::solo(owner))
    }

    fn set_alliances(&mut self, owner: Owner, table: AllianceTable) {
        self.alliances.insert(owner.0, table);
    }

    fn shared_vision(&self, owner: Owner) -> VisionMask {
        self.vision.get(&owner.0).copied().unwrap_or_default()
    }

    fn set_shared_vision(&mut self, owner: Owner, mask: VisionMask) {
        self.vision.insert(owner.0, mask);
    }

    fn game_speed(&self) -> u8 {
        self.speed
    }

    fn set_game_speed(&mut self, speed: u8) {
        self.speed = speed;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_cheat_flags(&mut self, flags: CheatFlags) {
        self.cheats = flags;
    }

    fn post_chat(&mut self, owner: Owner, text: &str) {
        self.chat.push((owner, text.to_owned()));
    }

    fn minimap_ping(&mut self, owner: Owner, position: Xy) {
        self.pings.push((owner, position));
    }

    fn leave_game(&mut self, owner: Owner, reason: u8) {
        self.left.push((owner, reason));
    }
}

// ============================================================================
// Pathing
// ============================================================================

/// Square map, open except for an optional full-height wall band.
///
/// Ground left of the wall is region 0, right of it region 1; the two are not
/// connected.
#[derive(Clone, Copy, Debug)]
pub struct StubPath {
    size: i32,
    wall: Option<(i32, i32)>,
}

impl StubPath {
    const CORRIDOR_STEP: i32 = 32;

    pub fn open(size: i32) -> Self {
        Self { size, wall: None }
    }

    /// Blocks every column in `from..to`.
    pub fn with_wall(mut self, from: i32, to: i32) -> Self {
        self.wall = Some((from, to));
        self
    }
}

impl PathOracle for StubPath {
    fn map_size(&self) -> Xy {
        Xy::new(self.size, self.size)
    }

    fn region_at(&self, position: Xy) -> Option<RegionId> {
        if position.x < 0 || position.y < 0 || position.x >= self.size || position.y >= self.size
        {
            return None;
        }
        match self.wall {
            Some((from, to)) if (from..to).contains(&position.x) => None,
            Some((from, _)) if position.x >= from => Some(RegionId(1)),
            _ => Some(RegionId(0)),
        }
    }

    fn regions_connected(&self, a: RegionId, b: RegionId) -> bool {
        a == b
    }

    fn long_path(&self, from: Xy, to: Xy) -> Option<Vec<Xy>> {
        self.region_at(from)?;
        let delta = to - from;
        let steps = (delta.x.abs().max(delta.y.abs()) / Self::CORRIDOR_STEP).max(1);
        let corridor = (0..=steps)
            .map(|k| from + Xy::new(delta.x * k / steps, delta.y * k / steps))
            .take_while(|&point| self.is_reachable(from, point))
            .collect();
        Some(corridor)
    }
}
