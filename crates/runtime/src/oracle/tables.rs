//! Rule tables served through [`lockstep_core::TablesOracle`].
use std::collections::BTreeMap;
use std::path::Path;

use lockstep_core::env::{
    Cost, OrderFlags, OrderTypeDef, TablesOracle, TechDef, UnitTypeDef, UnitTypeFlags, UpgradeDef,
};
use lockstep_core::{OrderId, TechId, UnitTypeId, UpgradeId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Serialized form of the tables, as stored in RON files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesData {
    pub unit_types: Vec<UnitTypeDef>,
    pub techs: Vec<TechDef>,
    pub upgrades: Vec<UpgradeDef>,
    pub orders: Vec<OrderTypeDef>,
}

/// Immutable rule tables indexed by id.
#[derive(Clone, Debug, Default)]
pub struct StaticTables {
    unit_types: BTreeMap<UnitTypeId, UnitTypeDef>,
    techs: BTreeMap<TechId, TechDef>,
    upgrades: BTreeMap<UpgradeId, UpgradeDef>,
    orders: BTreeMap<OrderId, OrderTypeDef>,
}

impl StaticTables {
    // ===== unit types =====
    pub const MARINE: UnitTypeId = UnitTypeId(0);
    pub const GHOST: UnitTypeId = UnitTypeId(1);
    pub const VULTURE: UnitTypeId = UnitTypeId(2);
    pub const SIEGE_TANK: UnitTypeId = UnitTypeId(5);
    pub const TANK_TURRET: UnitTypeId = UnitTypeId(6);
    pub const SCV: UnitTypeId = UnitTypeId(7);
    pub const WRAITH: UnitTypeId = UnitTypeId(8);
    pub const DROPSHIP: UnitTypeId = UnitTypeId(11);
    pub const NUCLEAR_MISSILE: UnitTypeId = UnitTypeId(14);
    pub const MEDIC: UnitTypeId = UnitTypeId(34);
    pub const ZERGLING: UnitTypeId = UnitTypeId(37);
    pub const HYDRALISK: UnitTypeId = UnitTypeId(38);
    pub const DRONE: UnitTypeId = UnitTypeId(41);
    pub const DARK_TEMPLAR: UnitTypeId = UnitTypeId(61);
    pub const HIGH_TEMPLAR: UnitTypeId = UnitTypeId(67);
    pub const CARRIER: UnitTypeId = UnitTypeId(72);
    pub const INTERCEPTOR: UnitTypeId = UnitTypeId(73);
    pub const REAVER: UnitTypeId = UnitTypeId(83);
    pub const SCARAB: UnitTypeId = UnitTypeId(85);
    pub const LURKER: UnitTypeId = UnitTypeId(103);
    pub const COMMAND_CENTER: UnitTypeId = UnitTypeId(106);
    pub const SUPPLY_DEPOT: UnitTypeId = UnitTypeId(109);
    pub const BARRACKS: UnitTypeId = UnitTypeId(111);
    pub const ACADEMY: UnitTypeId = UnitTypeId(112);
    pub const FACTORY: UnitTypeId = UnitTypeId(113);
    pub const NUCLEAR_SILO: UnitTypeId = UnitTypeId(108);
    pub const ENGINEERING_BAY: UnitTypeId = UnitTypeId(122);
    pub const HATCHERY: UnitTypeId = UnitTypeId(131);
    pub const LAIR: UnitTypeId = UnitTypeId(132);
    pub const STARGATE: UnitTypeId = UnitTypeId(167);
    pub const ROBOTICS_FACILITY: UnitTypeId = UnitTypeId(155);

    // ===== techs and upgrades =====
    pub const STIM_PACKS: TechId = TechId(0);
    pub const LOCKDOWN: TechId = TechId(1);
    pub const SIEGE_MODE: TechId = TechId(5);
    pub const BURROWING: TechId = TechId(11);
    pub const CLOAKING_FIELD: TechId = TechId(12);
    pub const LURKER_ASPECT: TechId = TechId(32);

    pub const INFANTRY_ARMOR: UpgradeId = UpgradeId(0);
    pub const INFANTRY_WEAPONS: UpgradeId = UpgradeId(7);

    // ===== orders outside the engine's fixed set =====
    pub const TANK_TURRET_ATTACK: OrderId = OrderId(11);

    /// Built-in tables covering the units, techs and orders the reference
    /// world and tests rely on.
    pub fn standard() -> Self {
        Self::from_data(standard_data())
    }

    pub fn from_data(data: TablesData) -> Self {
        Self {
            unit_types: data.unit_types.into_iter().map(|def| (def.id, def)).collect(),
            techs: data.techs.into_iter().map(|def| (def.id, def)).collect(),
            upgrades: data.upgrades.into_iter().map(|def| (def.id, def)).collect(),
            orders: data.orders.into_iter().map(|def| (def.id, def)).collect(),
        }
    }

    /// Loads tables from a RON file holding [`TablesData`].
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| RuntimeError::io(path, source))?;
        let data: TablesData = ron::from_str(&content).map_err(|source| RuntimeError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            target: "lockstep::runtime",
            path = %path.display(),
            unit_types = data.unit_types.len(),
            orders = data.orders.len(),
            "rule tables loaded"
        );
        Ok(Self::from_data(data))
    }

    pub fn to_data(&self) -> TablesData {
        TablesData {
            unit_types: self.unit_types.values().copied().collect(),
            techs: self.techs.values().copied().collect(),
            upgrades: self.upgrades.values().copied().collect(),
            orders: self.orders.values().copied().collect(),
        }
    }
}

impl TablesOracle for StaticTables {
    fn unit_type(&self, id: UnitTypeId) -> Option<UnitTypeDef> {
        self.unit_types.get(&id).copied()
    }

    fn tech(&self, id: TechId) -> Option<TechDef> {
        self.techs.get(&id).copied()
    }

    fn upgrade(&self, id: UpgradeId) -> Option<UpgradeDef> {
        self.upgrades.get(&id).copied()
    }

    fn order(&self, id: OrderId) -> Option<OrderTypeDef> {
        self.orders.get(&id).copied()
    }
}

fn standard_data() -> TablesData {
    use StaticTables as T;
    use UnitTypeFlags as U;

    let unit = |id, flags, minerals, gas, supply| {
        UnitTypeDef::new(id, flags, Cost::new(minerals, gas, supply))
    };
    let fighter = |id, flags, minerals, gas, supply| {
        unit(id, flags, minerals, gas, supply).attacks(OrderId::ATTACK_UNIT, OrderId::ATTACK_MOVE)
    };
    let infantry = U::MULTI_SELECTABLE;
    let zerg = infantry | U::ZERG;
    let building = U::BUILDING;
    let producer = U::BUILDING | U::FACTORY;

    let unit_types = vec![
        fighter(T::MARINE, infantry, 50, 0, 2).built_by(T::BARRACKS),
        fighter(T::GHOST, infantry, 25, 75, 2).built_by(T::BARRACKS),
        fighter(T::VULTURE, infantry, 75, 0, 4).built_by(T::FACTORY),
        fighter(T::SIEGE_TANK, infantry, 150, 100, 4).built_by(T::FACTORY),
        unit(T::TANK_TURRET, U::empty(), 0, 0, 0)
            .attacks(T::TANK_TURRET_ATTACK, T::TANK_TURRET_ATTACK),
        fighter(T::SCV, infantry | U::WORKER, 50, 0, 2).built_by(T::COMMAND_CENTER),
        fighter(T::WRAITH, infantry | U::FLYER, 150, 100, 4),
        unit(T::DROPSHIP, infantry | U::FLYER, 100, 100, 4),
        unit(T::NUCLEAR_MISSILE, U::NUCLEAR_MISSILE, 200, 200, 16).built_by(T::NUCLEAR_SILO),
        unit(T::MEDIC, infantry | U::MEDIC, 50, 25, 2)
            .built_by(T::BARRACKS)
            .attacks(OrderId::NOTHING, OrderId::NOTHING),
        fighter(T::ZERGLING, zerg, 50, 0, 1),
        fighter(T::HYDRALISK, zerg, 75, 25, 2),
        fighter(T::DRONE, zerg | U::WORKER, 50, 0, 2),
        fighter(T::DARK_TEMPLAR, infantry | U::DARK_TEMPLAR, 125, 100, 4),
        unit(T::HIGH_TEMPLAR, infantry | U::HIGH_TEMPLAR, 50, 150, 4),
        fighter(T::CARRIER, infantry | U::FLYER | U::CARRIER, 350, 250, 12).built_by(T::STARGATE),
        fighter(T::INTERCEPTOR, U::FLYER, 25, 0, 0),
        fighter(T::REAVER, infantry | U::REAVER, 200, 100, 8).built_by(T::ROBOTICS_FACILITY),
        unit(T::SCARAB, U::empty(), 15, 0, 0),
        fighter(T::LURKER, zerg, 50, 100, 2).built_by(T::HYDRALISK),
        unit(T::COMMAND_CENTER, producer, 400, 0, 0).with_footprint(4, 3),
        unit(T::NUCLEAR_SILO, building | U::ADDON, 100, 100, 0)
            .built_by(T::COMMAND_CENTER)
            .with_footprint(2, 2),
        unit(T::SUPPLY_DEPOT, building, 100, 0, 0)
            .built_by(T::SCV)
            .with_footprint(3, 2),
        unit(T::BARRACKS, producer, 150, 0, 0)
            .built_by(T::SCV)
            .with_footprint(4, 3),
        unit(T::ACADEMY, building, 150, 0, 0)
            .built_by(T::SCV)
            .with_footprint(3, 2),
        unit(T::FACTORY, producer, 200, 100, 0)
            .built_by(T::SCV)
            .with_footprint(4, 3),
        unit(T::ENGINEERING_BAY, building, 125, 0, 0)
            .built_by(T::SCV)
            .with_footprint(4, 3),
        unit(T::HATCHERY, producer | U::ZERG, 300, 0, 0).with_footprint(4, 3),
        unit(T::LAIR, producer | U::ZERG, 150, 100, 0)
            .built_by(T::HATCHERY)
            .with_footprint(4, 3),
        unit(T::ROBOTICS_FACILITY, producer, 200, 200, 0).with_footprint(3, 2),
        unit(T::STARGATE, producer, 150, 150, 0).with_footprint(4, 3),
    ];

    let tech = |id, minerals, gas, researched_at| TechDef {
        id,
        cost: Cost::resources(minerals, gas),
        researched_at,
    };
    let techs = vec![
        tech(T::STIM_PACKS, 100, 100, Some(T::ACADEMY)),
        tech(T::LOCKDOWN, 200, 200, None),
        tech(T::SIEGE_MODE, 150, 150, Some(T::FACTORY)),
        tech(T::BURROWING, 100, 100, Some(T::HATCHERY)),
        tech(T::CLOAKING_FIELD, 150, 150, None),
        tech(T::LURKER_ASPECT, 200, 200, Some(T::LAIR)),
    ];

    let upgrade = |id| UpgradeDef {
        id,
        base_cost: Cost::resources(100, 100),
        cost_per_level: Cost::resources(75, 75),
        max_level: 3,
        upgraded_at: Some(T::ENGINEERING_BAY),
    };
    let upgrades = vec![upgrade(T::INFANTRY_ARMOR), upgrade(T::INFANTRY_WEAPONS)];

    use OrderFlags as O;
    let simple = O::QUEUEABLE;
    let group_move = O::OBSTRUCTABLE | O::QUEUEABLE;
    let mut orders = vec![
        OrderTypeDef::new(OrderId::DIE, O::empty()),
        OrderTypeDef::new(OrderId::STOP, simple),
        OrderTypeDef::new(OrderId::MOVE, group_move | O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::ATTACK_DEFAULT, group_move | O::ATTACK),
        OrderTypeDef::new(OrderId::ATTACK_UNIT, O::ATTACK | O::TARGETS_UNIT | O::QUEUEABLE)
            .with_subunit_order(T::TANK_TURRET_ATTACK),
        OrderTypeDef::new(T::TANK_TURRET_ATTACK, O::ATTACK | O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::ATTACK_MOVE, group_move | O::ATTACK),
        OrderTypeDef::new(OrderId::HEAL_MOVE, group_move),
        OrderTypeDef::new(OrderId::NOTHING, O::empty()),
        OrderTypeDef::new(OrderId::BUILD, O::BUILD),
        OrderTypeDef::new(OrderId::RALLY_POINT_UNIT, O::TARGETS_UNIT | O::TARGETS_SELF),
        OrderTypeDef::new(OrderId::RALLY_POINT_TILE, O::empty()),
        OrderTypeDef::new(OrderId::RECHARGE_SHIELDS_BATTERY, O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::PICKUP_BUNKER, O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::CARRIER_STOP, O::empty()),
        OrderTypeDef::new(OrderId::REAVER_STOP, O::empty()),
        OrderTypeDef::new(OrderId::LIFTOFF, O::empty()),
        OrderTypeDef::new(OrderId::RETURN_CARGO, simple),
        OrderTypeDef::new(OrderId::SIEGE, simple).requires(T::SIEGE_MODE),
        OrderTypeDef::new(OrderId::UNSIEGE, simple),
        OrderTypeDef::new(OrderId::HOLD_POSITION, simple),
        OrderTypeDef::new(OrderId::CLOAK, simple).requires(T::CLOAKING_FIELD),
        OrderTypeDef::new(OrderId::DECLOAK, simple),
        OrderTypeDef::new(OrderId::UNLOAD, O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::UNLOAD_ALL, simple),
        OrderTypeDef::new(OrderId::BURROW, simple).requires(T::BURROWING),
        OrderTypeDef::new(OrderId::UNBURROW, simple),
        OrderTypeDef::new(OrderId::ARCHON_WARP, O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::DARK_ARCHON_MELD, O::TARGETS_UNIT),
        OrderTypeDef::new(OrderId::NUKE_LAUNCH, O::empty()),
        OrderTypeDef::new(OrderId::STIM, O::empty()).requires(T::STIM_PACKS),
    ];
    // Remaining internal orders exist so the engine can refuse them by id.
    let internal: Vec<_> = OrderId::INTERNAL
        .into_iter()
        .filter(|&id| orders.iter().all(|def| def.id != id))
        .map(|id| OrderTypeDef::new(id, O::empty()))
        .collect();
    orders.extend(internal);

    TablesData {
        unit_types,
        techs,
        upgrades,
        orders,
    }
}
