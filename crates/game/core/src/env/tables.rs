use bitflags::bitflags;

use crate::state::{OrderId, TechId, TilePos, UnitTypeId, UpgradeId, Xy};

/// Oracle providing the static rule tables referenced by action parameters.
///
/// Every id-resolving wire type (unit type, tech, upgrade, order) is validated
/// against this oracle during decode; handlers read costs and requirements from
/// the returned definitions.
pub trait TablesOracle: Send + Sync {
    fn unit_type(&self, id: UnitTypeId) -> Option<UnitTypeDef>;
    fn tech(&self, id: TechId) -> Option<TechDef>;
    fn upgrade(&self, id: UpgradeId) -> Option<UpgradeDef>;
    fn order(&self, id: OrderId) -> Option<OrderTypeDef>;
}

/// Mineral, gas and supply price of a unit, tech or upgrade level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cost {
    pub minerals: i32,
    pub gas: i32,
    pub supply: i32,
}

impl Cost {
    pub const FREE: Self = Self::new(0, 0, 0);

    pub const fn new(minerals: i32, gas: i32, supply: i32) -> Self {
        Self {
            minerals,
            gas,
            supply,
        }
    }

    pub const fn resources(minerals: i32, gas: i32) -> Self {
        Self::new(minerals, gas, 0)
    }

    /// `self + factor * per_step`, used for leveled upgrade prices.
    pub const fn stepped(self, per_step: Cost, factor: i32) -> Self {
        Self::new(
            self.minerals + per_step.minerals * factor,
            self.gas + per_step.gas * factor,
            self.supply + per_step.supply * factor,
        )
    }
}

bitflags! {
    /// Static properties of a unit type that affect command handling.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UnitTypeFlags: u16 {
        const BUILDING         = 1 << 0;
        const MULTI_SELECTABLE = 1 << 1;
        const NUCLEAR_MISSILE  = 1 << 2;
        const FLYER            = 1 << 3;
        const ADDON            = 1 << 4;
        const WORKER           = 1 << 5;
        const CARRIER          = 1 << 6;
        const REAVER           = 1 << 7;
        const MEDIC            = 1 << 8;
        /// Trains units and keeps a rally point for them.
        const FACTORY          = 1 << 9;
        const ZERG             = 1 << 10;
        const HIGH_TEMPLAR     = 1 << 11;
        const DARK_TEMPLAR     = 1 << 12;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitTypeDef {
    pub id: UnitTypeId,
    pub flags: UnitTypeFlags,
    pub cost: Cost,
    /// Unit type that trains, builds or morphs into this type.
    pub builder: Option<UnitTypeId>,
    /// Footprint in build tiles; placement targets the footprint's center.
    pub tile_width: u8,
    pub tile_height: u8,
    /// Orders a right-click attack resolves to against a unit and a point.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack_unit: Option<OrderId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack_move: Option<OrderId>,
}

impl UnitTypeDef {
    pub const fn new(id: UnitTypeId, flags: UnitTypeFlags, cost: Cost) -> Self {
        Self {
            id,
            flags,
            cost,
            builder: None,
            tile_width: 1,
            tile_height: 1,
            attack_unit: None,
            attack_move: None,
        }
    }

    pub const fn built_by(mut self, builder: UnitTypeId) -> Self {
        self.builder = Some(builder);
        self
    }

    pub const fn with_footprint(mut self, tile_width: u8, tile_height: u8) -> Self {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self
    }

    pub const fn attacks(mut self, attack_unit: OrderId, attack_move: OrderId) -> Self {
        self.attack_unit = Some(attack_unit);
        self.attack_move = Some(attack_move);
        self
    }

    /// Footprint in pixels.
    pub fn placement_size(&self) -> Xy {
        Xy::new(
            self.tile_width as i32 * TilePos::SIZE,
            self.tile_height as i32 * TilePos::SIZE,
        )
    }

    pub fn is_building(&self) -> bool {
        self.flags.contains(UnitTypeFlags::BUILDING)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TechDef {
    pub id: TechId,
    pub cost: Cost,
    /// Building type that researches this tech, `None` for techs that are
    /// granted rather than researched.
    pub researched_at: Option<UnitTypeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub base_cost: Cost,
    pub cost_per_level: Cost,
    pub max_level: u8,
    pub upgraded_at: Option<UnitTypeId>,
}

impl UpgradeDef {
    /// Price of going from `current_level` to `current_level + 1`.
    pub fn cost_at(&self, current_level: u8) -> Cost {
        self.base_cost
            .stepped(self.cost_per_level, current_level as i32)
    }
}

bitflags! {
    /// How an order type interacts with group targeting and queuing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OrderFlags: u8 {
        /// Ground units route a group move around obstructions.
        const OBSTRUCTABLE = 1 << 0;
        /// Targets hostile units; revoked when the target becomes allied.
        const ATTACK       = 1 << 1;
        /// Construction order issued by `build`.
        const BUILD        = 1 << 2;
        /// Accepts a unit target.
        const TARGETS_UNIT = 1 << 3;
        /// May be appended to the order queue.
        const QUEUEABLE    = 1 << 4;
        /// A unit may be given this order with itself as the target.
        const TARGETS_SELF = 1 << 5;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderTypeDef {
    pub id: OrderId,
    pub flags: OrderFlags,
    /// Technology the issuing player must own before units accept this order.
    pub required_tech: Option<TechId>,
    /// Order issued alongside to a unit's subunit (turret).
    pub subunit_order: Option<OrderId>,
}

impl OrderTypeDef {
    pub const fn new(id: OrderId, flags: OrderFlags) -> Self {
        Self {
            id,
            flags,
            required_tech: None,
            subunit_order: None,
        }
    }

    pub const fn requires(mut self, tech: TechId) -> Self {
        self.required_tech = Some(tech);
        self
    }

    pub const fn with_subunit_order(mut self, order: OrderId) -> Self {
        self.subunit_order = Some(order);
        self
    }
}
