//! Identifiers for static rule-table entries and their resolved counterparts.
//!
//! Each table kind comes as a pair: the narrow numeric id carried on the wire
//! and a `*Ref` that can only be obtained by resolving the id against a
//! [`TablesOracle`]. Holding a ref therefore proves the entry exists.

use std::fmt;

use crate::env::TablesOracle;

macro_rules! table_id {
    ($(#[$meta:meta])* $id:ident($repr:ty), $(#[$ref_meta:meta])* $handle:ident, $lookup:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $id(pub $repr);

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($id), self.0)
            }
        }

        $(#[$ref_meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $handle($id);

        impl $handle {
            /// Resolves a wire id against the rule tables.
            pub fn resolve<T>(tables: &T, id: $id) -> Option<Self>
            where
                T: TablesOracle + ?Sized,
            {
                tables.$lookup(id).map(|_| Self(id))
            }

            /// Projects the handle back to its wire id.
            #[inline]
            pub const fn id(self) -> $id {
                self.0
            }
        }
    };
}

table_id!(
    /// Unit type id (16-bit on the wire, 228 = none).
    UnitTypeId(u16),
    /// Resolved unit type.
    UnitTypeRef,
    unit_type
);

table_id!(
    /// Technology id (8-bit on the wire).
    TechId(u8),
    /// Resolved technology.
    TechRef,
    tech
);

table_id!(
    /// Upgrade id (8-bit on the wire).
    UpgradeId(u8),
    /// Resolved upgrade.
    UpgradeRef,
    upgrade
);

table_id!(
    /// Order type id (8-bit on the wire).
    OrderId(u8),
    /// Resolved order type.
    OrderRef,
    order
);

impl UnitTypeId {
    /// Sentinel written for a null unit type.
    pub const NONE: Self = Self(228);
}

/// Order ids the engine issues or inspects on its own behalf.
impl OrderId {
    pub const DIE: Self = Self(0);
    pub const STOP: Self = Self(1);
    pub const MOVE: Self = Self(6);
    pub const ATTACK_DEFAULT: Self = Self(8);
    pub const ATTACK_UNIT: Self = Self(10);
    pub const ATTACK_MOVE: Self = Self(14);
    pub const NOTHING: Self = Self(23);
    /// Terran construction; also the order `build` places buildings with.
    pub const BUILD: Self = Self(30);
    pub const RALLY_POINT_UNIT: Self = Self(39);
    pub const RALLY_POINT_TILE: Self = Self(40);
    pub const CARRIER_STOP: Self = Self(55);
    pub const REAVER_STOP: Self = Self(61);
    pub const RECHARGE_SHIELDS_BATTERY: Self = Self(67);
    pub const LIFTOFF: Self = Self(72);
    pub const RETURN_CARGO: Self = Self(90);
    pub const PICKUP_BUNKER: Self = Self(95);
    pub const SIEGE: Self = Self(98);
    pub const UNSIEGE: Self = Self(99);
    pub const ARCHON_WARP: Self = Self(105);
    pub const HOLD_POSITION: Self = Self(107);
    pub const CLOAK: Self = Self(109);
    pub const DECLOAK: Self = Self(110);
    pub const UNLOAD: Self = Self(111);
    pub const UNLOAD_ALL: Self = Self(112);
    pub const BURROW: Self = Self(116);
    pub const UNBURROW: Self = Self(118);
    pub const NUKE_LAUNCH: Self = Self(125);
    pub const STIM: Self = Self(140);
    pub const HEAL_MOVE: Self = Self(177);
    pub const DARK_ARCHON_MELD: Self = Self(183);

    /// Orders the simulation runs internally and a player may never issue
    /// through `order`.
    pub const INTERNAL: [Self; 24] = [
        Self::DIE,
        Self(15), // infested command center
        Self(20), // spider mine
        Self(25), // drone start build
        Self(29), // infesting command center
        Self::BUILD,
        Self(31), // place protoss building
        Self(32), // create protoss building
        Self(33), // constructing building
        Self(36), // place addon
        Self(46), // build nydus exit
        Self(71), // building land
        Self::LIFTOFF,
        Self(73), // drone liftoff
        Self(80), // harvest
        Self(81), // move to gas
        Self(82), // wait for gas
        Self(83), // harvest gas
        Self(85), // move to minerals
        Self(86), // wait for minerals
        Self(87), // mining minerals
        Self(88), // gathering interrupted
        Self(89), // gather wait interrupted
        Self(155), // capture the flag
    ];

    pub fn is_internal(self) -> bool {
        Self::INTERNAL.contains(&self)
    }
}
