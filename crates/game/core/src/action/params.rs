//! Resolved parameter types and their conversion to and from action fields.

use crate::codec::{WireType, WireValue};
use crate::state::{
    AllianceTable, OrderRef, Owner, TechRef, TilePos, UnitHandle, UnitTypeRef, UpgradeRef,
    VisionMask, Xy,
};

/// Semantic type of one resolved action parameter.
///
/// `Wire` parameters need no resolution; the others are looked up in the world
/// or the rule tables during decode and projected back to ids on encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Wire(WireType),
    /// Optional unit; stale ids resolve to `None`.
    Unit,
    /// Unit list; stale ids are dropped.
    Units,
    /// Optional unit type; the 228 sentinel resolves to `None`.
    UnitType,
    Tech,
    Upgrade,
    Order,
}

impl ParamType {
    /// Wire type this parameter is carried as.
    pub const fn wire_type(self) -> WireType {
        match self {
            Self::Wire(ty) => ty,
            Self::Unit => WireType::UnitId,
            Self::Units => WireType::UnitIdList,
            Self::UnitType => WireType::UnitTypeId,
            Self::Tech => WireType::TechId,
            Self::Upgrade => WireType::UpgradeId,
            Self::Order => WireType::OrderId,
        }
    }

    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Wire(_))
    }
}

/// One parameter in resolved form.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Param {
    Wire(WireValue),
    Unit(Option<UnitHandle>),
    Units(Vec<UnitHandle>),
    UnitType(Option<UnitTypeRef>),
    Tech(TechRef),
    Upgrade(UpgradeRef),
    Order(OrderRef),
}

/// Conversion between an action field and its [`Param`] slot.
pub trait ParamValue: Sized {
    fn from_param(param: Param) -> Option<Self>;

    fn into_param(self) -> Param;
}

macro_rules! wire_param {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn from_param(param: Param) -> Option<Self> {
                    match param {
                        Param::Wire(WireValue::$variant(value)) => Some(value),
                        _ => None,
                    }
                }

                fn into_param(self) -> Param {
                    Param::Wire(WireValue::$variant(self))
                }
            }
        )*
    };
}

wire_param!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i32 => I32,
    bool => Bool,
    Xy => Xy,
    TilePos => TilePos,
    AllianceTable => Alliances,
    VisionMask => Vision,
    String => Text,
);

macro_rules! resolved_param {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn from_param(param: Param) -> Option<Self> {
                    match param {
                        Param::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_param(self) -> Param {
                    Param::$variant(self)
                }
            }
        )*
    };
}

resolved_param!(
    Option<UnitHandle> => Unit,
    Vec<UnitHandle> => Units,
    Option<UnitTypeRef> => UnitType,
    TechRef => Tech,
    UpgradeRef => Upgrade,
    OrderRef => Order,
);

/// Owner slots travel as a single byte.
impl ParamValue for Owner {
    fn from_param(param: Param) -> Option<Self> {
        u8::from_param(param).map(Owner)
    }

    fn into_param(self) -> Param {
        self.0.into_param()
    }
}
