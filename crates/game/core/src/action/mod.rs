//! Action domain: the closed set of player commands and their wire codec.
//!
//! # Module Structure
//!
//! - `params`: resolved parameter types (`ParamType`, `Param`, `ParamValue`)
//! - `catalogue`: static description of every command (tag, wire and resolved lists)
//! - `adapter`: encode/decode driver over catalogue entries
//! - `cheat`: legacy cheat flag word
//! - `error`: decode and encode errors
//!
//! [`Action`] and [`ActionKind`] are generated together from one list so that
//! adding a command without a catalogue entry and an engine arm fails to compile.

pub mod adapter;
pub mod catalogue;
pub mod cheat;
pub mod error;
pub mod params;

pub use adapter::{DecodeContext, decode, encode, encode_into};
pub use catalogue::{ActionSpec, ActionTag, CATALOGUE, spec};
pub use cheat::CheatFlags;
pub use error::{DecodeError, EncodeError};
pub use params::{Param, ParamType, ParamValue};

use crate::state::{
    AllianceTable, OrderRef, Owner, TechRef, TilePos, UnitHandle, UnitTypeRef, UpgradeRef,
    VisionMask, Xy,
};

macro_rules! define_actions {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident { $($field:ident : $ty:ty),* $(,)? }
        ),* $(,)?
    ) => {
        /// One decoded player command with resolved parameters.
        ///
        /// Produced by a successful decode or constructed directly by input code.
        #[derive(Clone, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Action {
            $(
                $(#[$meta])*
                $variant { $($field: $ty),* },
            )*
        }

        /// Discriminant of [`Action`], in catalogue order.
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            strum::Display,
            strum::AsRefStr,
            strum::EnumIter,
            strum::EnumCount,
        )]
        #[strum(serialize_all = "snake_case")]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum ActionKind {
            $($variant,)*
        }

        impl Action {
            pub fn kind(&self) -> ActionKind {
                match self {
                    $(Self::$variant { .. } => ActionKind::$variant,)*
                }
            }

            /// Flattens the fields into positional parameters.
            pub fn to_params(&self) -> Vec<Param> {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Self::$variant { $($field),* } => {
                            vec![$(ParamValue::into_param($field.clone())),*]
                        }
                    )*
                }
            }

            /// Rebuilds an action from positional parameters; `None` when the
            /// count or any type does not match the variant.
            pub fn from_params(kind: ActionKind, params: Vec<Param>) -> Option<Self> {
                let mut params = params.into_iter();
                let action = match kind {
                    $(
                        ActionKind::$variant => Self::$variant {
                            $($field: ParamValue::from_param(params.next()?)?,)*
                        },
                    )*
                };
                params.next().is_none().then_some(action)
            }
        }
    };
}

define_actions! {
    // ========================================================================
    // Legacy commands (1-byte tags, in tag order)
    // ========================================================================
    KeepAlive {},

    /// Replace the selection.
    Select { units: Vec<UnitHandle> },
    /// Add to the selection.
    ShiftSelect { units: Vec<UnitHandle> },
    Deselect { units: Vec<UnitHandle> },

    /// Place a building; `tile` is the footprint's top-left build tile.
    Build { order: OrderRef, tile: TilePos, unit_type: Option<UnitTypeRef> },

    SharedVision { mask: VisionMask },
    SetAlliances { table: AllianceTable },
    GameSpeed { speed: u8 },
    Pause {},
    Resume {},
    /// Legacy cheat word; unknown bits are rejected at execution.
    Cheat { flags: u32 },
    /// Subaction 0 = set, 1 = recall, 2 = add.
    ControlGroup { subaction: u8, group: u8 },

    /// Right-click: the order is chosen per unit by the world.
    DefaultOrder {
        position: Xy,
        target: Option<UnitHandle>,
        target_type: Option<UnitTypeRef>,
        queue: bool,
    },
    Order {
        position: Xy,
        target: Option<UnitHandle>,
        target_type: Option<UnitTypeRef>,
        order: OrderRef,
        queue: bool,
    },
    CancelBuildingUnit {},
    CancelMorph {},
    Stop { queue: bool },
    CarrierStop {},
    ReaverStop {},
    OrderNothing {},
    ReturnCargo { queue: bool },

    Train { unit_type: Option<UnitTypeRef> },
    /// Cancel one training queue entry.
    CancelTrain { slot: u16 },
    Cloak { queue: bool },
    Decloak { queue: bool },
    UnitMorph { unit_type: Option<UnitTypeRef> },
    Unsiege { queue: bool },
    Siege { queue: bool },
    TrainFighter {},
    UnloadAll { queue: bool },
    Unload { unit: Option<UnitHandle> },
    MergeArchon {},
    HoldPosition { queue: bool },
    Burrow { queue: bool },
    Unburrow { queue: bool },
    CancelNuke {},
    Lift { position: Xy },
    Research { tech: TechRef },
    CancelResearch {},
    Upgrade { upgrade: UpgradeRef },
    CancelUpgrade {},
    CancelAddon {},
    BuildingMorph { unit_type: Option<UnitTypeRef> },
    Stim {},

    LeaveGame { reason: u8 },
    MinimapPing { position: Xy },
    MergeDarkArchon {},
    Chat { text: String },

    // ========================================================================
    // Extended cheats (3-byte tags)
    // ========================================================================
    CheatUnitHp { unit: Option<UnitHandle>, value: i32 },
    CheatUnitShield { unit: Option<UnitHandle>, value: i32 },
    CheatUnitEnergy { unit: Option<UnitHandle>, value: i32 },
    CheatUpgrade { owner: Owner, upgrade: UpgradeRef, level: u8 },
    CheatTech { owner: Owner, tech: TechRef, researched: bool },
    CheatMinerals { owner: Owner, amount: i32 },
    CheatGas { owner: Owner, amount: i32 },
}

impl ActionKind {
    /// Whether this command is a cheat gated by the simulation's cheat switch.
    pub fn is_cheat(self) -> bool {
        matches!(
            self,
            Self::Cheat
                | Self::CheatUnitHp
                | Self::CheatUnitShield
                | Self::CheatUnitEnergy
                | Self::CheatUpgrade
                | Self::CheatTech
                | Self::CheatMinerals
                | Self::CheatGas
        )
    }
}
