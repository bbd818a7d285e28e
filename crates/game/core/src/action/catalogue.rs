//! Static description of every command: tag, wire parameters, resolved
//! parameters.
//!
//! Entries are listed in [`ActionKind`] order so `CATALOGUE[kind as usize]` is
//! the entry for `kind`. Decode tries them in this order; the extended 3-byte
//! entries come last so a 1-byte match is always ruled out first.

use strum::EnumCount;

use crate::codec::{Reader, WireCodec, WireType, Writer};
use crate::config::CommandConfig;

use super::ActionKind;
use super::params::ParamType;

/// Identifying prefix of an encoded action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionTag {
    /// One byte in the legacy namespace.
    Legacy(u8),
    /// `(210, sub, sub2)` in the extended namespace.
    Extended { sub: u8, sub2: u8 },
}

impl ActionTag {
    pub const fn len(self) -> usize {
        match self {
            Self::Legacy(_) => 1,
            Self::Extended { .. } => 3,
        }
    }

    pub fn put(self, writer: &mut Writer) {
        match self {
            Self::Legacy(tag) => writer.put(&tag),
            Self::Extended { sub, sub2 } => {
                writer.put_bytes(&[CommandConfig::EXTENDED_TAG, sub, sub2]);
            }
        }
    }

    /// Consumes the tag if the next bytes match it.
    pub fn accept(self, reader: &mut Reader<'_>) -> bool {
        let start = reader.position();
        let matched = match self {
            Self::Legacy(tag) => reader.get::<u8>() == Some(tag),
            Self::Extended { sub, sub2 } => {
                reader.take(3) == Some(&[CommandConfig::EXTENDED_TAG, sub, sub2][..])
            }
        };
        if !matched {
            reader.restore(start);
        }
        matched
    }
}

/// One catalogue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub tag: ActionTag,
    /// Parameter types as serialized, in order.
    pub wire: &'static [WireType],
    /// Parameter types after resolution, positionally aligned with `wire`.
    pub resolved: &'static [ParamType],
    /// Whether any parameter needs id resolution/projection. When `false`,
    /// decode and encode pass wire values through untouched.
    pub projects: bool,
}

impl ActionSpec {
    /// Largest size of the encoded parameters, excluding the tag.
    pub const fn wire_capacity(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.wire.len() {
            total += self.wire[i].max_size();
            i += 1;
        }
        total
    }

    /// Largest size of the whole encoded action.
    pub const fn encoded_capacity(&self) -> usize {
        self.tag.len() + self.wire_capacity()
    }
}

/// Catalogue entry for `kind`.
pub fn spec(kind: ActionKind) -> &'static ActionSpec {
    &CATALOGUE[kind as usize]
}

// ============================================================================
// Entry builders
// ============================================================================

const fn same(
    kind: ActionKind,
    tag: ActionTag,
    wire: &'static [WireType],
    resolved: &'static [ParamType],
) -> ActionSpec {
    ActionSpec {
        kind,
        tag,
        wire,
        resolved,
        projects: false,
    }
}

const fn mapped(
    kind: ActionKind,
    tag: ActionTag,
    wire: &'static [WireType],
    resolved: &'static [ParamType],
) -> ActionSpec {
    ActionSpec {
        kind,
        tag,
        wire,
        resolved,
        projects: true,
    }
}

const fn bare(kind: ActionKind, tag: u8) -> ActionSpec {
    same(kind, ActionTag::Legacy(tag), &[], &[])
}

const fn queued(kind: ActionKind, tag: u8) -> ActionSpec {
    same(kind, ActionTag::Legacy(tag), W_QUEUE, P_QUEUE)
}

const fn legacy(tag: u8) -> ActionTag {
    ActionTag::Legacy(tag)
}

const fn extended(sub: u8, sub2: u8) -> ActionTag {
    ActionTag::Extended { sub, sub2 }
}

use ParamType::Wire as P;
use WireType as W;

const W_QUEUE: &[WireType] = &[W::Bool];
const P_QUEUE: &[ParamType] = &[P(W::Bool)];
const W_UNITS: &[WireType] = &[W::UnitIdList];
const P_UNITS: &[ParamType] = &[ParamType::Units];
const W_UNIT_TYPE: &[WireType] = &[W::UnitTypeId];
const P_UNIT_TYPE: &[ParamType] = &[ParamType::UnitType];
const W_XY: &[WireType] = &[W::Xy];
const P_XY: &[ParamType] = &[P(W::Xy)];
const W_UNIT_STAT: &[WireType] = &[W::UnitId, W::I32];
const P_UNIT_STAT: &[ParamType] = &[ParamType::Unit, P(W::I32)];
const W_RESOURCE: &[WireType] = &[W::U8, W::I32];
const P_RESOURCE: &[ParamType] = &[P(W::U8), P(W::I32)];

// ============================================================================
// Catalogue
// ============================================================================

pub static CATALOGUE: [ActionSpec; ActionKind::COUNT] = [
    bare(ActionKind::KeepAlive, 0x05),
    mapped(ActionKind::Select, legacy(0x09), W_UNITS, P_UNITS),
    mapped(ActionKind::ShiftSelect, legacy(0x0A), W_UNITS, P_UNITS),
    mapped(ActionKind::Deselect, legacy(0x0B), W_UNITS, P_UNITS),
    mapped(
        ActionKind::Build,
        legacy(0x0C),
        &[W::OrderId, W::TilePos, W::UnitTypeId],
        &[ParamType::Order, P(W::TilePos), ParamType::UnitType],
    ),
    same(ActionKind::SharedVision, legacy(0x0D), &[W::Vision], &[P(W::Vision)]),
    same(ActionKind::SetAlliances, legacy(0x0E), &[W::Alliances], &[P(W::Alliances)]),
    same(ActionKind::GameSpeed, legacy(0x0F), &[W::U8], &[P(W::U8)]),
    bare(ActionKind::Pause, 0x10),
    bare(ActionKind::Resume, 0x11),
    same(ActionKind::Cheat, legacy(0x12), &[W::U32], &[P(W::U32)]),
    same(
        ActionKind::ControlGroup,
        legacy(0x13),
        &[W::U8, W::U8],
        &[P(W::U8), P(W::U8)],
    ),
    mapped(
        ActionKind::DefaultOrder,
        legacy(0x14),
        &[W::Xy, W::UnitId, W::UnitTypeId, W::Bool],
        &[P(W::Xy), ParamType::Unit, ParamType::UnitType, P(W::Bool)],
    ),
    mapped(
        ActionKind::Order,
        legacy(0x15),
        &[W::Xy, W::UnitId, W::UnitTypeId, W::OrderId, W::Bool],
        &[
            P(W::Xy),
            ParamType::Unit,
            ParamType::UnitType,
            ParamType::Order,
            P(W::Bool),
        ],
    ),
    bare(ActionKind::CancelBuildingUnit, 0x18),
    bare(ActionKind::CancelMorph, 0x19),
    queued(ActionKind::Stop, 0x1A),
    bare(ActionKind::CarrierStop, 0x1B),
    bare(ActionKind::ReaverStop, 0x1C),
    bare(ActionKind::OrderNothing, 0x1D),
    queued(ActionKind::ReturnCargo, 0x1E),
    mapped(ActionKind::Train, legacy(0x1F), W_UNIT_TYPE, P_UNIT_TYPE),
    same(ActionKind::CancelTrain, legacy(0x20), &[W::U16], &[P(W::U16)]),
    queued(ActionKind::Cloak, 0x21),
    queued(ActionKind::Decloak, 0x22),
    mapped(ActionKind::UnitMorph, legacy(0x23), W_UNIT_TYPE, P_UNIT_TYPE),
    queued(ActionKind::Unsiege, 0x25),
    queued(ActionKind::Siege, 0x26),
    bare(ActionKind::TrainFighter, 0x27),
    queued(ActionKind::UnloadAll, 0x28),
    mapped(ActionKind::Unload, legacy(0x29), &[W::UnitId], &[ParamType::Unit]),
    bare(ActionKind::MergeArchon, 0x2A),
    queued(ActionKind::HoldPosition, 0x2B),
    queued(ActionKind::Burrow, 0x2C),
    queued(ActionKind::Unburrow, 0x2D),
    bare(ActionKind::CancelNuke, 0x2E),
    same(ActionKind::Lift, legacy(0x2F), W_XY, P_XY),
    mapped(ActionKind::Research, legacy(0x30), &[W::TechId], &[ParamType::Tech]),
    bare(ActionKind::CancelResearch, 0x31),
    mapped(ActionKind::Upgrade, legacy(0x32), &[W::UpgradeId], &[ParamType::Upgrade]),
    bare(ActionKind::CancelUpgrade, 0x33),
    bare(ActionKind::CancelAddon, 0x34),
    mapped(ActionKind::BuildingMorph, legacy(0x35), W_UNIT_TYPE, P_UNIT_TYPE),
    bare(ActionKind::Stim, 0x36),
    same(ActionKind::LeaveGame, legacy(0x57), &[W::U8], &[P(W::U8)]),
    same(ActionKind::MinimapPing, legacy(0x58), W_XY, P_XY),
    bare(ActionKind::MergeDarkArchon, 0x5A),
    same(ActionKind::Chat, legacy(0x5C), &[W::Text], &[P(W::Text)]),
    mapped(ActionKind::CheatUnitHp, extended(0, 0), W_UNIT_STAT, P_UNIT_STAT),
    mapped(ActionKind::CheatUnitShield, extended(0, 1), W_UNIT_STAT, P_UNIT_STAT),
    mapped(ActionKind::CheatUnitEnergy, extended(0, 2), W_UNIT_STAT, P_UNIT_STAT),
    mapped(
        ActionKind::CheatUpgrade,
        extended(1, 0),
        &[W::U8, W::UpgradeId, W::U8],
        &[P(W::U8), ParamType::Upgrade, P(W::U8)],
    ),
    mapped(
        ActionKind::CheatTech,
        extended(1, 1),
        &[W::U8, W::TechId, W::Bool],
        &[P(W::U8), ParamType::Tech, P(W::Bool)],
    ),
    same(ActionKind::CheatMinerals, extended(1, 2), W_RESOURCE, P_RESOURCE),
    same(ActionKind::CheatGas, extended(1, 3), W_RESOURCE, P_RESOURCE),
];
