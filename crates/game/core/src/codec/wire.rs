use crate::config::CommandConfig;
use crate::state::{
    AllianceTable, OrderId, TechId, TilePos, UnitId, UnitTypeId, UpgradeId, VisionMask, Xy,
};

use super::{MAX_UNIT_LIST_SIZE, Reader, WireCodec, Writer};

/// Semantic type of one serialized action parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum WireType {
    U8,
    U16,
    U32,
    I32,
    Bool,
    Xy,
    TilePos,
    UnitId,
    UnitIdList,
    UnitTypeId,
    TechId,
    UpgradeId,
    OrderId,
    Alliances,
    Vision,
    Text,
}

impl WireType {
    /// Largest encoded size in bytes.
    pub const fn max_size(self) -> usize {
        match self {
            Self::U8 | Self::Bool => u8::SIZE,
            Self::U16 => u16::SIZE,
            Self::U32 | Self::Alliances => u32::SIZE,
            Self::I32 => i32::SIZE,
            Self::Xy => Xy::SIZE,
            Self::TilePos => <TilePos as WireCodec>::SIZE,
            Self::UnitId => UnitId::SIZE,
            Self::UnitIdList => MAX_UNIT_LIST_SIZE,
            Self::UnitTypeId => UnitTypeId::SIZE,
            Self::TechId => TechId::SIZE,
            Self::UpgradeId => UpgradeId::SIZE,
            Self::OrderId => OrderId::SIZE,
            Self::Vision => VisionMask::SIZE,
            Self::Text => CommandConfig::TEXT_LEN,
        }
    }
}

/// One parameter in wire form: raw numbers and ids, nothing resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I32(i32),
    Bool(bool),
    Xy(Xy),
    TilePos(TilePos),
    UnitId(UnitId),
    UnitIdList(Vec<UnitId>),
    UnitTypeId(UnitTypeId),
    TechId(TechId),
    UpgradeId(UpgradeId),
    OrderId(OrderId),
    Alliances(AllianceTable),
    Vision(VisionMask),
    Text(String),
}

impl WireValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::U8(_) => WireType::U8,
            Self::U16(_) => WireType::U16,
            Self::U32(_) => WireType::U32,
            Self::I32(_) => WireType::I32,
            Self::Bool(_) => WireType::Bool,
            Self::Xy(_) => WireType::Xy,
            Self::TilePos(_) => WireType::TilePos,
            Self::UnitId(_) => WireType::UnitId,
            Self::UnitIdList(_) => WireType::UnitIdList,
            Self::UnitTypeId(_) => WireType::UnitTypeId,
            Self::TechId(_) => WireType::TechId,
            Self::UpgradeId(_) => WireType::UpgradeId,
            Self::OrderId(_) => WireType::OrderId,
            Self::Alliances(_) => WireType::Alliances,
            Self::Vision(_) => WireType::Vision,
            Self::Text(_) => WireType::Text,
        }
    }

    /// Appends the wire representation.
    pub fn put(&self, writer: &mut Writer) {
        match self {
            Self::U8(v) => v.put(writer),
            Self::U16(v) => v.put(writer),
            Self::U32(v) => v.put(writer),
            Self::I32(v) => v.put(writer),
            Self::Bool(v) => v.put(writer),
            Self::Xy(v) => v.put(writer),
            Self::TilePos(v) => v.put(writer),
            Self::UnitId(v) => v.put(writer),
            Self::UnitIdList(ids) => super::put_unit_list(writer, ids),
            Self::UnitTypeId(v) => v.put(writer),
            Self::TechId(v) => v.put(writer),
            Self::UpgradeId(v) => v.put(writer),
            Self::OrderId(v) => v.put(writer),
            Self::Alliances(v) => v.put(writer),
            Self::Vision(v) => v.put(writer),
            Self::Text(text) => super::put_text(writer, text),
        }
    }

    /// Consumes one value of type `ty`, or `None` on a short read.
    pub fn get(reader: &mut Reader<'_>, ty: WireType) -> Option<Self> {
        Some(match ty {
            WireType::U8 => Self::U8(reader.get()?),
            WireType::U16 => Self::U16(reader.get()?),
            WireType::U32 => Self::U32(reader.get()?),
            WireType::I32 => Self::I32(reader.get()?),
            WireType::Bool => Self::Bool(reader.get()?),
            WireType::Xy => Self::Xy(reader.get()?),
            WireType::TilePos => Self::TilePos(reader.get()?),
            WireType::UnitId => Self::UnitId(reader.get()?),
            WireType::UnitIdList => Self::UnitIdList(super::get_unit_list(reader)?),
            WireType::UnitTypeId => Self::UnitTypeId(reader.get()?),
            WireType::TechId => Self::TechId(reader.get()?),
            WireType::UpgradeId => Self::UpgradeId(reader.get()?),
            WireType::OrderId => Self::OrderId(reader.get()?),
            WireType::Alliances => Self::Alliances(reader.get()?),
            WireType::Vision => Self::Vision(reader.get()?),
            WireType::Text => Self::Text(super::get_text(reader)?),
        })
    }
}
