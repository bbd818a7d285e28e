//! Encode/decode driver over catalogue entries.
//!
//! Decode reads the tag, then each wire parameter in order, resolving ids
//! against the world and rule tables as it goes. Any failure leaves the reader
//! where it started so the next candidate entry can be tried.

use tracing::debug;

use crate::codec::{Reader, WireValue, Writer};
use crate::env::TablesOracle;
use crate::state::{OrderRef, TechRef, UnitId, UnitTypeId, UnitTypeRef, UpgradeRef};
use crate::world::UnitLookup;

use super::catalogue::{ActionSpec, CATALOGUE, spec};
use super::error::{DecodeError, EncodeError};
use super::params::{Param, ParamType};
use super::Action;

/// Lookups used to resolve wire ids during decode.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub units: &'a dyn UnitLookup,
    pub tables: &'a dyn TablesOracle,
}

impl<'a> DecodeContext<'a> {
    pub fn new(units: &'a dyn UnitLookup, tables: &'a dyn TablesOracle) -> Self {
        Self { units, tables }
    }
}

impl ActionSpec {
    /// Decodes this entry at the reader's position.
    ///
    /// On failure the reader is restored to where it started.
    pub fn decode(
        &self,
        reader: &mut Reader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Action, DecodeError> {
        let start = reader.position();
        let result = self.decode_inner(reader, ctx);
        if result.is_err() {
            reader.restore(start);
        }
        result
    }

    fn decode_inner(
        &self,
        reader: &mut Reader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Action, DecodeError> {
        let kind = self.kind;
        if !self.tag.accept(reader) {
            return Err(DecodeError::TagMismatch { kind });
        }

        let mut params = Vec::with_capacity(self.wire.len());
        for (index, (&wire, &resolved)) in self.wire.iter().zip(self.resolved).enumerate() {
            let value = WireValue::get(reader, wire).ok_or(DecodeError::Truncated {
                kind,
                index,
                wire,
            })?;
            let param = if self.projects {
                resolve(value, resolved, ctx).ok_or(DecodeError::Unresolved { kind, index, wire })?
            } else {
                Param::Wire(value)
            };
            params.push(param);
        }

        Action::from_params(kind, params).ok_or(DecodeError::ShapeMismatch { kind })
    }

    /// Appends tag and parameters of `action`, which must be of this entry's kind.
    ///
    /// Nothing is written on failure.
    pub fn encode(
        &self,
        action: &Action,
        units: &dyn UnitLookup,
        writer: &mut Writer,
    ) -> Result<(), EncodeError> {
        let kind = self.kind;
        let params = action.to_params();
        if action.kind() != kind || params.len() != self.resolved.len() {
            return Err(EncodeError::ParamMismatch {
                kind,
                index: params.len().min(self.resolved.len()),
            });
        }

        let mut out = Writer::with_capacity(self.encoded_capacity());
        self.tag.put(&mut out);
        for (index, (param, (&wire, &resolved))) in params
            .into_iter()
            .zip(self.wire.iter().zip(self.resolved))
            .enumerate()
        {
            let value = if self.projects {
                project(param, resolved, units)
            } else {
                match param {
                    Param::Wire(value) => Some(value),
                    _ => None,
                }
            };
            let value = value
                .filter(|value| value.wire_type() == wire)
                .ok_or(EncodeError::ParamMismatch { kind, index })?;
            if let WireValue::UnitIdList(ids) = &value {
                if ids.len() > u8::MAX as usize {
                    return Err(EncodeError::ListTooLong {
                        kind,
                        len: ids.len(),
                    });
                }
            }
            value.put(&mut out);
        }

        writer.put_bytes(out.as_bytes());
        Ok(())
    }
}

/// Resolves one wire value into its resolved form.
///
/// Stale unit ids become null units or are dropped from lists; unknown table ids
/// fail.
fn resolve(value: WireValue, ty: ParamType, ctx: &DecodeContext<'_>) -> Option<Param> {
    Some(match (ty, value) {
        (ParamType::Wire(expected), value) if value.wire_type() == expected => Param::Wire(value),
        (ParamType::Unit, WireValue::UnitId(id)) => Param::Unit(ctx.units.unit_by_id(id)),
        (ParamType::Units, WireValue::UnitIdList(ids)) => Param::Units(
            ids.into_iter()
                .filter_map(|id| ctx.units.unit_by_id(id))
                .collect(),
        ),
        (ParamType::UnitType, WireValue::UnitTypeId(id)) if id == UnitTypeId::NONE => {
            Param::UnitType(None)
        }
        (ParamType::UnitType, WireValue::UnitTypeId(id)) => {
            Param::UnitType(Some(UnitTypeRef::resolve(ctx.tables, id)?))
        }
        (ParamType::Tech, WireValue::TechId(id)) => Param::Tech(TechRef::resolve(ctx.tables, id)?),
        (ParamType::Upgrade, WireValue::UpgradeId(id)) => {
            Param::Upgrade(UpgradeRef::resolve(ctx.tables, id)?)
        }
        (ParamType::Order, WireValue::OrderId(id)) => {
            Param::Order(OrderRef::resolve(ctx.tables, id)?)
        }
        _ => return None,
    })
}

/// Projects one resolved parameter back to wire form.
fn project(param: Param, ty: ParamType, units: &dyn UnitLookup) -> Option<WireValue> {
    Some(match (ty, param) {
        (ParamType::Wire(_), Param::Wire(value)) => value,
        (ParamType::Unit, Param::Unit(unit)) => {
            WireValue::UnitId(unit.map_or(UnitId::NONE, |unit| units.unit_id(unit)))
        }
        (ParamType::Units, Param::Units(list)) => {
            WireValue::UnitIdList(list.into_iter().map(|unit| units.unit_id(unit)).collect())
        }
        (ParamType::UnitType, Param::UnitType(unit_type)) => {
            WireValue::UnitTypeId(unit_type.map_or(UnitTypeId::NONE, UnitTypeRef::id))
        }
        (ParamType::Tech, Param::Tech(tech)) => WireValue::TechId(tech.id()),
        (ParamType::Upgrade, Param::Upgrade(upgrade)) => WireValue::UpgradeId(upgrade.id()),
        (ParamType::Order, Param::Order(order)) => WireValue::OrderId(order.id()),
        _ => return None,
    })
}

/// Decodes the next action by trying every catalogue entry in table order.
///
/// The first entry that both matches its tag and fully parses wins. When none
/// does, the reader is left at the record start and
/// [`DecodeError::UnknownAction`] is returned.
pub fn decode(reader: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<Action, DecodeError> {
    let position = reader.position();
    for entry in CATALOGUE.iter() {
        match entry.decode(reader, ctx) {
            Ok(action) => return Ok(action),
            Err(DecodeError::TagMismatch { .. }) => {}
            Err(error) => {
                debug!(
                    target: "lockstep::codec",
                    kind = %entry.kind,
                    position,
                    param = ?error.param_index(),
                    %error,
                    "candidate entry rejected"
                );
            }
        }
    }
    Err(DecodeError::UnknownAction {
        tag: reader.peek_u8(),
        position,
    })
}

/// Encodes `action` with its catalogue entry into a fresh buffer.
pub fn encode(action: &Action, units: &dyn UnitLookup) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new();
    encode_into(action, units, &mut writer)?;
    Ok(writer.into_bytes())
}

/// Appends `action` to `writer`.
pub fn encode_into(
    action: &Action,
    units: &dyn UnitLookup,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    spec(action.kind()).encode(action, units, writer)
}
