//! Order handlers: targeted and right-click orders, the fixed-order commands,
//! archon merging and building placement.

use crate::action::ActionKind;
use crate::env::{
    GameEnv, OracleError, OrderFlags, OrderTypeDef, TablesOracle, UnitTypeDef, UnitTypeFlags,
};
use crate::state::{OrderId, OrderRef, Owner, Rect, TechRef, TilePos, UnitHandle, UnitTypeRef, Xy};
use crate::world::{OrderTarget, UnitView, World};

use super::errors::{Handled, Rejection};
use super::formation::{GroupMove, Member};
use super::ActionEngine;

/// Half-size (px) of the square searched for a unit under a typed click.
const CLICK_SEARCH_RADIUS: i32 = 96;

/// One order issued to every eligible selected unit.
#[derive(Clone, Copy, Debug)]
struct Batch {
    order: OrderRef,
    /// `None` targets each unit's own position.
    target: Option<OrderTarget>,
    queue: bool,
    /// Unit type flags a unit must carry to take part.
    requires: UnitTypeFlags,
}

impl Batch {
    fn new(order: OrderRef) -> Self {
        Self {
            order,
            target: None,
            queue: false,
            requires: UnitTypeFlags::empty(),
        }
    }
}

/// Point-order target state shared across one command's units.
struct GroupTargets<'e, 'a> {
    env: &'e GameEnv<'a>,
    click: Xy,
    obstructable: bool,
    plan: Option<GroupMove>,
}

impl<W: World> ActionEngine<'_, W> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn order(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        order: OrderRef,
        position: Xy,
        mut target: Option<UnitHandle>,
        target_type: Option<UnitTypeRef>,
        queue: bool,
    ) -> Handled {
        let tables = env.tables()?;
        if !env.path()?.in_bounds(position) {
            return Err(Rejection::OutOfRange.into());
        }
        if order.id().is_internal() {
            return Err(Rejection::InternalOrder.into());
        }
        let def = tables
            .order(order.id())
            .ok_or(Rejection::MissingTableEntry)?;
        let selected = self.selected_units(owner);
        if selected.is_empty() {
            return Err(Rejection::NoSelection.into());
        }

        let mut group = GroupTargets {
            env,
            click: position,
            obstructable: def.flags.contains(OrderFlags::OBSTRUCTABLE),
            plan: None,
        };
        let mut acted = false;
        for unit in selected {
            let Some((view, unit_def)) = self.typed_unit(tables, unit) else {
                continue;
            };
            if !self.receives(tables, owner, unit, &view, order, &def)
                || (target == Some(unit) && !def.flags.contains(OrderFlags::TARGETS_SELF))
                || view.order.is_some_and(|o| o.id() == OrderId::NUKE_LAUNCH)
            {
                continue;
            }
            if self.world.default_order(unit, None).is_none()
                && !accepted_without_default_action(order.id())
            {
                continue;
            }

            let mut order = order;
            if unit_def.flags.contains(UnitTypeFlags::MEDIC)
                && matches!(order.id(), OrderId::ATTACK_MOVE | OrderId::ATTACK_DEFAULT)
            {
                order = resolve_order(tables, OrderId::HEAL_MOVE)?;
            }
            let paired = if order.id() == OrderId::ATTACK_DEFAULT {
                let Some(attack) = attack_order(tables, &unit_def, target.is_some()) else {
                    continue;
                };
                order = attack;
                view.subunit.and_then(|subunit| {
                    let (_, subunit_def) = self.typed_unit(tables, subunit)?;
                    attack_order(tables, &subunit_def, target.is_some()).map(|o| (subunit, o))
                })
            } else {
                table_paired_order(tables, &view, order)
            };

            match order.id() {
                OrderId::RALLY_POINT_UNIT => {
                    if unit_def.flags.contains(UnitTypeFlags::FACTORY) {
                        let rally = *target.get_or_insert(unit);
                        self.rally_on_unit(unit, rally, position);
                        acted = true;
                    }
                }
                OrderId::RALLY_POINT_TILE => {
                    if unit_def.flags.contains(UnitTypeFlags::FACTORY) {
                        self.world.set_rally_point(unit, None, position);
                        acted = true;
                    }
                }
                _ => {
                    let order_target = match target {
                        Some(target) => OrderTarget {
                            position,
                            unit: Some(target),
                            unit_type: None,
                        },
                        None => OrderTarget {
                            position: match target_type {
                                Some(_) => position,
                                None => self.group_target(&mut group, owner, unit, &view)?,
                            },
                            unit: None,
                            unit_type: target_type,
                        },
                    };
                    acted |= self.issue_with_subunit(tables, unit, order, paired, order_target, queue);
                }
            }
        }

        if acted {
            Ok(())
        } else {
            Err(Rejection::NoEligibleUnit.into())
        }
    }

    /// Right-click: each selected unit takes whatever order the world resolves
    /// the click to.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn default_order(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        position: Xy,
        mut target: Option<UnitHandle>,
        mut target_type: Option<UnitTypeRef>,
        queue: bool,
    ) -> Handled {
        let tables = env.tables()?;
        if !env.path()?.in_bounds(position) {
            return Err(Rejection::OutOfRange.into());
        }
        if target.is_some() {
            target_type = None;
        } else if let Some(wanted) = target_type {
            if self.world.position_visible(owner, position) {
                target = self.unit_under_click(tables, wanted, position);
                target_type = None;
            }
        }
        let selected = self.selected_units(owner);
        if selected.is_empty() {
            return Err(Rejection::NoSelection.into());
        }

        let mut group = GroupTargets {
            env,
            click: position,
            obstructable: true,
            plan: None,
        };
        let mut acted = false;
        for unit in selected {
            let Some((view, unit_def)) = self.typed_unit(tables, unit) else {
                continue;
            };
            let Some(mut order) = self.world.default_order(unit, target) else {
                continue;
            };
            let is_factory = unit_def.flags.contains(UnitTypeFlags::FACTORY);
            match order.id() {
                OrderId::RALLY_POINT_UNIT => {
                    if is_factory {
                        let rally = *target.get_or_insert(unit);
                        self.rally_on_unit(unit, rally, position);
                        acted = true;
                    }
                }
                _ if target == Some(unit) => {}
                OrderId::RALLY_POINT_TILE => {
                    if is_factory {
                        self.world.set_rally_point(unit, None, position);
                        acted = true;
                    }
                }
                _ => {
                    if order.id() == OrderId::ATTACK_DEFAULT {
                        if let Some(subunit) = view.subunit {
                            let subunit_attack = self
                                .typed_unit(tables, subunit)
                                .and_then(|(_, def)| attack_order(tables, &def, true));
                            if let Some(subunit_attack) = subunit_attack {
                                let subunit_target = OrderTarget {
                                    position,
                                    unit: target,
                                    unit_type: None,
                                };
                                self.world
                                    .issue_order(subunit, subunit_attack, subunit_target, queue);
                            }
                        }
                        let Some(attack) = attack_order(tables, &unit_def, true) else {
                            continue;
                        };
                        order = attack;
                    }
                    let Some(def) = tables.order(order.id()) else {
                        continue;
                    };
                    if !self.receives(tables, owner, unit, &view, order, &def) {
                        continue;
                    }
                    let order_target = match target {
                        Some(target) => OrderTarget {
                            position,
                            unit: Some(target),
                            unit_type: None,
                        },
                        None => OrderTarget {
                            position: match target_type {
                                Some(_) => position,
                                None => self.group_target(&mut group, owner, unit, &view)?,
                            },
                            unit: None,
                            unit_type: target_type,
                        },
                    };
                    acted |= self.issue_with_subunit(tables, unit, order, None, order_target, queue);
                }
            }
        }

        if acted {
            Ok(())
        } else {
            Err(Rejection::NoEligibleUnit.into())
        }
    }

    /// Commands that map to one fixed order type with no target.
    pub(super) fn simple_order(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        kind: ActionKind,
        queue: bool,
    ) -> Handled {
        let (id, requires) = fixed_order(kind).ok_or(Rejection::MissingTableEntry)?;
        let order = resolve_order(env.tables()?, id)?;
        self.issue_batch(
            env,
            owner,
            Batch {
                queue,
                requires,
                ..Batch::new(order)
            },
        )
    }

    pub(super) fn unload(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        unit: Option<UnitHandle>,
    ) -> Handled {
        let unit = unit.ok_or(Rejection::NoTarget)?;
        let position = self.world.unit(unit).ok_or(Rejection::NoTarget)?.position;
        let order = resolve_order(env.tables()?, OrderId::UNLOAD)?;
        self.issue_batch(
            env,
            owner,
            Batch {
                target: Some(OrderTarget {
                    position,
                    unit: Some(unit),
                    unit_type: None,
                }),
                ..Batch::new(order)
            },
        )
    }

    /// Lifts the single selected building off toward `position`.
    pub(super) fn lift(&mut self, env: &GameEnv<'_>, owner: Owner, position: Xy) -> Handled {
        let tables = env.tables()?;
        if !env.path()?.in_bounds(position) {
            return Err(Rejection::OutOfRange.into());
        }
        let (unit, view, def) = self.single_selected_unit(tables, owner)?;
        if !def.is_building() {
            return Err(Rejection::WrongUnitType.into());
        }
        if !view.is_idle_producer() {
            return Err(Rejection::Busy.into());
        }
        let order = resolve_order(tables, OrderId::LIFTOFF)?;
        if !self.world.can_receive_order(unit, order) {
            return Err(Rejection::NoEligibleUnit.into());
        }
        if !self
            .world
            .issue_order(unit, order, OrderTarget::position(position), false)
        {
            return Err(Rejection::WorldRefused.into());
        }
        Ok(())
    }

    /// Pairs selected templars by proximity and orders each pair to merge.
    ///
    /// Each templar in turn takes the nearest later one still unpaired. The
    /// scan writes the previously nearest candidate into the slot of every
    /// closer one it finds, which is what decides later pairings.
    pub(super) fn merge_archon(&mut self, env: &GameEnv<'_>, owner: Owner, dark: bool) -> Handled {
        let tables = env.tables()?;
        let (order_id, templar) = if dark {
            (OrderId::DARK_ARCHON_MELD, UnitTypeFlags::DARK_TEMPLAR)
        } else {
            (OrderId::ARCHON_WARP, UnitTypeFlags::HIGH_TEMPLAR)
        };
        let order = resolve_order(tables, order_id)?;
        let def = tables.order(order_id).ok_or(Rejection::MissingTableEntry)?;

        let selected = self.selected_units(owner);
        let first = *selected.first().ok_or(Rejection::NoSelection)?;
        let (view, _) = self
            .typed_unit(tables, first)
            .ok_or(Rejection::NoEligibleUnit)?;
        if !self.receives(tables, owner, first, &view, order, &def) {
            return Err(Rejection::NoEligibleUnit.into());
        }

        let mut templars: Vec<Option<(UnitHandle, Xy)>> = selected
            .iter()
            .filter_map(|&unit| {
                let (view, def) = self.typed_unit(tables, unit)?;
                def.flags
                    .contains(templar)
                    .then_some(Some((unit, view.position)))
            })
            .collect();
        if templars.len() < 2 {
            return Err(Rejection::NoEligibleUnit.into());
        }

        let mut merged = false;
        for index in 0..templars.len() {
            let Some((unit, position)) = templars[index] else {
                continue;
            };
            let mut nearest: Option<(UnitHandle, Xy)> = None;
            let mut nearest_distance = i64::MAX;
            for slot in index + 1..templars.len() {
                let Some((_, other)) = templars[slot] else {
                    continue;
                };
                let distance = position.distance_squared(other);
                if distance < nearest_distance {
                    let closer = templars[slot];
                    templars[slot] = nearest;
                    nearest_distance = distance;
                    nearest = closer;
                }
            }
            let Some((partner, partner_position)) = nearest else {
                continue;
            };
            let to_partner = OrderTarget {
                position: partner_position,
                unit: Some(partner),
                unit_type: None,
            };
            let to_unit = OrderTarget {
                position,
                unit: Some(unit),
                unit_type: None,
            };
            self.world.issue_order(unit, order, to_partner, false);
            self.world.issue_order(partner, order, to_unit, false);
            merged = true;
        }

        if merged {
            Ok(())
        } else {
            Err(Rejection::NoEligibleUnit.into())
        }
    }

    /// Places a building with the single selected unit.
    ///
    /// Affordability is checked here; the world debits the cost when
    /// construction actually starts.
    pub(super) fn build(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        order: OrderRef,
        tile: TilePos,
        unit_type: Option<UnitTypeRef>,
    ) -> Handled {
        let tables = env.tables()?;
        let unit_type = unit_type.ok_or(Rejection::NoTarget)?;
        let (builder, view, _) = self.single_selected_unit(tables, owner)?;
        let order_def = tables
            .order(order.id())
            .ok_or(Rejection::MissingTableEntry)?;
        if !order_def.flags.contains(OrderFlags::BUILD) {
            return Err(Rejection::NotBuildOrder.into());
        }
        let building = tables
            .unit_type(unit_type.id())
            .ok_or(Rejection::MissingTableEntry)?;
        if building.builder.is_some_and(|b| b != view.unit_type)
            || !self.world.can_receive_order(builder, order)
        {
            return Err(Rejection::NoEligibleUnit.into());
        }

        if !self.world.resources(owner).can_afford(building.cost) {
            return Err(Rejection::InsufficientResources.into());
        }

        let size = building.placement_size();
        let origin = tile.to_xy();
        let target = OrderTarget {
            position: Xy::new(origin.x + size.x / 2, origin.y + size.y / 2),
            unit: None,
            unit_type: Some(unit_type),
        };
        if !self.world.issue_order(builder, order, target, false) {
            return Err(Rejection::WorldRefused.into());
        }
        Ok(())
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Ownership, visibility, world eligibility and tech.
    fn receives(
        &self,
        tables: &dyn TablesOracle,
        owner: Owner,
        unit: UnitHandle,
        view: &UnitView,
        order: OrderRef,
        def: &OrderTypeDef,
    ) -> bool {
        if view.owner != owner || view.is_hidden() || !self.world.can_receive_order(unit, order)
        {
            return false;
        }
        def.required_tech.is_none_or(|tech| {
            TechRef::resolve(tables, tech).is_some_and(|tech| self.world.has_tech(owner, tech))
        })
    }

    /// First unit of the clicked type whose footprint covers the click.
    fn unit_under_click(
        &self,
        tables: &dyn TablesOracle,
        wanted: UnitTypeRef,
        click: Xy,
    ) -> Option<UnitHandle> {
        let size = tables.unit_type(wanted.id())?.placement_size();
        self.world
            .units_in(Rect::around(click, CLICK_SEARCH_RADIUS))
            .into_iter()
            .find(|&unit| {
                self.world.unit(unit).is_some_and(|view| {
                    view.unit_type == wanted.id()
                        && covers(view.position.x, size.x, click.x)
                        && covers(view.position.y, size.y, click.y)
                })
            })
    }

    fn rally_on_unit(&mut self, factory: UnitHandle, rally: UnitHandle, fallback: Xy) {
        let position = self.world.unit(rally).map_or(fallback, |view| view.position);
        self.world.set_rally_point(factory, Some(rally), position);
    }

    /// Group-move target of one unit; the move is planned over the whole
    /// selection on first use.
    fn group_target(
        &self,
        group: &mut GroupTargets<'_, '_>,
        owner: Owner,
        unit: UnitHandle,
        view: &UnitView,
    ) -> Result<Xy, OracleError> {
        let path = group.env.path()?;
        let rules = group.env.config()?.formation();
        let plan = match group.plan {
            Some(plan) => plan,
            None => {
                let members: Vec<Member> = self
                    .selected_units(owner)
                    .into_iter()
                    .filter_map(|unit| self.world.unit(unit).map(|view| member(unit, &view)))
                    .collect();
                *group.plan.insert(GroupMove::plan(
                    path,
                    &rules,
                    &members,
                    group.click,
                    group.obstructable,
                ))
            }
        };
        Ok(plan.target_for(path, &rules, &member(unit, view)))
    }

    fn issue_with_subunit(
        &mut self,
        tables: &dyn TablesOracle,
        unit: UnitHandle,
        order: OrderRef,
        paired: Option<(UnitHandle, OrderRef)>,
        target: OrderTarget,
        queue: bool,
    ) -> bool {
        let queue = queue
            && tables
                .order(order.id())
                .is_some_and(|def| def.flags.contains(OrderFlags::QUEUEABLE));
        if !self.world.issue_order(unit, order, target, queue) {
            return false;
        }
        if let Some((subunit, order)) = paired {
            self.world.issue_order(subunit, order, target, queue);
        }
        true
    }

    fn issue_batch(&mut self, env: &GameEnv<'_>, owner: Owner, batch: Batch) -> Handled {
        let tables = env.tables()?;
        let def = tables
            .order(batch.order.id())
            .ok_or(Rejection::MissingTableEntry)?;
        let selected = self.selected_units(owner);
        if selected.is_empty() {
            return Err(Rejection::NoSelection.into());
        }

        let mut eligible = false;
        let mut issued = false;
        for unit in selected {
            let Some((view, unit_def)) = self.typed_unit(tables, unit) else {
                continue;
            };
            if !unit_def.flags.contains(batch.requires)
                || !self.receives(tables, owner, unit, &view, batch.order, &def)
            {
                continue;
            }
            eligible = true;
            let target = batch
                .target
                .unwrap_or(OrderTarget::position(view.position));
            let paired = table_paired_order(tables, &view, batch.order);
            issued |= self.issue_with_subunit(tables, unit, batch.order, paired, target, batch.queue);
        }

        match (eligible, issued) {
            (false, _) => Err(Rejection::NoEligibleUnit.into()),
            (true, false) => Err(Rejection::WorldRefused.into()),
            (true, true) => Ok(()),
        }
    }
}

fn member(unit: UnitHandle, view: &UnitView) -> Member {
    Member {
        unit,
        position: view.position,
        collides: view.has_collision(),
    }
}

/// Unsigned footprint test: the click lies within `size` px centred on `center`.
fn covers(center: i32, size: i32, click: i32) -> bool {
    (0..size).contains(&(center + size / 2 - click))
}

fn resolve_order(tables: &dyn TablesOracle, id: OrderId) -> Result<OrderRef, Rejection> {
    OrderRef::resolve(tables, id).ok_or(Rejection::MissingTableEntry)
}

/// Order a generic attack resolves to for a unit type; `None` when it cannot attack.
fn attack_order(tables: &dyn TablesOracle, def: &UnitTypeDef, has_target: bool) -> Option<OrderRef> {
    let id = if has_target {
        def.attack_unit
    } else {
        def.attack_move
    }?;
    if id == OrderId::NOTHING {
        return None;
    }
    OrderRef::resolve(tables, id)
}

/// Subunit order an order type carries in the tables.
fn table_paired_order(
    tables: &dyn TablesOracle,
    view: &UnitView,
    order: OrderRef,
) -> Option<(UnitHandle, OrderRef)> {
    let subunit = view.subunit?;
    let id = tables.order(order.id())?.subunit_order?;
    OrderRef::resolve(tables, id).map(|order| (subunit, order))
}

/// Orders a unit with no right-click action may still take.
fn accepted_without_default_action(id: OrderId) -> bool {
    matches!(
        id,
        OrderId::RALLY_POINT_UNIT
            | OrderId::RALLY_POINT_TILE
            | OrderId::RECHARGE_SHIELDS_BATTERY
            | OrderId::PICKUP_BUNKER
    )
}

/// Order type and unit type filter of each fixed-order command.
fn fixed_order(kind: ActionKind) -> Option<(OrderId, UnitTypeFlags)> {
    let any = UnitTypeFlags::empty();
    let order = match kind {
        ActionKind::Stop => (OrderId::STOP, any),
        ActionKind::CarrierStop => (OrderId::CARRIER_STOP, UnitTypeFlags::CARRIER),
        ActionKind::ReaverStop => (OrderId::REAVER_STOP, UnitTypeFlags::REAVER),
        ActionKind::OrderNothing => (OrderId::NOTHING, any),
        ActionKind::ReturnCargo => (OrderId::RETURN_CARGO, UnitTypeFlags::WORKER),
        ActionKind::Cloak => (OrderId::CLOAK, any),
        ActionKind::Decloak => (OrderId::DECLOAK, any),
        ActionKind::Unsiege => (OrderId::UNSIEGE, any),
        ActionKind::Siege => (OrderId::SIEGE, any),
        ActionKind::UnloadAll => (OrderId::UNLOAD_ALL, any),
        ActionKind::HoldPosition => (OrderId::HOLD_POSITION, any),
        ActionKind::Burrow => (OrderId::BURROW, any),
        ActionKind::Unburrow => (OrderId::UNBURROW, any),
        ActionKind::Stim => (OrderId::STIM, any),
        _ => return None,
    };
    Some(order)
}
