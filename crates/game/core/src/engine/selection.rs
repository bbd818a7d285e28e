//! Selection and control group handlers.

use crate::action::ActionKind;
use crate::config::CommandConfig;
use crate::env::{GameEnv, TablesOracle, UnitTypeFlags};
use crate::state::{ControlGroup, Owner, Selection, UnitHandle};
use crate::world::{UnitStatus, World};

use super::errors::{ExecuteError, Failure, Handled, Rejection};
use super::ActionEngine;

const SET: u8 = 0;
const RECALL: u8 = 1;
const ADD: u8 = 2;

impl<W: World> ActionEngine<'_, W> {
    // ========================================================================
    // Eligibility
    // ========================================================================

    /// Can share a selection or group with other units.
    pub(super) fn groupable(&self, tables: &dyn TablesOracle, unit: UnitHandle) -> bool {
        self.typed_unit(tables, unit).is_some_and(|(view, def)| {
            def.flags.contains(UnitTypeFlags::MULTI_SELECTABLE)
                && !view.status.contains(UnitStatus::DISABLED)
        })
    }

    fn groupable_for(&self, tables: &dyn TablesOracle, owner: Owner, unit: UnitHandle) -> bool {
        self.world.unit(unit).is_some_and(|view| view.owner == owner)
            && self.groupable(tables, unit)
    }

    /// Live members of the selection, in selection order.
    pub(super) fn selected_units(&self, owner: Owner) -> Vec<UnitHandle> {
        self.state
            .selection(owner)
            .iter()
            .copied()
            .filter(|&unit| self.world.unit(unit).is_some())
            .collect()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Appends the acceptable units of `units` to the selection.
    ///
    /// While every slot is free the first unit is taken regardless of group
    /// rules; after that only units `owner` may group are taken. Accepting a
    /// unit with no slot left is fatal.
    fn select_units(
        &mut self,
        tables: &dyn TablesOracle,
        owner: Owner,
        kind: ActionKind,
        units: &[UnitHandle],
        mut available: usize,
    ) -> Result<bool, Failure> {
        let mut accepted = false;
        for &unit in units {
            let Some((view, def)) = self.typed_unit(tables, unit) else {
                continue;
            };
            if def.flags.contains(UnitTypeFlags::NUCLEAR_MISSILE)
                || self.state.selection(owner).contains(&unit)
                || view.is_hidden()
            {
                continue;
            }
            if available != CommandConfig::MAX_SELECTION
                && !self.groupable_for(tables, owner, unit)
            {
                continue;
            }
            if available == 0 {
                return Err(ExecuteError::SelectionOverflow {
                    owner,
                    kind,
                    len: CommandConfig::MAX_SELECTION + 1,
                }
                .into());
            }
            self.selection_mut(owner)?.push(unit);
            available -= 1;
            accepted = true;
        }
        Ok(accepted)
    }

    /// Replaces the selection. The old selection is dropped even when no
    /// unit is accepted.
    pub(super) fn select(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        kind: ActionKind,
        units: &[UnitHandle],
    ) -> Handled {
        let tables = env.tables()?;
        self.selection_mut(owner)?.clear();
        if self.select_units(tables, owner, kind, units, CommandConfig::MAX_SELECTION)? {
            Ok(())
        } else {
            Err(Rejection::NoEligibleUnit.into())
        }
    }

    pub(super) fn shift_select(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        kind: ActionKind,
        units: &[UnitHandle],
    ) -> Handled {
        let tables = env.tables()?;
        let current = self.selected_units(owner);
        // A lone unit that cannot share a selection blocks every addition.
        if let [lone] = current.as_slice() {
            if !self.groupable(tables, *lone) {
                return Err(Rejection::NoEligibleUnit.into());
            }
        }

        let available = CommandConfig::MAX_SELECTION - current.len();
        if self.select_units(tables, owner, kind, units, available)? {
            Ok(())
        } else {
            Err(Rejection::Unchanged.into())
        }
    }

    pub(super) fn deselect(&mut self, owner: Owner, units: &[UnitHandle]) -> Handled {
        let selection = self.selection_mut(owner)?;
        let mut removed = false;
        for unit in units {
            if let Some(at) = selection.iter().position(|selected| selected == unit) {
                selection.remove(at);
                removed = true;
            }
        }
        if removed {
            Ok(())
        } else {
            Err(Rejection::Unchanged.into())
        }
    }

    // ========================================================================
    // Control groups
    // ========================================================================

    pub(super) fn control_group(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        subaction: u8,
        group: u8,
    ) -> Handled {
        let index = group as usize;
        if index >= CommandConfig::CONTROL_GROUPS {
            return Err(Rejection::OutOfRange.into());
        }
        match subaction {
            SET => self.set_group(owner, index),
            RECALL => self.recall_group(env, owner, index),
            ADD => self.add_to_group(env, owner, index),
            _ => Err(ExecuteError::ControlGroupSubaction { owner, subaction }.into()),
        }
    }

    /// Clears the group, then stores the selection up to its first unit not
    /// owned by `owner`.
    fn set_group(&mut self, owner: Owner, index: usize) -> Handled {
        let selected = self.selected_units(owner);
        self.group_mut(owner, index)?.clear();

        let mut stored = false;
        for unit in selected {
            if !self.world.unit(unit).is_some_and(|view| view.owner == owner) {
                break;
            }
            let id = self.world.unit_id(unit);
            self.group_mut(owner, index)?
                .try_push(id)
                .map_err(|_| ExecuteError::ControlGroupOverflow {
                    owner,
                    group: index as u8,
                })?;
            stored = true;
        }
        if stored {
            Ok(())
        } else {
            Err(Rejection::NoSelection.into())
        }
    }

    /// Restores the selection from a group.
    ///
    /// A member that is gone, hidden, no longer owned or cannot share a
    /// selection is swapped with the last member and dropped; the swapped-in
    /// member is checked in its place.
    fn recall_group(&mut self, env: &GameEnv<'_>, owner: Owner, index: usize) -> Handled {
        let tables = env.tables()?;
        let mut group: ControlGroup = self.state.control_group(owner, index).iter().copied().collect();
        if group.is_empty() {
            return Err(Rejection::NoEligibleUnit.into());
        }

        let mut recalled = Selection::new();
        let mut i = 0;
        while i < group.len() {
            let alone = group.len() == 1;
            let unit = self.world.unit_by_id(group[i]).filter(|&unit| {
                self.world
                    .unit(unit)
                    .is_some_and(|view| !view.is_hidden() && view.owner == owner)
                    && (alone || self.groupable(tables, unit))
            });
            match unit {
                Some(unit) => {
                    recalled.push(unit);
                    i += 1;
                }
                None => {
                    group.swap_remove(i);
                }
            }
        }

        *self.group_mut(owner, index)? = group;
        let selection = self.selection_mut(owner)?;
        *selection = recalled;
        if selection.is_empty() {
            Err(Rejection::NoEligibleUnit.into())
        } else {
            Ok(())
        }
    }

    /// Appends selected units to a group, stopping at the first unit not
    /// owned by `owner`.
    ///
    /// When group `index` is already full the next candidate is written to
    /// group `index + 1` instead (pushed if that group is empty, else over
    /// its first member) and the command stops without reporting success.
    /// Nothing is written past the last group. Replays recorded against the
    /// legacy protocol depend on this.
    fn add_to_group(&mut self, env: &GameEnv<'_>, owner: Owner, index: usize) -> Handled {
        let tables = env.tables()?;
        if let Some(&first) = self.state.control_group(owner, index).first() {
            if let Some(unit) = self.world.unit_by_id(first) {
                if !self.groupable(tables, unit) {
                    return Err(Rejection::NoEligibleUnit.into());
                }
            }
        }

        let mut added = false;
        for unit in self.selected_units(owner) {
            if !self.world.unit(unit).is_some_and(|view| view.owner == owner) {
                break;
            }
            let id = self.world.unit_id(unit);
            let group = self.state.control_group(owner, index);
            if !(group.is_empty() || self.groupable(tables, unit)) || group.contains(&id) {
                continue;
            }

            if group.len() == CommandConfig::MAX_SELECTION {
                if index + 1 < CommandConfig::CONTROL_GROUPS {
                    let next = self.group_mut(owner, index + 1)?;
                    match next.first_mut() {
                        Some(slot) => *slot = id,
                        None => next.push(id),
                    }
                }
                break;
            }

            let group = self.group_mut(owner, index)?;
            group.push(id);
            added = true;
            if group.is_full() {
                break;
            }
        }

        if added {
            Ok(())
        } else {
            Err(Rejection::Unchanged.into())
        }
    }

    fn group_mut(&mut self, owner: Owner, index: usize) -> Result<&mut ControlGroup, ExecuteError> {
        self.state
            .control_group_mut(owner, index)
            .ok_or(ExecuteError::InvalidOwner { owner })
    }
}

#[cfg(test)]
mod tests {
    use crate::action::Action;
    use crate::engine::tests::Fixture;
    use crate::engine::ExecuteError;
    use crate::state::{Owner, UnitHandle, UnitId, Xy};
    use crate::testing::{StubTables, StubWorld};
    use crate::world::UnitStatus;

    fn handles(units: &[u16]) -> Vec<UnitHandle> {
        units.iter().map(|&u| UnitHandle(u)).collect()
    }

    fn ids(units: &[u16]) -> Vec<UnitId> {
        units.iter().map(|&u| UnitId::from_parts(u, 0)).collect()
    }

    fn group(subaction: u8, group: u8) -> Action {
        Action::ControlGroup { subaction, group }
    }

    #[test]
    fn select_skips_ineligible_units() {
        let mut world = StubWorld::with_units(3);
        world.view_mut(UnitHandle(1)).status |= UnitStatus::HIDDEN;
        world.spawn(Owner(1), StubTables::MARINE, Xy::new(0, 64));
        world.spawn(Owner(0), StubTables::NUKE, Xy::new(0, 96));
        let mut fx = Fixture::new(world);

        let ok = fx.run(Owner(0), Action::Select { units: handles(&[0, 1, 2, 3, 4, 0]) });

        assert_eq!(ok, Ok(true));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[0, 2]).as_slice());
    }

    #[test]
    fn first_unit_ignores_group_rules() {
        let mut world = StubWorld::with_units(2);
        world.spawn(Owner(3), StubTables::BARRACKS, Xy::new(0, 0));
        let mut fx = Fixture::new(world);

        assert_eq!(fx.run(Owner(0), Action::Select { units: handles(&[2, 0, 1]) }), Ok(true));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[2, 0, 1]).as_slice());

        // Once a slot is taken the building no longer qualifies.
        assert_eq!(fx.run(Owner(0), Action::Select { units: handles(&[0, 2]) }), Ok(true));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[0]).as_slice());
    }

    #[test]
    fn overflow_counts_accepted_units_only() {
        let mut world = StubWorld::with_units(13);
        world.view_mut(UnitHandle(5)).status |= UnitStatus::HIDDEN;
        let mut fx = Fixture::new(world);
        let units = handles(&(0..13).collect::<Vec<u16>>());
        assert_eq!(fx.run(Owner(0), Action::Select { units: units.clone() }), Ok(true));
        assert_eq!(fx.state.selection(Owner(0)).len(), 12);

        fx.world.view_mut(UnitHandle(5)).status = UnitStatus::COMPLETED;
        assert!(matches!(
            fx.run(Owner(0), Action::Select { units }),
            Err(ExecuteError::SelectionOverflow { len: 13, .. })
        ));
    }

    #[test]
    fn empty_result_clears_selection() {
        let mut world = StubWorld::with_units(2);
        world.view_mut(UnitHandle(1)).status |= UnitStatus::HIDDEN;
        let mut fx = Fixture::new(world);
        fx.select(Owner(0), &[0]);

        assert_eq!(fx.run(Owner(0), Action::Select { units: handles(&[1]) }), Ok(false));
        assert!(fx.state.selection(Owner(0)).is_empty());
    }

    #[test]
    fn shift_select_fills_to_capacity() {
        let mut fx = Fixture::new(StubWorld::with_units(20));
        fx.select(Owner(0), &(0..10).collect::<Vec<u16>>());

        let ok = fx.run(Owner(0), Action::ShiftSelect { units: handles(&[3, 10, 11]) });

        assert_eq!(ok, Ok(true));
        let selection = fx.state.selection(Owner(0));
        assert_eq!(selection.len(), 12);
        assert_eq!(&selection[10..], handles(&[10, 11]).as_slice());
    }

    #[test]
    fn shift_select_past_capacity_is_fatal() {
        let mut fx = Fixture::new(StubWorld::with_units(20));
        fx.select(Owner(0), &(0..10).collect::<Vec<u16>>());

        assert!(matches!(
            fx.run(Owner(0), Action::ShiftSelect { units: handles(&[10, 11, 12]) }),
            Err(ExecuteError::SelectionOverflow { .. })
        ));
    }

    #[test]
    fn shift_select_blocked_by_lone_building() {
        let mut world = StubWorld::with_units(2);
        world.spawn(Owner(0), StubTables::BARRACKS, Xy::new(0, 0));
        let mut fx = Fixture::new(world);
        fx.select(Owner(0), &[2]);

        let ok = fx.run(Owner(0), Action::ShiftSelect { units: handles(&[0, 1]) });

        assert_eq!(ok, Ok(false));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[2]).as_slice());
    }

    #[test]
    fn shift_select_into_empty_selection_takes_anything_first() {
        let mut world = StubWorld::with_units(1);
        world.spawn(Owner(0), StubTables::BARRACKS, Xy::new(0, 0));
        let mut fx = Fixture::new(world);

        let ok = fx.run(Owner(0), Action::ShiftSelect { units: handles(&[1, 0]) });

        assert_eq!(ok, Ok(true));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[1, 0]).as_slice());
    }

    #[test]
    fn deselect_twice_is_a_noop() {
        let mut fx = Fixture::new(StubWorld::with_units(3));
        fx.select(Owner(0), &[0, 1, 2]);

        let deselect = Action::Deselect { units: handles(&[1]) };
        assert_eq!(fx.run(Owner(0), deselect.clone()), Ok(true));
        assert_eq!(fx.run(Owner(0), deselect), Ok(false));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[0, 2]).as_slice());
    }

    #[test]
    fn recall_swaps_dead_members_out() {
        let mut fx = Fixture::new(StubWorld::with_units(4));
        fx.select(Owner(0), &[0, 1, 2, 3]);
        assert_eq!(fx.run(Owner(0), group(0, 4)), Ok(true));

        fx.world.kill(UnitHandle(1));
        fx.state.on_unit_deselect(UnitHandle(1));
        fx.select(Owner(0), &[0]);

        assert_eq!(fx.run(Owner(0), group(1, 4)), Ok(true));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[0, 3, 2]).as_slice());
        assert_eq!(fx.state.control_group(Owner(0), 4), ids(&[0, 3, 2]).as_slice());
    }

    #[test]
    fn recall_of_dead_group_clears_selection() {
        let mut fx = Fixture::new(StubWorld::with_units(2));
        fx.select(Owner(0), &[0]);
        assert_eq!(fx.run(Owner(0), group(0, 1)), Ok(true));
        fx.world.kill(UnitHandle(0));
        fx.select(Owner(0), &[1]);

        assert_eq!(fx.run(Owner(0), group(1, 1)), Ok(false));
        assert!(fx.state.selection(Owner(0)).is_empty());
        assert!(fx.state.control_group(Owner(0), 1).is_empty());

        // An empty group leaves the selection alone.
        fx.select(Owner(0), &[1]);
        assert_eq!(fx.run(Owner(0), group(1, 1)), Ok(false));
        assert_eq!(fx.state.selection(Owner(0)), handles(&[1]).as_slice());
    }

    #[test]
    fn set_clears_then_stops_at_foreign_unit() {
        let mut fx = Fixture::new(StubWorld::with_units(3));
        fx.select(Owner(0), &[0, 1, 2]);
        assert_eq!(fx.run(Owner(0), group(0, 2)), Ok(true));
        assert_eq!(fx.state.control_group(Owner(0), 2), ids(&[0, 1, 2]).as_slice());

        fx.world.view_mut(UnitHandle(1)).owner = Owner(1);
        assert_eq!(fx.run(Owner(0), group(0, 2)), Ok(true));
        assert_eq!(fx.state.control_group(Owner(0), 2), ids(&[0]).as_slice());

        fx.world.view_mut(UnitHandle(0)).owner = Owner(1);
        assert_eq!(fx.run(Owner(0), group(0, 2)), Ok(false));
        assert!(fx.state.control_group(Owner(0), 2).is_empty());
    }

    #[test]
    fn set_with_empty_selection_fails() {
        let mut fx = Fixture::new(StubWorld::with_units(1));
        assert_eq!(fx.run(Owner(0), group(0, 0)), Ok(false));
    }

    #[test]
    fn out_of_range_group_is_rejected_and_bad_subaction_is_fatal() {
        let mut fx = Fixture::new(StubWorld::with_units(1));
        assert_eq!(
            fx.run(Owner(0), group(3, 0)),
            Err(ExecuteError::ControlGroupSubaction {
                owner: Owner(0),
                subaction: 3
            })
        );
        assert_eq!(fx.run(Owner(0), group(0, 10)), Ok(false));
        assert_eq!(fx.run(Owner(0), group(3, 10)), Ok(false));
    }

    #[test]
    fn add_overflow_overwrites_next_group_and_stops() {
        let mut fx = Fixture::new(StubWorld::with_units(16));
        fx.select(Owner(0), &(0..12).collect::<Vec<u16>>());
        assert_eq!(fx.run(Owner(0), group(0, 3)), Ok(true));
        fx.select(Owner(0), &[13]);
        assert_eq!(fx.run(Owner(0), group(0, 4)), Ok(true));
        let full = fx.state.control_group(Owner(0), 3).to_vec();

        fx.select(Owner(0), &[12, 14, 15]);
        assert_eq!(fx.run(Owner(0), group(2, 3)), Ok(false));

        assert_eq!(fx.state.control_group(Owner(0), 3), full.as_slice());
        assert_eq!(fx.state.control_group(Owner(0), 4), ids(&[12]).as_slice());
    }

    #[test]
    fn add_overflow_into_empty_next_group_inserts() {
        let mut fx = Fixture::new(StubWorld::with_units(13));
        fx.select(Owner(0), &(0..12).collect::<Vec<u16>>());
        assert_eq!(fx.run(Owner(0), group(0, 0)), Ok(true));

        fx.select(Owner(0), &[12]);
        assert_eq!(fx.run(Owner(0), group(2, 0)), Ok(false));
        assert_eq!(fx.state.control_group(Owner(0), 1), ids(&[12]).as_slice());
    }

    #[test]
    fn add_overflow_on_last_group_changes_nothing() {
        let mut fx = Fixture::new(StubWorld::with_units(13));
        fx.select(Owner(0), &(0..12).collect::<Vec<u16>>());
        assert_eq!(fx.run(Owner(0), group(0, 9)), Ok(true));

        fx.select(Owner(0), &[12]);
        let selected = fx.state.clone();
        assert_eq!(fx.run(Owner(0), group(2, 9)), Ok(false));
        assert_eq!(fx.state, selected);
    }

    #[test]
    fn add_fills_group_and_stops_when_full() {
        let mut fx = Fixture::new(StubWorld::with_units(14));
        fx.select(Owner(0), &(0..10).collect::<Vec<u16>>());
        assert_eq!(fx.run(Owner(0), group(0, 5)), Ok(true));

        fx.select(Owner(0), &[10, 11, 12, 13]);
        assert_eq!(fx.run(Owner(0), group(2, 5)), Ok(true));
        assert_eq!(
            fx.state.control_group(Owner(0), 5),
            ids(&(0..12).collect::<Vec<u16>>()).as_slice()
        );
        assert!(fx.state.control_group(Owner(0), 6).is_empty());
    }

    #[test]
    fn add_stops_at_foreign_unit_and_respects_lone_building() {
        let mut world = StubWorld::with_units(3);
        let barracks = world.spawn(Owner(0), StubTables::BARRACKS, Xy::new(0, 0));
        let mut fx = Fixture::new(world);

        fx.select(Owner(0), &[0, 1, 2]);
        fx.world.view_mut(UnitHandle(1)).owner = Owner(1);
        assert_eq!(fx.run(Owner(0), group(2, 6)), Ok(true));
        assert_eq!(fx.state.control_group(Owner(0), 6), ids(&[0]).as_slice());

        // A building may start an empty group but blocks further additions.
        fx.select(Owner(0), &[barracks.0]);
        assert_eq!(fx.run(Owner(0), group(2, 7)), Ok(true));
        fx.select(Owner(0), &[0]);
        assert_eq!(fx.run(Owner(0), group(2, 7)), Ok(false));
        assert_eq!(fx.state.control_group(Owner(0), 7), ids(&[barracks.0]).as_slice());
    }
}
