//! Match administration and cheat handlers.

use tracing::debug;

use crate::action::{ActionKind, CheatFlags};
use crate::config::CommandConfig;
use crate::env::{Cost, GameEnv, OrderFlags};
use crate::state::{AllianceTable, Owner, TechRef, UnitHandle, UpgradeRef, VisionMask, Xy};
use crate::world::{Resources, UnitStat, World};

use super::errors::{ExecuteError, Handled, Rejection};
use super::ActionEngine;

impl<W: World> ActionEngine<'_, W> {
    /// Replaces the low byte of the vision mask; the high byte is kept.
    pub(super) fn shared_vision(&mut self, owner: Owner, mask: VisionMask) -> Handled {
        let current = self.world.shared_vision(owner);
        self.world.set_shared_vision(owner, mask.applied_over(current));
        Ok(())
    }

    /// Installs a new alliance table and revokes attack orders that now
    /// target an ally.
    pub(super) fn set_alliances(
        &mut self,
        env: &GameEnv<'_>,
        owner: Owner,
        table: AllianceTable,
    ) -> Handled {
        let tables = env.tables()?;
        self.world.set_alliances(owner, table);

        let revoked: Vec<UnitHandle> = self
            .world
            .owned_units(owner)
            .into_iter()
            .filter(|&unit| {
                let Some(view) = self.world.unit(unit) else {
                    return false;
                };
                let attacking = view
                    .order
                    .and_then(|order| tables.order(order.id()))
                    .is_some_and(|def| def.flags.contains(OrderFlags::ATTACK));
                let target_owner = view
                    .order_target
                    .and_then(|target| self.world.unit(target))
                    .map(|target| target.owner);
                attacking
                    && target_owner
                        .is_some_and(|other| other != owner && table.is_allied(other))
            })
            .collect();

        for unit in revoked {
            self.world.clear_order_target(unit);
        }
        Ok(())
    }

    pub(super) fn game_speed(&mut self, speed: u8) -> Handled {
        if speed > CommandConfig::MAX_GAME_SPEED {
            return Err(Rejection::OutOfRange.into());
        }
        self.world.set_game_speed(speed);
        Ok(())
    }

    pub(super) fn set_paused(&mut self, paused: bool) -> Handled {
        if self.world.is_paused() == paused {
            return Err(Rejection::Unchanged.into());
        }
        self.world.set_paused(paused);
        Ok(())
    }

    /// Legacy cheat word. Rejected while cheats are off; with cheats on,
    /// unknown bits are fatal.
    ///
    /// The money grant goes to every occupied slot, not just the issuer.
    pub(super) fn cheat(&mut self, env: &GameEnv<'_>, owner: Owner, bits: u32) -> Handled {
        self.require_cheats(env)?;
        let flags = CheatFlags::parse(bits)
            .map_err(|bits| ExecuteError::UnknownCheatFlags { owner, bits })?;

        self.world.set_cheat_flags(flags.toggles());
        let grant = flags.grant();
        if grant != Cost::FREE {
            let occupied: Vec<Owner> = Owner::all()
                .filter(|&slot| self.world.is_occupied(slot))
                .collect();
            for slot in occupied {
                let resources = self.world.resources(slot).credit(grant);
                self.world.set_resources(slot, resources);
            }
        }
        debug!(target: "lockstep::engine", %owner, flags = ?flags, "cheat applied");
        Ok(())
    }

    pub(super) fn leave_game(&mut self, owner: Owner, reason: u8) -> Handled {
        self.selection_mut(owner)?.clear();
        self.world.leave_game(owner, reason);
        Ok(())
    }

    pub(super) fn minimap_ping(&mut self, env: &GameEnv<'_>, owner: Owner, position: Xy) -> Handled {
        let position = env.path()?.clamp_to_map(position);
        self.world.minimap_ping(owner, position);
        Ok(())
    }

    pub(super) fn chat(&mut self, owner: Owner, text: &str) -> Handled {
        self.world.post_chat(owner, text);
        Ok(())
    }

    // ========================================================================
    // Extended cheats
    // ========================================================================

    pub(super) fn cheat_unit_stat(
        &mut self,
        env: &GameEnv<'_>,
        kind: ActionKind,
        unit: Option<UnitHandle>,
        value: i32,
    ) -> Handled {
        self.require_cheats(env)?;
        let stat = match kind {
            ActionKind::CheatUnitHp => UnitStat::HitPoints,
            ActionKind::CheatUnitShield => UnitStat::Shields,
            ActionKind::CheatUnitEnergy => UnitStat::Energy,
            _ => return Err(Rejection::MissingTableEntry.into()),
        };
        let unit = unit.ok_or(Rejection::NoTarget)?;
        if self.world.unit(unit).is_none() {
            return Err(Rejection::NoTarget.into());
        }
        self.world.set_unit_stat(unit, stat, value);
        Ok(())
    }

    pub(super) fn cheat_upgrade(
        &mut self,
        env: &GameEnv<'_>,
        target: Owner,
        upgrade: UpgradeRef,
        level: u8,
    ) -> Handled {
        self.require_cheats(env)?;
        check_slot(target)?;
        let def = env
            .tables()?
            .upgrade(upgrade.id())
            .ok_or(Rejection::MissingTableEntry)?;
        if level > def.max_level {
            return Err(Rejection::OutOfRange.into());
        }
        self.world.set_upgrade_level(target, upgrade, level);
        Ok(())
    }

    pub(super) fn cheat_tech(
        &mut self,
        env: &GameEnv<'_>,
        target: Owner,
        tech: TechRef,
        researched: bool,
    ) -> Handled {
        self.require_cheats(env)?;
        check_slot(target)?;
        self.world.set_tech(target, tech, researched);
        Ok(())
    }

    /// Sets the mineral or gas stock of `target` to `amount`.
    pub(super) fn cheat_resources(
        &mut self,
        env: &GameEnv<'_>,
        kind: ActionKind,
        target: Owner,
        amount: i32,
    ) -> Handled {
        self.require_cheats(env)?;
        check_slot(target)?;
        let current = self.world.resources(target);
        let next = match kind {
            ActionKind::CheatMinerals => Resources::new(amount, current.gas),
            _ => Resources::new(current.minerals, amount),
        };
        self.world.set_resources(target, next);
        Ok(())
    }

    fn require_cheats(&self, env: &GameEnv<'_>) -> Handled {
        if env.cheats_enabled()? {
            Ok(())
        } else {
            Err(Rejection::CheatsDisabled.into())
        }
    }
}

fn check_slot(owner: Owner) -> Result<(), Rejection> {
    owner.index().map(|_| ()).ok_or(Rejection::OutOfRange)
}

#[cfg(test)]
mod tests {
    use crate::action::{Action, CheatFlags};
    use crate::engine::tests::Fixture;
    use crate::engine::ExecuteError;
    use crate::state::{AllianceTable, OrderId, Owner, Stance, UnitHandle, VisionMask, Xy};
    use crate::testing::{StubTables, StubWorld};
    use crate::world::{OrderTarget, Resources, UnitStat, World};

    #[test]
    fn alliance_change_revokes_attacks_on_new_allies() {
        let mut world = StubWorld::with_units(2);
        let p1 = world.spawn(Owner(1), StubTables::MARINE, Xy::new(500, 0));
        let p2 = world.spawn(Owner(2), StubTables::MARINE, Xy::new(600, 0));
        let attack = StubTables::order_ref(OrderId::ATTACK_UNIT);
        let movement = StubTables::order_ref(OrderId::MOVE);
        world.issue_order(UnitHandle(0), attack, target(p1), false);
        world.issue_order(UnitHandle(1), movement, target(p1), false);
        world.issue_order(p2, attack, target(UnitHandle(0)), false);
        let mut fx = Fixture::new(world);

        let mut table = AllianceTable::solo(Owner(0));
        table.set(Owner(1), Stance::Allied);
        assert_eq!(fx.run(Owner(0), Action::SetAlliances { table }), Ok(true));

        assert_eq!(fx.world.alliances(Owner(0)), table);
        assert_eq!(fx.world.unit(UnitHandle(0)).unwrap().order_target, None);
        assert_eq!(fx.world.unit(UnitHandle(1)).unwrap().order_target, Some(p1));
        assert_eq!(fx.world.unit(p2).unwrap().order_target, Some(UnitHandle(0)));
    }

    fn target(unit: UnitHandle) -> OrderTarget {
        OrderTarget {
            position: Xy::ORIGIN,
            unit: Some(unit),
            unit_type: None,
        }
    }

    #[test]
    fn pause_and_speed_report_changes() {
        let mut fx = Fixture::new(StubWorld::default());
        assert_eq!(fx.run(Owner(0), Action::Resume {}), Ok(false));
        assert_eq!(fx.run(Owner(0), Action::Pause {}), Ok(true));
        assert_eq!(fx.run(Owner(0), Action::Pause {}), Ok(false));
        assert!(fx.world.paused);

        assert_eq!(fx.run(Owner(0), Action::GameSpeed { speed: 7 }), Ok(false));
        assert_eq!(fx.run(Owner(0), Action::GameSpeed { speed: 2 }), Ok(true));
        assert_eq!(fx.world.speed, 2);
    }

    #[test]
    fn unknown_cheat_bits_are_fatal_when_enabled() {
        let mut fx = Fixture::new(StubWorld::default());
        assert_eq!(
            fx.run(Owner(0), Action::Cheat { flags: 0x4 | 0x2 }),
            Err(ExecuteError::UnknownCheatFlags {
                owner: Owner(0),
                bits: 0x4
            })
        );

        fx.config.cheats_enabled = false;
        assert_eq!(fx.run(Owner(0), Action::Cheat { flags: 0x4 }), Ok(false));
        assert_eq!(fx.run(Owner(0), Action::Cheat { flags: 0x10 }), Ok(false));
        assert_eq!(fx.world.resources(Owner(0)), Resources::default());
    }

    #[test]
    fn money_cheat_credits_every_occupied_slot() {
        let mut world = StubWorld::default();
        world.give(Owner(1), 50, 5, 0);
        world.vacant.extend(2..12);
        let mut fx = Fixture::new(world);
        let flags = CheatFlags::SHOW_ME_THE_MONEY | CheatFlags::OPERATION_CWAL;
        assert_eq!(fx.run(Owner(3), Action::Cheat { flags: flags.bits() }), Ok(true));

        assert_eq!(fx.world.resources(Owner(0)), Resources::new(10_000, 10_000));
        assert_eq!(fx.world.resources(Owner(1)), Resources::new(10_050, 10_005));
        assert_eq!(fx.world.resources(Owner(3)), Resources::default());
        assert_eq!(fx.world.cheats, CheatFlags::OPERATION_CWAL);

        // A word without the toggle switches it back off.
        assert_eq!(fx.run(Owner(0), Action::Cheat { flags: 0 }), Ok(true));
        assert_eq!(fx.world.cheats, CheatFlags::empty());
        assert_eq!(fx.world.resources(Owner(0)), Resources::new(10_000, 10_000));
    }

    #[test]
    fn extended_cheats_require_switch() {
        let mut fx = Fixture::new(StubWorld::with_units(1));
        fx.config.cheats_enabled = false;
        let action = Action::CheatMinerals {
            owner: Owner(0),
            amount: 42,
        };
        assert_eq!(fx.run(Owner(0), action.clone()), Ok(false));

        fx.config.cheats_enabled = true;
        fx.world.give(Owner(0), 5, 7, 0);
        assert_eq!(fx.run(Owner(0), action), Ok(true));
        assert_eq!(fx.world.resources(Owner(0)), Resources::new(42, 7));
    }

    #[test]
    fn unit_stat_cheats_write_through() {
        let mut fx = Fixture::new(StubWorld::with_units(1));
        let action = Action::CheatUnitEnergy {
            unit: Some(UnitHandle(0)),
            value: 200,
        };
        assert_eq!(fx.run(Owner(0), action), Ok(true));
        assert_eq!(fx.world.stat(UnitHandle(0), UnitStat::Energy), Some(200));

        let action = Action::CheatUnitHp {
            unit: None,
            value: 1,
        };
        assert_eq!(fx.run(Owner(0), action), Ok(false));
    }

    #[test]
    fn leave_clears_selection_and_ping_clamps() {
        let mut fx = Fixture::new(StubWorld::with_units(2));
        fx.select(Owner(0), &[0, 1]);

        assert_eq!(fx.run(Owner(0), Action::LeaveGame { reason: 3 }), Ok(true));
        assert!(fx.state.selection(Owner(0)).is_empty());
        assert_eq!(fx.world.left, vec![(Owner(0), 3)]);

        let ping = Action::MinimapPing {
            position: Xy::new(-10, 9000),
        };
        assert_eq!(fx.run(Owner(1), ping), Ok(true));
        assert_eq!(fx.world.pings, vec![(Owner(1), Xy::new(0, 4095))]);
    }

    #[test]
    fn vision_replaces_only_the_low_byte() {
        let mut world = StubWorld::default();
        world.vision.insert(2, VisionMask(0x0300 | 0x0004));
        let mut fx = Fixture::new(world);
        let action = Action::SharedVision {
            mask: VisionMask(0x0801),
        };
        assert_eq!(fx.run(Owner(2), action), Ok(true));
        assert_eq!(fx.world.shared_vision(Owner(2)), VisionMask(0x0301));
    }

    #[test]
    fn vision_and_chat_always_succeed() {
        let mut fx = Fixture::new(StubWorld::default());
        assert_eq!(
            fx.run(Owner(2), Action::SharedVision { mask: VisionMask(0b101) }),
            Ok(true)
        );
        assert_eq!(
            fx.run(Owner(2), Action::Chat { text: "gl hf".into() }),
            Ok(true)
        );
        assert_eq!(fx.world.chat, vec![(Owner(2), "gl hf".to_owned())]);
    }
}
