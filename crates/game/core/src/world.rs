//! Mutable simulation collaborator.
//!
//! The unit model, physics and production internals live outside this crate.
//! The command layer sees them only through [`World`]: queries used to validate a
//! command and the mutators a validated command is allowed to invoke. Static data
//! (rule tables, pathfinding, config) is reached through [`crate::env`] instead.

use bitflags::bitflags;

use crate::action::CheatFlags;
use crate::env::Cost;
use crate::state::{
    AllianceTable, OrderRef, Owner, Rect, TechRef, UnitHandle, UnitId, UnitTypeId, UnitTypeRef,
    UpgradeRef, VisionMask, Xy,
};

/// Id resolution needed by the codec: wire id to live handle and back.
pub trait UnitLookup {
    /// Resolves a wire id to a live unit; stale or null ids resolve to `None`.
    fn unit_by_id(&self, id: UnitId) -> Option<UnitHandle>;

    /// Projects a handle to the id that currently names it.
    fn unit_id(&self, unit: UnitHandle) -> UnitId;
}

bitflags! {
    /// Dynamic unit state relevant to command eligibility.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UnitStatus: u16 {
        /// Not present on the map (inside a transport or building).
        const HIDDEN       = 1 << 0;
        const COMPLETED    = 1 << 1;
        const BURROWED     = 1 << 2;
        const CLOAKED      = 1 << 3;
        const SIEGED       = 1 << 4;
        const LIFTED       = 1 << 5;
        /// Ignores unit collision (air units); skips obstruction checks.
        const NO_COLLISION = 1 << 6;
        /// Stunned, locked down or otherwise unable to take orders.
        const DISABLED     = 1 << 7;
        const CONSTRUCTING = 1 << 8;
        const MORPHING     = 1 << 9;
    }
}

/// Production work a unit is busy with. Also what a command starts and what a
/// cancel hands back for refunding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Job {
    Train(UnitTypeRef),
    /// Interceptor or scarab; priced by the world.
    TrainFighter,
    Research(TechRef),
    Upgrade(UpgradeRef),
    Morph(UnitTypeRef),
    BuildingMorph(UnitTypeRef),
    Addon(UnitTypeRef),
    Construction(UnitTypeRef),
    Nuke,
}

/// Production a command can cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cancel {
    /// One entry of the training queue.
    Train { slot: u16 },
    Research,
    Upgrade,
    Morph,
    Addon,
    Construction,
    Nuke,
}

impl Cancel {
    /// Training slot that names the last queued entry.
    pub const LAST_TRAIN_SLOT: u16 = 254;
}

/// Snapshot of a unit's command-relevant state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitView {
    pub owner: Owner,
    pub unit_type: UnitTypeId,
    pub position: Xy,
    pub status: UnitStatus,
    pub order: Option<OrderRef>,
    pub order_target: Option<UnitHandle>,
    pub subunit: Option<UnitHandle>,
    /// Current non-queued work (research, upgrade, morph, addon, construction).
    pub production: Option<Job>,
    /// Entries in the training queue.
    pub train_queue: u8,
}

impl UnitView {
    pub fn is_hidden(&self) -> bool {
        self.status.contains(UnitStatus::HIDDEN)
    }

    pub fn has_collision(&self) -> bool {
        !self.status.contains(UnitStatus::NO_COLLISION)
    }

    pub fn is_idle_producer(&self) -> bool {
        self.production.is_none()
            && self.status.contains(UnitStatus::COMPLETED)
            && !self
                .status
                .intersects(UnitStatus::CONSTRUCTING | UnitStatus::MORPHING | UnitStatus::DISABLED)
    }
}

/// Target parameters carried by an issued order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderTarget {
    pub position: Xy,
    pub unit: Option<UnitHandle>,
    pub unit_type: Option<UnitTypeRef>,
}

impl OrderTarget {
    pub const fn position(position: Xy) -> Self {
        Self {
            position,
            unit: None,
            unit_type: None,
        }
    }
}

/// Per-player mineral and gas stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resources {
    pub minerals: i32,
    pub gas: i32,
}

impl Resources {
    pub const fn new(minerals: i32, gas: i32) -> Self {
        Self { minerals, gas }
    }

    pub fn can_afford(&self, cost: Cost) -> bool {
        self.minerals >= cost.minerals && self.gas >= cost.gas
    }

    pub fn debit(self, cost: Cost) -> Self {
        Self::new(self.minerals - cost.minerals, self.gas - cost.gas)
    }

    pub fn credit(self, cost: Cost) -> Self {
        Self::new(self.minerals + cost.minerals, self.gas + cost.gas)
    }
}

/// Unit attribute written by extended cheats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitStat {
    HitPoints,
    Shields,
    Energy,
}

/// Simulation state the command layer queries and mutates.
///
/// Implementations must be deterministic: the same sequence of calls on two
/// instances with equal state must leave them equal.
pub trait World: UnitLookup {
    // ===== unit queries =====
    fn unit(&self, unit: UnitHandle) -> Option<UnitView>;

    /// Units owned by `owner`, in stable arena order.
    fn owned_units(&self, owner: Owner) -> Vec<UnitHandle>;

    /// Whether the unit may take `order` given its type and current order.
    fn can_receive_order(&self, unit: UnitHandle, order: OrderRef) -> bool;

    /// Order a right-click resolves to for this unit and target; `None` for
    /// units with no right-click action at all.
    fn default_order(&self, unit: UnitHandle, target: Option<UnitHandle>) -> Option<OrderRef>;

    /// Live units positioned inside `area`, in stable arena order.
    fn units_in(&self, area: Rect) -> Vec<UnitHandle>;

    /// Whether `owner` currently sees `position`.
    fn position_visible(&self, owner: Owner, position: Xy) -> bool;

    // ===== unit mutators =====
    fn issue_order(
        &mut self,
        unit: UnitHandle,
        order: OrderRef,
        target: OrderTarget,
        queue: bool,
    ) -> bool;

    fn clear_order_target(&mut self, unit: UnitHandle);

    /// Points a factory's rally at a unit, or at `position` when `target` is `None`.
    fn set_rally_point(&mut self, unit: UnitHandle, target: Option<UnitHandle>, position: Xy);

    fn begin_production(&mut self, unit: UnitHandle, job: Job) -> bool;

    /// Cancels the requested production, returning what was cancelled so the
    /// caller can refund it.
    fn cancel_production(&mut self, unit: UnitHandle, cancel: Cancel) -> Option<Job>;

    fn set_unit_stat(&mut self, unit: UnitHandle, stat: UnitStat, value: i32);

    // ===== player ledgers =====
    fn resources(&self, owner: Owner) -> Resources;
    fn set_resources(&mut self, owner: Owner, resources: Resources);
    fn supply_available(&self, owner: Owner) -> i32;
    fn has_tech(&self, owner: Owner, tech: TechRef) -> bool;
    fn set_tech(&mut self, owner: Owner, tech: TechRef, researched: bool);
    fn upgrade_level(&self, owner: Owner, upgrade: UpgradeRef) -> u8;
    fn set_upgrade_level(&mut self, owner: Owner, upgrade: UpgradeRef, level: u8);

    // ===== match-level state =====
    /// Whether a player occupies the slot.
    fn is_occupied(&self, owner: Owner) -> bool;
    fn alliances(&self, owner: Owner) -> AllianceTable;
    fn set_alliances(&mut self, owner: Owner, table: AllianceTable);
    fn shared_vision(&self, owner: Owner) -> VisionMask;
    fn set_shared_vision(&mut self, owner: Owner, mask: VisionMask);
    fn game_speed(&self) -> u8;
    fn set_game_speed(&mut self, speed: u8);
    fn is_paused(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    fn set_cheat_flags(&mut self, flags: CheatFlags);
    fn post_chat(&mut self, owner: Owner, text: &str);
    fn minimap_ping(&mut self, owner: Owner, position: Xy);
    fn leave_game(&mut self, owner: Owner, reason: u8);
}
