//! Per-simulation command state.
//!
//! This module owns the player-slot mapping, stream cursor, selections and
//! control groups. Runtime layers clone or query this state but mutate it
//! exclusively through the engine and the unit-removal callback.
pub mod error;
pub mod types;

use arrayvec::ArrayVec;

use crate::config::CommandConfig;
pub use error::StateError;
pub use types::{
    AllianceTable, Frame, OrderId, OrderRef, Owner, PlayerId, Rect, Stance, TechId, TechRef,
    TilePos, UnitHandle, UnitId, UnitTypeId, UnitTypeRef, UpgradeId, UpgradeRef, VisionMask, Xy,
};

/// Ordered, duplicate-free set of live units a player has selected.
pub type Selection = ArrayVec<UnitHandle, { CommandConfig::MAX_SELECTION }>;

/// Saved hotkey group. Members are stored by id and re-resolved on every use,
/// so entries may name units that have since died or changed owner.
pub type ControlGroup = ArrayVec<UnitId, { CommandConfig::MAX_SELECTION }>;

const EMPTY_SLOT: i8 = -1;

/// Canonical command-layer state paired with one simulation instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionState {
    /// Player id to owner slot; `-1` marks an empty slot.
    player_owner: [i8; CommandConfig::MAX_PLAYERS],

    /// Bytes of the frame-gated stream already consumed.
    stream_position: usize,

    /// Earliest frame for which unread stream data exists.
    next_action_frame: Frame,

    selections: [Selection; CommandConfig::MAX_PLAYERS],

    control_groups: [[ControlGroup; CommandConfig::CONTROL_GROUPS]; CommandConfig::MAX_PLAYERS],
}

impl ActionState {
    /// Creates zeroed state: no players, selections or groups, cursor at 0.
    pub fn new() -> Self {
        Self {
            player_owner: [EMPTY_SLOT; CommandConfig::MAX_PLAYERS],
            stream_position: 0,
            next_action_frame: Frame::ZERO,
            selections: Default::default(),
            control_groups: Default::default(),
        }
    }

    /// Creates state where player id `n` controls owner slot `n` for every slot.
    pub fn with_identity_players() -> Self {
        let mut state = Self::new();
        for (slot, owner) in state.player_owner.iter_mut().enumerate() {
            *owner = slot as i8;
        }
        state
    }

    // ===== player mapping =====

    /// Maps `player` to `owner`, or clears the mapping with `None`.
    pub fn assign_player(
        &mut self,
        player: PlayerId,
        owner: Option<Owner>,
    ) -> Result<(), StateError> {
        let slot = self
            .player_owner
            .get_mut(player.0 as usize)
            .ok_or(StateError::PlayerOutOfRange {
                player,
                max: CommandConfig::MAX_PLAYERS,
            })?;
        *slot = match owner {
            Some(owner) => {
                owner.index().ok_or(StateError::OwnerOutOfRange {
                    owner,
                    max: CommandConfig::MAX_PLAYERS,
                })? as i8
            }
            None => EMPTY_SLOT,
        };
        Ok(())
    }

    pub fn owner_of(&self, player: PlayerId) -> Option<Owner> {
        match self.player_owner.get(player.0 as usize) {
            Some(&slot) if slot >= 0 => Some(Owner(slot as u8)),
            _ => None,
        }
    }

    // ===== stream cursor =====

    pub fn stream_position(&self) -> usize {
        self.stream_position
    }

    pub fn next_action_frame(&self) -> Frame {
        self.next_action_frame
    }

    pub(crate) fn set_stream_position(&mut self, position: usize) {
        self.stream_position = position;
    }

    pub(crate) fn set_next_action_frame(&mut self, frame: Frame) {
        self.next_action_frame = frame;
    }

    /// Rewinds the cursor so a new stream can be processed from its start.
    pub fn reset_stream(&mut self) {
        self.stream_position = 0;
        self.next_action_frame = Frame::ZERO;
    }

    // ===== selections and groups =====

    pub fn selection(&self, owner: Owner) -> &[UnitHandle] {
        owner.index().map_or(&[], |i| self.selections[i].as_slice())
    }

    pub(crate) fn selection_mut(&mut self, owner: Owner) -> Option<&mut Selection> {
        owner.index().map(|i| &mut self.selections[i])
    }

    pub fn control_group(&self, owner: Owner, group: usize) -> &[UnitId] {
        owner
            .index()
            .and_then(|i| self.control_groups[i].get(group))
            .map_or(&[], |g| g.as_slice())
    }

    pub(crate) fn control_group_mut(
        &mut self,
        owner: Owner,
        group: usize,
    ) -> Option<&mut ControlGroup> {
        owner
            .index()
            .and_then(move |i| self.control_groups[i].get_mut(group))
    }

    /// Strikes `unit` from every player's selection.
    ///
    /// Must be called by the world whenever a unit is destroyed or leaves its
    /// owner's control. Control groups are not touched; their ids are
    /// re-validated lazily.
    pub fn on_unit_deselect(&mut self, unit: UnitHandle) {
        for selection in &mut self.selections {
            selection.retain(|selected| *selected != unit);
        }
    }

    /// Re-points every held unit handle after the paired world was cloned.
    ///
    /// Handles that no longer map are dropped.
    pub fn remap_units(&mut self, mut map: impl FnMut(UnitHandle) -> Option<UnitHandle>) {
        for selection in &mut self.selections {
            let remapped: Selection = selection.iter().filter_map(|unit| map(*unit)).collect();
            *selection = remapped;
        }
    }
}

impl Default for ActionState {
    fn default() -> Self {
        Self::new()
    }
}
