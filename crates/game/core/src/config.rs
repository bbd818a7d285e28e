/// Protocol limits and tunable parameters of the command layer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandConfig {
    /// Whether cheat and administrative actions take effect.
    pub cheats_enabled: bool,

    /// Group-move formation heuristic parameters.
    pub formation: FormationRules,
}

impl CommandConfig {
    // ===== compile-time constants used as type parameters =====
    /// Fixed number of player slots in a match.
    pub const MAX_PLAYERS: usize = 12;
    /// Maximum units in a selection or control group.
    pub const MAX_SELECTION: usize = 12;
    /// Control groups per player (hotkeys 0-9).
    pub const CONTROL_GROUPS: usize = 10;
    /// Fixed size of the zero-padded chat buffer on the wire.
    pub const TEXT_LEN: usize = 81;
    /// Maximum payload of one frame block (length is a single byte).
    pub const MAX_FRAME_BLOCK: usize = u8::MAX as usize;
    /// Leading byte of the extended (3-byte) action tag namespace.
    pub const EXTENDED_TAG: u8 = 210;
    /// Training queue slots per producing unit.
    pub const TRAIN_QUEUE_LEN: u8 = 5;
    /// Fastest game speed setting.
    pub const MAX_GAME_SPEED: u8 = 6;

    pub fn new() -> Self {
        Self {
            cheats_enabled: false,
            formation: FormationRules::default(),
        }
    }

    pub fn with_cheats(cheats_enabled: bool) -> Self {
        Self {
            cheats_enabled,
            ..Self::new()
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Thresholds steering how a multi-unit move keeps its shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormationRules {
    /// Largest bounding-box side (px) that still moves as a formation when any
    /// member has collision.
    pub ground_span: i32,

    /// Largest bounding-box side (px) for groups made only of collision-disabled
    /// units.
    pub air_span: i32,

    /// Per-axis distance (px) from the target each unit is pulled within when
    /// the click lands inside the group's bounding box.
    pub inner_spread: i32,

    /// Number of increments tried when walking an obstructed target back toward
    /// the clicked point.
    pub obstruction_steps: u32,
}

impl FormationRules {
    pub const DEFAULT_GROUND_SPAN: i32 = 192;
    pub const DEFAULT_AIR_SPAN: i32 = 256;
    pub const DEFAULT_INNER_SPREAD: i32 = 32;
    pub const DEFAULT_OBSTRUCTION_STEPS: u32 = 8;
}

impl Default for FormationRules {
    fn default() -> Self {
        Self {
            ground_span: Self::DEFAULT_GROUND_SPAN,
            air_span: Self::DEFAULT_AIR_SPAN,
            inner_spread: Self::DEFAULT_INNER_SPREAD,
            obstruction_steps: Self::DEFAULT_OBSTRUCTION_STEPS,
        }
    }
}
