use crate::config::CommandConfig;

use super::Owner;

/// Alliance stance of one player toward another (2 bits on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stance {
    #[default]
    Enemy,
    Allied,
    AlliedVictory,
    /// Value 3 is carried through unchanged but has no meaning.
    Reserved,
}

impl Stance {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Enemy,
            1 => Self::Allied,
            2 => Self::AlliedVictory,
            _ => Self::Reserved,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::Enemy => 0,
            Self::Allied => 1,
            Self::AlliedVictory => 2,
            Self::Reserved => 3,
        }
    }

    pub const fn is_allied(self) -> bool {
        matches!(self, Self::Allied | Self::AlliedVictory)
    }
}

/// One player's alliance row: a stance toward each of the 12 slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllianceTable(pub [Stance; CommandConfig::MAX_PLAYERS]);

impl AllianceTable {
    const FIELD_BITS: usize = 2;

    /// Table where `owner` is allied only with itself.
    pub fn solo(owner: Owner) -> Self {
        let mut table = Self::default();
        if let Some(index) = owner.index() {
            table.0[index] = Stance::Allied;
        }
        table
    }

    pub fn stance(&self, other: Owner) -> Stance {
        other.index().map_or(Stance::Enemy, |i| self.0[i])
    }

    pub fn is_allied(&self, other: Owner) -> bool {
        self.stance(other).is_allied()
    }

    pub fn set(&mut self, other: Owner, stance: Stance) {
        if let Some(index) = other.index() {
            self.0[index] = stance;
        }
    }

    /// Packs the fields low-to-high into one 32-bit word.
    pub fn pack(&self) -> u32 {
        self.0
            .iter()
            .enumerate()
            .fold(0u32, |word, (i, stance)| {
                word | (stance.bits() as u32) << (i * Self::FIELD_BITS)
            })
    }

    pub fn unpack(word: u32) -> Self {
        let mut table = Self::default();
        for (i, stance) in table.0.iter_mut().enumerate() {
            *stance = Stance::from_bits((word >> (i * Self::FIELD_BITS)) as u8);
        }
        table
    }
}

// The packed table must fit in the flag word.
const _: () = assert!(CommandConfig::MAX_PLAYERS <= u32::BITS as usize / AllianceTable::FIELD_BITS);

/// Set of player slots sharing vision with the issuing player (one bit each).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisionMask(pub u16);

impl VisionMask {
    /// Bits a player may set; the high byte belongs to the simulation.
    pub const PLAYER_BITS: u16 = 0x00ff;

    /// Replaces the player-controlled low byte of `current` with this mask's.
    pub fn applied_over(self, current: VisionMask) -> VisionMask {
        VisionMask((self.0 & Self::PLAYER_BITS) | (current.0 & !Self::PLAYER_BITS))
    }

    pub fn contains(self, owner: Owner) -> bool {
        owner.index().is_some_and(|i| self.0 & (1 << i) != 0)
    }
}
