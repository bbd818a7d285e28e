use bitflags::bitflags;

use crate::env::Cost;

bitflags! {
    /// Legacy cheat bits carried by the `cheat` action.
    ///
    /// Any bit outside this set is a protocol violation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CheatFlags: u32 {
        /// Fast build; persists until a cheat word without it arrives.
        const OPERATION_CWAL    = 0x0000_0002;
        /// One-shot resource grant to every occupied slot.
        const SHOW_ME_THE_MONEY = 0x0000_0010;
    }
}

impl CheatFlags {
    /// Parses a raw word, returning the unrecognised bits on failure.
    pub fn parse(bits: u32) -> Result<Self, u32> {
        Self::from_bits(bits).ok_or(bits & !Self::all().bits())
    }

    /// Persistent toggles forwarded to the world.
    pub fn toggles(self) -> Self {
        self & Self::OPERATION_CWAL
    }

    /// Minerals and gas each occupied slot receives.
    pub fn grant(self) -> Cost {
        if self.contains(Self::SHOW_ME_THE_MONEY) {
            Cost::resources(10_000, 10_000)
        } else {
            Cost::FREE
        }
    }
}
