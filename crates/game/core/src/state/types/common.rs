use std::fmt;

use crate::config::CommandConfig;

/// Player slot (0..12) that owns units and issues commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Owner(pub u8);

impl Owner {
    /// Returns the slot as an array index, or `None` when outside the player range.
    #[inline]
    pub fn index(self) -> Option<usize> {
        let index = self.0 as usize;
        (index < CommandConfig::MAX_PLAYERS).then_some(index)
    }

    pub fn all() -> impl Iterator<Item = Owner> {
        (0..CommandConfig::MAX_PLAYERS as u8).map(Owner)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Player id as it appears at the head of every per-player stream record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// Stable 16-bit unit identifier used on the wire.
///
/// The low 11 bits hold `index + 1`, the high 5 bits a generation counter, so a
/// stale id from a dead unit never resolves to the unit that reused its slot.
/// Zero is the null unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId(pub u16);

impl UnitId {
    pub const NONE: Self = Self(0);

    const INDEX_BITS: u32 = 11;
    const INDEX_MASK: u16 = (1 << Self::INDEX_BITS) - 1;

    /// Composes an id from an arena index and generation.
    pub const fn from_parts(index: u16, generation: u8) -> Self {
        Self(((index + 1) & Self::INDEX_MASK) | ((generation as u16) << Self::INDEX_BITS))
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 & Self::INDEX_MASK == 0
    }

    /// Arena index encoded in this id, or `None` for the null unit.
    pub const fn index(self) -> Option<u16> {
        let raw = self.0 & Self::INDEX_MASK;
        if raw == 0 { None } else { Some(raw - 1) }
    }

    pub const fn generation(self) -> u8 {
        (self.0 >> Self::INDEX_BITS) as u8
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{:#06x}", self.0)
    }
}

/// Resolved reference to a live unit: its index in the world's unit arena.
///
/// Only produced by resolving a [`UnitId`] against the world, so a handle held
/// by a selection always names a unit that existed at resolution time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitHandle(pub u16);

impl UnitHandle {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel position on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Xy {
    pub x: i32,
    pub y: i32,
}

impl Xy {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise clamp into `[min, max]`.
    pub fn clamp(self, min: Xy, max: Xy) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }

    /// Squared euclidean distance, widened to avoid overflow on map-sized spans.
    pub fn distance_squared(self, other: Xy) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

impl std::ops::Add for Xy {
    type Output = Xy;
    fn add(self, rhs: Xy) -> Xy {
        Xy::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Xy {
    type Output = Xy;
    fn sub(self, rhs: Xy) -> Xy {
        Xy::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Xy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Build-grid coordinate (32 px tiles).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TilePos {
    pub x: u16,
    pub y: u16,
}

impl TilePos {
    pub const SIZE: i32 = 32;

    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Top-left pixel of this tile.
    pub fn to_xy(self) -> Xy {
        Xy::new(self.x as i32 * Self::SIZE, self.y as i32 * Self::SIZE)
    }
}

/// Axis-aligned pixel rectangle with inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub from: Xy,
    pub to: Xy,
}

impl Rect {
    /// Smallest rectangle covering every point, or `None` for an empty input.
    pub fn bounding(points: impl IntoIterator<Item = Xy>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { from: first, to: first }, |rect, p| Self {
            from: Xy::new(rect.from.x.min(p.x), rect.from.y.min(p.y)),
            to: Xy::new(rect.to.x.max(p.x), rect.to.y.max(p.y)),
        }))
    }

    pub fn contains(&self, p: Xy) -> bool {
        p.x >= self.from.x && p.x <= self.to.x && p.y >= self.from.y && p.y <= self.to.y
    }

    /// Strictly inside; points on the edge are excluded.
    pub fn contains_inner(&self, p: Xy) -> bool {
        p.x > self.from.x && p.x < self.to.x && p.y > self.from.y && p.y < self.to.y
    }

    /// Square of half-size `radius` around `center`.
    pub fn around(center: Xy, radius: i32) -> Self {
        Self {
            from: Xy::new(center.x - radius, center.y - radius),
            to: Xy::new(center.x + radius, center.y + radius),
        }
    }

    pub fn width(&self) -> i32 {
        self.to.x - self.from.x
    }

    pub fn height(&self) -> i32 {
        self.to.y - self.from.y
    }
}

/// Simulation frame number used to gate the action stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame(pub u32);

impl Frame {
    pub const ZERO: Self = Self(0);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
