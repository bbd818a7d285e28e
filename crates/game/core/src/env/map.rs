use crate::state::Xy;

/// Region identifier assigned by the pathfinder; units in connected regions
/// can reach each other by ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionId(pub u16);

/// Static map oracle exposing walkability, region connectivity and long-range
/// corridor search for ground movement.
pub trait PathOracle: Send + Sync {
    /// Map size in pixels; valid positions are `0..size` on each axis.
    fn map_size(&self) -> Xy;

    /// Region containing `position`, or `None` when it is not walkable.
    fn region_at(&self, position: Xy) -> Option<RegionId>;

    /// Whether ground units can travel between the two regions.
    fn regions_connected(&self, a: RegionId, b: RegionId) -> bool;

    /// Corridor of waypoints from `from` toward `to`, ending at the reachable
    /// point closest to `to`. `None` if `from` itself is not walkable.
    fn long_path(&self, from: Xy, to: Xy) -> Option<Vec<Xy>>;

    fn is_walkable(&self, position: Xy) -> bool {
        self.region_at(position).is_some()
    }

    /// Both points walkable and connected by ground.
    fn is_reachable(&self, from: Xy, to: Xy) -> bool {
        match (self.region_at(from), self.region_at(to)) {
            (Some(a), Some(b)) => a == b || self.regions_connected(a, b),
            _ => false,
        }
    }

    /// Whether `position` lies on the map.
    fn in_bounds(&self, position: Xy) -> bool {
        let size = self.map_size();
        (0..size.x).contains(&position.x) && (0..size.y).contains(&position.y)
    }

    /// Clamps a position into the playable area.
    fn clamp_to_map(&self, position: Xy) -> Xy {
        let size = self.map_size();
        position.clamp(Xy::ORIGIN, Xy::new(size.x - 1, size.y - 1))
    }
}
