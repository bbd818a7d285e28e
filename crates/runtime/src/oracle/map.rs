//! Tile grid served through [`lockstep_core::PathOracle`].
//!
//! Walkability is tracked per 32 px build tile. Regions are flood-filled inside
//! fixed sectors so that a large open area still splits into several regions;
//! regions are connected when they belong to the same island (global flood
//! fill). Corridor search is a breadth-first walk over tiles.
use std::collections::VecDeque;

use lockstep_core::{PathOracle, RegionId, TilePos, Xy};

use crate::config::MapSource;
use crate::error::{Result, RuntimeError};

const UNASSIGNED: u16 = u16::MAX;

/// Static walkability grid with precomputed regions.
#[derive(Clone, Debug)]
pub struct TileMap {
    width: u16,
    height: u16,
    walkable: Vec<bool>,
    /// Region per tile, `UNASSIGNED` where blocked.
    regions: Vec<u16>,
    /// Island per region.
    islands: Vec<u16>,
}

impl TileMap {
    /// Side of the square sector regions are confined to, in tiles.
    pub const SECTOR: u16 = 8;

    /// Fully walkable map of `width` x `height` tiles.
    pub fn open(width: u16, height: u16) -> Self {
        let walkable = vec![true; width as usize * height as usize];
        Self::from_walkable(width, height, walkable)
    }

    /// Parses ASCII rows (`.` walkable, `#` blocked). All rows must have the
    /// same length.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        if width == 0 || height == 0 {
            return Err(RuntimeError::Map {
                row: 0,
                reason: "map is empty",
            });
        }
        if width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(RuntimeError::Map {
                row: 0,
                reason: "map is too large",
            });
        }

        let mut walkable = Vec::with_capacity(width * height);
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            if line.len() != width {
                return Err(RuntimeError::Map {
                    row,
                    reason: "row length differs from the first row",
                });
            }
            for byte in line.bytes() {
                match byte {
                    b'.' => walkable.push(true),
                    b'#' => walkable.push(false),
                    _ => {
                        return Err(RuntimeError::Map {
                            row,
                            reason: "unexpected tile character",
                        });
                    }
                }
            }
        }
        Ok(Self::from_walkable(width as u16, height as u16, walkable))
    }

    pub fn from_source(source: &MapSource) -> Result<Self> {
        match source {
            MapSource::Open { width, height } => Ok(Self::open(*width, *height)),
            MapSource::Rows(rows) => Self::from_rows(rows),
        }
    }

    fn from_walkable(width: u16, height: u16, walkable: Vec<bool>) -> Self {
        let mut map = Self {
            width,
            height,
            walkable,
            regions: Vec::new(),
            islands: Vec::new(),
        };
        map.assign_regions();
        map.assign_islands();
        map
    }

    /// Map size in tiles.
    pub fn tile_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn region_count(&self) -> usize {
        self.islands.len()
    }

    // ========================================================================
    // Precomputation
    // ========================================================================

    fn assign_regions(&mut self) {
        self.regions = vec![UNASSIGNED; self.walkable.len()];
        let mut next = 0u16;
        for start in 0..self.walkable.len() {
            if !self.walkable[start] || self.regions[start] != UNASSIGNED {
                continue;
            }
            let sector = self.sector_of(start);
            let mut queue = VecDeque::from([start]);
            self.regions[start] = next;
            while let Some(tile) = queue.pop_front() {
                for neighbor in self.neighbors(tile) {
                    if self.walkable[neighbor]
                        && self.regions[neighbor] == UNASSIGNED
                        && self.sector_of(neighbor) == sector
                    {
                        self.regions[neighbor] = next;
                        queue.push_back(neighbor);
                    }
                }
            }
            next += 1;
        }
        self.islands = vec![UNASSIGNED; next as usize];
    }

    fn assign_islands(&mut self) {
        let mut next = 0u16;
        for start in 0..self.walkable.len() {
            let region = self.regions[start];
            if region == UNASSIGNED || self.islands[region as usize] != UNASSIGNED {
                continue;
            }
            let mut visited = vec![false; self.walkable.len()];
            let mut queue = VecDeque::from([start]);
            visited[start] = true;
            while let Some(tile) = queue.pop_front() {
                self.islands[self.regions[tile] as usize] = next;
                for neighbor in self.neighbors(tile) {
                    if self.walkable[neighbor] && !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            next += 1;
        }
    }

    // ========================================================================
    // Tile helpers
    // ========================================================================

    fn sector_of(&self, tile: usize) -> (u16, u16) {
        let (x, y) = self.coords(tile);
        (x / Self::SECTOR, y / Self::SECTOR)
    }

    fn coords(&self, tile: usize) -> (u16, u16) {
        let width = self.width as usize;
        ((tile % width) as u16, (tile / width) as u16)
    }

    fn tile_at(&self, position: Xy) -> Option<usize> {
        if position.x < 0 || position.y < 0 {
            return None;
        }
        let x = position.x / TilePos::SIZE;
        let y = position.y / TilePos::SIZE;
        if x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn center(&self, tile: usize) -> Xy {
        let (x, y) = self.coords(tile);
        let half = TilePos::SIZE / 2;
        TilePos::new(x, y).to_xy() + Xy::new(half, half)
    }

    /// Four-connected neighbors inside the map, in a fixed order.
    fn neighbors(&self, tile: usize) -> impl Iterator<Item = usize> + use<> {
        let (x, y) = self.coords(tile);
        let (width, height) = (self.width, self.height);
        let row = width as usize;
        [
            (y > 0).then(|| tile - row),
            (x + 1 < width).then_some(tile + 1),
            (y + 1 < height).then(|| tile + row),
            (x > 0).then(|| tile - 1),
        ]
        .into_iter()
        .flatten()
    }

    /// Tiles from `from` to `goal` (inclusive), or to the reachable tile
    /// closest to `target` when `goal` cannot be reached.
    fn search(&self, from: usize, goal: Option<usize>, target: Xy) -> Vec<usize> {
        let mut parent = vec![usize::MAX; self.walkable.len()];
        parent[from] = from;
        let mut queue = VecDeque::from([from]);
        let mut best = from;

        while let Some(tile) = queue.pop_front() {
            if Some(tile) == goal {
                best = tile;
                break;
            }
            if self.center(tile).distance_squared(target)
                < self.center(best).distance_squared(target)
            {
                best = tile;
            }
            for neighbor in self.neighbors(tile) {
                if self.walkable[neighbor] && parent[neighbor] == usize::MAX {
                    parent[neighbor] = tile;
                    queue.push_back(neighbor);
                }
            }
        }

        let mut corridor = vec![best];
        let mut tile = best;
        while tile != from {
            tile = parent[tile];
            corridor.push(tile);
        }
        corridor.reverse();
        corridor
    }
}

impl PathOracle for TileMap {
    fn map_size(&self) -> Xy {
        Xy::new(
            self.width as i32 * TilePos::SIZE,
            self.height as i32 * TilePos::SIZE,
        )
    }

    fn region_at(&self, position: Xy) -> Option<RegionId> {
        let tile = self.tile_at(position)?;
        let region = self.regions[tile];
        (region != UNASSIGNED).then_some(RegionId(region))
    }

    fn regions_connected(&self, a: RegionId, b: RegionId) -> bool {
        match (
            self.islands.get(a.0 as usize),
            self.islands.get(b.0 as usize),
        ) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn long_path(&self, from: Xy, to: Xy) -> Option<Vec<Xy>> {
        let start = self.tile_at(from).filter(|&tile| self.walkable[tile])?;
        let goal = self.tile_at(to).filter(|&tile| self.walkable[tile]);
        let tiles = self.search(start, goal, to);

        let mut corridor: Vec<Xy> = tiles.into_iter().map(|tile| self.center(tile)).collect();
        corridor[0] = from;
        if goal.is_some() && self.is_reachable(from, to) {
            if let Some(last) = corridor.last_mut() {
                *last = to;
            }
        }
        Some(corridor)
    }
}
