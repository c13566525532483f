//! Tile addressing: integer tile coordinates and their world-space footprint.

use std::fmt;

/// Integer address of a tile in the world grid.
///
/// Tile `(x, z)` covers the world-space square
/// `[x * tile_size, (x + 1) * tile_size] x [z * tile_size, (z + 1) * tile_size]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub z: i32,
}

impl TileCoordinate {
    /// Create a tile coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space position of the tile's minimum corner.
    pub fn world_origin(self, tile_size: f64) -> (f64, f64) {
        (self.x as f64 * tile_size, self.z as f64 * tile_size)
    }

    /// World-space position of the tile's center.
    pub fn world_center(self, tile_size: f64) -> (f64, f64) {
        let (ox, oz) = self.world_origin(tile_size);
        (ox + tile_size * 0.5, oz + tile_size * 0.5)
    }

    /// The tile containing a world-space point.
    pub fn containing(world_x: f64, world_z: f64, tile_size: f64) -> Self {
        Self {
            x: (world_x / tile_size).floor() as i32,
            z: (world_z / tile_size).floor() as i32,
        }
    }

    /// Chebyshev distance in tiles.
    pub fn ring_distance(self, other: Self) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx.max(dz) as u32
    }

    /// Squared Euclidean distance in tiles, used as a prefetch priority.
    pub fn distance_squared(self, other: Self) -> u64 {
        let dx = self.x as i64 - other.x as i64;
        let dz = self.z as i64 - other.z as i64;
        (dx * dx + dz * dz) as u64
    }

    /// All tiles within `radius` rings of `self`, nearest first.
    ///
    /// Ties are ordered by `(z, x)` so the sequence is stable.
    pub fn tiles_within(self, radius: u32) -> Vec<Self> {
        let r = radius as i32;
        let mut tiles = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dz in -r..=r {
            for dx in -r..=r {
                tiles.push(Self::new(self.x + dx, self.z + dz));
            }
        }
        tiles.sort_by_key(|t| (t.distance_squared(self), t.z, t.x));
        tiles
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
