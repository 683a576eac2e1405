//! Terrain support oracle.
//!
//! The support rules only ever ask the terrain one question: does the
//! ground hold up a piece at this cell? Implementations must be pure and
//! total. Closures of the right shape are oracles too, which keeps tests
//! and custom worlds short.

/// Pluggable "terrain supports this cell" predicate.
pub trait TerrainOracle {
    /// Whether terrain supports a structure at `(x, z, level)`.
    fn supports_at(&self, x: i32, z: i32, level: i32) -> bool;
}

/// Flat ground: every cell on `ground_level` is supported, nothing else is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTerrain {
    ground_level: i32,
}

impl FlatTerrain {
    /// Flat ground at the given level.
    #[must_use]
    pub const fn new(ground_level: i32) -> Self {
        Self { ground_level }
    }

    /// Level the ground sits on.
    #[must_use]
    pub const fn ground_level(&self) -> i32 {
        self.ground_level
    }
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TerrainOracle for FlatTerrain {
    fn supports_at(&self, _x: i32, _z: i32, level: i32) -> bool {
        level == self.ground_level
    }
}

impl<F> TerrainOracle for F
where
    F: Fn(i32, i32, i32) -> bool,
{
    fn supports_at(&self, x: i32, z: i32, level: i32) -> bool {
        self(x, z, level)
    }
}
