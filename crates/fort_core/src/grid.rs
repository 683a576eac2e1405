//! Grid coordinates and the world <-> grid coordinate mapper.
//!
//! Cells are addressed by integer tile X/Z and an integer level. A cell's
//! world position is its centre on X/Z and its base on Y:
//! `(x * tile_size, level * level_height, z * tile_size)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{round_half_up_div, Fixed, Vec3Fixed, HALF};
use crate::structure::Rotation;

/// Offsets `(dx, dz)` of the eight horizontally adjacent cells.
pub const HORIZONTAL_NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Integer address of a build cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridCoordinate {
    /// Tile X.
    pub x: i32,
    /// Tile Z.
    pub z: i32,
    /// Vertical level.
    pub level: i32,
}

impl GridCoordinate {
    /// Create a grid coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32, level: i32) -> Self {
        Self { x, z, level }
    }

    /// Offset this coordinate, or `None` if any axis would overflow.
    #[must_use]
    pub fn offset(self, dx: i32, dz: i32, dlevel: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            z: self.z.checked_add(dz)?,
            level: self.level.checked_add(dlevel)?,
        })
    }

    /// The cell directly below.
    #[must_use]
    pub fn below(self) -> Option<Self> {
        self.offset(0, 0, -1)
    }

    /// The cell directly above.
    #[must_use]
    pub fn above(self) -> Option<Self> {
        self.offset(0, 0, 1)
    }

    /// The eight horizontally adjacent cells on the same level.
    pub fn horizontal_neighbors(self) -> impl Iterator<Item = GridCoordinate> {
        HORIZONTAL_NEIGHBORS
            .into_iter()
            .filter_map(move |(dx, dz)| self.offset(dx, dz, 0))
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.z, self.level)
    }
}

/// Converts between continuous world positions and grid cells.
///
/// Stateless apart from the two cell dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMapper {
    tile_size: Fixed,
    level_height: Fixed,
}

impl GridMapper {
    /// Create a mapper.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(tile_size: Fixed, level_height: Fixed) -> Self {
        assert!(tile_size > Fixed::ZERO, "GridMapper tile_size must be positive");
        assert!(
            level_height > Fixed::ZERO,
            "GridMapper level_height must be positive"
        );
        Self {
            tile_size,
            level_height,
        }
    }

    /// Tile size in world units.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Level height in world units.
    #[must_use]
    pub const fn level_height(&self) -> Fixed {
        self.level_height
    }

    /// Snap a world position to the nearest cell, rounding ties up on every axis.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3Fixed) -> GridCoordinate {
        GridCoordinate {
            x: round_half_up_div(pos.x, self.tile_size),
            z: round_half_up_div(pos.z, self.tile_size),
            level: round_half_up_div(pos.y, self.level_height),
        }
    }

    /// World position of a cell: X/Z centre, Y base.
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoordinate) -> Vec3Fixed {
        Vec3Fixed {
            x: Fixed::from_num(coord.x).saturating_mul(self.tile_size),
            y: Fixed::from_num(coord.level).saturating_mul(self.level_height),
            z: Fixed::from_num(coord.z).saturating_mul(self.tile_size),
        }
    }

    /// Snap a world position to its cell's world position.
    #[must_use]
    pub fn snap(&self, pos: Vec3Fixed) -> Vec3Fixed {
        self.grid_to_world(self.world_to_grid(pos))
    }
}

/// Round an angle to the nearest multiple of 90 degrees (ties up) and reduce it into `[0, 360)`.
#[must_use]
pub fn snap_rotation(degrees: Fixed) -> Rotation {
    let quarter_turns = degrees
        .saturating_div(Fixed::from_num(90))
        .saturating_add(HALF)
        .floor()
        .to_num::<i64>();
    match quarter_turns.rem_euclid(4) {
        0 => Rotation::Deg0,
        1 => Rotation::Deg90,
        2 => Rotation::Deg180,
        _ => Rotation::Deg270,
    }
}
