//! Entry points for untyped callers.
//!
//! [`PlacementRequest`] carries a placement as it arrives over a wire, with
//! the kind and material as strings and the orientation as degrees. Resolving
//! it is where unknown kinds, rotations and materials are rejected; past that
//! point the typed API makes them unrepresentable.
//!
//! [`PlacementPreview`] snaps a continuous cursor position and yaw onto the
//! grid and reports what placing there would do, without placing anything.

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;
use crate::grid::{snap_rotation, GridCoordinate};
use crate::math::{Fixed, Vec3Fixed};
use crate::structure::{MaterialTier, Orientation, Placement, Rotation, StructureKind, WallEdge};
use crate::terrain::TerrainOracle;
use crate::world::BuildWorld;

fn default_material() -> String {
    "wood".to_string()
}

/// A placement as submitted by an external caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// `"floor"`, `"wall"` or `"ramp"`.
    pub kind: String,
    /// Tile X.
    pub x: i32,
    /// Tile Z.
    pub z: i32,
    /// Level.
    pub level: i32,
    /// Snapped rotation: 0, 90, 180 or 270. Walls map it to an edge.
    #[serde(default)]
    pub rotation: i32,
    /// Material tier name.
    #[serde(default = "default_material")]
    pub material: String,
}

impl PlacementRequest {
    /// Build a request.
    pub fn new(
        kind: impl Into<String>,
        coord: GridCoordinate,
        rotation: i32,
        material: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            x: coord.x,
            z: coord.z,
            level: coord.level,
            rotation,
            material: material.into(),
        }
    }

    /// Requested cell.
    #[must_use]
    pub const fn coord(&self) -> GridCoordinate {
        GridCoordinate::new(self.x, self.z, self.level)
    }

    /// Parse kind and rotation into a typed placement.
    pub fn placement(&self) -> Result<Placement, PlacementError> {
        let kind: StructureKind = self.kind.parse()?;
        let rotation =
            Rotation::from_degrees(self.rotation).ok_or(PlacementError::InvalidRotation {
                kind,
                degrees: self.rotation,
            })?;
        Placement::new(kind, self.coord(), Orientation::for_kind(kind, rotation))
    }

    /// Parse the whole request.
    pub fn resolve(&self) -> Result<(Placement, MaterialTier), PlacementError> {
        let placement = self.placement()?;
        let material = self.material.parse()?;
        Ok((placement, material))
    }
}

/// Ghost-placement result for a cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Snapped placement.
    pub placement: Placement,
    /// World position of the snapped cell.
    pub snapped_position: Vec3Fixed,
    /// What placing it now would return.
    pub validation: Result<(), PlacementError>,
}

impl PlacementPreview {
    /// Snap `world_pos` and `yaw_degrees` onto the grid and validate the result.
    pub fn new<T: TerrainOracle>(
        world: &BuildWorld<T>,
        kind: StructureKind,
        world_pos: Vec3Fixed,
        yaw_degrees: Fixed,
    ) -> Self {
        let mapper = world.mapper();
        let coord = mapper.world_to_grid(world_pos);
        let rotation = snap_rotation(yaw_degrees);
        let placement = match kind {
            StructureKind::Floor => Placement::floor(coord),
            StructureKind::Wall => Placement::wall(coord, WallEdge::from_rotation(rotation)),
            StructureKind::Ramp => Placement::ramp(coord, rotation),
        };
        Self {
            placement,
            snapped_position: mapper.grid_to_world(coord),
            validation: world.validate_placement(&placement),
        }
    }

    /// Whether the ghost should render as placeable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }
}
