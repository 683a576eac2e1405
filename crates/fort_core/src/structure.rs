//! Structure definitions: kinds, orientations, placement keys and records.
//!
//! Kinds and orientations are closed enums. A [`Placement`] pairs a kind with
//! a legal orientation for that kind, so the support rules can match on it
//! exhaustively. Placements are only built through [`Placement::new`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;
use crate::grid::GridCoordinate;

/// Unique identifier for placed structures.
///
/// Assigned once by the placement path and never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureId(pub u64);

impl StructureId {
    /// Create a new structure ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// The closed set of buildable pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Horizontal tile-sized slab.
    Floor,
    /// Vertical panel on one edge of a tile.
    Wall,
    /// Inclined slab rising in one of four directions.
    Ramp,
}

impl StructureKind {
    /// All kinds, in declaration order.
    pub const ALL: [StructureKind; 3] = [Self::Floor, Self::Wall, Self::Ramp];

    /// Lowercase name used in requests and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Wall => "wall",
            Self::Ramp => "ramp",
        }
    }

    /// Every orientation component that can appear in a key of this kind.
    ///
    /// Floors ignore orientation for identity, so they have a single `None`.
    #[must_use]
    pub fn key_orientations(self) -> &'static [Option<Orientation>] {
        const FLOOR: [Option<Orientation>; 1] = [None];
        const WALL: [Option<Orientation>; 4] = [
            Some(Orientation::Edge(WallEdge::North)),
            Some(Orientation::Edge(WallEdge::East)),
            Some(Orientation::Edge(WallEdge::South)),
            Some(Orientation::Edge(WallEdge::West)),
        ];
        const RAMP: [Option<Orientation>; 4] = [
            Some(Orientation::Rotation(Rotation::Deg0)),
            Some(Orientation::Rotation(Rotation::Deg90)),
            Some(Orientation::Rotation(Rotation::Deg180)),
            Some(Orientation::Rotation(Rotation::Deg270)),
        ];
        match self {
            Self::Floor => &FLOOR,
            Self::Wall => &WALL,
            Self::Ramp => &RAMP,
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructureKind {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "floor" => Ok(Self::Floor),
            "wall" => Ok(Self::Wall),
            "ramp" => Ok(Self::Ramp),
            _ => Err(PlacementError::InvalidStructureType(s.to_string())),
        }
    }
}

// ============================================================================
// Orientation
// ============================================================================

/// One of the four snapped rotations, measured clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// 0 degrees.
    Deg0,
    /// 90 degrees.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees.
    Deg270,
}

impl Rotation {
    /// Parse an already-snapped angle. Anything other than 0/90/180/270 is rejected.
    #[must_use]
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

/// Which edge of its tile a wall occupies.
///
/// North is +Z, East is +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallEdge {
    /// +Z edge.
    North,
    /// +X edge.
    East,
    /// -Z edge.
    South,
    /// -X edge.
    West,
}

impl WallEdge {
    /// All edges, clockwise from north.
    pub const ALL: [WallEdge; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Tile offset `(dx, dz)` to the neighbour sharing this edge.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Edge facing a rotation (0 = north, clockwise).
    #[must_use]
    pub const fn from_rotation(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Deg0 => Self::North,
            Rotation::Deg90 => Self::East,
            Rotation::Deg180 => Self::South,
            Rotation::Deg270 => Self::West,
        }
    }

    /// Rotation facing this edge.
    #[must_use]
    pub const fn rotation(self) -> Rotation {
        match self {
            Self::North => Rotation::Deg0,
            Self::East => Rotation::Deg90,
            Self::South => Rotation::Deg180,
            Self::West => Rotation::Deg270,
        }
    }
}

/// Orientation attached to a placement, interpreted per kind.
///
/// - Floor: `Rotation`, cosmetic only.
/// - Wall: `Edge`.
/// - Ramp: `Rotation`, the rise direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// A snapped rotation.
    Rotation(Rotation),
    /// A tile edge.
    Edge(WallEdge),
}

impl Orientation {
    /// Angle in degrees, edges mapped clockwise from north.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Rotation(rotation) => rotation.degrees(),
            Self::Edge(edge) => edge.rotation().degrees(),
        }
    }

    /// Whether this orientation is legal for `kind`.
    #[must_use]
    pub const fn is_valid_for(self, kind: StructureKind) -> bool {
        matches!(
            (kind, self),
            (StructureKind::Floor, Self::Rotation(_))
                | (StructureKind::Wall, Self::Edge(_))
                | (StructureKind::Ramp, Self::Rotation(_))
        )
    }

    /// Build the orientation for `kind` from a snapped angle.
    #[must_use]
    pub const fn for_kind(kind: StructureKind, rotation: Rotation) -> Self {
        match kind {
            StructureKind::Wall => Self::Edge(WallEdge::from_rotation(rotation)),
            StructureKind::Floor | StructureKind::Ramp => Self::Rotation(rotation),
        }
    }
}

// ============================================================================
// Materials
// ============================================================================

/// Building material tier. Only affects hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialTier {
    /// Cheapest, weakest tier.
    #[default]
    Wood,
    /// Middle tier.
    Stone,
    /// Strongest tier.
    Metal,
}

impl FromStr for MaterialTier {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wood" => Ok(Self::Wood),
            "stone" | "brick" => Ok(Self::Stone),
            "metal" => Ok(Self::Metal),
            _ => Err(PlacementError::InvalidMaterial(s.to_string())),
        }
    }
}

// ============================================================================
// Placement
// ============================================================================

/// Composite uniqueness key of the occupancy index.
///
/// Floors carry no orientation component, so two floors on the same cell
/// always collide regardless of their cosmetic rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlacementKey {
    /// Grid cell.
    pub coord: GridCoordinate,
    /// Structure kind.
    pub kind: StructureKind,
    /// Orientation component, `None` for floors.
    pub orientation: Option<Orientation>,
}

impl PlacementKey {
    /// Build a key, dropping the orientation for kinds that ignore it.
    #[must_use]
    pub fn new(coord: GridCoordinate, kind: StructureKind, orientation: Option<Orientation>) -> Self {
        let orientation = match kind {
            StructureKind::Floor => None,
            StructureKind::Wall | StructureKind::Ramp => orientation,
        };
        Self {
            coord,
            kind,
            orientation,
        }
    }
}

/// A kind, a cell and an orientation legal for that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    kind: StructureKind,
    coord: GridCoordinate,
    orientation: Orientation,
}

impl Placement {
    /// Validate and build a placement.
    ///
    /// Fails with [`PlacementError::InvalidRotation`] when the orientation is
    /// not legal for the kind (e.g. a wall given a rotation instead of an edge).
    pub fn new(
        kind: StructureKind,
        coord: GridCoordinate,
        orientation: Orientation,
    ) -> Result<Self, PlacementError> {
        if !orientation.is_valid_for(kind) {
            return Err(PlacementError::InvalidRotation {
                kind,
                degrees: orientation.degrees(),
            });
        }
        Ok(Self {
            kind,
            coord,
            orientation,
        })
    }

    /// A floor with no cosmetic rotation.
    #[must_use]
    pub const fn floor(coord: GridCoordinate) -> Self {
        Self {
            kind: StructureKind::Floor,
            coord,
            orientation: Orientation::Rotation(Rotation::Deg0),
        }
    }

    /// A wall on one edge of `coord`.
    #[must_use]
    pub const fn wall(coord: GridCoordinate, edge: WallEdge) -> Self {
        Self {
            kind: StructureKind::Wall,
            coord,
            orientation: Orientation::Edge(edge),
        }
    }

    /// A ramp rising towards `rotation`.
    #[must_use]
    pub const fn ramp(coord: GridCoordinate, rotation: Rotation) -> Self {
        Self {
            kind: StructureKind::Ramp,
            coord,
            orientation: Orientation::Rotation(rotation),
        }
    }

    /// Structure kind.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.kind
    }

    /// Grid cell.
    #[must_use]
    pub const fn coord(&self) -> GridCoordinate {
        self.coord
    }

    /// Orientation.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Wall edge, if this is a wall.
    #[must_use]
    pub const fn wall_edge(&self) -> Option<WallEdge> {
        match self.orientation {
            Orientation::Edge(edge) => Some(edge),
            Orientation::Rotation(_) => None,
        }
    }

    /// Occupancy key of this placement.
    #[must_use]
    pub fn key(&self) -> PlacementKey {
        PlacementKey::new(self.coord, self.kind, Some(self.orientation))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} facing {}",
            self.kind,
            self.coord,
            self.orientation.degrees()
        )
    }
}

// ============================================================================
// Records
// ============================================================================

/// A live structure, owned by the occupancy index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureRecord {
    /// Immutable identifier.
    pub id: StructureId,
    /// Kind, cell and orientation.
    pub placement: Placement,
    /// Material tier.
    pub material: MaterialTier,
    /// Hit points at full health.
    pub max_hp: u32,
    /// Current hit points.
    pub current_hp: u32,
    /// Logical clock value when the structure was placed.
    pub placed_at: u64,
}

impl StructureRecord {
    /// Structure kind.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.placement.kind()
    }

    /// Grid cell.
    #[must_use]
    pub const fn coord(&self) -> GridCoordinate {
        self.placement.coord()
    }

    /// Occupancy key.
    #[must_use]
    pub fn key(&self) -> PlacementKey {
        self.placement.key()
    }
}
