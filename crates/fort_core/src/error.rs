//! Error types for the build core.
//!
//! Placement failures are ordinary outcomes that callers branch on. They are
//! kept separate from [`CoreError`], which covers the file and config surfaces
//! and broken invariants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::GridCoordinate;
use crate::occupancy::SlotOccupied;
use crate::structure::{StructureId, StructureKind};

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a placement was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementError {
    /// Kind is not one of floor/wall/ramp.
    #[error("Unknown structure type: {0}")]
    InvalidStructureType(String),

    /// Orientation is not one of the legal values for the kind.
    #[error("Rotation {degrees} is not valid for a {kind}")]
    InvalidRotation {
        /// Kind being placed.
        kind: StructureKind,
        /// Offending angle in degrees.
        degrees: i32,
    },

    /// Material tier is unknown.
    #[error("Unknown material: {0}")]
    InvalidMaterial(String),

    /// Cell lies outside the configured build bounds.
    #[error("Cell {coord} is outside the build bounds")]
    OutOfBounds {
        /// Requested cell.
        coord: GridCoordinate,
    },

    /// Placement key is already taken.
    #[error("Slot is already occupied by structure {existing}")]
    Overlap {
        /// Structure holding the slot.
        existing: StructureId,
    },

    /// The support rules reject the candidate.
    #[error("Nothing supports a {kind} at {coord}")]
    Unsupported {
        /// Kind being placed.
        kind: StructureKind,
        /// Requested cell.
        coord: GridCoordinate,
    },

    /// Every structure id has been handed out.
    #[error("No structure ids left to assign")]
    IdsExhausted,
}

impl PlacementError {
    /// Stable machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidStructureType(_) => "invalid_structure_type",
            Self::InvalidRotation { .. } => "invalid_rotation",
            Self::InvalidMaterial(_) => "invalid_material",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::Overlap { .. } => "overlap",
            Self::Unsupported { .. } => "unsupported",
            Self::IdsExhausted => "ids_exhausted",
        }
    }
}

impl From<SlotOccupied> for PlacementError {
    fn from(err: SlotOccupied) -> Self {
        Self::Overlap {
            existing: err.existing,
        }
    }
}

/// A broken structural invariant. Always a programming defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Two live records share a placement key.
    #[error("Structures {first} and {second} share a placement key")]
    DuplicateKey {
        /// First record.
        first: StructureId,
        /// Second record.
        second: StructureId,
    },

    /// A live structure fails the support rules.
    #[error("Structure {0} is not supported")]
    Unsupported(StructureId),

    /// `supports` and `supported_by` disagree.
    #[error("Edge {supporter} -> {dependent} is only recorded on one side")]
    AsymmetricEdge {
        /// Supporting structure.
        supporter: StructureId,
        /// Dependent structure.
        dependent: StructureId,
    },

    /// A structure is present in only one of index and graph.
    #[error("Structure {0} is present in only one of the occupancy index and the dependency graph")]
    Desynchronized(StructureId),

    /// The incremental graph differs from one rebuilt from scratch.
    #[error("Dependency graph edges for {0} differ from a fresh rebuild")]
    StaleEdges(StructureId),
}

/// Top-level error type for the build core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration values are unusable.
    #[error("Invalid build config: {0}")]
    InvalidConfig(String),

    /// Failed to parse a RON config.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode a snapshot.
    #[error("Snapshot encoding error: {0}")]
    SnapshotEncoding(#[from] bincode::Error),

    /// Snapshot written by an incompatible version.
    #[error("Snapshot version mismatch: expected {expected}, got {found}")]
    SnapshotVersion {
        /// Version this build reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// A snapshot record no longer passes placement.
    #[error("Snapshot record {id} cannot be restored: {source}")]
    SnapshotRecord {
        /// Record that failed.
        id: StructureId,
        /// Why placement rejected it.
        source: PlacementError,
    },

    /// A structural invariant does not hold.
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}
