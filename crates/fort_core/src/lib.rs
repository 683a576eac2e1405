//! # Fort Core
//!
//! Deterministic structural-integrity core for grid-based base building.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO outside the explicit config and snapshot file helpers
//! - No wall-clock time (records carry a logical clock)
//! - No floating-point math (uses fixed-point)
//!
//! A [`world::BuildWorld`] owns the occupancy index and the dependency graph
//! and is the only writer of either. Placement and removal are each one
//! `&mut self` call, so callers queue concurrent requests into a single
//! stream in front of it.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Grid coordinates and world/grid mapping
//! - [`structure`] - Kinds, orientations, placement keys and records
//! - [`terrain`] - Pluggable terrain support oracle
//! - [`occupancy`] - Authoritative store of live structures
//! - [`support`] - Per-kind support rules
//! - [`graph`] - Dependency graph of support edges
//! - [`cascade`] - Cascade destruction on removal
//! - [`world`] - Transactional facade over all of the above
//! - [`placement`] - String requests and ghost previews
//! - [`config`] - RON build configuration
//! - [`snapshot`] - Binary world snapshots
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cascade;
pub mod config;
pub mod error;
pub mod graph;
pub mod grid;
pub mod math;
pub mod occupancy;
pub mod placement;
pub mod snapshot;
pub mod structure;
pub mod support;
pub mod terrain;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cascade::{DestroyedStructure, DestructionCause, RemovalOutcome};
    pub use crate::config::{BuildConfig, MaterialTable};
    pub use crate::error::{CoreError, InvariantViolation, PlacementError, Result};
    pub use crate::grid::{snap_rotation, GridCoordinate, GridMapper};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::placement::{PlacementPreview, PlacementRequest};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::structure::{
        MaterialTier, Orientation, Placement, PlacementKey, Rotation, StructureId, StructureKind,
        StructureRecord, WallEdge,
    };
    pub use crate::support::{SupportSource, WallSupportPolicy};
    pub use crate::terrain::{FlatTerrain, TerrainOracle};
    pub use crate::world::BuildWorld;
}
