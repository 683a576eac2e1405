//! Support rules.
//!
//! The evaluator decides from scratch whether a placement is held up, using
//! only the occupancy index and the terrain oracle. It never looks at the
//! dependency graph, which may be stale in the middle of a cascade.
//!
//! Rules, first match wins:
//!
//! | Kind  | Supported by |
//! |-------|--------------|
//! | Floor | terrain; a floor in the 8-neighbourhood; any wall on the cell below; a floor on the cell below |
//! | Wall  | a floor on its own tile or across its edge (see [`WallSupportPolicy`]); the same-edge wall below |
//! | Ramp  | terrain; a floor on its own cell |
//!
//! [`SupportEvaluator::explain`] returns every source that satisfies a rule,
//! not just the first. The dependency graph is built from those sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grid::GridCoordinate;
use crate::occupancy::OccupancyIndex;
use crate::structure::{Orientation, Placement, PlacementKey, StructureId, StructureKind, WallEdge};
use crate::terrain::TerrainOracle;

/// Something that holds a structure up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportSource {
    /// The ground.
    Terrain,
    /// Another live structure.
    Structure(StructureId),
}

/// Which floors a wall needs on the two tiles sharing its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WallSupportPolicy {
    /// A floor on either tile is enough.
    #[default]
    EitherSide,
    /// Both tiles must hold a floor.
    BothSides,
}

/// Evaluates the per-kind support rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportEvaluator {
    wall_policy: WallSupportPolicy,
}

impl SupportEvaluator {
    /// Create an evaluator with the given wall policy.
    #[must_use]
    pub const fn new(wall_policy: WallSupportPolicy) -> Self {
        Self { wall_policy }
    }

    /// Active wall policy.
    #[must_use]
    pub const fn wall_policy(&self) -> WallSupportPolicy {
        self.wall_policy
    }

    /// Whether `placement` is supported by the current occupants.
    ///
    /// The candidate itself need not be (and usually is not) in the index.
    #[must_use]
    pub fn is_supported<T>(&self, placement: &Placement, index: &OccupancyIndex, terrain: &T) -> bool
    where
        T: TerrainOracle + ?Sized,
    {
        let coord = placement.coord();
        match placement.kind() {
            StructureKind::Floor => {
                terrain_supports(coord, terrain)
                    || index.neighbors_at(coord, StructureKind::Floor).next().is_some()
                    || coord.below().is_some_and(|below| {
                        index.any_at(below, StructureKind::Wall) || floor_at(below, index).is_some()
                    })
            }
            StructureKind::Wall => placement.wall_edge().is_some_and(|edge| {
                self.wall_floors(coord, edge, index).is_some()
                    || wall_below(coord, edge, index).is_some()
            }),
            StructureKind::Ramp => {
                terrain_supports(coord, terrain) || floor_at(coord, index).is_some()
            }
        }
    }

    /// Every source that currently satisfies a support rule for `placement`.
    ///
    /// Empty exactly when [`Self::is_supported`] is false.
    #[must_use]
    pub fn explain<T>(
        &self,
        placement: &Placement,
        index: &OccupancyIndex,
        terrain: &T,
    ) -> BTreeSet<SupportSource>
    where
        T: TerrainOracle + ?Sized,
    {
        let coord = placement.coord();
        let mut sources = BTreeSet::new();

        match placement.kind() {
            StructureKind::Floor => {
                if terrain_supports(coord, terrain) {
                    sources.insert(SupportSource::Terrain);
                }
                sources.extend(
                    index
                        .neighbors_at(coord, StructureKind::Floor)
                        .map(|r| SupportSource::Structure(r.id)),
                );
                if let Some(below) = coord.below() {
                    sources.extend(
                        index
                            .all_at(below, StructureKind::Wall)
                            .map(|r| SupportSource::Structure(r.id)),
                    );
                    sources.extend(floor_at(below, index).map(SupportSource::Structure));
                }
            }
            StructureKind::Wall => {
                if let Some(edge) = placement.wall_edge() {
                    if let Some(floors) = self.wall_floors(coord, edge, index) {
                        sources.extend(floors.into_iter().map(SupportSource::Structure));
                    }
                    sources.extend(wall_below(coord, edge, index).map(SupportSource::Structure));
                }
            }
            StructureKind::Ramp => {
                if terrain_supports(coord, terrain) {
                    sources.insert(SupportSource::Terrain);
                }
                sources.extend(floor_at(coord, index).map(SupportSource::Structure));
            }
        }

        sources
    }

    /// Floors satisfying the wall rule on the two tiles sharing `edge`, or `None` if the
    /// policy is not met.
    fn wall_floors(
        &self,
        coord: GridCoordinate,
        edge: WallEdge,
        index: &OccupancyIndex,
    ) -> Option<Vec<StructureId>> {
        let (dx, dz) = edge.offset();
        let own = floor_at(coord, index);
        let across = coord.offset(dx, dz, 0).and_then(|c| floor_at(c, index));
        let floors: Vec<StructureId> = own.into_iter().chain(across).collect();

        let satisfied = match self.wall_policy {
            WallSupportPolicy::EitherSide => !floors.is_empty(),
            WallSupportPolicy::BothSides => floors.len() == 2,
        };
        satisfied.then_some(floors)
    }
}

/// Slots whose support rules can name a structure at `placement` as a source.
///
/// This is the reverse of [`SupportEvaluator::explain`]: any structure that
/// lists `placement` as a source sits at one of these keys.
#[must_use]
pub fn dependent_keys(placement: &Placement) -> Vec<PlacementKey> {
    let coord = placement.coord();
    let mut keys = Vec::new();
    let mut push_all = |coord: GridCoordinate, kind: StructureKind| {
        for &orientation in kind.key_orientations() {
            keys.push(PlacementKey::new(coord, kind, orientation));
        }
    };

    match placement.kind() {
        StructureKind::Floor => {
            for neighbor in coord.horizontal_neighbors() {
                push_all(neighbor, StructureKind::Floor);
            }
            if let Some(above) = coord.above() {
                push_all(above, StructureKind::Floor);
            }
            push_all(coord, StructureKind::Wall);
            push_all(coord, StructureKind::Ramp);
            // Walls on adjacent tiles whose edge faces this one.
            for edge in WallEdge::ALL {
                let (dx, dz) = edge.offset();
                if let Some(owner) = coord.offset(-dx, -dz, 0) {
                    keys.push(PlacementKey::new(
                        owner,
                        StructureKind::Wall,
                        Some(Orientation::Edge(edge)),
                    ));
                }
            }
        }
        StructureKind::Wall => {
            if let Some(above) = coord.above() {
                push_all(above, StructureKind::Floor);
                keys.push(PlacementKey::new(
                    above,
                    StructureKind::Wall,
                    Some(placement.orientation()),
                ));
            }
        }
        StructureKind::Ramp => {}
    }

    keys
}

fn terrain_supports<T: TerrainOracle + ?Sized>(coord: GridCoordinate, terrain: &T) -> bool {
    terrain.supports_at(coord.x, coord.z, coord.level)
}

fn floor_at(coord: GridCoordinate, index: &OccupancyIndex) -> Option<StructureId> {
    index.at(coord, StructureKind::Floor, None).map(|r| r.id)
}

fn wall_below(coord: GridCoordinate, edge: WallEdge, index: &OccupancyIndex) -> Option<StructureId> {
    let below = coord.below()?;
    index
        .at(below, StructureKind::Wall, Some(Orientation::Edge(edge)))
        .map(|r| r.id)
}
