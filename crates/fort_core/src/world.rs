//! The build world: one serialized owner of the occupancy index and the
//! dependency graph.
//!
//! Every mutation is a single `&mut self` call that leaves the world
//! consistent before it returns:
//!
//! - **Placement** validates read-only, then inserts the record, records its
//!   support sources, and refreshes the sources of every structure it could
//!   support.
//! - **Removal** runs the [`CascadeEngine`] to a fixed point.
//!
//! With the `debug-validation` feature, the full invariant checker runs after
//! every transaction and panics on the first violation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, warn};

use crate::cascade::{CascadeEngine, RemovalOutcome};
use crate::config::BuildConfig;
use crate::error::{CoreError, InvariantViolation, PlacementError, Result};
use crate::graph::DependencyGraph;
use crate::grid::{GridCoordinate, GridMapper};
use crate::occupancy::OccupancyIndex;
use crate::snapshot::WorldSnapshot;
use crate::structure::{
    MaterialTier, Orientation, Placement, StructureId, StructureKind, StructureRecord,
};
use crate::support::{dependent_keys, SupportEvaluator};
use crate::terrain::{FlatTerrain, TerrainOracle};

/// A grid of player-built structures over one terrain.
#[derive(Debug, Clone)]
pub struct BuildWorld<T: TerrainOracle = FlatTerrain> {
    config: BuildConfig,
    mapper: GridMapper,
    evaluator: SupportEvaluator,
    terrain: T,
    index: OccupancyIndex,
    graph: DependencyGraph,
    /// Next structure id to assign.
    next_id: u64,
    /// Logical clock stamped onto new records.
    clock: u64,
}

impl BuildWorld<FlatTerrain> {
    /// Create an empty world over flat ground at `config.ground_level`.
    pub fn new(config: BuildConfig) -> Result<Self> {
        let terrain = FlatTerrain::new(config.ground_level);
        Self::with_terrain(config, terrain)
    }
}

impl<T: TerrainOracle> BuildWorld<T> {
    /// Create an empty world over a custom terrain oracle.
    pub fn with_terrain(config: BuildConfig, terrain: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mapper: config.mapper(),
            evaluator: SupportEvaluator::new(config.wall_policy),
            config,
            terrain,
            index: OccupancyIndex::new(),
            graph: DependencyGraph::new(),
            next_id: 1,
            clock: 0,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Coordinate mapper for this world's cell size.
    #[must_use]
    pub fn mapper(&self) -> &GridMapper {
        &self.mapper
    }

    /// Terrain oracle.
    #[must_use]
    pub fn terrain(&self) -> &T {
        &self.terrain
    }

    /// Support rule evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &SupportEvaluator {
        &self.evaluator
    }

    /// Occupancy index (read-only).
    #[must_use]
    pub fn index(&self) -> &OccupancyIndex {
        &self.index
    }

    /// Dependency graph (read-only).
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Number of live structures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the world holds no structures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every live record, in id order.
    pub fn structures(&self) -> impl Iterator<Item = &StructureRecord> + '_ {
        self.index.iter()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&StructureRecord> {
        self.index.get(id)
    }

    /// Exact slot lookup. The orientation is ignored for floors.
    #[must_use]
    pub fn get_structure_at(
        &self,
        coord: GridCoordinate,
        kind: StructureKind,
        orientation: Option<Orientation>,
    ) -> Option<&StructureRecord> {
        self.index.at(coord, kind, orientation)
    }

    /// Records whose tile lies within `radius` tiles of `(center_x, center_z)`, on any level.
    #[must_use]
    pub fn query_area(&self, center_x: i32, center_z: i32, radius: u32) -> Vec<StructureRecord> {
        self.index
            .within_radius(center_x, center_z, radius)
            .cloned()
            .collect()
    }

    /// Current logical clock.
    #[must_use]
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    /// Set the logical clock stamped onto later placements.
    pub fn set_clock(&mut self, clock: u64) {
        self.clock = clock;
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Check a placement without changing anything.
    ///
    /// Checks run in order: bounds, overlap, support. Bounds come first
    /// because they are part of the placement path's own validation, so a
    /// cell outside the build volume reports `out_of_bounds` even when the
    /// slot is also taken.
    pub fn validate_placement(&self, placement: &Placement) -> std::result::Result<(), PlacementError> {
        let coord = placement.coord();
        if !self.config.in_bounds(coord) {
            return Err(PlacementError::OutOfBounds { coord });
        }
        if let Some(existing) = self.index.by_key(&placement.key()) {
            return Err(PlacementError::Overlap {
                existing: existing.id,
            });
        }
        if !self
            .evaluator
            .is_supported(placement, &self.index, &self.terrain)
        {
            return Err(PlacementError::Unsupported {
                kind: placement.kind(),
                coord,
            });
        }
        Ok(())
    }

    /// Validate and commit a placement, returning the new record.
    pub fn place_structure(
        &mut self,
        placement: Placement,
        material: MaterialTier,
    ) -> std::result::Result<StructureRecord, PlacementError> {
        if let Err(err) = self.validate_placement(&placement) {
            debug!(code = err.code(), %placement, "Placement rejected");
            return Err(err);
        }

        let Some(following) = self.next_id.checked_add(1) else {
            let err = PlacementError::IdsExhausted;
            debug!(code = err.code(), %placement, "Placement rejected");
            return Err(err);
        };

        let max_hp = self.config.materials.max_hp(material);
        let record = StructureRecord {
            id: StructureId::new(self.next_id),
            placement,
            material,
            max_hp,
            current_hp: max_hp,
            placed_at: self.clock,
        };
        self.insert(record.clone())?;
        self.next_id = following;

        debug!(id = %record.id, kind = %record.kind(), coord = %record.coord(), "Structure placed");
        self.validate_after_transaction();
        Ok(record)
    }

    /// Insert a record into index and graph, then refresh everything it may support.
    fn insert(&mut self, record: StructureRecord) -> std::result::Result<(), PlacementError> {
        let id = record.id;
        let placement = record.placement;
        self.index.try_insert(record)?;
        self.graph.insert_node(id);

        let sources = self
            .evaluator
            .explain(&placement, &self.index, &self.terrain);
        debug_assert!(!sources.is_empty(), "committed {placement} without support");
        self.graph.set_sources(id, sources);

        let refreshed: Vec<_> = dependent_keys(&placement)
            .iter()
            .filter_map(|key| self.index.by_key(key))
            .map(|dependent| {
                let sources =
                    self.evaluator
                        .explain(&dependent.placement, &self.index, &self.terrain);
                (dependent.id, sources)
            })
            .collect();
        for (dependent, sources) in refreshed {
            self.graph.set_sources(dependent, sources);
        }

        debug_assert_eq!(self.index.len(), self.graph.len());
        Ok(())
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove a structure and everything that loses support because of it.
    ///
    /// Removing an absent id is a no-op with an empty outcome.
    pub fn remove_structure(&mut self, id: StructureId) -> RemovalOutcome {
        let outcome =
            CascadeEngine::new(&mut self.index, &mut self.graph, &self.evaluator, &self.terrain)
                .remove(id);
        self.validate_after_transaction();
        outcome
    }

    /// Set a structure's hit points, clamped to its max.
    ///
    /// Returns the stored value, or `None` if the structure is gone. Reaching
    /// zero does not destroy anything.
    pub fn set_health(&mut self, id: StructureId, hp: u32) -> Option<u32> {
        let record = self.index.get_mut(id)?;
        record.current_hp = hp.min(record.max_hp);
        Some(record.current_hp)
    }

    /// Swap the terrain oracle and collapse whatever it no longer holds up.
    pub fn replace_terrain(&mut self, terrain: T) -> RemovalOutcome {
        self.terrain = terrain;
        self.graph = DependencyGraph::rebuild(&self.index, &self.evaluator, &self.terrain);

        let candidates: Vec<_> = self.index.ids().collect();
        let outcome = CascadeEngine::new(
            &mut self.index,
            &mut self.graph,
            &self.evaluator,
            &self.terrain,
        )
        .collapse(candidates);
        if !outcome.is_empty() {
            warn!(collapsed = outcome.len(), "Terrain change collapsed structures");
        }
        self.validate_after_transaction();
        outcome
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Capture the live records and counters.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::new(self.clock, self.next_id, self.index.iter().cloned().collect())
    }

    /// Rebuild a world from a snapshot.
    ///
    /// Ids, materials and hit points are kept. Each record must still have a
    /// legal orientation, lie in bounds and not overlap an earlier one.
    /// Support is judged on the full record set, and anything the terrain no
    /// longer holds up is collapsed.
    pub fn restore(config: BuildConfig, terrain: T, snapshot: &WorldSnapshot) -> Result<Self> {
        let mut world = Self::with_terrain(config, terrain)?;
        let mut records = snapshot.records.clone();
        records.sort_by_key(|r| r.id);

        let mut last_id = 0;
        for record in records {
            let id = record.id;
            let fail = |source| CoreError::SnapshotRecord { id, source };

            let placement = Placement::new(
                record.placement.kind(),
                record.placement.coord(),
                record.placement.orientation(),
            )
            .map_err(fail)?;
            if !world.config.in_bounds(placement.coord()) {
                return Err(fail(PlacementError::OutOfBounds {
                    coord: placement.coord(),
                }));
            }
            // `u64::MAX` is never assigned, so a record carrying it cannot be ours.
            if id.get() == u64::MAX {
                return Err(fail(PlacementError::IdsExhausted));
            }
            if world.index.contains(id) {
                return Err(fail(PlacementError::Overlap { existing: id }));
            }
            world
                .index
                .try_insert(StructureRecord {
                    placement,
                    current_hp: record.current_hp.min(record.max_hp),
                    ..record
                })
                .map_err(|e| fail(e.into()))?;
            last_id = id.get();
        }

        world.graph = DependencyGraph::rebuild(&world.index, &world.evaluator, &world.terrain);
        let candidates: Vec<_> = world.index.ids().collect();
        let outcome = CascadeEngine::new(
            &mut world.index,
            &mut world.graph,
            &world.evaluator,
            &world.terrain,
        )
        .collapse(candidates);
        if !outcome.is_empty() {
            warn!(
                collapsed = outcome.len(),
                "Snapshot restore dropped unsupported structures"
            );
        }

        world.next_id = snapshot.next_id.max(last_id + 1);
        world.clock = snapshot.clock;
        world.validate_after_transaction();
        Ok(world)
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Deterministic hash of the live records and counters.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.clock.hash(&mut hasher);
        self.next_id.hash(&mut hasher);
        self.index.len().hash(&mut hasher);
        for record in self.index.iter() {
            record.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Verify every structural invariant, and that the graph matches a fresh rebuild.
    pub fn check_invariants(&self) -> std::result::Result<(), InvariantViolation> {
        self.index.check_keys()?;

        for record in self.index.iter() {
            if !self
                .evaluator
                .is_supported(&record.placement, &self.index, &self.terrain)
            {
                return Err(InvariantViolation::Unsupported(record.id));
            }
        }

        self.graph.check_symmetry()?;

        if let Some(id) = self.index.ids().find(|&id| !self.graph.contains(id)) {
            return Err(InvariantViolation::Desynchronized(id));
        }
        if let Some(id) = self.graph.ids().find(|&id| !self.index.contains(id)) {
            return Err(InvariantViolation::Desynchronized(id));
        }

        let fresh = DependencyGraph::rebuild(&self.index, &self.evaluator, &self.terrain);
        for id in self.index.ids() {
            if self.graph.supported_by(id) != fresh.supported_by(id)
                || self.graph.supports(id) != fresh.supports(id)
            {
                return Err(InvariantViolation::StaleEdges(id));
            }
        }
        Ok(())
    }

    #[cfg(feature = "debug-validation")]
    fn validate_after_transaction(&self) {
        if let Err(violation) = self.check_invariants() {
            panic!("build world invariant violated: {violation}");
        }
    }

    #[cfg(not(feature = "debug-validation"))]
    fn validate_after_transaction(&self) {
        debug_assert_eq!(self.index.len(), self.graph.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::DestructionCause;
    use crate::structure::{Rotation, WallEdge};
    use crate::support::WallSupportPolicy;

    fn cell(x: i32, z: i32, level: i32) -> GridCoordinate {
        GridCoordinate::new(x, z, level)
    }

    fn world() -> BuildWorld {
        BuildWorld::new(BuildConfig::default()).unwrap()
    }

    fn place(world: &mut BuildWorld, placement: Placement) -> StructureId {
        world.place_structure(placement, MaterialTier::Wood).unwrap().id
    }

    // ------------------------------------------------------------------------
    // Placement Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_place_assigns_sequential_ids() {
        let mut world = world();
        let a = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let b = place(&mut world, Placement::floor(cell(1, 0, 0)));
        assert_eq!(a, StructureId::new(1));
        assert_eq!(b, StructureId::new(2));
        assert_eq!(world.len(), 2);
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_place_stamps_material_and_clock() {
        let mut world = world();
        world.set_clock(42);
        let record = world
            .place_structure(Placement::floor(cell(0, 0, 0)), MaterialTier::Metal)
            .unwrap();
        assert_eq!(record.max_hp, 500);
        assert_eq!(record.current_hp, 500);
        assert_eq!(record.placed_at, 42);
        assert_eq!(world.get(record.id), Some(&record));
    }

    #[test]
    fn test_rejections_do_not_mutate() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let before = world.state_hash();

        assert_eq!(
            world.place_structure(Placement::floor(cell(0, 0, 0)), MaterialTier::Wood),
            Err(PlacementError::Overlap {
                existing: StructureId::new(1)
            })
        );
        assert_eq!(
            world.place_structure(Placement::floor(cell(8, 8, 2)), MaterialTier::Wood),
            Err(PlacementError::Unsupported {
                kind: StructureKind::Floor,
                coord: cell(8, 8, 2)
            })
        );
        assert_eq!(
            world.place_structure(Placement::floor(cell(0, 0, -1)), MaterialTier::Wood),
            Err(PlacementError::OutOfBounds {
                coord: cell(0, 0, -1)
            })
        );
        assert_eq!(world.state_hash(), before);

        // Failed attempts do not consume ids.
        let next = place(&mut world, Placement::floor(cell(1, 0, 0)));
        assert_eq!(next, StructureId::new(2));
    }

    #[test]
    fn test_validate_checks_bounds_before_overlap() {
        let config = BuildConfig {
            max_tile_extent: 4,
            ..Default::default()
        };
        let world = BuildWorld::new(config).unwrap();
        assert_eq!(
            world.validate_placement(&Placement::floor(cell(5, 0, 0))),
            Err(PlacementError::OutOfBounds { coord: cell(5, 0, 0) })
        );
        assert!(world.validate_placement(&Placement::floor(cell(4, 0, 0))).is_ok());
    }

    #[test]
    fn test_floor_rotation_does_not_change_slot() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let rotated = Placement::new(
            StructureKind::Floor,
            cell(0, 0, 0),
            Orientation::Rotation(Rotation::Deg90),
        )
        .unwrap();
        assert!(matches!(
            world.validate_placement(&rotated),
            Err(PlacementError::Overlap { .. })
        ));
    }

    #[test]
    fn test_placement_refreshes_dependents() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 1, 0)));
        let wall = place(&mut world, Placement::wall(cell(0, 0, 0), WallEdge::North));
        // New floor under the wall's own tile becomes a second source.
        let floor = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let sources = world.graph().supported_by(wall).unwrap();
        assert!(sources.contains(&crate::support::SupportSource::Structure(floor)));
        assert!(world.check_invariants().is_ok());
    }

    // ------------------------------------------------------------------------
    // Removal Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_remove_tower() {
        let mut world = world();
        let ids: Vec<_> = (0..4)
            .map(|level| place(&mut world, Placement::floor(cell(0, 0, level))))
            .collect();
        let outcome = world.remove_structure(ids[0]);
        assert_eq!(outcome.destroyed_ids(), ids);
        assert!(world.is_empty());
        assert!(world.remove_structure(ids[0]).is_empty());
    }

    #[test]
    fn test_floor_stands_until_last_support_goes() {
        let mut world = world();
        let ground = place(&mut world, Placement::floor(cell(3, 3, 0)));
        let wall = place(&mut world, Placement::wall(cell(3, 3, 0), WallEdge::East));
        let upper = place(&mut world, Placement::floor(cell(3, 3, 1)));

        // The upper floor also rests on the ground floor below.
        assert_eq!(world.remove_structure(wall).destroyed_ids(), vec![wall]);
        assert!(world.get(upper).is_some());

        let outcome = world.remove_structure(ground);
        assert_eq!(outcome.destroyed_ids(), vec![ground, upper]);
        assert_eq!(outcome.destroyed[1].cause, DestructionCause::Collapsed);
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_ramp_falls_with_its_floor() {
        let mut world = world();
        let ground = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let upper = place(&mut world, Placement::floor(cell(0, 0, 1)));
        let ramp = place(&mut world, Placement::ramp(cell(0, 0, 1), Rotation::Deg180));
        let outcome = world.remove_structure(ground);
        assert_eq!(outcome.destroyed_ids(), vec![ground, upper, ramp]);
    }

    #[test]
    fn test_set_health_clamps() {
        let mut world = world();
        let id = place(&mut world, Placement::floor(cell(0, 0, 0)));
        assert_eq!(world.set_health(id, 40), Some(40));
        assert_eq!(world.set_health(id, 10_000), Some(150));
        assert_eq!(world.set_health(id, 0), Some(0));
        assert!(world.get(id).is_some());
        assert_eq!(world.set_health(StructureId::new(99), 1), None);
    }

    // ------------------------------------------------------------------------
    // Query Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_query_area_and_get_at() {
        let mut world = world();
        let a = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let b = place(&mut world, Placement::wall(cell(0, 0, 0), WallEdge::South));
        place(&mut world, Placement::floor(cell(10, 0, 0)));

        let ids: Vec<_> = world.query_area(0, 0, 3).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);

        let south = Some(Orientation::Edge(WallEdge::South));
        assert_eq!(
            world
                .get_structure_at(cell(0, 0, 0), StructureKind::Wall, south)
                .map(|r| r.id),
            Some(b)
        );
        assert!(world
            .get_structure_at(cell(0, 0, 0), StructureKind::Wall, None)
            .is_none());
    }

    // ------------------------------------------------------------------------
    // Terrain / Snapshot Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_replace_terrain_collapses_unsupported() {
        let mut world = world();
        let ground = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let upper = place(&mut world, Placement::floor(cell(0, 0, 1)));

        let outcome = world.replace_terrain(FlatTerrain::new(1));
        assert_eq!(outcome.destroyed_ids(), vec![ground]);
        // Upper floor now stands on the raised ground.
        assert!(world.get(upper).is_some());
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_snapshot_restore_preserves_state() {
        let mut world = world();
        world.set_clock(7);
        let a = place(&mut world, Placement::floor(cell(0, 0, 0)));
        place(&mut world, Placement::floor(cell(0, 0, 1)));
        world.set_health(a, 99);
        let removed = place(&mut world, Placement::floor(cell(5, 5, 0)));
        world.remove_structure(removed);

        let snapshot = world.snapshot();
        let restored =
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &snapshot)
                .unwrap();
        assert_eq!(restored.state_hash(), world.state_hash());
        assert_eq!(restored.get(a).map(|r| r.current_hp), Some(99));
        assert!(restored.check_invariants().is_ok());
    }

    #[test]
    fn test_restore_handles_support_placed_later() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        place(&mut world, Placement::floor(cell(1, 0, 0)));
        let x = place(&mut world, Placement::floor(cell(0, 0, 1)));
        let y = place(&mut world, Placement::floor(cell(1, 0, 1)));
        // x now rests only on y, which was placed after it.
        world.remove_structure(StructureId::new(1));
        assert!(world.get(x).is_some());

        let restored =
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &world.snapshot())
                .unwrap();
        assert!(restored.get(x).is_some());
        assert!(restored.get(y).is_some());
        assert_eq!(restored.state_hash(), world.state_hash());
    }

    #[test]
    fn test_restore_next_id_continues() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let mut snapshot = world.snapshot();
        snapshot.next_id = 0;
        let mut restored =
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &snapshot)
                .unwrap();
        let next = place(&mut restored, Placement::floor(cell(1, 0, 0)));
        assert_eq!(next, StructureId::new(2));
    }

    #[test]
    fn test_restore_rejects_duplicate_slots() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let mut snapshot = world.snapshot();
        let mut copy = snapshot.records[0].clone();
        copy.id = StructureId::new(5);
        snapshot.records.push(copy);
        assert!(matches!(
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &snapshot),
            Err(CoreError::SnapshotRecord { id, .. }) if id == StructureId::new(5)
        ));
    }

    #[test]
    fn test_restore_rejects_unassignable_id() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let mut snapshot = world.snapshot();
        snapshot.records[0].id = StructureId::new(u64::MAX);
        assert!(matches!(
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &snapshot),
            Err(CoreError::SnapshotRecord {
                source: PlacementError::IdsExhausted,
                ..
            })
        ));
    }

    #[test]
    fn test_placement_after_last_id_is_rejected() {
        let mut world = world();
        let kept = place(&mut world, Placement::floor(cell(0, 0, 0)));
        let mut snapshot = world.snapshot();
        snapshot.next_id = u64::MAX - 1;
        let mut restored =
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::default(), &snapshot)
                .unwrap();

        let last = place(&mut restored, Placement::floor(cell(1, 0, 0)));
        assert_eq!(last, StructureId::new(u64::MAX - 1));
        assert_eq!(
            restored.place_structure(Placement::floor(cell(2, 0, 0)), MaterialTier::Wood),
            Err(PlacementError::IdsExhausted)
        );
        assert_eq!(restored.len(), 2);
        assert!(restored.get(kept).is_some());
        assert!(restored.check_invariants().is_ok());
    }

    #[test]
    fn test_restore_with_other_terrain_collapses() {
        let mut world = world();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        let restored =
            BuildWorld::restore(BuildConfig::default(), FlatTerrain::new(3), &world.snapshot())
                .unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_both_sides_policy_from_config() {
        let config = BuildConfig {
            wall_policy: WallSupportPolicy::BothSides,
            ..Default::default()
        };
        let mut world = BuildWorld::new(config).unwrap();
        place(&mut world, Placement::floor(cell(0, 0, 0)));
        assert!(matches!(
            world.place_structure(Placement::wall(cell(0, 0, 0), WallEdge::North), MaterialTier::Wood),
            Err(PlacementError::Unsupported { .. })
        ));
        place(&mut world, Placement::floor(cell(0, 1, 0)));
        place(&mut world, Placement::wall(cell(0, 0, 0), WallEdge::North));
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BuildConfig {
            tile_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            BuildWorld::new(config),
            Err(CoreError::InvalidConfig(_))
        ));
    }
}
