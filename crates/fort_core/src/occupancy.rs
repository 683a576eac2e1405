//! Occupancy index: the authoritative store of live structures.
//!
//! Records live in an id-ordered arena; a second map resolves placement keys
//! to ids. Every spatial question (exact slot, any orientation on a cell,
//! the 8-neighbourhood) is answered with key lookups, so no query scans the
//! whole world except [`OccupancyIndex::within_radius`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::GridCoordinate;
use crate::structure::{Orientation, PlacementKey, StructureId, StructureKind, StructureRecord};

/// The placement key is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Slot already occupied by {existing}")]
pub struct SlotOccupied {
    /// Structure holding the slot.
    pub existing: StructureId,
}

/// Live structures keyed by id and by placement key.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    /// Records in id order, for deterministic iteration.
    records: BTreeMap<StructureId, StructureRecord>,
    /// Placement key to occupant.
    slots: HashMap<PlacementKey, StructureId>,
}

impl OccupancyIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live structures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a structure is live.
    #[must_use]
    pub fn contains(&self, id: StructureId) -> bool {
        self.records.contains_key(&id)
    }

    /// Insert a record, unless its placement key is taken.
    pub fn try_insert(&mut self, record: StructureRecord) -> Result<(), SlotOccupied> {
        let key = record.key();
        if let Some(&existing) = self.slots.get(&key) {
            return Err(SlotOccupied { existing });
        }
        debug_assert!(
            !self.records.contains_key(&record.id),
            "structure id {} inserted twice",
            record.id
        );
        self.slots.insert(key, record.id);
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Remove and return a record. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: StructureId) -> Option<StructureRecord> {
        let record = self.records.remove(&id)?;
        self.slots.remove(&record.key());
        Some(record)
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&StructureRecord> {
        self.records.get(&id)
    }

    /// Mutable access to a record. Only hit points may be changed through it.
    pub(crate) fn get_mut(&mut self, id: StructureId) -> Option<&mut StructureRecord> {
        self.records.get_mut(&id)
    }

    /// Exact key lookup. The orientation is ignored for floors.
    #[must_use]
    pub fn at(
        &self,
        coord: GridCoordinate,
        kind: StructureKind,
        orientation: Option<Orientation>,
    ) -> Option<&StructureRecord> {
        self.by_key(&PlacementKey::new(coord, kind, orientation))
    }

    /// Look up the occupant of a placement key.
    #[must_use]
    pub fn by_key(&self, key: &PlacementKey) -> Option<&StructureRecord> {
        self.slots.get(key).and_then(|id| self.records.get(id))
    }

    /// All records of `kind` on one cell, whatever their orientation.
    pub fn all_at(
        &self,
        coord: GridCoordinate,
        kind: StructureKind,
    ) -> impl Iterator<Item = &StructureRecord> + '_ {
        kind.key_orientations()
            .iter()
            .filter_map(move |&orientation| self.at(coord, kind, orientation))
    }

    /// Whether any record of `kind` sits on the cell.
    #[must_use]
    pub fn any_at(&self, coord: GridCoordinate, kind: StructureKind) -> bool {
        self.all_at(coord, kind).next().is_some()
    }

    /// All records of `kind` in the eight horizontally adjacent cells on the same level.
    pub fn neighbors_at(
        &self,
        coord: GridCoordinate,
        kind: StructureKind,
    ) -> impl Iterator<Item = &StructureRecord> + '_ {
        coord
            .horizontal_neighbors()
            .flat_map(move |neighbor| self.all_at(neighbor, kind))
    }

    /// Every live record, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &StructureRecord> + '_ {
        self.records.values()
    }

    /// Ids of every live record, in order.
    pub fn ids(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.records.keys().copied()
    }

    /// Records on any level whose tile lies within `radius` tiles of `(center_x, center_z)`.
    ///
    /// Uses a Euclidean disc; results are in id order.
    pub fn within_radius(
        &self,
        center_x: i32,
        center_z: i32,
        radius: u32,
    ) -> impl Iterator<Item = &StructureRecord> + '_ {
        let radius_sq = i64::from(radius) * i64::from(radius);
        self.records.values().filter(move |record| {
            let coord = record.coord();
            let dx = i64::from(coord.x) - i64::from(center_x);
            let dz = i64::from(coord.z) - i64::from(center_z);
            dx * dx + dz * dz <= radius_sq
        })
    }

    /// Verify that keys and records agree.
    pub(crate) fn check_keys(&self) -> Result<(), crate::error::InvariantViolation> {
        use crate::error::InvariantViolation;

        let mut seen: HashMap<PlacementKey, StructureId> = HashMap::new();
        for record in self.records.values() {
            if let Some(&first) = seen.get(&record.key()) {
                return Err(InvariantViolation::DuplicateKey {
                    first,
                    second: record.id,
                });
            }
            seen.insert(record.key(), record.id);
            if self.slots.get(&record.key()) != Some(&record.id) {
                return Err(InvariantViolation::Desynchronized(record.id));
            }
        }
        if let Some((_, &id)) = self.slots.iter().find(|(key, _)| !seen.contains_key(key)) {
            return Err(InvariantViolation::Desynchronized(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{MaterialTier, Placement, Rotation, WallEdge};

    fn cell(x: i32, z: i32, level: i32) -> GridCoordinate {
        GridCoordinate::new(x, z, level)
    }

    fn record(id: u64, placement: Placement) -> StructureRecord {
        StructureRecord {
            id: StructureId::new(id),
            placement,
            material: MaterialTier::Wood,
            max_hp: 100,
            current_hp: 100,
            placed_at: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Insert / Remove Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_try_insert_and_lookup() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(0, 0, 0))))
            .unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.contains(StructureId::new(1)));
        let found = index.at(cell(0, 0, 0), StructureKind::Floor, None).unwrap();
        assert_eq!(found.id, StructureId::new(1));
    }

    #[test]
    fn test_try_insert_rejects_taken_key() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::ramp(cell(4, 4, 0), Rotation::Deg0)))
            .unwrap();

        let err = index
            .try_insert(record(2, Placement::ramp(cell(4, 4, 0), Rotation::Deg0)))
            .unwrap_err();
        assert_eq!(err.existing, StructureId::new(1));
        assert_eq!(index.len(), 1);

        // Different rotation is a different key.
        index
            .try_insert(record(3, Placement::ramp(cell(4, 4, 0), Rotation::Deg90)))
            .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(0, 0, 0))))
            .unwrap();

        assert!(index.remove(StructureId::new(1)).is_some());
        assert!(index.remove(StructureId::new(1)).is_none());
        assert!(index.at(cell(0, 0, 0), StructureKind::Floor, None).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_slot_reusable_after_remove() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(0, 0, 0))))
            .unwrap();
        index.remove(StructureId::new(1));
        index
            .try_insert(record(2, Placement::floor(cell(0, 0, 0))))
            .unwrap();
        assert_eq!(
            index.at(cell(0, 0, 0), StructureKind::Floor, None).unwrap().id,
            StructureId::new(2)
        );
    }

    // ------------------------------------------------------------------------
    // Spatial Query Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_at_requires_matching_orientation_for_walls() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::wall(cell(0, 0, 0), WallEdge::North)))
            .unwrap();

        let north = Some(Orientation::Edge(WallEdge::North));
        let south = Some(Orientation::Edge(WallEdge::South));
        assert!(index.at(cell(0, 0, 0), StructureKind::Wall, north).is_some());
        assert!(index.at(cell(0, 0, 0), StructureKind::Wall, south).is_none());
        assert!(index.at(cell(0, 0, 0), StructureKind::Wall, None).is_none());
        assert!(index.any_at(cell(0, 0, 0), StructureKind::Wall));
    }

    #[test]
    fn test_all_at_collects_every_orientation() {
        let mut index = OccupancyIndex::new();
        for (id, edge) in WallEdge::ALL.into_iter().enumerate() {
            index
                .try_insert(record(id as u64 + 1, Placement::wall(cell(2, 2, 1), edge)))
                .unwrap();
        }
        assert_eq!(index.all_at(cell(2, 2, 1), StructureKind::Wall).count(), 4);
        assert_eq!(index.all_at(cell(2, 2, 0), StructureKind::Wall).count(), 0);
    }

    #[test]
    fn test_neighbors_at_same_level_only() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(1, 1, 0))))
            .unwrap();
        index
            .try_insert(record(2, Placement::floor(cell(-1, 0, 0))))
            .unwrap();
        // Different level.
        index
            .try_insert(record(3, Placement::floor(cell(1, 0, 1))))
            .unwrap();
        // Same cell is not a neighbour.
        index
            .try_insert(record(4, Placement::floor(cell(0, 0, 0))))
            .unwrap();
        // Two tiles away.
        index
            .try_insert(record(5, Placement::floor(cell(2, 0, 0))))
            .unwrap();

        let mut ids: Vec<_> = index
            .neighbors_at(cell(0, 0, 0), StructureKind::Floor)
            .map(|r| r.id.get())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_neighbors_at_filters_kind() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::wall(cell(1, 0, 0), WallEdge::West)))
            .unwrap();
        index
            .try_insert(record(2, Placement::floor(cell(0, 1, 0))))
            .unwrap();

        let walls: Vec<_> = index
            .neighbors_at(cell(0, 0, 0), StructureKind::Wall)
            .map(|r| r.id.get())
            .collect();
        assert_eq!(walls, vec![1]);
    }

    #[test]
    fn test_within_radius() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(0, 0, 0))))
            .unwrap();
        index
            .try_insert(record(2, Placement::floor(cell(3, 4, 5))))
            .unwrap();
        index
            .try_insert(record(3, Placement::floor(cell(4, 4, 0))))
            .unwrap();

        let ids: Vec<_> = index.within_radius(0, 0, 5).map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);

        let ids: Vec<_> = index.within_radius(0, 0, 0).map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_iter_is_id_ordered() {
        let mut index = OccupancyIndex::new();
        for id in [5, 2, 9, 1] {
            index
                .try_insert(record(id, Placement::floor(cell(id as i32, 0, 0))))
                .unwrap();
        }
        let ids: Vec<_> = index.ids().map(StructureId::get).collect();
        assert_eq!(ids, vec![1, 2, 5, 9]);
    }

    #[test]
    fn test_check_keys_passes_for_consistent_index() {
        let mut index = OccupancyIndex::new();
        index
            .try_insert(record(1, Placement::floor(cell(0, 0, 0))))
            .unwrap();
        index
            .try_insert(record(2, Placement::wall(cell(0, 0, 0), WallEdge::East)))
            .unwrap();
        assert!(index.check_keys().is_ok());
    }
}
