//! Invariant assertions and reference oracles.
//!
//! [`naive_survivors`] answers "what should still stand after removing this"
//! by brute force: keep deleting any unsupported structure from the whole
//! world until nothing changes. Cascade results are compared against it.

use std::collections::BTreeSet;

use fort_core::occupancy::OccupancyIndex;
use fort_core::prelude::*;

/// Panic with a readable message if any world invariant is broken.
///
/// # Panics
///
/// Panics on the first violation reported by `check_invariants`.
pub fn assert_world_consistent<T: TerrainOracle>(world: &BuildWorld<T>) {
    if let Err(violation) = world.check_invariants() {
        let records: Vec<String> = world
            .structures()
            .map(|r| format!("  {} {}", r.id, r.placement))
            .collect();
        panic!(
            "World invariant violated: {violation}\nLive structures ({}):\n{}",
            world.len(),
            records.join("\n")
        );
    }
}

/// Ids that remain after removing `target` and repeatedly sweeping every
/// unsupported structure out of the whole world.
#[must_use]
pub fn naive_survivors<T: TerrainOracle>(
    world: &BuildWorld<T>,
    target: StructureId,
) -> BTreeSet<StructureId> {
    let evaluator = *world.evaluator();
    let mut index = OccupancyIndex::new();
    for record in world.structures().filter(|r| r.id != target) {
        index
            .try_insert(record.clone())
            .expect("records from a consistent world have unique keys");
    }

    loop {
        let doomed: Vec<StructureId> = index
            .iter()
            .filter(|r| !evaluator.is_supported(&r.placement, &index, world.terrain()))
            .map(|r| r.id)
            .collect();
        if doomed.is_empty() {
            break;
        }
        for id in doomed {
            index.remove(id);
        }
    }
    index.ids().collect()
}
