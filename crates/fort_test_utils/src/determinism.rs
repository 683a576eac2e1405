//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a build world produces identical
//! results given identical operation histories.
//!
//! # Testing Strategy
//!
//! The same history must yield the same world on every machine and every run,
//! or replicas and saved games drift apart. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can round differently at a cell
//!   boundary. World positions use [`fort_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Records iterate in id order and cascade queues are seeded in id order.
//!
//! - **Wall-clock time**: Records carry a logical clock, never `Instant`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use fort_core::prelude::*;

use crate::fixtures::{flat_world, replay_ops, WorldOp};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Build world is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state, given the step index
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: usize,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, usize),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for i in 0..steps {
            step(&mut state, i);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Apply the same operation history to `runs` fresh worlds and compare hashes.
#[must_use]
pub fn verify_operation_determinism(runs: usize, ops: &[WorldOp]) -> DeterminismResult {
    verify_determinism(
        runs,
        ops.len(),
        flat_world,
        |world, i| ops[i].apply(world),
        BuildWorld::state_hash,
    )
}

/// Replay the same history on `num_worlds` scoped threads and collect final hashes.
///
/// Catches state that leaks between threads or depends on scheduling.
#[must_use]
pub fn run_parallel_worlds(ops: &[WorldOp], num_worlds: usize) -> Vec<u64> {
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| s.spawn(|| replay_ops(ops).state_hash()))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("replay thread panicked"))
            .collect()
    })
}

/// Replay a history on two worlds side by side, finding the first step where
/// they differ.
///
/// # Returns
///
/// `None` if the worlds never diverge, `Some(step)` for the first step
/// (1-based) after which their hashes differ.
#[must_use]
pub fn find_first_divergence(ops: &[WorldOp]) -> Option<usize> {
    let mut first = flat_world();
    let mut second = flat_world();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for (i, op) in ops.iter().enumerate() {
        op.apply(&mut first);
        op.apply(&mut second);

        if first.state_hash() != second.state_hash() {
            return Some(i + 1);
        }
    }

    None
}

/// Verify that a snapshot round trip preserves the world exactly.
#[must_use]
pub fn verify_snapshot_determinism<T: TerrainOracle + Clone>(world: &BuildWorld<T>) -> bool {
    let Ok(bytes) = world.snapshot().to_bytes() else {
        return false;
    };
    let Ok(snapshot) = WorldSnapshot::from_bytes(&bytes) else {
        return false;
    };
    let Ok(restored) =
        BuildWorld::restore(world.config().clone(), world.terrain().clone(), &snapshot)
    else {
        return false;
    };
    restored.state_hash() == world.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for build worlds.
///
/// Coordinates are drawn from a small region so that random histories
/// actually stack, touch and collapse instead of scattering.
pub mod strategies {
    use fort_core::prelude::*;
    use proptest::prelude::*;

    use crate::fixtures::WorldOp;

    /// Half-width of the generated tile region.
    pub const REGION: i32 = 3;
    /// Levels `0..LEVELS` are generated.
    pub const LEVELS: i32 = 4;

    /// Generate a cell in the test region.
    pub fn arb_coord() -> impl Strategy<Value = GridCoordinate> {
        (-REGION..=REGION, -REGION..=REGION, 0..LEVELS)
            .prop_map(|(x, z, level)| GridCoordinate::new(x, z, level))
    }

    /// Generate a snapped rotation.
    pub fn arb_rotation() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Deg0),
            Just(Rotation::Deg90),
            Just(Rotation::Deg180),
            Just(Rotation::Deg270),
        ]
    }

    /// Generate a material tier.
    pub fn arb_material() -> impl Strategy<Value = MaterialTier> {
        prop_oneof![
            Just(MaterialTier::Wood),
            Just(MaterialTier::Stone),
            Just(MaterialTier::Metal),
        ]
    }

    /// Generate a well-formed placement of any kind, floors weighted up.
    pub fn arb_placement() -> impl Strategy<Value = Placement> {
        prop_oneof![
            3 => arb_coord().prop_map(Placement::floor),
            2 => (arb_coord(), arb_rotation())
                .prop_map(|(coord, r)| Placement::wall(coord, WallEdge::from_rotation(r))),
            1 => (arb_coord(), arb_rotation()).prop_map(|(coord, r)| Placement::ramp(coord, r)),
        ]
    }

    /// Generate a raw id that may or may not be live after `max_len` steps.
    pub fn arb_raw_id(max_len: usize) -> impl Strategy<Value = u64> {
        1..=(max_len as u64 + 1)
    }

    /// Generate one operation, placements weighted up.
    pub fn arb_operation(max_len: usize) -> impl Strategy<Value = WorldOp> {
        prop_oneof![
            6 => (arb_placement(), arb_material())
                .prop_map(|(placement, material)| WorldOp::Place { placement, material }),
            2 => arb_raw_id(max_len).prop_map(WorldOp::Remove),
            1 => (arb_raw_id(max_len), 0u32..600)
                .prop_map(|(id, hp)| WorldOp::SetHealth { id, hp }),
            1 => Just(WorldOp::Tick),
        ]
    }

    /// Generate a history of operations.
    pub fn arb_operation_sequence(max_len: usize) -> impl Strategy<Value = Vec<WorldOp>> {
        proptest::collection::vec(arb_operation(max_len), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{cell, floor_tower};
    use proptest::prelude::*;

    fn sample_ops() -> Vec<WorldOp> {
        let mut ops = Vec::new();
        for level in 0..3 {
            ops.push(WorldOp::Place {
                placement: Placement::floor(cell(0, 0, level)),
                material: MaterialTier::Wood,
            });
            ops.push(WorldOp::Tick);
        }
        ops.push(WorldOp::Place {
            placement: Placement::wall(cell(0, 0, 1), WallEdge::North),
            material: MaterialTier::Metal,
        });
        ops.push(WorldOp::SetHealth { id: 4, hp: 10 });
        ops.push(WorldOp::Remove(2));
        ops
    }

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_history_determinism() {
        verify_operation_determinism(3, &[]).assert_deterministic();
    }

    #[test]
    fn test_sample_history_determinism() {
        let result = verify_operation_determinism(4, &sample_ops());
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_parallel_worlds_agree() {
        let hashes = run_parallel_worlds(&sample_ops(), 4);
        assert_eq!(hashes.len(), 4);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_find_divergence_on_deterministic_history() {
        assert!(find_first_divergence(&sample_ops()).is_none());
    }

    #[test]
    fn test_history_changes_hash() {
        let ops = sample_ops();
        let full = replay_ops(&ops).state_hash();
        let partial = replay_ops(&ops[..ops.len() - 1]).state_hash();
        assert_ne!(full, partial);
    }

    // =========================================================================
    // Snapshot round-trip tests
    // =========================================================================

    #[test]
    fn test_snapshot_preserves_empty_world() {
        assert!(verify_snapshot_determinism(&flat_world()));
    }

    #[test]
    fn test_snapshot_preserves_tower() {
        let (world, _) = floor_tower(6);
        assert!(verify_snapshot_determinism(&world));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u64, "floor")), compute_hash(&(1u64, "floor")));
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_random_histories_are_deterministic(ops in strategies::arb_operation_sequence(40)) {
            let result = verify_operation_determinism(2, &ops);
            prop_assert!(result.is_deterministic, "hashes: {:?}", result.hashes);
        }

        #[test]
        fn prop_random_worlds_survive_snapshot(ops in strategies::arb_operation_sequence(40)) {
            let world = replay_ops(&ops);
            prop_assert!(verify_snapshot_determinism(&world));
        }
    }
}
