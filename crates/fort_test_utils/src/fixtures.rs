//! Test fixtures and helpers.
//!
//! Pre-built worlds and structure layouts for consistent testing. Helpers
//! panic on failure, since a fixture that cannot be built is a broken test.

use fixed::types::I32F32;
use fort_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for a grid cell.
#[must_use]
pub const fn cell(x: i32, z: i32, level: i32) -> GridCoordinate {
    GridCoordinate::new(x, z, level)
}

/// Empty world over flat ground with the default config.
#[must_use]
pub fn flat_world() -> BuildWorld {
    world_with_policy(WallSupportPolicy::EitherSide)
}

/// Empty world over flat ground using the given wall policy.
#[must_use]
pub fn world_with_policy(wall_policy: WallSupportPolicy) -> BuildWorld {
    let config = BuildConfig {
        wall_policy,
        ..Default::default()
    };
    BuildWorld::new(config).expect("default config with any wall policy is valid")
}

/// Place a wood structure, panicking if the world rejects it.
pub fn place<T: TerrainOracle>(world: &mut BuildWorld<T>, placement: Placement) -> StructureId {
    match world.place_structure(placement, MaterialTier::Wood) {
        Ok(record) => record.id,
        Err(err) => panic!("fixture placement of {placement} failed: {err}"),
    }
}

/// A world holding a single column of floors on `(0, 0)`, levels `0..levels`.
///
/// Returns the world and the floor ids bottom-up.
#[must_use]
pub fn floor_tower(levels: i32) -> (BuildWorld, Vec<StructureId>) {
    let mut world = flat_world();
    let ids = (0..levels)
        .map(|level| place(&mut world, Placement::floor(cell(0, 0, level))))
        .collect();
    (world, ids)
}

/// Fill a `width` x `depth` rectangle of floors starting at `origin`, row by row.
pub fn floor_slab<T: TerrainOracle>(
    world: &mut BuildWorld<T>,
    origin: GridCoordinate,
    width: i32,
    depth: i32,
) -> Vec<StructureId> {
    let mut ids = Vec::new();
    for dx in 0..width {
        for dz in 0..depth {
            let coord = cell(origin.x + dx, origin.z + dz, origin.level);
            ids.push(place(world, Placement::floor(coord)));
        }
    }
    ids
}

/// Put a wall on every edge of `coord`, which must already be supported for walls.
pub fn walled_cell<T: TerrainOracle>(
    world: &mut BuildWorld<T>,
    coord: GridCoordinate,
) -> [StructureId; 4] {
    WallEdge::ALL.map(|edge| place(world, Placement::wall(coord, edge)))
}

/// One step of a scripted or generated world history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldOp {
    /// Attempt a placement; rejections are ignored.
    Place {
        /// What to place.
        placement: Placement,
        /// Material tier.
        material: MaterialTier,
    },
    /// Remove a structure by raw id; absent ids are ignored.
    Remove(u64),
    /// Set hit points on a structure by raw id.
    SetHealth {
        /// Raw structure id.
        id: u64,
        /// New hit points.
        hp: u32,
    },
    /// Advance the logical clock by one.
    Tick,
}

impl WorldOp {
    /// Apply this operation, ignoring expected failures.
    pub fn apply<T: TerrainOracle>(&self, world: &mut BuildWorld<T>) {
        match *self {
            Self::Place {
                placement,
                material,
            } => {
                let _ = world.place_structure(placement, material);
            }
            Self::Remove(id) => {
                let _ = world.remove_structure(StructureId::new(id));
            }
            Self::SetHealth { id, hp } => {
                let _ = world.set_health(StructureId::new(id), hp);
            }
            Self::Tick => {
                let next = world.clock() + 1;
                world.set_clock(next);
            }
        }
    }
}

/// Build a fresh flat world and apply `ops` in order.
#[must_use]
pub fn replay_ops(ops: &[WorldOp]) -> BuildWorld {
    let mut world = flat_world();
    for op in ops {
        op.apply(&mut world);
    }
    world
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_tower_ids_bottom_up() {
        let (world, ids) = floor_tower(4);
        assert_eq!(world.len(), 4);
        for (level, id) in ids.iter().enumerate() {
            assert_eq!(world.get(*id).unwrap().coord().level, level as i32);
        }
    }

    #[test]
    fn test_floor_slab_and_walls() {
        let mut world = flat_world();
        let slab = floor_slab(&mut world, cell(-1, -1, 0), 3, 2);
        assert_eq!(slab.len(), 6);
        let walls = walled_cell(&mut world, cell(0, 0, 0));
        assert_eq!(walls.len(), 4);
        assert_eq!(world.len(), 10);
    }

    #[test]
    fn test_replay_ops_applies_in_order() {
        let ops = [
            WorldOp::Tick,
            WorldOp::Place {
                placement: Placement::floor(cell(0, 0, 0)),
                material: MaterialTier::Stone,
            },
            WorldOp::SetHealth { id: 1, hp: 7 },
            WorldOp::Remove(42),
        ];
        let world = replay_ops(&ops);
        let record = world.get(StructureId::new(1)).unwrap();
        assert_eq!(record.placed_at, 1);
        assert_eq!(record.current_hp, 7);
    }
}
