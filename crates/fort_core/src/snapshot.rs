//! Binary snapshots of a build world.
//!
//! A snapshot holds the live records in id order plus the id and clock
//! counters. The index and graph are not stored. Restoring inserts every
//! record at once, checking orientation, bounds, duplicate ids and slot
//! overlap, then rebuilds the graph over the full set and collapses anything
//! left unsupported. See [`crate::world::BuildWorld::restore`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::structure::StructureRecord;

/// Snapshot format version for compatibility.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized state of one build world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Logical clock at save time.
    pub clock: u64,
    /// Next id the world would have assigned.
    pub next_id: u64,
    /// Live records, in placement order.
    pub records: Vec<StructureRecord>,
}

impl WorldSnapshot {
    /// Build a snapshot, sorting records into placement order.
    #[must_use]
    pub fn new(clock: u64, next_id: u64, mut records: Vec<StructureRecord>) -> Self {
        // Ids are assigned in placement order.
        records.sort_by_key(|r| r.id);
        Self {
            version: SNAPSHOT_VERSION,
            clock,
            next_id,
            records,
        }
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode with bincode, rejecting other format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoreError::SnapshotVersion {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Save the snapshot to a file.
    ///
    /// # Errors
    /// Returns an error if encoding or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Load a snapshot from a file.
    ///
    /// # Errors
    /// Returns an error if reading, decoding or the version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}
