//! Cascade destruction.
//!
//! Removing a structure may leave others without support. The engine deletes
//! the target, then walks the dependency graph outward from it. Every
//! candidate is re-checked with the [`SupportEvaluator`] against the current
//! occupancy index, never against the graph. Candidates that fail are deleted
//! and their own dependents are queued, until nothing fails.
//!
//! A candidate that survives is queued again if a later deletion in the same
//! pass takes away another of its supports. Survivors get their support
//! sources refreshed, so the graph leaves the pass exact.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::graph::DependencyGraph;
use crate::occupancy::OccupancyIndex;
use crate::structure::{StructureId, StructureRecord};
use crate::support::SupportEvaluator;
use crate::terrain::TerrainOracle;

/// Why a structure was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestructionCause {
    /// Explicitly removed.
    Removed,
    /// Lost all support.
    Collapsed,
}

/// A structure destroyed by a removal, with its final record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedStructure {
    /// Record as it was when destroyed.
    pub record: StructureRecord,
    /// Why it went.
    pub cause: DestructionCause,
}

/// Everything a removal destroyed, target first, then in cascade order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    /// Destroyed structures in destruction order.
    pub destroyed: Vec<DestroyedStructure>,
}

impl RemovalOutcome {
    /// Ids of destroyed structures, in destruction order.
    #[must_use]
    pub fn destroyed_ids(&self) -> Vec<StructureId> {
        self.destroyed.iter().map(|d| d.record.id).collect()
    }

    /// Whether nothing was destroyed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty()
    }

    /// Number of destroyed structures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.destroyed.len()
    }

    /// Structures that collapsed, excluding the explicit target.
    pub fn collapsed(&self) -> impl Iterator<Item = &StructureRecord> + '_ {
        self.destroyed
            .iter()
            .filter(|d| d.cause == DestructionCause::Collapsed)
            .map(|d| &d.record)
    }
}

/// One removal transaction over an index and its graph.
pub struct CascadeEngine<'a, T: TerrainOracle + ?Sized> {
    index: &'a mut OccupancyIndex,
    graph: &'a mut DependencyGraph,
    evaluator: &'a SupportEvaluator,
    terrain: &'a T,
    outcome: RemovalOutcome,
}

impl<'a, T: TerrainOracle + ?Sized> CascadeEngine<'a, T> {
    /// Borrow the world state for one transaction.
    pub fn new(
        index: &'a mut OccupancyIndex,
        graph: &'a mut DependencyGraph,
        evaluator: &'a SupportEvaluator,
        terrain: &'a T,
    ) -> Self {
        Self {
            index,
            graph,
            evaluator,
            terrain,
            outcome: RemovalOutcome::default(),
        }
    }

    /// Remove `target` and everything that loses support because of it.
    ///
    /// Removing an absent id destroys nothing.
    #[must_use]
    pub fn remove(mut self, target: StructureId) -> RemovalOutcome {
        let Some(dependents) = self.delete(target, DestructionCause::Removed) else {
            trace!(id = %target, "Removal of absent structure ignored");
            return self.outcome;
        };
        self.settle(dependents);

        let collapsed = self.outcome.len() - 1;
        if collapsed > 0 {
            info!(target_id = %target, collapsed, "Removal cascaded");
        }
        self.outcome
    }

    /// Re-check `candidates` and destroy whatever no longer stands, transitively.
    #[must_use]
    pub fn collapse<I>(mut self, candidates: I) -> RemovalOutcome
    where
        I: IntoIterator<Item = StructureId>,
    {
        self.settle(candidates);
        if !self.outcome.is_empty() {
            info!(collapsed = self.outcome.len(), "Unsupported structures collapsed");
        }
        self.outcome
    }

    /// Run the work queue to a fixed point.
    fn settle<I>(&mut self, seed: I)
    where
        I: IntoIterator<Item = StructureId>,
    {
        let mut queue = VecDeque::new();
        let mut pending = HashSet::new();
        for id in seed {
            if pending.insert(id) {
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            pending.remove(&id);
            // Destroyed earlier in this pass.
            let Some(record) = self.index.get(id) else {
                continue;
            };
            let placement = record.placement;

            let sources = self.evaluator.explain(&placement, self.index, self.terrain);
            if sources.is_empty() {
                let dependents = self
                    .delete(id, DestructionCause::Collapsed)
                    .unwrap_or_default();
                for dependent in dependents {
                    if pending.insert(dependent) {
                        queue.push_back(dependent);
                    }
                }
            } else {
                trace!(id = %id, sources = sources.len(), "Candidate still supported");
                self.graph.set_sources(id, sources);
            }
        }
    }

    /// Delete one structure from index and graph together.
    ///
    /// Returns its former dependents, or `None` if it was not live.
    fn delete(
        &mut self,
        id: StructureId,
        cause: DestructionCause,
    ) -> Option<BTreeSet<StructureId>> {
        let record = self.index.remove(id)?;
        let dependents = self.graph.remove_node(id);
        debug_assert!(
            dependents.is_some(),
            "structure {id} was in the index but not the graph"
        );

        if cause == DestructionCause::Collapsed {
            debug!(id = %id, kind = %record.kind(), coord = %record.coord(), "Structure collapsed");
        }
        self.outcome.destroyed.push(DestroyedStructure { record, cause });
        Some(dependents.unwrap_or_default())
    }
}
