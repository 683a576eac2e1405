//! Dependency graph: a cache of who currently holds up whom.
//!
//! For every live structure the graph stores the sources that support it
//! (`supported_by`) and the structures it supports (`supports`). The two
//! sides are kept as exact duals. The graph is only ever used to pick
//! re-validation candidates; support decisions always go back to the
//! [`SupportEvaluator`].

use std::collections::{BTreeSet, HashMap};

use crate::error::InvariantViolation;
use crate::occupancy::OccupancyIndex;
use crate::structure::StructureId;
use crate::support::{SupportEvaluator, SupportSource};
use crate::terrain::TerrainOracle;

/// Support edges between live structures (and terrain).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    supported_by: HashMap<StructureId, BTreeSet<SupportSource>>,
    supports: HashMap<StructureId, BTreeSet<StructureId>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from scratch by explaining every live structure.
    #[must_use]
    pub fn rebuild<T>(index: &OccupancyIndex, evaluator: &SupportEvaluator, terrain: &T) -> Self
    where
        T: TerrainOracle + ?Sized,
    {
        let mut graph = Self::new();
        for id in index.ids() {
            graph.insert_node(id);
        }
        for record in index.iter() {
            let sources = evaluator.explain(&record.placement, index, terrain);
            graph.set_sources(record.id, sources);
        }
        graph
    }

    /// Number of structures tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.supported_by.len()
    }

    /// Check if the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.supported_by.is_empty()
    }

    /// Whether a structure is tracked.
    #[must_use]
    pub fn contains(&self, id: StructureId) -> bool {
        self.supported_by.contains_key(&id)
    }

    /// Tracked structure ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.supported_by.keys().copied()
    }

    /// Sources currently believed to support `id`.
    #[must_use]
    pub fn supported_by(&self, id: StructureId) -> Option<&BTreeSet<SupportSource>> {
        self.supported_by.get(&id)
    }

    /// Structures currently believed to depend on `id`.
    #[must_use]
    pub fn supports(&self, id: StructureId) -> Option<&BTreeSet<StructureId>> {
        self.supports.get(&id)
    }

    /// Start tracking a structure with no edges.
    pub fn insert_node(&mut self, id: StructureId) {
        self.supported_by.entry(id).or_default();
        self.supports.entry(id).or_default();
    }

    /// Replace the support sources of `id`, keeping both edge directions in sync.
    ///
    /// Sources naming untracked structures are dropped.
    pub fn set_sources(&mut self, id: StructureId, sources: BTreeSet<SupportSource>) {
        let previous = self.supported_by.remove(&id).unwrap_or_default();
        for source in &previous {
            if let SupportSource::Structure(supporter) = source {
                if let Some(dependents) = self.supports.get_mut(supporter) {
                    dependents.remove(&id);
                }
            }
        }

        let mut kept = BTreeSet::new();
        for source in sources {
            match source {
                SupportSource::Terrain => {
                    kept.insert(source);
                }
                SupportSource::Structure(supporter) => {
                    debug_assert_ne!(supporter, id, "structure {id} cannot support itself");
                    if let Some(dependents) = self.supports.get_mut(&supporter) {
                        dependents.insert(id);
                        kept.insert(source);
                    }
                }
            }
        }
        self.supports.entry(id).or_default();
        self.supported_by.insert(id, kept);
    }

    /// Stop tracking a structure, dropping every edge that touches it.
    ///
    /// Returns the structures it supported, or `None` if it was not tracked.
    pub fn remove_node(&mut self, id: StructureId) -> Option<BTreeSet<StructureId>> {
        let sources = self.supported_by.remove(&id)?;
        let dependents = self.supports.remove(&id).unwrap_or_default();

        for source in sources {
            if let SupportSource::Structure(supporter) = source {
                if let Some(set) = self.supports.get_mut(&supporter) {
                    set.remove(&id);
                }
            }
        }
        for dependent in &dependents {
            if let Some(set) = self.supported_by.get_mut(dependent) {
                set.remove(&SupportSource::Structure(id));
            }
        }

        Some(dependents)
    }

    /// Verify that `supports` and `supported_by` are exact duals.
    pub fn check_symmetry(&self) -> Result<(), InvariantViolation> {
        let orphan = self
            .supports
            .keys()
            .chain(self.supported_by.keys())
            .find(|id| !self.supports.contains_key(id) || !self.supported_by.contains_key(id));
        if let Some(&id) = orphan {
            return Err(InvariantViolation::Desynchronized(id));
        }

        for (&supporter, dependents) in &self.supports {
            for &dependent in dependents {
                let mirrored = self
                    .supported_by
                    .get(&dependent)
                    .is_some_and(|s| s.contains(&SupportSource::Structure(supporter)));
                if !mirrored {
                    return Err(InvariantViolation::AsymmetricEdge {
                        supporter,
                        dependent,
                    });
                }
            }
        }

        for (&dependent, sources) in &self.supported_by {
            for source in sources {
                let SupportSource::Structure(supporter) = *source else {
                    continue;
                };
                let mirrored = self
                    .supports
                    .get(&supporter)
                    .is_some_and(|s| s.contains(&dependent));
                if !mirrored {
                    return Err(InvariantViolation::AsymmetricEdge {
                        supporter,
                        dependent,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCoordinate;
    use crate::structure::{MaterialTier, Placement, StructureRecord};
    use crate::terrain::FlatTerrain;

    fn id(n: u64) -> StructureId {
        StructureId::new(n)
    }

    fn on(n: u64) -> SupportSource {
        SupportSource::Structure(id(n))
    }

    fn set<T: Ord>(items: impl IntoIterator<Item = T>) -> BTreeSet<T> {
        items.into_iter().collect()
    }

    /// 1 <- 2 <- 3, and 1 <- 3 directly.
    fn small_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for n in 1..=3 {
            graph.insert_node(id(n));
        }
        graph.set_sources(id(1), set([SupportSource::Terrain]));
        graph.set_sources(id(2), set([on(1)]));
        graph.set_sources(id(3), set([on(1), on(2)]));
        graph
    }

    #[test]
    fn test_set_sources_records_both_directions() {
        let graph = small_graph();
        assert_eq!(graph.supports(id(1)), Some(&set([id(2), id(3)])));
        assert_eq!(graph.supports(id(2)), Some(&set([id(3)])));
        assert_eq!(graph.supported_by(id(3)), Some(&set([on(1), on(2)])));
        assert!(graph.check_symmetry().is_ok());
    }

    #[test]
    fn test_set_sources_replaces_previous_edges() {
        let mut graph = small_graph();
        graph.set_sources(id(3), set([on(2)]));
        assert_eq!(graph.supports(id(1)), Some(&set([id(2)])));
        assert_eq!(graph.supported_by(id(3)), Some(&set([on(2)])));
        assert!(graph.check_symmetry().is_ok());
    }

    #[test]
    fn test_set_sources_drops_untracked_supporters() {
        let mut graph = small_graph();
        graph.set_sources(id(2), set([on(1), on(99)]));
        assert_eq!(graph.supported_by(id(2)), Some(&set([on(1)])));
        assert!(graph.check_symmetry().is_ok());
    }

    #[test]
    fn test_remove_node_returns_dependents_and_cleans_edges() {
        let mut graph = small_graph();
        let dependents = graph.remove_node(id(1)).unwrap();
        assert_eq!(dependents, set([id(2), id(3)]));

        assert!(!graph.contains(id(1)));
        assert_eq!(graph.supported_by(id(2)), Some(&BTreeSet::new()));
        assert_eq!(graph.supported_by(id(3)), Some(&set([on(2)])));
        assert!(graph.check_symmetry().is_ok());
    }

    #[test]
    fn test_remove_node_middle() {
        let mut graph = small_graph();
        let dependents = graph.remove_node(id(2)).unwrap();
        assert_eq!(dependents, set([id(3)]));
        assert_eq!(graph.supports(id(1)), Some(&set([id(3)])));
        assert!(graph.check_symmetry().is_ok());
    }

    #[test]
    fn test_remove_node_absent_is_none() {
        let mut graph = small_graph();
        assert!(graph.remove_node(id(42)).is_none());
        graph.remove_node(id(3));
        assert!(graph.remove_node(id(3)).is_none());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_check_symmetry_detects_one_sided_edge() {
        let mut graph = small_graph();
        graph.supports.get_mut(&id(3)).unwrap().insert(id(1));
        assert_eq!(
            graph.check_symmetry(),
            Err(InvariantViolation::AsymmetricEdge {
                supporter: id(3),
                dependent: id(1)
            })
        );
    }

    #[test]
    fn test_rebuild_from_index() {
        let mut index = OccupancyIndex::new();
        let placements = [
            Placement::floor(GridCoordinate::new(0, 0, 0)),
            Placement::floor(GridCoordinate::new(0, 0, 1)),
            Placement::floor(GridCoordinate::new(1, 0, 1)),
        ];
        for (n, placement) in placements.into_iter().enumerate() {
            index
                .try_insert(StructureRecord {
                    id: id(n as u64 + 1),
                    placement,
                    material: MaterialTier::Wood,
                    max_hp: 150,
                    current_hp: 150,
                    placed_at: 0,
                })
                .unwrap();
        }

        let graph =
            DependencyGraph::rebuild(&index, &SupportEvaluator::default(), &FlatTerrain::default());
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.supported_by(id(1)), Some(&set([SupportSource::Terrain])));
        assert_eq!(graph.supported_by(id(2)), Some(&set([on(1), on(3)])));
        assert_eq!(graph.supported_by(id(3)), Some(&set([on(2)])));
        assert_eq!(graph.supports(id(1)), Some(&set([id(2)])));
        assert!(graph.check_symmetry().is_ok());
    }
}
