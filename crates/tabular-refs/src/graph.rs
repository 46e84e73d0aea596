//! Bidirectional dependency graph store.
//!
//! Two independent maps, forward (holder → ordered edges) and reverse
//! (entity → dependent holders), so clears and deletions stay localized,
//! non-recursive operations and no back-references live inside entities.
//! A pruned-empty and an absent reverse set are indistinguishable to
//! readers.

use std::collections::{HashMap, HashSet};

use tabular_model::{EntityId, HolderId};

use crate::resolve::Edge;

/// Counts useful for asserting the internal representation in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    /// Holders with at least one edge.
    pub holders: usize,
    /// Total forward edges.
    pub edges: usize,
    /// Entities with at least one dependent.
    pub referenced_entities: usize,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    depends_on: HashMap<HolderId, Vec<Edge>>,
    referenced_by: HashMap<EntityId, HashSet<HolderId>>,
    /// Set while a holder's edges are cleared but not yet recomputed.
    /// Reads inside this window are a caller bug and fail fast.
    rebuilding: bool,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered edges for `holder`; empty if untracked. Order is property
    /// enumeration order, then left-to-right source order.
    #[must_use]
    pub fn depends_on(&self, holder: HolderId) -> &[Edge] {
        self.assert_readable();
        self.depends_on.get(&holder).map_or(&[], Vec::as_slice)
    }

    /// Holders with at least one edge targeting `entity`, sorted for
    /// deterministic iteration.
    #[must_use]
    pub fn referenced_by(&self, entity: EntityId) -> Vec<HolderId> {
        self.assert_readable();
        let mut out: Vec<HolderId> = self
            .referenced_by
            .get(&entity)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Every holder currently carrying edges, sorted.
    #[must_use]
    pub fn holders(&self) -> Vec<HolderId> {
        self.assert_readable();
        let mut out: Vec<HolderId> = self.depends_on.keys().copied().collect();
        out.sort_unstable();
        out
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        self.assert_readable();
        GraphStats {
            holders: self.depends_on.len(),
            edges: self.depends_on.values().map(Vec::len).sum(),
            referenced_entities: self.referenced_by.len(),
        }
    }

    /// Remove all of `holder`'s edges, detaching it from every target's
    /// reverse set.
    pub(crate) fn clear(&mut self, holder: HolderId) {
        let Some(edges) = self.depends_on.remove(&holder) else {
            return;
        };
        for edge in edges {
            if let Some(set) = self.referenced_by.get_mut(&edge.target) {
                set.remove(&holder);
                if set.is_empty() {
                    self.referenced_by.remove(&edge.target);
                }
            }
        }
    }

    /// Append an edge to `holder`'s list and index the reverse direction.
    pub(crate) fn add_edge(&mut self, holder: HolderId, edge: Edge) {
        self.referenced_by
            .entry(edge.target)
            .or_default()
            .insert(holder);
        self.depends_on.entry(holder).or_default().push(edge);
    }

    /// Purge a deleted entity as a *target*: every edge to it is dropped
    /// from every holder, and its reverse entry disappears.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) {
        let Some(holders) = self.referenced_by.remove(&entity) else {
            return;
        };
        for holder in holders {
            if let Some(edges) = self.depends_on.get_mut(&holder) {
                edges.retain(|e| e.target != entity);
                if edges.is_empty() {
                    self.depends_on.remove(&holder);
                }
            }
        }
    }

    /// Purge a deleted holder: same as [`Self::clear`]; kept separate so
    /// call sites read as what they mean.
    pub(crate) fn remove_holder(&mut self, holder: HolderId) {
        self.clear(holder);
    }

    pub(crate) fn reset(&mut self) {
        self.depends_on.clear();
        self.referenced_by.clear();
    }

    pub(crate) fn begin_rebuild(&mut self) {
        assert!(
            !self.rebuilding,
            "dependency rebuild re-entered while one is in progress"
        );
        self.rebuilding = true;
    }

    pub(crate) fn end_rebuild(&mut self) {
        self.rebuilding = false;
    }

    fn assert_readable(&self) {
        assert!(
            !self.rebuilding,
            "dependency graph read during an in-progress rebuild"
        );
    }
}
