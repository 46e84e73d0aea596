//! Rebuild orchestration, batching, and change notification.
//!
//! The tracker has two logical states. **Active**: every triggering
//! mutation rebuilds the affected holder synchronously and emits one
//! notification. **Suspended**: triggers accumulate a deduplicated dirty
//! set instead. Suspension is nestable; only the transition back to depth
//! zero flushes. A flush collapses deliberately: one dirty holder rebuilds
//! alone and emits a holder-scoped event, anything more performs a full
//! rebuild and emits a single model-wide event, so bulk operations never
//! flood consumers with per-entity notifications.

use std::collections::HashSet;

use log::debug;
use tabular_model::{EntityId, HolderId, Model};

use crate::fixup;
use crate::graph::DependencyGraph;
use crate::resolve::{resolve_property, Edge};
use crate::tokens::tokenize;

/// Scope of a structure-changed notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeScope {
    /// Dependency structure changed across the model.
    Model,
    /// Dependency structure changed for a single holder.
    Holder(HolderId),
}

/// Consumer of change events (the UI/tree layer). The core only emits;
/// it never depends on the sink's behavior.
pub trait NotificationSink {
    /// Dependency structure changed within `scope`.
    fn structure_changed(&mut self, scope: ChangeScope);
    /// A holder's formula text was rewritten in place.
    fn nodes_changed(&mut self, holder: HolderId);
}

struct NullSink;

impl NotificationSink for NullSink {
    fn structure_changed(&mut self, _scope: ChangeScope) {}
    fn nodes_changed(&mut self, _holder: HolderId) {}
}

/// The dependency tracker for one model instance.
///
/// All state is per-instance; the [`Model`] is passed explicitly into every
/// call, so independent models in one process never interact.
pub struct DependencyTracker {
    graph: DependencyGraph,
    sink: Box<dyn NotificationSink>,
    suspend_depth: u32,
    dirty: HashSet<HolderId>,
    full_rebuild_pending: bool,
}

impl Default for DependencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullSink))
    }

    #[must_use]
    pub fn with_sink(sink: Box<dyn NotificationSink>) -> Self {
        Self {
            graph: DependencyGraph::new(),
            sink,
            suspend_depth: 0,
            dirty: HashSet::new(),
            full_rebuild_pending: false,
        }
    }

    /// Read access to the graph store.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Ordered edges for `holder`.
    #[must_use]
    pub fn depends_on(&self, holder: HolderId) -> &[Edge] {
        self.graph.depends_on(holder)
    }

    /// Holders currently depending on `entity`.
    #[must_use]
    pub fn referenced_by(&self, entity: EntityId) -> Vec<HolderId> {
        self.graph.referenced_by(entity)
    }

    // ---- mutation entry points ------------------------------------------

    /// Force a full recompute, respecting the current batch state.
    pub fn whole_model_rebuild(&mut self, model: &Model) {
        if self.suspended() {
            self.full_rebuild_pending = true;
            return;
        }
        self.rebuild_all(model);
        self.sink.structure_changed(ChangeScope::Model);
    }

    /// A holder's formula text changed; recompute (or queue) its edges.
    pub fn notify_formula_changed(&mut self, model: &Model, holder: HolderId) {
        self.touch(model, holder);
    }

    /// A holder was structurally changed (added, moved between containers);
    /// recompute (or queue) its edges.
    pub fn notify_structural_change(&mut self, model: &Model, holder: HolderId) {
        self.touch(model, holder);
    }

    /// `renamed`'s name has already changed in the model: rewrite every
    /// dependent formula in place, rebuild the rewritten holders, and
    /// notify.
    ///
    /// The per-holder rebuild inside fixup is unconditional: it runs even
    /// while a batch is suspended so a later rename in the same batch never
    /// sees stale offsets. Only the structure notification is coalesced.
    pub fn notify_renamed(&mut self, model: &mut Model, renamed: EntityId) {
        let rewritten = fixup::apply_fixup(model, &mut self.graph, renamed);
        for &holder in &rewritten {
            self.sink.nodes_changed(holder);
        }
        if self.suspended() {
            self.dirty.extend(rewritten);
        } else {
            self.emit_collapsed(&rewritten);
        }
    }

    /// `entity` was removed from the model: purge it from both graph roles
    /// and reconcile its former dependents.
    pub fn notify_deleted(&mut self, model: &Model, entity: EntityId) {
        let dependents = self.graph.referenced_by(entity);
        self.graph.remove_entity(entity);
        if let Some(holder) = entity.as_holder() {
            self.graph.remove_holder(holder);
            self.dirty.remove(&holder);
        }

        for &holder in &dependents {
            if self.suspended() {
                self.dirty.insert(holder);
            } else {
                self.rebuild_one(model, holder);
            }
        }
        if !self.suspended() {
            self.emit_collapsed(&dependents);
        }
    }

    // ---- batching --------------------------------------------------------

    /// Enter a suspension scope. Nestable.
    pub fn enter_batch(&mut self) {
        self.suspend_depth += 1;
    }

    /// Leave a suspension scope; the transition back to depth zero flushes
    /// accumulated work. Unmatched exits are a caller bug.
    pub fn exit_batch(&mut self, model: &Model) {
        assert!(
            self.suspend_depth > 0,
            "exit_batch without a matching enter_batch"
        );
        self.suspend_depth -= 1;
        if self.suspend_depth == 0 {
            self.flush(model);
        }
    }

    /// Run `f` inside a batch scope; leaving the scope flushes.
    pub fn batch<R>(
        &mut self,
        model: &mut Model,
        f: impl FnOnce(&mut Model, &mut Self) -> R,
    ) -> R {
        self.enter_batch();
        let result = f(model, self);
        self.exit_batch(model);
        result
    }

    // ---- internal --------------------------------------------------------

    fn suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    fn flush(&mut self, model: &Model) {
        let dirty: Vec<HolderId> = self.dirty.drain().collect();
        let full = std::mem::take(&mut self.full_rebuild_pending);

        if full || dirty.len() > 1 {
            debug!(
                "batch flush: full rebuild ({} dirty holder(s), explicit={full})",
                dirty.len()
            );
            self.rebuild_all(model);
            self.sink.structure_changed(ChangeScope::Model);
        } else if let Some(&holder) = dirty.first() {
            self.rebuild_one(model, holder);
            self.sink.structure_changed(ChangeScope::Holder(holder));
        }
    }

    fn touch(&mut self, model: &Model, holder: HolderId) {
        if self.suspended() {
            self.dirty.insert(holder);
            return;
        }
        self.rebuild_one(model, holder);
        self.sink.structure_changed(ChangeScope::Holder(holder));
    }

    fn rebuild_one(&mut self, model: &Model, holder: HolderId) {
        rebuild_holder(model, &mut self.graph, holder);
    }

    fn rebuild_all(&mut self, model: &Model) {
        self.graph.reset();
        for holder in model.holders() {
            rebuild_holder(model, &mut self.graph, holder);
        }
    }

    fn emit_collapsed(&mut self, affected: &[HolderId]) {
        match affected {
            [] => {}
            [holder] => self.sink.structure_changed(ChangeScope::Holder(*holder)),
            _ => self.sink.structure_changed(ChangeScope::Model),
        }
    }
}

/// Atomically replace `holder`'s edge set from its current formula text.
///
/// Readers observe either the pre-rebuild state or the completed rebuild,
/// never the cleared-but-unresolved window in between.
pub(crate) fn rebuild_holder(model: &Model, graph: &mut DependencyGraph, holder: HolderId) {
    graph.begin_rebuild();
    graph.clear(holder);
    let owning_table = model.holder_table(holder);
    for (property, text) in model.formula_properties(holder) {
        let tokens = tokenize(text);
        for edge in resolve_property(model, owning_table, property, &tokens) {
            graph.add_edge(holder, edge);
        }
    }
    graph.end_rebuild();
}
