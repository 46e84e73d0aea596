//! Live dependency tracking between formula text and the named entities it
//! references (tables, columns, measures).
//!
//! The crate maintains a bidirectional graph: for each formula-bearing
//! *holder* (measure, calculated column) an ordered list of resolved
//! reference spans, and for each referenced entity the set of holders
//! depending on it. On top of the graph sit the two refactoring services:
//!
//! - **rename fixup**: after an entity's name changes, every dependent
//!   formula's reference text is spliced in place (rightmost span first) and
//!   the rewritten holders are rebuilt, so no stale offsets survive;
//! - **batching**: nestable suspension that coalesces bulk edits into a
//!   single rebuild pass and a single change notification.
//!
//! Everything is single-threaded and synchronous: resolution, graph
//! mutation, and fixup run on the caller's control flow, and the [`Model`]
//! is passed explicitly so independent models never share state.
//!
//! [`Model`]: tabular_model::Model

mod fixup;
mod graph;
mod resolve;
mod tokens;
mod tracker;

pub use graph::{DependencyGraph, GraphStats};
pub use resolve::{resolve_property, Edge};
pub use tokens::{tokenize, Token, TokenKind};
pub use tracker::{ChangeScope, DependencyTracker, NotificationSink};
