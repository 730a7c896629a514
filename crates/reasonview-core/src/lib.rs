//! Reasonview: derived views over biomedical reasoner messages
//!
//! A reasoner message pairs a query graph (typed variables) with the
//! knowledge graph that answered it and a list of scored results binding one
//! to the other. This crate turns a loaded message into:
//!
//! 1. **Overview graph**: the knowledge graph pruned to a node budget with
//!    per-query-node quotas and leftover redistribution (`prune`)
//! 2. **Answer views**: a dense per-result summary and an answer subgraph with
//!    set bindings capped by literature evidence (`answer`)
//! 3. **Faceted filters**: per-query-node property/value panels with checked
//!    and availability bits, versioned copy-on-write (`facet`)
//! 4. **Result table** rows and columns (`table`)
//! 5. **Display graphs** ready for a graph renderer (`decorate`)
//!
//! ## Flow
//!
//! ```text
//! Message ──load──► MessageStore (index + resolved query categories)
//!                      │
//!      ┌───────────────┼───────────────┬──────────────┐
//!      ▼               ▼               ▼              ▼
//!   prune          answer          facet/reducer    table
//!      └──────┬────────┘
//!             ▼
//!          decorate
//! ```
//!
//! Everything is synchronous and free of I/O; the store is immutable after
//! load, so passes may run on any thread.

pub mod answer;
pub mod category;
pub mod config;
pub mod decorate;
pub mod error;
pub mod facet;
pub mod index;
pub mod model;
pub mod prune;
pub mod reducer;
pub mod store;
pub mod table;

pub use answer::{
    active_answer_graph, dense_answer, is_ag_pruned, is_kg_pruned, max_num_ag_nodes, set_nodes,
    AnswerGraph, AnswerGraphEdge, AnswerGraphNode, DenseAnswer, DenseNode,
};
pub use category::{display_category, primary_category};
pub use config::ViewConfig;
pub use decorate::{decorate, DisplayEdge, DisplayGraph, DisplayNode, DisplaySource};
pub use error::{Result, ViewError};
pub use facet::{FacetState, FacetValueState, PropertyFacet, QueryNodeFacets};
pub use index::MessageIndex;
pub use model::{
    Answer, Binding, Category, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, Message, OneOrMany,
    QueryEdge, QueryGraph, QueryNode, ResultId, MISSING_NODE_NAME,
};
pub use prune::{annotated_pruned_graph, PrunedGraph, PrunedNode, RankingKey};
pub use reducer::{reduce, replay, Action, ViewState};
pub use store::MessageStore;
pub use table::{answer_set_table, AnswerRow, AnswerTable, TableCell, TableColumn};
