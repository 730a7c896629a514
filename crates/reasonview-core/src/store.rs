//! The loaded message: immutable after [`MessageStore::load`].
//!
//! Every engine pass (pruning, answer assembly, facets, table) borrows the
//! store; none of them mutate it. Derived graphs hold deep copies of the nodes
//! they annotate.

use crate::category;
use crate::config::ViewConfig;
use crate::error::{Result, ViewError};
use crate::index::{assign_result_ids, MessageIndex};
use crate::model::{Answer, KnowledgeEdge, KnowledgeNode, Message, QueryEdge, QueryNode, ResultId};

#[derive(Debug, Clone)]
pub struct MessageStore {
    message: Message,
    index: MessageIndex,
    config: ViewConfig,
}

impl MessageStore {
    /// Validate `config`, assign missing result ids, index every collection and
    /// resolve query-node categories from pinned curies.
    pub fn load(mut message: Message, config: ViewConfig) -> Result<Self> {
        config.validate()?;

        let assigned = assign_result_ids(&mut message);
        let index = MessageIndex::build(&message);
        let resolved = category::resolve_query_categories(&mut message, &index);

        let store = Self {
            message,
            index,
            config,
        };

        let unresolved = store.count_unresolved_bindings();
        if unresolved > 0 {
            tracing::warn!(
                bindings = unresolved,
                "node bindings reference ids missing from the knowledge graph"
            );
        }
        tracing::debug!(
            qg_nodes = store.num_qg_nodes(),
            kg_nodes = store.num_kg_nodes(),
            kg_edges = store.message.knowledge_graph.edges.len(),
            results = store.message.results.len(),
            assigned_ids = assigned,
            resolved_categories = resolved,
            "message loaded"
        );
        Ok(store)
    }

    pub fn from_json_str(text: &str, config: ViewConfig) -> Result<Self> {
        Self::load(Message::from_json_str(text)?, config)
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn index(&self) -> &MessageIndex {
        &self.index
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------------

    pub fn query_nodes(&self) -> &[QueryNode] {
        &self.message.query_graph.nodes
    }

    pub fn query_edges(&self) -> &[QueryEdge] {
        &self.message.query_graph.edges
    }

    pub fn kg_nodes(&self) -> &[KnowledgeNode] {
        &self.message.knowledge_graph.nodes
    }

    pub fn kg_edges(&self) -> &[KnowledgeEdge] {
        &self.message.knowledge_graph.edges
    }

    pub fn results(&self) -> &[Answer] {
        &self.message.results
    }

    pub fn num_qg_nodes(&self) -> usize {
        self.message.query_graph.nodes.len()
    }

    pub fn num_kg_nodes(&self) -> usize {
        self.message.knowledge_graph.nodes.len()
    }

    pub fn qnode_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.message.query_graph.nodes.iter().map(|n| n.id.as_str())
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn kg_node(&self, id: &str) -> Option<&KnowledgeNode> {
        self.index
            .kg_node_position(id)
            .and_then(|pos| self.message.knowledge_graph.nodes.get(pos))
    }

    pub fn kg_node_position(&self, id: &str) -> Option<usize> {
        self.index.kg_node_position(id)
    }

    pub fn kg_edge(&self, id: &str) -> Option<&KnowledgeEdge> {
        self.index
            .kg_edge_position(id)
            .and_then(|pos| self.message.knowledge_graph.edges.get(pos))
    }

    pub fn qg_node(&self, id: &str) -> Option<&QueryNode> {
        self.index
            .qg_node_position(id)
            .and_then(|pos| self.message.query_graph.nodes.get(pos))
    }

    pub fn qg_node_position(&self, id: &str) -> Option<usize> {
        self.index.qg_node_position(id)
    }

    pub fn qg_edge(&self, id: &str) -> Option<&QueryEdge> {
        self.index
            .qg_edge_position(id)
            .and_then(|pos| self.message.query_graph.edges.get(pos))
    }

    pub fn result(&self, id: &ResultId) -> Option<&Answer> {
        self.index
            .result_position(id)
            .and_then(|pos| self.message.results.get(pos))
    }

    /// Like [`Self::result`], for callers that treat an unknown id as a
    /// contract violation.
    pub fn require_result(&self, id: &ResultId) -> Result<&Answer> {
        self.result(id)
            .ok_or_else(|| ViewError::UnknownResult(id.clone()))
    }

    /// Whether any node binding names an id the knowledge graph lacks.
    pub fn has_unknown_nodes(&self) -> bool {
        self.count_unresolved_bindings() > 0
    }

    fn count_unresolved_bindings(&self) -> usize {
        self.message
            .results
            .iter()
            .flat_map(|r| r.node_bindings.iter())
            .flat_map(|b| b.kg_ids().iter())
            .filter(|id| self.index.kg_node_position(id).is_none())
            .count()
    }
}
