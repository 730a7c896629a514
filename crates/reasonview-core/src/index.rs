//! Message Index: id → position lookups for every collection in a message.
//!
//! Built in one pass per collection right after load. Positions (not record
//! clones) are stored so the index stays small and the message remains the
//! single owner of every record.

use ahash::{AHashMap, AHashSet};

use crate::model::{Message, ResultId};

#[derive(Debug, Clone, Default)]
pub struct MessageIndex {
    pub kg_nodes: AHashMap<String, usize>,
    pub kg_edges: AHashMap<String, usize>,
    pub qg_nodes: AHashMap<String, usize>,
    pub qg_edges: AHashMap<String, usize>,
    pub results: AHashMap<ResultId, usize>,
}

impl MessageIndex {
    /// Index a message whose result ids are already assigned.
    ///
    /// Duplicate ids resolve to their last position.
    pub fn build(message: &Message) -> Self {
        let results = message
            .results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.id.clone().map(|id| (id, i)))
            .collect();

        Self {
            kg_nodes: id_to_position(message.knowledge_graph.nodes.iter().map(|n| n.id.as_str())),
            kg_edges: id_to_position(message.knowledge_graph.edges.iter().map(|e| e.id.as_str())),
            qg_nodes: id_to_position(message.query_graph.nodes.iter().map(|n| n.id.as_str())),
            qg_edges: id_to_position(message.query_graph.edges.iter().map(|e| e.id.as_str())),
            results,
        }
    }

    pub fn kg_node_position(&self, id: &str) -> Option<usize> {
        self.kg_nodes.get(id).copied()
    }

    pub fn kg_edge_position(&self, id: &str) -> Option<usize> {
        self.kg_edges.get(id).copied()
    }

    pub fn qg_node_position(&self, id: &str) -> Option<usize> {
        self.qg_nodes.get(id).copied()
    }

    pub fn qg_edge_position(&self, id: &str) -> Option<usize> {
        self.qg_edges.get(id).copied()
    }

    pub fn result_position(&self, id: &ResultId) -> Option<usize> {
        self.results.get(id).copied()
    }
}

fn id_to_position<'a, I>(ids: I) -> AHashMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = AHashMap::new();
    for (i, id) in ids.into_iter().enumerate() {
        out.insert(id.to_string(), i);
    }
    out
}

/// Give every result without an id its array position as id.
///
/// A position already claimed by an explicit id moves to the next free index.
/// Positional ids are only stable within a single load. Returns how many ids
/// were assigned.
pub fn assign_result_ids(message: &mut Message) -> usize {
    let mut taken: AHashSet<ResultId> = message
        .results
        .iter()
        .filter(|r| r.has_id())
        .filter_map(|r| r.id.clone())
        .collect();

    let mut assigned = 0;
    for (i, result) in message.results.iter_mut().enumerate() {
        if result.has_id() {
            continue;
        }
        let mut next = i as u64;
        while taken.contains(&ResultId::Index(next)) {
            next += 1;
        }
        if next != i as u64 {
            tracing::warn!(
                position = i,
                id = next,
                "positional result id already taken by an explicit id"
            );
        }
        let id = ResultId::Index(next);
        taken.insert(id.clone());
        result.id = Some(id);
        assigned += 1;
    }
    assigned
}
