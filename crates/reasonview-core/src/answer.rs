//! Answer Assembler: views of a single result.
//!
//! - [`dense_answer`]: one entry per query node / query edge, with set
//!   bindings collapsed into labeled `Set: <category>` containers.
//! - [`active_answer_graph`]: the knowledge nodes and edges the result uses,
//!   with set bindings cut down to the members carrying the most literature.

use roaring::RoaringBitmap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::category::display_primary;
use crate::error::Result;
use crate::model::{
    Binding, Category, KnowledgeEdge, KnowledgeNode, QueryNode, ResultId, MISSING_NODE_NAME,
};
use crate::store::MessageStore;

// ============================================================================
// Dense answer
// ============================================================================

/// A query node's slot in a dense answer.
///
/// Either a resolved knowledge node (its fields flattened in, `is_set = false`)
/// or a set container whose members sit in `set_nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DenseNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub is_set: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub set_nodes: Vec<KnowledgeNode>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl DenseNode {
    const FIELDS: [&'static str; 5] = ["id", "name", "category", "is_set", "set_nodes"];

    /// No binding in this result; a declared set stays a (memberless) set.
    fn empty(qnode: &QueryNode) -> Self {
        if qnode.is_set {
            return Self::set(qnode, Vec::new());
        }
        Self {
            category: qnode.category.clone(),
            ..Self::default()
        }
    }

    fn set(qnode: &QueryNode, members: Vec<KnowledgeNode>) -> Self {
        Self {
            name: Some(format!("Set: {}", display_primary(qnode.category.as_ref()))),
            category: qnode.category.clone(),
            is_set: true,
            set_nodes: members,
            ..Self::default()
        }
    }

    fn single(qnode: &QueryNode, kg_id: &str, knode: Option<&KnowledgeNode>) -> Self {
        match knode {
            Some(k) => Self {
                id: Some(k.id.clone()),
                name: k.name.clone(),
                category: qnode.category.clone().or_else(|| k.category.clone()),
                is_set: false,
                set_nodes: Vec::new(),
                properties: k
                    .properties
                    .iter()
                    .filter(|(key, _)| !Self::FIELDS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            },
            None => Self {
                id: Some(kg_id.to_string()),
                name: Some(MISSING_NODE_NAME.to_string()),
                category: qnode.category.clone(),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseAnswer {
    pub id: ResultId,
    pub score: Option<f64>,
    pub nodes: BTreeMap<String, DenseNode>,
    pub edges: BTreeMap<String, Vec<KnowledgeEdge>>,
}

/// Dense view of result `id`.
pub fn dense_answer(store: &MessageStore, id: &ResultId) -> Result<DenseAnswer> {
    let answer = store.require_result(id)?;

    let mut nodes = BTreeMap::new();
    for qnode in store.query_nodes() {
        let dense = match answer.node_binding(&qnode.id) {
            None => DenseNode::empty(qnode),
            Some(binding) => dense_node(store, qnode, binding),
        };
        nodes.insert(qnode.id.clone(), dense);
    }

    let mut edges = BTreeMap::new();
    for qedge in store.query_edges() {
        let resolved: Vec<KnowledgeEdge> = answer
            .edge_binding(&qedge.id)
            .map(|b| {
                b.kg_ids()
                    .iter()
                    .filter_map(|eid| store.kg_edge(eid))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        edges.insert(qedge.id.clone(), resolved);
    }

    Ok(DenseAnswer {
        id: id.clone(),
        score: answer.score,
        nodes,
        edges,
    })
}

fn dense_node(store: &MessageStore, qnode: &QueryNode, binding: &Binding) -> DenseNode {
    let ids = binding.kg_ids();
    let is_set = qnode.is_set || ids.len() > 1;
    if is_set {
        let members = ids.iter().map(|id| resolve_or_missing(store, id)).collect();
        return DenseNode::set(qnode, members);
    }
    match ids.first() {
        Some(id) => DenseNode::single(qnode, id, store.kg_node(id)),
        None => DenseNode::empty(qnode),
    }
}

fn resolve_or_missing(store: &MessageStore, id: &str) -> KnowledgeNode {
    store
        .kg_node(id)
        .cloned()
        .unwrap_or_else(|| KnowledgeNode::missing(id))
}

// ============================================================================
// Active answer graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerGraphNode {
    #[serde(flatten)]
    pub node: KnowledgeNode,
    pub is_set: bool,
    /// Query node this knowledge node is bound to.
    pub binding: String,
    pub level: usize,
    /// Summed publication count over all incident knowledge edges.
    pub evidence: usize,
}

impl AnswerGraphNode {
    const FIELDS: [&'static str; 4] = ["is_set", "binding", "level", "evidence"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerGraphEdge {
    #[serde(flatten)]
    pub edge: KnowledgeEdge,
    /// Query edge this knowledge edge is bound to.
    pub binding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerGraph {
    pub id: ResultId,
    pub nodes: Vec<AnswerGraphNode>,
    pub edges: Vec<AnswerGraphEdge>,
    /// Bound ids that resolved to no knowledge node.
    pub missing: usize,
    /// Some set binding lost members to the cap.
    pub truncated: bool,
}

/// Publication count of every edge incident to each knowledge node.
fn evidence_by_position(store: &MessageStore) -> Vec<usize> {
    let mut evidence = vec![0usize; store.num_kg_nodes()];
    for edge in store.kg_edges() {
        let n = edge.publication_count();
        if n == 0 {
            continue;
        }
        let subject = store.kg_node_position(&edge.subject);
        let object = store.kg_node_position(&edge.object);
        if let Some(s) = subject {
            evidence[s] += n;
        }
        if let Some(o) = object.filter(|&o| Some(o) != subject) {
            evidence[o] += n;
        }
    }
    evidence
}

/// Subgraph used by result `id`, set bindings capped at `num_ag_set_nodes`.
pub fn active_answer_graph(
    store: &MessageStore,
    id: &ResultId,
    num_ag_set_nodes: usize,
) -> Result<AnswerGraph> {
    crate::config::validate_set_cap(num_ag_set_nodes)?;
    let answer = store.require_result(id)?;
    let evidence = evidence_by_position(store);

    let mut nodes = Vec::new();
    let mut survivors = RoaringBitmap::new();
    let mut missing = 0usize;
    let mut truncated = false;

    for binding in &answer.node_bindings {
        let qnode = store.qg_node(&binding.qg_id);
        let level = store
            .qg_node_position(&binding.qg_id)
            .unwrap_or(store.num_qg_nodes());
        let is_set = qnode.is_some_and(|q| q.is_set);

        let mut members: Vec<(&str, Option<usize>)> = if is_set {
            binding
                .kg_ids()
                .iter()
                .map(|kid| (kid.as_str(), store.kg_node_position(kid)))
                .collect()
        } else {
            binding
                .kg_ids()
                .first()
                .map(|kid| vec![(kid.as_str(), store.kg_node_position(kid))])
                .unwrap_or_default()
        };

        if is_set {
            let score = |pos: Option<usize>| pos.map(|p| evidence[p]).unwrap_or(0);
            members.sort_by(|a, b| score(b.1).cmp(&score(a.1)));
            if members.len() > num_ag_set_nodes {
                members.truncate(num_ag_set_nodes);
                truncated = true;
            }
        }

        for (kid, pos) in members {
            let Some(pos) = pos else {
                tracing::warn!(qg_id = %binding.qg_id, kg_id = %kid, "binding does not resolve; dropped from answer graph");
                missing += 1;
                continue;
            };
            let Some(knode) = store.kg_nodes().get(pos) else {
                missing += 1;
                continue;
            };
            let mut node = knode.clone();
            if let Some(category) = qnode.and_then(|q| q.category.clone()) {
                node.category = Some(category);
            }
            survivors.insert(pos as u32);
            nodes.push(AnswerGraphNode {
                node: node.without_properties(&AnswerGraphNode::FIELDS),
                is_set,
                binding: binding.qg_id.clone(),
                level,
                evidence: evidence[pos],
            });
        }
    }

    let survived = |node_id: &str| {
        store
            .kg_node_position(node_id)
            .is_some_and(|p| survivors.contains(p as u32))
    };

    let mut edges = Vec::new();
    for binding in &answer.edge_bindings {
        for eid in binding.kg_ids() {
            let Some(edge) = store.kg_edge(eid) else {
                continue;
            };
            if survived(&edge.subject) && survived(&edge.object) {
                edges.push(AnswerGraphEdge {
                    edge: edge.clone().without_properties(&["binding"]),
                    binding: binding.qg_id.clone(),
                });
            }
        }
    }

    tracing::debug!(
        result = %id,
        nodes = nodes.len(),
        edges = edges.len(),
        missing,
        truncated,
        "assembled answer graph"
    );

    Ok(AnswerGraph {
        id: id.clone(),
        nodes,
        edges,
        missing,
        truncated,
    })
}

// ============================================================================
// Size queries
// ============================================================================

/// Largest set-binding cardinality of result `id`; with no id, the knowledge
/// graph node count.
pub fn max_num_ag_nodes(store: &MessageStore, id: Option<&ResultId>) -> Result<usize> {
    let Some(id) = id else {
        return Ok(store.num_kg_nodes());
    };
    let answer = store.require_result(id)?;
    Ok(answer
        .node_bindings
        .iter()
        .filter(|b| b.kg_id.is_many())
        .map(|b| b.kg_id.len())
        .max()
        .unwrap_or(0))
}

/// Resolved members of one binding; unresolvable ids become placeholders.
pub fn set_nodes(store: &MessageStore, id: &ResultId, qg_id: &str) -> Result<Vec<KnowledgeNode>> {
    let answer = store.require_result(id)?;
    Ok(answer
        .node_binding(qg_id)
        .map(|b| b.kg_ids().iter().map(|kid| resolve_or_missing(store, kid)).collect())
        .unwrap_or_default())
}

pub fn is_kg_pruned(store: &MessageStore, id: Option<&ResultId>) -> Result<bool> {
    Ok(max_num_ag_nodes(store, id)? > store.num_kg_nodes())
}

pub fn is_ag_pruned(store: &MessageStore, id: Option<&ResultId>, num_ag_set_nodes: usize) -> Result<bool> {
    Ok(num_ag_set_nodes < max_num_ag_nodes(store, id)?)
}
