//! Render preparation for derived graphs.
//!
//! [`decorate`] takes any [`DisplaySource`] (a pruned overview, an answer
//! graph, or the raw knowledge graph) and produces plain display records:
//! unique ids, short labels, publication-weighted edge widths, and the
//! multi-edge flags a hierarchical layout needs to know about.

use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::answer::AnswerGraph;
use crate::facet::facet_value_text;
use crate::model::{Category, KnowledgeEdge, KnowledgeGraph, KnowledgeNode};
use crate::prune::PrunedGraph;

/// Predicate of literature co-occurrence ("support") edges.
pub const SUPPORT_PREDICATE: &str = "literature_co-occurrence";

const LABEL_MAX_CHARS: usize = 15;
const LABEL_KEEP_CHARS: usize = 13;

/// A node as handed to [`decorate`].
#[derive(Debug, Clone, Copy)]
pub struct NodeSeed<'a> {
    pub node: &'a KnowledgeNode,
    pub level: Option<usize>,
    pub is_set: bool,
    pub binding: Option<&'a str>,
}

impl<'a> NodeSeed<'a> {
    fn plain(node: &'a KnowledgeNode) -> Self {
        Self {
            node,
            level: None,
            is_set: false,
            binding: None,
        }
    }
}

/// An edge as handed to [`decorate`], with its query-edge binding if any.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSeed<'a> {
    pub edge: &'a KnowledgeEdge,
    pub binding: Option<&'a str>,
}

/// Graphs that can be decorated for display.
pub trait DisplaySource {
    fn node_seeds(&self) -> Vec<NodeSeed<'_>>;
    fn edge_seeds(&self) -> Vec<EdgeSeed<'_>>;
}

impl DisplaySource for KnowledgeGraph {
    fn node_seeds(&self) -> Vec<NodeSeed<'_>> {
        self.nodes.iter().map(NodeSeed::plain).collect()
    }

    fn edge_seeds(&self) -> Vec<EdgeSeed<'_>> {
        self.edges
            .iter()
            .map(|edge| EdgeSeed { edge, binding: None })
            .collect()
    }
}

impl DisplaySource for PrunedGraph {
    fn node_seeds(&self) -> Vec<NodeSeed<'_>> {
        self.nodes
            .iter()
            .map(|n| NodeSeed {
                level: Some(n.level),
                ..NodeSeed::plain(&n.node)
            })
            .collect()
    }

    fn edge_seeds(&self) -> Vec<EdgeSeed<'_>> {
        self.edges
            .iter()
            .map(|edge| EdgeSeed { edge, binding: None })
            .collect()
    }
}

impl DisplaySource for AnswerGraph {
    fn node_seeds(&self) -> Vec<NodeSeed<'_>> {
        self.nodes
            .iter()
            .map(|n| NodeSeed {
                node: &n.node,
                level: Some(n.level),
                is_set: n.is_set,
                binding: Some(n.binding.as_str()),
            })
            .collect()
    }

    fn edge_seeds(&self) -> Vec<EdgeSeed<'_>> {
        self.edges
            .iter()
            .map(|e| EdgeSeed {
                edge: &e.edge,
                binding: Some(e.binding.as_str()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayNode {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
    pub is_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    /// Tooltip fields beyond id/name/category.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayEdge {
    pub id: String,
    pub subject: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    pub label: String,
    pub publications: Vec<String>,
    /// Edge width.
    pub value: f64,
    pub is_support: bool,
    /// Another regular edge joins the same unordered node pair.
    pub more_than_one_edge: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayGraph {
    pub nodes: Vec<DisplayNode>,
    pub edges: Vec<DisplayEdge>,
    /// Some node pair has several regular edges; directed layouts break.
    pub has_duplicate_edges: bool,
}

/// Short node label: names over 15 characters keep 13 plus `...`.
pub fn node_label(name: Option<&str>) -> String {
    match name {
        Some(n) if n.chars().count() > LABEL_MAX_CHARS => {
            let head: String = n.chars().take(LABEL_KEEP_CHARS).collect();
            format!("{head}...")
        }
        Some(n) if !n.is_empty() => n.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Edge width for `n` supporting publications: a logistic curve from about
/// 0.08 (no publications) towards 3.
pub fn edge_width(publications: usize) -> f64 {
    4.0 / (1.0 + (-(-1.0 + 0.01 * publications as f64)).exp()) - 1.0
}

pub fn is_support_edge(edge: &KnowledgeEdge) -> bool {
    edge.predicate.as_ref().is_some_and(|p| {
        p.iter()
            .any(|pred| pred.strip_prefix("biolink:").unwrap_or(pred) == SUPPORT_PREDICATE)
    })
}

fn unordered_pair(edge: &KnowledgeEdge) -> (&str, &str) {
    if edge.subject <= edge.object {
        (&edge.subject, &edge.object)
    } else {
        (&edge.object, &edge.subject)
    }
}

fn display_node(seed: NodeSeed<'_>) -> DisplayNode {
    let node = seed.node;
    DisplayNode {
        id: node.id.clone(),
        label: node_label(node.name.as_deref()),
        name: node.name.clone(),
        category: node.category.clone(),
        level: seed.level,
        is_set: seed.is_set,
        binding: seed.binding.map(str::to_string),
        details: node
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), facet_value_text(v)))
            .collect(),
    }
}

fn display_edge(seed: EdgeSeed<'_>, is_support: bool, more_than_one_edge: bool) -> DisplayEdge {
    let edge = seed.edge;
    let publications: Vec<String> = edge
        .publications
        .as_ref()
        .map(|p| p.as_slice().to_vec())
        .unwrap_or_default();
    let n = publications.len();
    let predicate = edge.predicate_label();

    let label = if is_support {
        n.to_string()
    } else {
        match (&predicate, n) {
            (Some(p), n) if n > 0 => format!("{p} ({n})"),
            (Some(p), _) => p.clone(),
            (None, _) => String::new(),
        }
    };

    DisplayEdge {
        id: edge.id.clone(),
        subject: edge.subject.clone(),
        object: edge.object.clone(),
        predicate,
        label,
        publications,
        value: edge_width(n),
        is_support,
        more_than_one_edge,
        binding: seed.binding.map(str::to_string),
    }
}

/// Prepare `graph` for display.
///
/// Duplicate node and edge ids keep their first occurrence. Support edges
/// are dropped when they loop on one node or repeat a regular edge's pair;
/// surviving support edges come first, followed by the regular edges.
pub fn decorate<G>(graph: &G) -> DisplayGraph
where
    G: DisplaySource + ?Sized,
{
    let mut seen_nodes = AHashSet::new();
    let nodes: Vec<DisplayNode> = graph
        .node_seeds()
        .into_iter()
        .filter(|s| seen_nodes.insert(s.node.id.clone()))
        .map(display_node)
        .collect();

    let mut seen_edges = AHashSet::new();
    let (support, regular): (Vec<EdgeSeed<'_>>, Vec<EdgeSeed<'_>>) = graph
        .edge_seeds()
        .into_iter()
        .filter(|s| seen_edges.insert(s.edge.id.clone()))
        .partition(|s| is_support_edge(s.edge));

    let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for seed in &regular {
        *pair_counts.entry(unordered_pair(seed.edge)).or_insert(0) += 1;
    }

    let mut edges = Vec::with_capacity(support.len() + regular.len());
    let mut dropped_support = 0usize;
    for seed in &support {
        let self_edge = seed.edge.subject == seed.edge.object;
        let duplicate = pair_counts.contains_key(&unordered_pair(seed.edge));
        if self_edge || duplicate {
            dropped_support += 1;
            continue;
        }
        edges.push(display_edge(*seed, true, false));
    }
    for seed in &regular {
        let shared = pair_counts
            .get(&unordered_pair(seed.edge))
            .is_some_and(|&n| n > 1);
        edges.push(display_edge(*seed, false, shared));
    }

    let has_duplicate_edges = edges.iter().any(|e| e.more_than_one_edge);
    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        dropped_support,
        has_duplicate_edges,
        "decorated graph"
    );

    DisplayGraph {
        nodes,
        edges,
        has_duplicate_edges,
    }
}
