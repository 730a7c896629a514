//! Graph Pruning/Scoring Engine.
//!
//! Builds a size-bounded overview of the whole knowledge graph that stays
//! representative per query node:
//!
//! ```text
//!   results ──► score/occurrence vectors per kg node
//!                 │
//!                 ▼
//!   per query node: rank candidates, keep top `quota` ──► selected
//!                 │                       └─ rest ──► unselected pool
//!                 ▼
//!   backfill from pool (by aggregate score) until `prune_num`
//!                 │
//!                 ▼
//!   edges with both endpoints selected, category vote, level
//! ```
//!
//! Selection and survivor sets are roaring bitmaps over knowledge-node
//! positions.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::category::{self, best_query_node};
use crate::model::{KnowledgeEdge, KnowledgeNode};
use crate::store::MessageStore;

/// Metric candidates are ranked by within one pruning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKey {
    /// Sum of result scores over every binding of the node.
    AggregateScore,
    /// Number of bindings under the query node being filled.
    OccurrenceCount,
}

/// Per-node scoring, indexed by query-node position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    /// Position of the node in the knowledge graph.
    pub position: u32,
    pub score_vector: Vec<f64>,
    pub occurrence_vector: Vec<usize>,
    pub agg_score: f64,
}

impl ScoredCandidate {
    fn new(position: u32, num_qg_nodes: usize) -> Self {
        Self {
            position,
            score_vector: vec![0.0; num_qg_nodes],
            occurrence_vector: vec![0; num_qg_nodes],
            agg_score: 0.0,
        }
    }

    /// Whether this node competes for the slots of query node `qpos`.
    fn is_candidate_for(&self, key: RankingKey, qpos: usize) -> bool {
        match key {
            RankingKey::AggregateScore => self.score_vector[qpos] > 0.0,
            RankingKey::OccurrenceCount => self.occurrence_vector[qpos] > 0,
        }
    }

    fn metric(&self, key: RankingKey, qpos: usize) -> f64 {
        match key {
            RankingKey::AggregateScore => self.agg_score,
            RankingKey::OccurrenceCount => self.occurrence_vector[qpos] as f64,
        }
    }

    fn total_occurrences(&self) -> usize {
        self.occurrence_vector.iter().sum()
    }
}

/// A knowledge node copied into the pruned graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrunedNode {
    #[serde(flatten)]
    pub node: KnowledgeNode,
    /// Position of the query node this node was bound to most often.
    pub level: usize,
    pub agg_score: f64,
    pub score_vector: Vec<f64>,
    pub occurrence_vector: Vec<usize>,
}

impl PrunedNode {
    const FIELDS: [&'static str; 4] = ["level", "agg_score", "score_vector", "occurrence_vector"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrunedGraph {
    pub nodes: Vec<PrunedNode>,
    pub edges: Vec<KnowledgeEdge>,
    /// `None` when there was nothing to rank (no query graph).
    pub ranking: Option<RankingKey>,
    /// Per-query-node slot count.
    pub quota: usize,
    /// Effective target after clamping.
    pub prune_num: usize,
    /// Fewer nodes than the knowledge graph holds.
    pub truncated: bool,
}

impl PrunedGraph {
    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|n| n.node.id.as_str())
    }
}

/// Effective node target: never below the query-node count, never zero.
pub fn clamp_prune_num(prune_num: usize, num_qg_nodes: usize) -> usize {
    prune_num.max(num_qg_nodes).max(1)
}

/// `round(prune_num / num_qg_nodes)`, halves rounding up.
pub fn quota(prune_num: usize, num_qg_nodes: usize) -> usize {
    if num_qg_nodes == 0 {
        return 0;
    }
    (prune_num as f64 / num_qg_nodes as f64).round() as usize
}

// ============================================================================
// Scoring
// ============================================================================

/// Score every knowledge node that appears in at least one node binding.
///
/// Output is in knowledge-graph order. A node listed twice in one binding
/// counts once for that binding.
pub fn score_knowledge_nodes(store: &MessageStore) -> Vec<ScoredCandidate> {
    let num_q = store.num_qg_nodes();
    let mut slots: Vec<Option<ScoredCandidate>> = vec![None; store.num_kg_nodes()];
    let mut seen: Vec<u32> = Vec::new();

    for result in store.results() {
        for binding in &result.node_bindings {
            let Some(qpos) = store.qg_node_position(&binding.qg_id) else {
                continue;
            };
            seen.clear();
            seen.extend(
                binding
                    .kg_ids()
                    .iter()
                    .filter_map(|id| store.kg_node_position(id))
                    .map(|p| p as u32),
            );
            seen.sort_unstable();
            seen.dedup();

            for &pos in &seen {
                let cand = slots[pos as usize].get_or_insert_with(|| ScoredCandidate::new(pos, num_q));
                cand.occurrence_vector[qpos] += 1;
                if let Some(score) = result.score {
                    cand.score_vector[qpos] += score;
                }
            }
        }
    }

    slots
        .into_iter()
        .flatten()
        .map(|mut c| {
            c.agg_score = c.score_vector.iter().sum();
            c
        })
        .collect()
}

/// Aggregate score when every query node has a positively scored candidate,
/// occurrence count otherwise.
pub fn choose_ranking_key(candidates: &[ScoredCandidate], num_qg_nodes: usize) -> RankingKey {
    let all_scored = (0..num_qg_nodes).all(|q| candidates.iter().any(|c| c.score_vector[q] > 0.0));
    if all_scored {
        RankingKey::AggregateScore
    } else {
        RankingKey::OccurrenceCount
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ============================================================================
// Pruning
// ============================================================================

/// Prune the knowledge graph to about `prune_num` nodes.
///
/// Nodes are deep copies with category resolution applied; the store is left
/// untouched.
pub fn annotated_pruned_graph(store: &MessageStore, prune_num: usize) -> PrunedGraph {
    let num_q = store.num_qg_nodes();
    if num_q == 0 {
        return PrunedGraph::default();
    }

    let target = clamp_prune_num(prune_num, num_q);
    let quota = quota(target, num_q);
    let candidates = score_knowledge_nodes(store);
    let ranking = choose_ranking_key(&candidates, num_q);

    let mut selected = RoaringBitmap::new();
    let mut per_qnode: Vec<Vec<usize>> = vec![Vec::new(); num_q];
    let mut pool: Vec<usize> = Vec::new();

    for (qpos, picks) in per_qnode.iter_mut().enumerate() {
        let mut ranked: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].is_candidate_for(ranking, qpos))
            .collect();
        ranked.sort_by(|&a, &b| {
            descending(
                candidates[a].metric(ranking, qpos),
                candidates[b].metric(ranking, qpos),
            )
        });

        for i in ranked {
            let pos = candidates[i].position;
            if picks.len() < quota && !selected.contains(pos) {
                selected.insert(pos);
                picks.push(i);
            } else {
                pool.push(i);
            }
        }
    }

    // Rounding can hand out more slots than the target; give back the weakest
    // pick of the fullest query node until it fits.
    let mut total: usize = per_qnode.iter().map(Vec::len).sum();
    while total > target {
        let Some(fullest) = (0..num_q).max_by_key(|&q| per_qnode[q].len()) else {
            break;
        };
        let Some(i) = per_qnode[fullest].pop() else {
            break;
        };
        selected.remove(candidates[i].position);
        pool.push(i);
        total -= 1;
    }

    let mut order: Vec<usize> = per_qnode.into_iter().flatten().collect();

    if total < target {
        pool.sort_unstable();
        pool.dedup();
        pool.retain(|&i| !selected.contains(candidates[i].position));
        pool.sort_by(|&a, &b| {
            descending(candidates[a].agg_score, candidates[b].agg_score).then_with(|| {
                candidates[b]
                    .total_occurrences()
                    .cmp(&candidates[a].total_occurrences())
            })
        });
        for i in pool.into_iter().take(target - total) {
            selected.insert(candidates[i].position);
            order.push(i);
        }
    }

    let nodes: Vec<PrunedNode> = order
        .into_iter()
        .filter_map(|i| annotate(store, &candidates[i]))
        .collect();

    let edges: Vec<KnowledgeEdge> = store
        .kg_edges()
        .iter()
        .filter(|e| endpoint_selected(store, &selected, &e.subject) && endpoint_selected(store, &selected, &e.object))
        .cloned()
        .collect();

    tracing::debug!(
        target,
        quota,
        ranking = ?ranking,
        candidates = candidates.len(),
        nodes = nodes.len(),
        edges = edges.len(),
        "pruned knowledge graph"
    );

    PrunedGraph {
        truncated: nodes.len() < store.num_kg_nodes(),
        nodes,
        edges,
        ranking: Some(ranking),
        quota,
        prune_num: target,
    }
}

fn endpoint_selected(store: &MessageStore, selected: &RoaringBitmap, id: &str) -> bool {
    store
        .kg_node_position(id)
        .is_some_and(|pos| selected.contains(pos as u32))
}

fn annotate(store: &MessageStore, candidate: &ScoredCandidate) -> Option<PrunedNode> {
    let mut node = store.kg_nodes().get(candidate.position as usize)?.clone();
    if category::needs_vote(&node) {
        category::apply_vote(store, &mut node, &candidate.occurrence_vector);
    }
    Some(PrunedNode {
        node: node.without_properties(&PrunedNode::FIELDS),
        level: best_query_node(&candidate.occurrence_vector).unwrap_or(0),
        agg_score: candidate.agg_score,
        score_vector: candidate.score_vector.clone(),
        occurrence_vector: candidate.occurrence_vector.clone(),
    })
}
