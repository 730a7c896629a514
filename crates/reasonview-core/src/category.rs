//! Category Resolver.
//!
//! Two gaps get filled here:
//! - query nodes that pin a literal identifier (`curie`) but declare no
//!   category adopt the first category of that knowledge node;
//! - knowledge nodes whose category is ambiguous (a list) or absent (only raw
//!   `labels`) take the category of the query node they were bound to most
//!   often across all results.

use crate::index::MessageIndex;
use crate::model::{Category, KnowledgeNode, Message, OneOrMany};
use crate::store::MessageStore;

/// Fill missing query-node categories from pinned knowledge nodes.
///
/// Runs once at load, before the store is handed out. Returns the number of
/// query nodes that received a category.
pub fn resolve_query_categories(message: &mut Message, index: &MessageIndex) -> usize {
    let Message {
        query_graph,
        knowledge_graph,
        ..
    } = message;

    let mut resolved = 0;
    for qnode in query_graph.nodes.iter_mut() {
        if qnode.category.is_some() {
            continue;
        }
        let Some(curie) = qnode.curie.as_ref().and_then(|c| c.first()) else {
            continue;
        };
        let Some(knode) = index
            .kg_node_position(curie)
            .and_then(|pos| knowledge_graph.nodes.get(pos))
        else {
            tracing::debug!(qnode = %qnode.id, %curie, "pinned curie not in knowledge graph");
            continue;
        };
        if let Some(first) = knode.category.as_ref().and_then(|c| c.first()) {
            qnode.category = Some(OneOrMany::One(first.clone()));
            resolved += 1;
        }
    }
    resolved
}

/// Whether a knowledge node's category must be decided by majority vote.
pub fn needs_vote(node: &KnowledgeNode) -> bool {
    match &node.category {
        Some(OneOrMany::Many(_)) => true,
        Some(OneOrMany::One(_)) => false,
        None => node.labels.is_some(),
    }
}

/// How often `kg_id` was bound to each query node, indexed by query-node
/// position. Set membership counts once per result binding.
pub fn binding_tally(store: &MessageStore, kg_id: &str) -> Vec<usize> {
    let mut tally = vec![0usize; store.num_qg_nodes()];
    for result in store.results() {
        for binding in &result.node_bindings {
            if !binding.kg_id.iter().any(|id| id == kg_id) {
                continue;
            }
            if let Some(pos) = store.qg_node_position(&binding.qg_id) {
                tally[pos] += 1;
            }
        }
    }
    tally
}

/// Position of the highest tally; ties go to the earliest query node.
///
/// An all-zero tally still picks position 0, matching a node that was never
/// bound at all.
pub fn best_query_node<T>(tally: &[T]) -> Option<usize>
where
    T: PartialOrd + Copy,
{
    let mut best: Option<(usize, T)> = None;
    for (i, &count) in tally.iter().enumerate() {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((i, count)),
        }
    }
    best.map(|(i, _)| i)
}

/// Category a voted node should carry, given its tally.
///
/// A generic root winner is replaced by the node's own recorded category
/// (always in list form), falling back to its raw labels.
pub fn voted_category(store: &MessageStore, node: &KnowledgeNode, tally: &[usize]) -> Option<Category> {
    let winner = best_query_node(tally)?;
    let category = store.query_nodes().get(winner)?.category.clone()?;
    if !is_generic(store, &category) {
        return Some(category);
    }
    if let Some(own) = &node.category {
        return Some(own.clone().into_many());
    }
    match &node.labels {
        Some(labels) if !labels.is_empty() => Some(OneOrMany::Many(labels.clone())),
        _ => Some(category),
    }
}

/// Apply majority-vote resolution to `node` when it needs it.
///
/// Returns true when the category changed.
pub fn resolve_node_category(store: &MessageStore, node: &mut KnowledgeNode) -> bool {
    if !needs_vote(node) {
        return false;
    }
    let tally = binding_tally(store, &node.id);
    apply_vote(store, node, &tally)
}

pub(crate) fn apply_vote(store: &MessageStore, node: &mut KnowledgeNode, tally: &[usize]) -> bool {
    match voted_category(store, node, tally) {
        Some(category) if node.category.as_ref() != Some(&category) => {
            node.category = Some(category);
            true
        }
        _ => false,
    }
}

fn is_generic(store: &MessageStore, category: &Category) -> bool {
    match category.as_slice() {
        [only] => store.config().is_generic_category(only),
        _ => false,
    }
}

/// First entry of a category list (the only entry of a scalar category).
pub fn primary_category(category: Option<&Category>) -> Option<&str> {
    category.and_then(|c| c.first()).map(String::as_str)
}

/// [`display_category`] of the primary category, `Unknown` when there is none.
pub fn display_primary(category: Option<&Category>) -> String {
    primary_category(category)
        .map(display_category)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Human-readable category: `biolink:GeneticCondition` → `Genetic Condition`,
/// `gene_family` → `Gene Family`.
pub fn display_category(category: &str) -> String {
    let raw = category.strip_prefix("biolink:").unwrap_or(category);
    let mut words: Vec<String> = Vec::new();
    for chunk in raw.split(['_', ' ']).filter(|c| !c.is_empty()) {
        words.extend(split_camel_case(chunk));
    }
    words
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_camel_case(chunk: &str) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = chars[i - 1].is_uppercase();
            // `RNAProduct` splits before `P`, `GeneFamily` before `F`.
            if prev_lower || (prev_upper && next_lower) {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_category_handles_biolink_and_snake_case() {
        assert_eq!(display_category("biolink:GeneticCondition"), "Genetic Condition");
        assert_eq!(display_category("gene_family"), "Gene Family");
        assert_eq!(display_category("biolink:Gene"), "Gene");
        assert_eq!(display_category("biolink:RNAProduct"), "RNA Product");
        assert_eq!(display_category("disease"), "Disease");
        assert_eq!(display_primary(None), "Unknown");
        let list = OneOrMany::Many(vec!["biolink:SmallMolecule".to_string(), "x".to_string()]);
        assert_eq!(display_primary(Some(&list)), "Small Molecule");
    }

    #[test]
    fn best_query_node_prefers_earliest_on_ties() {
        assert_eq!(best_query_node(&[1usize, 3, 3]), Some(1));
        assert_eq!(best_query_node(&[0usize, 0]), Some(0));
        assert_eq!(best_query_node::<usize>(&[]), None);
        assert_eq!(best_query_node(&[0.5f64, 2.0, 1.0]), Some(1));
    }

    #[test]
    fn needs_vote_for_lists_and_label_only_nodes() {
        let mut node = KnowledgeNode::new("a", None, Some("biolink:Gene"));
        assert!(!needs_vote(&node));
        node.category = Some(OneOrMany::Many(vec!["biolink:Gene".into()]));
        assert!(needs_vote(&node));
        node.category = None;
        assert!(!needs_vote(&node));
        node.labels = Some(vec!["gene".into()]);
        assert!(needs_vote(&node));
    }
}
