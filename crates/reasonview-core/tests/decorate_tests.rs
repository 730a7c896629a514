use anyhow::Result;
use approx::assert_relative_eq;
use reasonview_core::decorate::edge_width;
use reasonview_core::{
    active_answer_graph, annotated_pruned_graph, decorate, KnowledgeEdge, KnowledgeGraph,
    KnowledgeNode, Message, MessageStore, ViewConfig,
};
use serde_json::json;

fn graph() -> KnowledgeGraph {
    KnowledgeGraph {
        nodes: vec![
            KnowledgeNode::new("A", Some("Alpha-1-B glycoprotein"), Some("biolink:Gene")),
            KnowledgeNode::new("B", Some("asthma"), Some("biolink:Disease")),
            KnowledgeNode::new("C", None, None).with_property("taxon", "human"),
            KnowledgeNode::new("A", Some("duplicate"), None),
        ],
        edges: vec![
            KnowledgeEdge::new("e1", "A", "B", Some("biolink:causes")).with_publications(["PMID:1", "PMID:2"]),
            KnowledgeEdge::new("e2", "B", "A", Some("biolink:related_to")),
            KnowledgeEdge::new("e1", "A", "B", Some("biolink:causes")),
            KnowledgeEdge::new("s1", "A", "B", Some("literature_co-occurrence")).with_publications(["PMID:3"]),
            KnowledgeEdge::new("s2", "C", "C", Some("biolink:literature_co-occurrence")),
            KnowledgeEdge::new("s3", "B", "C", Some("literature_co-occurrence")).with_publications(["PMID:4", "PMID:5"]),
            KnowledgeEdge::new("e3", "B", "C", None),
        ],
    }
}

#[test]
fn duplicates_are_dropped_first_wins() {
    let display = decorate(&graph());
    let ids: Vec<&str> = display.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(display.nodes[0].label, "Alpha-1-B gly...");
    assert_eq!(display.nodes[2].label, "Unknown");
    assert_eq!(display.nodes[2].details.get("taxon").map(String::as_str), Some("human"));
}

#[test]
fn support_edges_are_removed_when_self_or_redundant() {
    let display = decorate(&graph());
    let ids: Vec<&str> = display.edges.iter().map(|e| e.id.as_str()).collect();
    // s1 repeats A-B, s2 loops on C, s3 repeats B-C.
    assert_eq!(ids, vec!["e1", "e2", "e3"]);
    assert!(display.edges.iter().all(|e| !e.is_support));
}

#[test]
fn parallel_regular_edges_are_flagged() {
    let display = decorate(&graph());
    let by_id = |id: &str| display.edges.iter().find(|e| e.id == id).expect("edge");
    assert!(by_id("e1").more_than_one_edge);
    assert!(by_id("e2").more_than_one_edge);
    assert!(!by_id("e3").more_than_one_edge);
    assert!(display.has_duplicate_edges);
}

#[test]
fn edge_labels_carry_publication_counts() {
    let display = decorate(&graph());
    let e1 = &display.edges[0];
    assert_eq!(e1.label, "biolink:causes (2)");
    assert_eq!(e1.publications.len(), 2);
    assert_relative_eq!(e1.value, edge_width(2));
    assert_eq!(display.edges[1].label, "biolink:related_to");
    assert!(display.edges[1].publications.is_empty());
    assert_eq!(display.edges[2].label, "");
}

#[test]
fn lone_support_edge_survives_and_comes_first() {
    let g = KnowledgeGraph {
        nodes: vec![KnowledgeNode::new("A", None, None), KnowledgeNode::new("B", None, None)],
        edges: vec![
            KnowledgeEdge::new("r", "A", "A", Some("biolink:related_to")),
            KnowledgeEdge::new("s", "A", "B", Some("literature_co-occurrence")).with_publications(["PMID:1", "PMID:2", "PMID:3"]),
        ],
    };
    let display = decorate(&g);
    assert_eq!(display.edges[0].id, "s");
    assert!(display.edges[0].is_support);
    assert_eq!(display.edges[0].label, "3");
    assert!(!display.edges[0].more_than_one_edge);
    assert!(!display.has_duplicate_edges);
}

#[test]
fn derived_graphs_decorate_with_levels_and_bindings() -> Result<()> {
    let msg = Message::from_json_value(json!({
        "query_graph": {"nodes": [{"id": "n0"}, {"id": "n1", "is_set": true}], "edges": [{"id": "e0", "subject": "n0", "object": "n1"}]},
        "knowledge_graph": {
            "nodes": [{"id": "A", "name": "a"}, {"id": "B", "name": "b"}],
            "edges": [{"id": "k", "subject": "A", "object": "B", "predicate": "biolink:related_to"}]
        },
        "results": [{"score": 1.0,
            "node_bindings": [{"qg_id": "n0", "kg_id": "A"}, {"qg_id": "n1", "kg_id": ["B"]}],
            "edge_bindings": [{"qg_id": "e0", "kg_id": "k"}]}]
    }))?;
    let store = MessageStore::load(msg, ViewConfig::default())?;

    let pruned = decorate(&annotated_pruned_graph(&store, 10));
    assert_eq!(pruned.nodes[1].level, Some(1));
    assert_eq!(pruned.edges.len(), 1);

    let answer = decorate(&active_answer_graph(&store, &0u64.into(), 10)?);
    assert_eq!(answer.nodes[1].binding.as_deref(), Some("n1"));
    assert!(answer.nodes[1].is_set);
    assert_eq!(answer.edges[0].binding.as_deref(), Some("e0"));
    Ok(())
}
