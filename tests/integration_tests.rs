//! Integration tests for the complete Reasonview pipeline
//!
//! One message flows through every derived view:
//! - load → category resolution → overview pruning → display graph
//! - result table → dense answer → answer graph
//! - facet state → reducer replay → table narrowing
//!
//! Run with: cargo test --test integration_tests

use anyhow::Result;
use reasonview_core::{
    active_answer_graph, annotated_pruned_graph, answer_set_table, decorate, dense_answer,
    is_ag_pruned, replay, Action, Message, MessageStore, OneOrMany, ResultId, ViewConfig,
    ViewState,
};
use serde_json::json;

fn message() -> Result<Message> {
    Ok(Message::from_json_value(json!({
        "query_graph": {
            "nodes": [
                {"id": "n0", "curie": "MONDO:0004979"},
                {"id": "n1", "category": "biolink:Gene", "is_set": true},
                {"id": "n2", "category": ["biolink:ChemicalEntity", "biolink:Drug"]}
            ],
            "edges": [
                {"id": "e0", "subject": "n1", "object": "n0"},
                {"id": "e1", "subject": "n2", "object": "n1"}
            ]
        },
        "knowledge_graph": {
            "nodes": [
                {"id": "MONDO:0004979", "name": "asthma", "category": ["biolink:Disease"]},
                {"id": "G:1", "name": "IL13", "category": ["biolink:Gene"], "taxon": "human"},
                {"id": "G:2", "name": "IL4", "category": ["biolink:Gene"], "taxon": "human"},
                {"id": "G:3", "name": "IL5", "category": ["biolink:Gene"], "taxon": "mouse"},
                {"id": "C:1", "name": "dupilumab", "category": ["biolink:Drug", "biolink:ChemicalEntity"]},
                {"id": "C:2", "name": "mepolizumab", "category": ["biolink:Drug"]}
            ],
            "edges": [
                {"id": "k0", "subject": "G:1", "object": "MONDO:0004979", "predicate": "biolink:gene_associated_with_condition", "publications": ["PMID:1"]},
                {"id": "k1", "subject": "G:2", "object": "MONDO:0004979", "predicate": "biolink:gene_associated_with_condition"},
                {"id": "k2", "subject": "G:3", "object": "MONDO:0004979", "predicate": "biolink:gene_associated_with_condition"},
                {"id": "k3", "subject": "C:1", "object": "G:2", "predicate": "biolink:affects"},
                {"id": "k4", "subject": "C:2", "object": "G:3", "predicate": "biolink:affects"},
                {"id": "s0", "subject": "C:1", "object": "G:2", "predicate": "biolink:literature_co-occurrence", "publications": ["PMID:2", "PMID:3"]}
            ]
        },
        "results": [
            {"score": 0.8,
             "node_bindings": [
                {"qg_id": "n0", "kg_id": "MONDO:0004979"},
                {"qg_id": "n1", "kg_id": ["G:1", "G:2"]},
                {"qg_id": "n2", "kg_id": "C:1"}],
             "edge_bindings": [
                {"qg_id": "e0", "kg_id": ["k0", "k1"]},
                {"qg_id": "e1", "kg_id": ["k3", "s0"]}]},
            {"score": 0.3,
             "node_bindings": [
                {"qg_id": "n0", "kg_id": "MONDO:0004979"},
                {"qg_id": "n1", "kg_id": ["G:3"]},
                {"qg_id": "n2", "kg_id": "C:2"}],
             "edge_bindings": [
                {"qg_id": "e0", "kg_id": "k2"},
                {"qg_id": "e1", "kg_id": "k4"}]}
        ]
    }))?)
}

fn store() -> Result<MessageStore> {
    Ok(MessageStore::load(message()?, ViewConfig::default())?)
}

// ============================================================================
// Load
// ============================================================================

#[test]
fn test_load_resolves_pinned_query_categories() -> Result<()> {
    let store = store()?;
    assert_eq!(
        store.qg_node("n0").and_then(|q| q.category.clone()),
        Some(OneOrMany::One("biolink:Disease".into()))
    );
    assert!(!store.has_unknown_nodes());
    assert!(store.result(&ResultId::Index(1)).is_some());
    Ok(())
}

// ============================================================================
// Overview graph
// ============================================================================

#[test]
fn test_overview_keeps_everything_under_budget() -> Result<()> {
    let store = store()?;
    let pruned = annotated_pruned_graph(&store, 50);
    assert_eq!(pruned.nodes.len(), 6);
    assert_eq!(pruned.edges.len(), 6);
    assert!(!pruned.truncated);

    let display = decorate(&pruned);
    // s0 duplicates the C:1 → G:2 pair of k3.
    assert_eq!(display.edges.len(), 5);
    assert!(display.edges.iter().all(|e| e.id != "s0"));
    let drug = display.nodes.iter().find(|n| n.id == "C:1").expect("C:1");
    assert_eq!(drug.level, Some(2));
    Ok(())
}

#[test]
fn test_overview_budget_is_honored() -> Result<()> {
    let store = store()?;
    let pruned = annotated_pruned_graph(&store, 3);
    assert_eq!(pruned.nodes.len(), 3);
    assert!(pruned.truncated);
    let kept: Vec<&str> = pruned.node_ids().collect();
    for edge in &pruned.edges {
        assert!(kept.contains(&edge.subject.as_str()));
        assert!(kept.contains(&edge.object.as_str()));
    }
    Ok(())
}

// ============================================================================
// Table and answers
// ============================================================================

#[test]
fn test_table_rows_follow_results() -> Result<()> {
    let store = store()?;
    let table = answer_set_table(&store);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].cell_text("n1"), "IL13, IL4");
    assert_eq!(table.rows[0].rank(), "0.800");
    let headers: Vec<&str> = table.columns.iter().map(|c| c.header()).collect();
    assert_eq!(
        headers,
        vec!["", "n0: Disease", "n1: Gene", "n2: Chemical Entity", "Rank"]
    );
    Ok(())
}

#[test]
fn test_dense_and_graph_views_of_one_result() -> Result<()> {
    let store = store()?;
    let id = ResultId::Index(0);

    let dense = dense_answer(&store, &id)?;
    assert!(dense.nodes["n1"].is_set);
    assert_eq!(dense.nodes["n1"].set_nodes.len(), 2);
    assert_eq!(dense.edges["e1"].len(), 2);

    let graph = active_answer_graph(&store, &id, 1)?;
    assert_eq!(graph.nodes.len(), 3);
    assert!(graph.truncated);
    assert!(is_ag_pruned(&store, Some(&id), 1)?);
    // G:2 has more supporting publications and wins the single set slot.
    assert!(graph.nodes.iter().any(|n| n.node.id == "G:2"));
    Ok(())
}

// ============================================================================
// Facets and reducer
// ============================================================================

#[test]
fn test_facet_replay_narrows_the_table() -> Result<()> {
    let store = store()?;
    let actions: Vec<Action> = serde_json::from_value(json!([
        {"action": "toggle", "qnode_id": "n1", "property_key": "taxon", "value": "mouse"},
        {"action": "set_num_ag_set_nodes", "num_ag_set_nodes": 1}
    ]))?;
    let state = replay(&store, &actions)?;
    assert_eq!(state.num_ag_set_nodes, 1);
    assert_eq!(state.facets.filtered_rows(), [ResultId::Index(0)]);

    let mut table = answer_set_table(&store);
    table.retain_rows(state.facets.filtered_rows());
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].cell_text("n2"), "dupilumab");

    // The initial state is untouched by replay.
    let initial = ViewState::new(&store);
    assert_eq!(initial.facets.filtered_rows().len(), 2);
    Ok(())
}
