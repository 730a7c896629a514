use anyhow::Result;
use reasonview_core::category::{binding_tally, resolve_node_category, voted_category};
use reasonview_core::{Message, MessageStore, OneOrMany, ViewConfig};
use serde_json::json;

fn store() -> Result<MessageStore> {
    let msg = Message::from_json_value(json!({
        "query_graph": {
            "nodes": [
                {"id": "n0", "curie": ["MONDO:0005737", "MONDO:0000001"]},
                {"id": "n1", "category": "biolink:named_thing"},
                {"id": "n2", "category": "biolink:Protein", "set": true},
                {"id": "n3", "curie": "NOT:FOUND"}
            ]
        },
        "knowledge_graph": {
            "nodes": [
                {"id": "MONDO:0005737", "name": "Ebola", "category": ["biolink:Disease", "biolink:NamedThing"]},
                {"id": "P:1", "name": "VP35", "category": ["biolink:Protein", "biolink:NamedThing"]},
                {"id": "L:1", "name": "legacy", "labels": ["gene", "named_thing"]},
                {"id": "L:2", "name": "legacy-2", "labels": ["chemical"]}
            ]
        },
        "results": [
            {"node_bindings": [{"qg_id": "n0", "kg_id": "MONDO:0005737"}, {"qg_id": "n1", "kg_id": "L:1"}, {"qg_id": "n2", "kg_id": ["P:1", "L:2"]}]},
            {"node_bindings": [{"qg_id": "n0", "kg_id": "MONDO:0005737"}, {"qg_id": "n1", "kg_id": "P:1"}, {"qg_id": "n2", "kg_id": ["P:1"]}]},
            {"node_bindings": [{"qg_id": "n1", "kg_id": "L:2"}]}
        ]
    }))?;
    let config = ViewConfig {
        generic_categories: vec!["biolink:named_thing".into()],
        ..ViewConfig::default()
    };
    Ok(MessageStore::load(msg, config)?)
}

#[test]
fn pinned_curie_adopts_first_knowledge_category() -> Result<()> {
    let store = store()?;
    assert_eq!(
        store.qg_node("n0").and_then(|q| q.category.clone()),
        Some(OneOrMany::One("biolink:Disease".into()))
    );
    assert_eq!(store.qg_node("n3").and_then(|q| q.category.clone()), None);
    Ok(())
}

#[test]
fn tally_counts_set_membership_per_result() -> Result<()> {
    let store = store()?;
    assert_eq!(binding_tally(&store, "P:1"), vec![0, 1, 2, 0]);
    assert_eq!(binding_tally(&store, "L:2"), vec![0, 1, 1, 0]);
    assert_eq!(binding_tally(&store, "nobody"), vec![0, 0, 0, 0]);
    Ok(())
}

#[test]
fn set_majority_wins_over_generic_slot() -> Result<()> {
    let store = store()?;
    let mut node = store.kg_node("P:1").cloned().expect("P:1");
    assert!(resolve_node_category(&store, &mut node));
    assert_eq!(node.category, Some(OneOrMany::One("biolink:Protein".into())));
    Ok(())
}

#[test]
fn generic_winner_uses_labels_when_no_category_is_recorded() -> Result<()> {
    let store = store()?;
    let node = store.kg_node("L:1").expect("L:1");
    let tally = binding_tally(&store, "L:1");
    assert_eq!(
        voted_category(&store, node, &tally),
        Some(OneOrMany::Many(vec!["gene".into(), "named_thing".into()]))
    );
    Ok(())
}

#[test]
fn tie_goes_to_the_earliest_query_node() -> Result<()> {
    let store = store()?;
    let mut node = store.kg_node("L:2").cloned().expect("L:2");
    resolve_node_category(&store, &mut node);
    // n1 (generic) and n2 tie; n1 wins and falls back to the raw labels.
    assert_eq!(node.category, Some(OneOrMany::Many(vec!["chemical".into()])));
    Ok(())
}
