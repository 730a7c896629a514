use anyhow::Result;
use reasonview_core::{FacetState, Message, MessageStore, ResultId, ViewConfig, ViewError};
use serde_json::json;

fn gene_message() -> Result<Message> {
    Ok(Message::from_json_value(json!({
        "query_graph": {
            "nodes": [
                {"id": "n0", "category": "biolink:Disease"},
                {"id": "n1", "category": "biolink:Gene"}
            ]
        },
        "knowledge_graph": {
            "nodes": [
                {"id": "D1", "name": "asthma", "category": "biolink:Disease", "equivalent_identifiers": ["DOID:2841"]},
                {"id": "G1", "name": "IL13", "taxon": "human", "note": "curated"},
                {"id": "G2", "name": "IL4", "taxon": "mouse"},
                {"id": "G3", "name": "TSLP", "taxon": "human"}
            ]
        },
        "results": [
            {"node_bindings": [{"qg_id": "n0", "kg_id": "D1"}, {"qg_id": "n1", "kg_id": "G1"}]},
            {"node_bindings": [{"qg_id": "n0", "kg_id": "D1"}, {"qg_id": "n1", "kg_id": "G2"}]},
            {"node_bindings": [{"qg_id": "n0", "kg_id": "D1"}, {"qg_id": "n1", "kg_id": ["G3", "G1", "G:404"]}]}
        ]
    }))?)
}

fn setup() -> Result<(MessageStore, FacetState)> {
    let store = MessageStore::load(gene_message()?, ViewConfig::default())?;
    let facets = FacetState::initialize(&store);
    Ok((store, facets))
}

fn rows(ids: &[u64]) -> Vec<ResultId> {
    ids.iter().copied().map(ResultId::Index).collect()
}

#[test]
fn facets_keep_only_properties_shared_by_every_bound_node() -> Result<()> {
    let (_store, facets) = setup()?;

    let genes = facets.qnode("n1").expect("n1 panel");
    let keys: Vec<&str> = genes.properties.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["name", "taxon"]);

    let taxa: Vec<&str> = genes.property("taxon").expect("taxon").values.keys().map(String::as_str).collect();
    assert_eq!(taxa, vec!["human", "mouse"]);
    assert_eq!(genes.bound_ids(), ["G1", "G2", "G3", "G:404"]);

    let disease = facets.qnode("n0").expect("n0 panel");
    assert!(disease.property("equivalent_identifiers").is_none());
    assert!(disease.property("name").is_some());

    assert_eq!(facets.filtered_rows(), rows(&[0, 1, 2]).as_slice());
    assert!(!facets.is_filtered("n1"));
    Ok(())
}

#[test]
fn toggling_a_value_hides_nodes_rows_and_availability() -> Result<()> {
    let (store, facets) = setup()?;
    let next = facets.toggle(&store, "n1", "taxon", "mouse")?;

    assert!(!next.is_visible("n1", "G2"));
    assert!(next.is_visible("n1", "G1"));
    assert_eq!(next.filtered_rows(), rows(&[0, 2]).as_slice());

    let mouse = next.value_state("n1", "taxon", "mouse").expect("mouse");
    assert!(!mouse.checked);
    assert!(!mouse.available);
    let il4 = next.value_state("n1", "name", "IL4").expect("IL4");
    assert!(il4.checked);
    assert!(!il4.available);
    assert!(next.value_state("n1", "name", "TSLP").expect("TSLP").available);

    assert!(next.is_filtered("n1"));
    assert!(next.is_prop_filtered("n1", "taxon"));
    assert!(!next.is_prop_filtered("n1", "name"));

    // Untouched panels are shared with the previous version.
    assert!(next.shares_qnode(&facets, "n0"));
    assert!(!next.shares_qnode(&facets, "n1"));
    // The previous version is unchanged.
    assert!(!facets.is_filtered("n1"));
    assert_eq!(facets.filtered_rows().len(), 3);
    Ok(())
}

#[test]
fn toggle_all_twice_restores_checked_state() -> Result<()> {
    let (store, facets) = setup()?;

    let unchecked = facets.toggle_all(&store, "n1", "taxon")?;
    assert!(unchecked.is_prop_filtered("n1", "taxon"));
    assert!(unchecked.filtered_rows().is_empty());
    assert!(!unchecked.value_state("n0", "name", "asthma").expect("asthma").available);

    let restored = unchecked.toggle_all(&store, "n1", "taxon")?;
    assert_eq!(restored, facets);
    Ok(())
}

#[test]
fn toggle_all_checks_everything_when_partially_filtered() -> Result<()> {
    let (store, facets) = setup()?;
    let partial = facets.toggle(&store, "n1", "taxon", "human")?;
    let all = partial.toggle_all(&store, "n1", "taxon")?;
    assert!(!all.is_prop_filtered("n1", "taxon"));
    assert_eq!(all.filtered_rows().len(), 3);
    Ok(())
}

#[test]
fn reset_clears_checks_and_search() -> Result<()> {
    let (store, facets) = setup()?;
    let filtered = facets
        .toggle(&store, "n1", "name", "IL13")?
        .search("n1", "il")?;
    assert!(filtered.is_filtered("n1"));
    assert_eq!(filtered.filtered_rows(), rows(&[1]).as_slice());

    let reset = filtered.reset(&store, "n1")?;
    assert!(!reset.is_filtered("n1"));
    assert_eq!(reset.filtered_rows().len(), 3);
    assert_eq!(reset.qnode("n1").and_then(|q| q.search.clone()), None);
    Ok(())
}

#[test]
fn search_narrows_the_panel_without_touching_checks() -> Result<()> {
    let (_store, facets) = setup()?;
    let searched = facets.search("n1", "HU")?;

    let panel = searched.searched_filter("n1")?;
    let taxon = panel.iter().find(|p| p.key == "taxon").expect("taxon");
    assert_eq!(taxon.values.keys().collect::<Vec<_>>(), vec!["human"]);
    let name = panel.iter().find(|p| p.key == "name").expect("name");
    assert!(name.values.is_empty());

    assert!(!searched.is_filtered("n1"));
    assert!(searched.shares_qnode(&facets, "n0"));

    let cleared = searched.search("n1", "")?;
    assert_eq!(cleared.searched_filter("n1")?.len(), 2);
    assert_eq!(cleared.searched_filter("n1")?[1].values.len(), 2);
    Ok(())
}

#[test]
fn unknown_facets_are_contract_violations() -> Result<()> {
    let (store, facets) = setup()?;

    let err = facets.toggle(&store, "n9", "taxon", "human").unwrap_err();
    assert!(matches!(err, ViewError::UnknownFacet { property_key: None, .. }));

    let err = facets.toggle(&store, "n1", "note", "curated").unwrap_err();
    assert_eq!(err.to_string(), "unknown facet n1 / note");

    let err = facets.toggle(&store, "n1", "taxon", "rat").unwrap_err();
    assert!(matches!(err, ViewError::UnknownFacet { property_value: Some(_), .. }));

    assert!(facets.search("n9", "x").is_err());
    assert!(facets.reset(&store, "n9").is_err());
    Ok(())
}

#[test]
fn external_row_narrowing_recomputes_availability() -> Result<()> {
    let (store, facets) = setup()?;
    let narrowed = facets.update_filtered_rows(&store, rows(&[1]));

    assert_eq!(narrowed.filtered_rows(), rows(&[1]).as_slice());
    assert!(narrowed.value_state("n1", "taxon", "mouse").expect("mouse").available);
    assert!(!narrowed.value_state("n1", "taxon", "human").expect("human").available);
    assert!(narrowed.value_state("n1", "taxon", "human").expect("human").checked);
    // D1 appears in every row, so the disease panel keeps its version.
    assert!(narrowed.shares_qnode(&facets, "n0"));
    Ok(())
}
