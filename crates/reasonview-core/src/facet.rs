//! Facet Filter Engine.
//!
//! For every query node the engine keeps:
//!
//! ```text
//! properties   ordered [(property key, {value → (checked, available)})]
//! visibility   bound kg id → visible under the current checked bits
//! search       optional narrowing text for the facet panel
//! ```
//!
//! plus the ids of the result rows that survive the filter. `checked` is the
//! user's choice; `available` says whether the value still occurs among the
//! visible nodes of the surviving rows.
//!
//! State is versioned: every mutator takes `&self` and returns a new
//! [`FacetState`]. Query nodes sit behind `Arc`s and are only copied when an
//! action actually changes them, so versions share untouched query nodes.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ViewConfig;
use crate::error::{Result, ViewError};
use crate::model::{KnowledgeNode, ResultId};
use crate::store::MessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValueState {
    pub checked: bool,
    pub available: bool,
}

impl Default for FacetValueState {
    fn default() -> Self {
        Self {
            checked: true,
            available: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyFacet {
    /// Property key with spaces replaced by underscores.
    pub key: String,
    pub values: BTreeMap<String, FacetValueState>,
}

impl PropertyFacet {
    /// Some value is unchecked.
    pub fn is_filtered(&self) -> bool {
        self.values.values().any(|v| !v.checked)
    }
}

/// Facet panel of one query node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryNodeFacets {
    pub qnode_id: String,
    pub properties: Vec<PropertyFacet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Bound kg ids in first-seen order.
    #[serde(skip)]
    bound: Vec<String>,
    #[serde(skip)]
    visible: AHashMap<String, bool>,
}

impl QueryNodeFacets {
    pub fn property(&self, key: &str) -> Option<&PropertyFacet> {
        self.properties.iter().find(|p| p.key == key)
    }

    fn property_mut(&mut self, key: &str) -> Option<&mut PropertyFacet> {
        self.properties.iter_mut().find(|p| p.key == key)
    }

    pub fn is_filtered(&self) -> bool {
        self.properties.iter().any(PropertyFacet::is_filtered)
    }

    /// Bound ids the query node was seeded with, first-seen order.
    pub fn bound_ids(&self) -> &[String] {
        &self.bound
    }

    pub fn is_visible(&self, kg_id: &str) -> bool {
        self.visible.get(kg_id).copied().unwrap_or(true)
    }

    /// Facet properties narrowed to the values matching the search text.
    pub fn searched(&self) -> Vec<PropertyFacet> {
        let Some(needle) = self.search.as_ref().map(|s| s.to_lowercase()) else {
            return self.properties.clone();
        };
        self.properties
            .iter()
            .map(|p| PropertyFacet {
                key: p.key.clone(),
                values: p
                    .values
                    .iter()
                    .filter(|(value, _)| value.to_lowercase().contains(&needle))
                    .map(|(value, state)| (value.clone(), *state))
                    .collect(),
            })
            .collect()
    }

    /// A node is admitted when none of its facet values is unchecked. Values
    /// the panel does not list count as checked.
    fn admits(&self, pairs: &[(String, String)]) -> bool {
        self.properties.iter().all(|facet| {
            pairs
                .iter()
                .filter(|(key, _)| *key == facet.key)
                .all(|(_, value)| facet.values.get(value).map_or(true, |s| s.checked))
        })
    }

    fn recompute_visibility(&mut self, store: &MessageStore) {
        let mut visible = AHashMap::with_capacity(self.bound.len());
        for kg_id in &self.bound {
            let show = match store.kg_node(kg_id) {
                Some(knode) => self.admits(&facet_pairs(store.config(), knode)),
                None => true,
            };
            visible.insert(kg_id.clone(), show);
        }
        self.visible = visible;
    }
}

/// Normalized facet key: spaces become underscores.
pub fn normalize_key(key: &str) -> String {
    key.replace(' ', "_")
}

/// Facet text of a property value.
pub fn facet_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(facet_value_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Every non-blocklisted `(normalized key, value text)` a node offers.
pub fn facet_pairs(config: &ViewConfig, node: &KnowledgeNode) -> Vec<(String, String)> {
    let mut pairs = vec![("id".to_string(), node.id.clone())];
    if let Some(name) = &node.name {
        pairs.push(("name".to_string(), name.clone()));
    }
    if let Some(category) = &node.category {
        pairs.push(("category".to_string(), category.as_slice().join(",")));
    }
    if let Some(labels) = &node.labels {
        pairs.push(("labels".to_string(), labels.join(",")));
    }
    for (key, value) in &node.properties {
        pairs.push((normalize_key(key), facet_value_text(value)));
    }
    pairs.retain(|(key, _)| !config.is_blocklisted(key));
    pairs
}

/// Properties common to every resolvable bound node, with all their values.
///
/// The first resolvable node seeds the list; each later node contributes new
/// values under properties already present and removes the properties it
/// lacks.
fn intersect_properties(store: &MessageStore, bound: &[String]) -> Vec<PropertyFacet> {
    let mut properties: Vec<PropertyFacet> = Vec::new();
    let mut seeded = false;

    for kg_id in bound {
        let Some(knode) = store.kg_node(kg_id) else {
            continue;
        };
        let pairs = facet_pairs(store.config(), knode);

        for (key, value) in &pairs {
            match properties.iter_mut().find(|p| &p.key == key) {
                Some(facet) => {
                    facet.values.entry(value.clone()).or_default();
                }
                None if !seeded => properties.push(PropertyFacet {
                    key: key.clone(),
                    values: BTreeMap::from([(value.clone(), FacetValueState::default())]),
                }),
                None => {}
            }
        }
        if seeded {
            properties.retain(|p| pairs.iter().any(|(key, _)| *key == p.key));
        }
        seeded = true;
    }
    properties
}

// ============================================================================
// Versioned state
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetState {
    qnodes: Vec<Arc<QueryNodeFacets>>,
    filtered_rows: Arc<Vec<ResultId>>,
}

impl FacetState {
    /// Seed visibility from every binding and derive the facet panels.
    ///
    /// Every value starts checked and available; every result row is visible.
    pub fn initialize(store: &MessageStore) -> Self {
        let mut bound: Vec<(Vec<String>, AHashMap<String, bool>)> =
            vec![(Vec::new(), AHashMap::new()); store.num_qg_nodes()];

        for result in store.results() {
            for binding in &result.node_bindings {
                let Some(qpos) = store.qg_node_position(&binding.qg_id) else {
                    continue;
                };
                let (order, visible) = &mut bound[qpos];
                for kg_id in binding.kg_ids() {
                    if visible.insert(kg_id.clone(), true).is_none() {
                        order.push(kg_id.clone());
                    }
                }
            }
        }

        let qnodes: Vec<Arc<QueryNodeFacets>> = store
            .query_nodes()
            .iter()
            .zip(bound)
            .map(|(qnode, (order, visible))| {
                Arc::new(QueryNodeFacets {
                    qnode_id: qnode.id.clone(),
                    properties: intersect_properties(store, &order),
                    search: None,
                    bound: order,
                    visible,
                })
            })
            .collect();

        let rows = store
            .results()
            .iter()
            .filter_map(|r| r.id.clone())
            .collect();

        tracing::debug!(
            qnodes = qnodes.len(),
            facets = qnodes.iter().map(|q| q.properties.len()).sum::<usize>(),
            "facet index initialized"
        );

        Self {
            qnodes,
            filtered_rows: Arc::new(rows),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn qnodes(&self) -> impl Iterator<Item = &QueryNodeFacets> + '_ {
        self.qnodes.iter().map(Arc::as_ref)
    }

    pub fn qnode(&self, qnode_id: &str) -> Option<&QueryNodeFacets> {
        self.qnodes().find(|q| q.qnode_id == qnode_id)
    }

    fn require(&self, qnode_id: &str) -> Result<usize> {
        self.qnodes
            .iter()
            .position(|q| q.qnode_id == qnode_id)
            .ok_or_else(|| ViewError::unknown_qnode(qnode_id))
    }

    /// Any value of the query node is unchecked.
    pub fn is_filtered(&self, qnode_id: &str) -> bool {
        self.qnode(qnode_id).is_some_and(QueryNodeFacets::is_filtered)
    }

    pub fn is_prop_filtered(&self, qnode_id: &str, property_key: &str) -> bool {
        self.qnode(qnode_id)
            .and_then(|q| q.property(property_key))
            .is_some_and(PropertyFacet::is_filtered)
    }

    pub fn value_state(&self, qnode_id: &str, property_key: &str, value: &str) -> Option<FacetValueState> {
        self.qnode(qnode_id)?.property(property_key)?.values.get(value).copied()
    }

    pub fn is_visible(&self, qnode_id: &str, kg_id: &str) -> bool {
        self.qnode(qnode_id).map_or(true, |q| q.is_visible(kg_id))
    }

    /// The facet panel of `qnode_id` narrowed by its search text.
    pub fn searched_filter(&self, qnode_id: &str) -> Result<Vec<PropertyFacet>> {
        let pos = self.require(qnode_id)?;
        Ok(self.qnodes[pos].searched())
    }

    /// Ids of the result rows that survive the filter, message order.
    pub fn filtered_rows(&self) -> &[ResultId] {
        &self.filtered_rows
    }

    /// Whether two versions still share the panel of `qnode_id`.
    pub fn shares_qnode(&self, other: &Self, qnode_id: &str) -> bool {
        match (self.require(qnode_id), other.require(qnode_id)) {
            (Ok(a), Ok(b)) => Arc::ptr_eq(&self.qnodes[a], &other.qnodes[b]),
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Flip the checked bit of one value and refilter.
    pub fn toggle(&self, store: &MessageStore, qnode_id: &str, property_key: &str, value: &str) -> Result<Self> {
        let pos = self.require(qnode_id)?;
        let facet = self.qnodes[pos]
            .property(property_key)
            .ok_or_else(|| ViewError::unknown_property(qnode_id, property_key))?;
        if !facet.values.contains_key(value) {
            return Err(ViewError::unknown_value(qnode_id, property_key, value));
        }

        let mut next = self.clone();
        let panel = Arc::make_mut(&mut next.qnodes[pos]);
        if let Some(state) = panel
            .property_mut(property_key)
            .and_then(|p| p.values.get_mut(value))
        {
            state.checked = !state.checked;
        }
        panel.recompute_visibility(store);
        Ok(next.apply_default_filter(store))
    }

    /// Check every value of a property if any is unchecked, else uncheck all.
    pub fn toggle_all(&self, store: &MessageStore, qnode_id: &str, property_key: &str) -> Result<Self> {
        let pos = self.require(qnode_id)?;
        let check = self.qnodes[pos]
            .property(property_key)
            .ok_or_else(|| ViewError::unknown_property(qnode_id, property_key))?
            .is_filtered();

        let mut next = self.clone();
        let panel = Arc::make_mut(&mut next.qnodes[pos]);
        if let Some(facet) = panel.property_mut(property_key) {
            for state in facet.values.values_mut() {
                state.checked = check;
            }
        }
        panel.recompute_visibility(store);
        Ok(next.apply_default_filter(store))
    }

    /// Narrow the facet panel of a query node; checked bits are untouched.
    /// Empty text clears the search.
    pub fn search(&self, qnode_id: &str, text: &str) -> Result<Self> {
        let pos = self.require(qnode_id)?;
        let search = (!text.is_empty()).then(|| text.to_string());
        if self.qnodes[pos].search == search {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.qnodes[pos]).search = search;
        Ok(next)
    }

    /// Check every value of a query node again, clear its search and refilter.
    pub fn reset(&self, store: &MessageStore, qnode_id: &str) -> Result<Self> {
        let pos = self.require(qnode_id)?;
        let mut next = self.clone();
        let panel = Arc::make_mut(&mut next.qnodes[pos]);
        for facet in panel.properties.iter_mut() {
            for state in facet.values.values_mut() {
                state.checked = true;
            }
        }
        panel.search = None;
        panel.recompute_visibility(store);
        Ok(next.apply_default_filter(store))
    }

    /// Drop every row with a resolvable bound node that is not visible, then
    /// recompute availability over the survivors.
    pub fn apply_default_filter(&self, store: &MessageStore) -> Self {
        let rows: Vec<ResultId> = store
            .results()
            .iter()
            .filter(|result| {
                !result.node_bindings.iter().any(|binding| {
                    let Some(panel) = self.qnode(&binding.qg_id) else {
                        return false;
                    };
                    binding
                        .kg_ids()
                        .iter()
                        .any(|kg_id| store.kg_node(kg_id).is_some() && !panel.is_visible(kg_id))
                })
            })
            .filter_map(|result| result.id.clone())
            .collect();
        self.update_filtered_rows(store, rows)
    }

    /// Adopt `rows` as the surviving result set and recompute availability:
    /// a value stays available iff a visible node of a surviving row has it.
    pub fn update_filtered_rows(&self, store: &MessageStore, rows: Vec<ResultId>) -> Self {
        // (property index, value) marks per query node.
        let mut marks: Vec<Vec<(usize, String)>> = vec![Vec::new(); self.qnodes.len()];

        for row in &rows {
            let Some(result) = store.result(row) else {
                continue;
            };
            for binding in &result.node_bindings {
                let Ok(qpos) = self.require(&binding.qg_id) else {
                    continue;
                };
                let panel = &self.qnodes[qpos];
                for kg_id in binding.kg_ids() {
                    if !panel.is_visible(kg_id) {
                        continue;
                    }
                    let Some(knode) = store.kg_node(kg_id) else {
                        continue;
                    };
                    for (key, value) in facet_pairs(store.config(), knode) {
                        if let Some(pidx) = panel.properties.iter().position(|p| p.key == key) {
                            marks[qpos].push((pidx, value));
                        }
                    }
                }
            }
        }

        let mut next = Self {
            qnodes: self.qnodes.clone(),
            filtered_rows: Arc::new(rows),
        };
        for (qpos, mut marked) in marks.into_iter().enumerate() {
            marked.sort_unstable();
            marked.dedup();
            let current = &next.qnodes[qpos];
            let unchanged = current.properties.iter().enumerate().all(|(pidx, facet)| {
                facet.values.iter().all(|(value, state)| {
                    state.available == marked.binary_search(&(pidx, value.clone())).is_ok()
                })
            });
            if unchanged {
                continue;
            }
            let panel = Arc::make_mut(&mut next.qnodes[qpos]);
            for (pidx, facet) in panel.properties.iter_mut().enumerate() {
                for (value, state) in facet.values.iter_mut() {
                    state.available = marked.binary_search(&(pidx, value.clone())).is_ok();
                }
            }
        }

        if next.filtered_rows != self.filtered_rows {
            tracing::debug!(
                rows = next.filtered_rows.len(),
                "filtered result rows changed"
            );
        }
        next
    }
}
