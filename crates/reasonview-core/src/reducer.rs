//! View reducer: every user interaction as data.
//!
//! Hosts keep a [`ViewState`] and feed [`Action`]s through [`reduce`]; the
//! previous state is never modified, so undo is keeping the old value.
//!
//! Actions are JSON-tagged for scripted replays:
//!
//! ```text
//! {"action": "toggle", "qnode_id": "n1", "property_key": "taxon", "value": "mouse"}
//! {"action": "set_prune_num", "prune_num": 50}
//! ```

use serde::{Deserialize, Serialize};

use crate::config::validate_set_cap;
use crate::error::Result;
use crate::facet::FacetState;
use crate::model::ResultId;
use crate::prune::clamp_prune_num;
use crate::store::MessageStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub prune_num: usize,
    pub num_ag_set_nodes: usize,
    pub facets: FacetState,
}

impl ViewState {
    /// Initial state: configured sizes, fresh facet index, every row visible.
    pub fn new(store: &MessageStore) -> Self {
        let config = store.config();
        Self {
            prune_num: clamp_prune_num(config.prune_num, store.num_qg_nodes()),
            num_ag_set_nodes: config.num_ag_set_nodes,
            facets: FacetState::initialize(store),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SetPruneNum {
        prune_num: usize,
    },
    SetNumAgSetNodes {
        num_ag_set_nodes: usize,
    },
    Toggle {
        qnode_id: String,
        property_key: String,
        value: String,
    },
    ToggleAll {
        qnode_id: String,
        property_key: String,
    },
    Search {
        qnode_id: String,
        text: String,
    },
    Reset {
        qnode_id: String,
    },
    /// The host narrowed the table by other means (sorting, paging filters).
    UpdateFilteredRows {
        rows: Vec<ResultId>,
    },
}

pub fn reduce(store: &MessageStore, state: &ViewState, action: &Action) -> Result<ViewState> {
    let next = match action {
        Action::SetPruneNum { prune_num } => ViewState {
            prune_num: clamp_prune_num(*prune_num, store.num_qg_nodes()),
            ..state.clone()
        },
        Action::SetNumAgSetNodes { num_ag_set_nodes } => {
            validate_set_cap(*num_ag_set_nodes)?;
            ViewState {
                num_ag_set_nodes: *num_ag_set_nodes,
                ..state.clone()
            }
        }
        Action::Toggle {
            qnode_id,
            property_key,
            value,
        } => ViewState {
            facets: state.facets.toggle(store, qnode_id, property_key, value)?,
            ..state.clone()
        },
        Action::ToggleAll {
            qnode_id,
            property_key,
        } => ViewState {
            facets: state.facets.toggle_all(store, qnode_id, property_key)?,
            ..state.clone()
        },
        Action::Search { qnode_id, text } => ViewState {
            facets: state.facets.search(qnode_id, text)?,
            ..state.clone()
        },
        Action::Reset { qnode_id } => ViewState {
            facets: state.facets.reset(store, qnode_id)?,
            ..state.clone()
        },
        Action::UpdateFilteredRows { rows } => ViewState {
            facets: state.facets.update_filtered_rows(store, rows.clone()),
            ..state.clone()
        },
    };
    tracing::debug!(?action, rows = next.facets.filtered_rows().len(), "reduced view action");
    Ok(next)
}

/// Fold `actions` over the initial state, stopping at the first error.
pub fn replay<'a, I>(store: &MessageStore, actions: I) -> Result<ViewState>
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut state = ViewState::new(store);
    for action in actions {
        state = reduce(store, &state, action)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_round_trip_through_tagged_json() {
        let action: Action = serde_json::from_str(
            r#"{"action": "toggle_all", "qnode_id": "n0", "property_key": "taxon"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            Action::ToggleAll {
                qnode_id: "n0".into(),
                property_key: "taxon".into()
            }
        );
        let rows: Action =
            serde_json::from_str(r#"{"action": "update_filtered_rows", "rows": [0, "r1"]}"#).unwrap();
        assert_eq!(
            rows,
            Action::UpdateFilteredRows {
                rows: vec![ResultId::Index(0), ResultId::Key("r1".into())]
            }
        );
    }
}
