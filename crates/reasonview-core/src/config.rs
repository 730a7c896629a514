//! Caller-facing configuration.
//!
//! Hosts load this once (the CLI reads it from `--config <file.json>`) and then
//! override individual knobs from user input.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

/// Target node count for the overview graph.
pub const DEFAULT_PRUNE_NUM: usize = 35;

/// Maximum members drawn per set binding in an answer graph.
pub const DEFAULT_NUM_AG_SET_NODES: usize = 10;

/// Technical fields never offered as facets.
pub const DEFAULT_FACET_BLOCKLIST: &[&str] = &[
    "isSet",
    "is_set",
    "labels",
    "equivalent_identifiers",
    "category",
    "type",
    "id",
    "degree",
    "synonyms",
    "attributes",
];

/// Root types that carry no information for display.
pub const DEFAULT_GENERIC_CATEGORIES: &[&str] = &["named_thing", "biolink:NamedThing"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub prune_num: usize,
    pub num_ag_set_nodes: usize,
    pub facet_blocklist: Vec<String>,
    pub generic_categories: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            prune_num: DEFAULT_PRUNE_NUM,
            num_ag_set_nodes: DEFAULT_NUM_AG_SET_NODES,
            facet_blocklist: DEFAULT_FACET_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            generic_categories: DEFAULT_GENERIC_CATEGORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ViewConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_set_cap(self.num_ag_set_nodes)
    }

    /// Blocklist match after the same key normalization facets use.
    pub fn is_blocklisted(&self, property_key: &str) -> bool {
        self.facet_blocklist.iter().any(|k| k == property_key)
    }

    pub fn is_generic_category(&self, category: &str) -> bool {
        self.generic_categories.iter().any(|c| c == category)
    }
}

pub(crate) fn validate_set_cap(num_ag_set_nodes: usize) -> Result<()> {
    if num_ag_set_nodes == 0 {
        return Err(ViewError::InvalidConfig(
            "num_ag_set_nodes must be at least 1".to_string(),
        ));
    }
    Ok(())
}
