use thiserror::Error;

use crate::model::ResultId;

/// Errors raised by the view engine.
///
/// Data irregularities inside a message (dangling bindings, missing categories,
/// empty sections) are never errors; they degrade to placeholders and flags.
/// Only caller contract violations end up here.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown facet {qnode_id}{}{}", fmt_part(.property_key), fmt_part(.property_value))]
    UnknownFacet {
        qnode_id: String,
        property_key: Option<String>,
        property_value: Option<String>,
    },

    #[error("unknown result id `{0}`")]
    UnknownResult(ResultId),

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

fn fmt_part(part: &Option<String>) -> String {
    part.as_ref().map(|p| format!(" / {p}")).unwrap_or_default()
}

impl ViewError {
    pub(crate) fn unknown_qnode(qnode_id: &str) -> Self {
        Self::UnknownFacet {
            qnode_id: qnode_id.to_string(),
            property_key: None,
            property_value: None,
        }
    }

    pub(crate) fn unknown_property(qnode_id: &str, property_key: &str) -> Self {
        Self::UnknownFacet {
            qnode_id: qnode_id.to_string(),
            property_key: Some(property_key.to_string()),
            property_value: None,
        }
    }

    pub(crate) fn unknown_value(qnode_id: &str, property_key: &str, property_value: &str) -> Self {
        Self::UnknownFacet {
            qnode_id: qnode_id.to_string(),
            property_key: Some(property_key.to_string()),
            property_value: Some(property_value.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_facet_message_names_the_full_path() {
        let err = ViewError::unknown_value("n0", "taxon", "mouse");
        assert_eq!(err.to_string(), "unknown facet n0 / taxon / mouse");
        assert_eq!(
            ViewError::unknown_qnode("n9").to_string(),
            "unknown facet n9"
        );
    }
}
