//! Reasoner message data model.
//!
//! A message carries three collections:
//!
//! ```text
//! query_graph      abstract pattern: typed node/edge variables (`n0`, `e0`, ...)
//! knowledge_graph  concrete nodes/edges returned by the search
//! results          bindings from query-graph ids to knowledge-graph ids
//! ```
//!
//! Wire fields follow the reasoner JSON shape (`qg_id`, `kg_id`, `is_set`, ...).
//! Anything a knowledge node or edge carries beyond the typed fields is kept in
//! `properties` so facets and tooltips can see it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Name used for placeholder nodes standing in for unresolvable bindings.
pub const MISSING_NODE_NAME: &str = "Missing Node";

/// A JSON field that may hold a single value or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs.as_slice(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// True for the list form, even when the list has a single element.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Always the list form (`"a"` becomes `["a"]`).
    pub fn into_many(self) -> Self {
        match self {
            Self::One(v) => Self::Many(vec![v]),
            many => many,
        }
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.as_slice().contains(value)
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

/// A node category: one biolink type or a list of candidates.
pub type Category = OneOrMany<String>;

// ============================================================================
// Query graph
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGraph {
    #[serde(default)]
    pub nodes: Vec<QueryNode>,
    #[serde(default)]
    pub edges: Vec<QueryEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Declared set node: its binding may resolve to many knowledge nodes.
    #[serde(default, alias = "set")]
    pub is_set: bool,
    /// Literal identifier pinned by the question (e.g. `MONDO:0005737`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curie: Option<OneOrMany<String>>,
}

impl QueryNode {
    pub fn new(id: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            id: id.into(),
            category: category.map(|c| OneOrMany::One(c.to_string())),
            is_set: false,
            curie: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEdge {
    pub id: String,
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<OneOrMany<String>>,
}

// ============================================================================
// Knowledge graph
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<KnowledgeNode>,
    #[serde(default)]
    pub edges: Vec<KnowledgeEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Raw labels from sources that predate `category`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl KnowledgeNode {
    pub fn new(id: impl Into<String>, name: Option<&str>, category: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            category: category.map(|c| OneOrMany::One(c.to_string())),
            labels: None,
            properties: BTreeMap::new(),
        }
    }

    /// Placeholder for a binding whose id does not resolve in the knowledge graph.
    pub fn missing(id: impl Into<String>) -> Self {
        Self::new(id, Some(MISSING_NODE_NAME), None)
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Drop properties named like a field of a view that flattens this node.
    pub(crate) fn without_properties(mut self, reserved: &[&str]) -> Self {
        self.properties
            .retain(|key, _| !NODE_FIELDS.contains(&key.as_str()) && !reserved.contains(&key.as_str()));
        self
    }
}

/// Serialized fields of [`KnowledgeNode`] besides its open properties.
const NODE_FIELDS: [&str; 4] = ["id", "name", "category", "labels"];
/// Serialized fields of [`KnowledgeEdge`] besides its open properties.
const EDGE_FIELDS: [&str; 5] = ["id", "subject", "object", "predicate", "publications"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    pub id: String,
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<OneOrMany<String>>,
    /// Supporting publications; some sources send a bare string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publications: Option<OneOrMany<String>>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl KnowledgeEdge {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        object: impl Into<String>,
        predicate: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            object: object.into(),
            predicate: predicate.map(|p| OneOrMany::One(p.to_string())),
            publications: None,
            properties: BTreeMap::new(),
        }
    }

    /// Drop properties named like a field of a view that flattens this edge.
    pub(crate) fn without_properties(mut self, reserved: &[&str]) -> Self {
        self.properties
            .retain(|key, _| !EDGE_FIELDS.contains(&key.as_str()) && !reserved.contains(&key.as_str()));
        self
    }

    pub fn with_publications<I, S>(mut self, publications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.publications = Some(OneOrMany::Many(
            publications.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn publication_count(&self) -> usize {
        self.publications.as_ref().map(OneOrMany::len).unwrap_or(0)
    }

    pub fn is_incident_to(&self, node_id: &str) -> bool {
        self.subject == node_id || self.object == node_id
    }

    /// Predicates joined for display (`"treats, ameliorates"`).
    pub fn predicate_label(&self) -> Option<String> {
        self.predicate
            .as_ref()
            .map(|p| p.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result identifier: reasoners send strings, synthetic ids are positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultId {
    Index(u64),
    Key(String),
}

impl ResultId {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Key(k) if k.trim().is_empty())
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<u64> for ResultId {
    fn from(value: u64) -> Self {
        Self::Index(value)
    }
}

impl From<&str> for ResultId {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub qg_id: String,
    pub kg_id: OneOrMany<String>,
}

impl Binding {
    pub fn one(qg_id: impl Into<String>, kg_id: impl Into<String>) -> Self {
        Self {
            qg_id: qg_id.into(),
            kg_id: OneOrMany::One(kg_id.into()),
        }
    }

    pub fn many<I, S>(qg_id: impl Into<String>, kg_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            qg_id: qg_id.into(),
            kg_id: OneOrMany::Many(kg_ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn kg_ids(&self) -> &[String] {
        self.kg_id.as_slice()
    }
}

/// One answer: a substitution of query-graph variables, optionally scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResultId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub node_bindings: Vec<Binding>,
    #[serde(default)]
    pub edge_bindings: Vec<Binding>,
}

impl Answer {
    pub fn node_binding(&self, qg_id: &str) -> Option<&Binding> {
        self.node_bindings.iter().find(|b| b.qg_id == qg_id)
    }

    pub fn edge_binding(&self, qg_id: &str) -> Option<&Binding> {
        self.edge_bindings.iter().find(|b| b.qg_id == qg_id)
    }

    pub(crate) fn has_id(&self) -> bool {
        self.id.as_ref().map(|id| !id.is_blank()).unwrap_or(false)
    }
}

// ============================================================================
// Message
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub query_graph: QueryGraph,
    #[serde(default)]
    pub knowledge_graph: KnowledgeGraph,
    #[serde(default)]
    pub results: Vec<Answer>,
}

impl Message {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn is_empty(&self) -> bool {
        self.query_graph.nodes.is_empty() && self.results.is_empty()
    }
}
