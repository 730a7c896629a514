//! Result table: one row per result, one column per query node.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::category::{display_category, primary_category};
use crate::model::{ResultId, MISSING_NODE_NAME};
use crate::store::MessageStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeColumn {
    /// Query-node id.
    pub id: String,
    /// `"<id>: <display category>"`.
    pub header: String,
    pub category: Option<String>,
    pub is_set: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableColumn {
    Expander,
    QueryNode(NodeColumn),
    Rank,
}

impl TableColumn {
    pub fn header(&self) -> &str {
        match self {
            Self::Expander => "",
            Self::QueryNode(col) => &col.header,
            Self::Rank => "Rank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    pub name: Option<String>,
    /// `None` for a missing node.
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRow {
    pub id: ResultId,
    pub score: Option<f64>,
    pub cells: BTreeMap<String, Vec<TableCell>>,
}

impl AnswerRow {
    /// Display names of one column, joined for a single-line cell.
    pub fn cell_text(&self, qg_id: &str) -> String {
        self.cells
            .get(qg_id)
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| c.name.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    }

    pub fn rank(&self) -> String {
        format_rank(self.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<AnswerRow>,
    /// Some cell stands in for a node missing from the knowledge graph.
    pub unknown_nodes: bool,
}

impl AnswerTable {
    pub fn node_columns(&self) -> impl Iterator<Item = &NodeColumn> + '_ {
        self.columns.iter().filter_map(|c| match c {
            TableColumn::QueryNode(col) => Some(col),
            _ => None,
        })
    }

    /// Rows by descending score; unscored rows keep message order at the end.
    pub fn sort_by_rank(&mut self) {
        self.rows.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    /// Keep only rows whose id is in `ids`, preserving table order.
    pub fn retain_rows(&mut self, ids: &[ResultId]) {
        self.rows.retain(|row| ids.contains(&row.id));
    }
}

/// Rank column text: three decimals, `N/A` for absent or zero scores.
pub fn format_rank(score: Option<f64>) -> String {
    match score {
        Some(s) if s != 0.0 && !s.is_nan() => format!("{s:.3}"),
        _ => "N/A".to_string(),
    }
}

pub fn answer_set_table(store: &MessageStore) -> AnswerTable {
    let mut columns = vec![TableColumn::Expander];
    for qnode in store.query_nodes() {
        let category = primary_category(qnode.category.as_ref()).map(str::to_string);
        let shown = category.as_deref().map(display_category).unwrap_or_default();
        columns.push(TableColumn::QueryNode(NodeColumn {
            id: qnode.id.clone(),
            header: format!("{}: {}", qnode.id, shown),
            category,
            is_set: qnode.is_set,
        }));
    }
    columns.push(TableColumn::Rank);

    let mut unknown_nodes = false;
    let mut rows = Vec::with_capacity(store.results().len());
    for (i, result) in store.results().iter().enumerate() {
        let mut cells = BTreeMap::new();
        for binding in &result.node_bindings {
            let column: Vec<TableCell> = binding
                .kg_ids()
                .iter()
                .map(|kid| match store.kg_node(kid) {
                    Some(knode) => TableCell {
                        name: knode.name.clone(),
                        id: Some(knode.id.clone()),
                    },
                    None => {
                        unknown_nodes = true;
                        TableCell {
                            name: Some(MISSING_NODE_NAME.to_string()),
                            id: None,
                        }
                    }
                })
                .collect();
            cells.insert(binding.qg_id.clone(), column);
        }
        rows.push(AnswerRow {
            id: result.id.clone().unwrap_or(ResultId::Index(i as u64)),
            score: result.score,
            cells,
        });
    }

    AnswerTable {
        columns,
        rows,
        unknown_nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_text_uses_three_decimals() {
        assert_eq!(format_rank(Some(0.12345)), "0.123");
        assert_eq!(format_rank(Some(2.0)), "2.000");
        assert_eq!(format_rank(Some(0.0)), "N/A");
        assert_eq!(format_rank(None), "N/A");
    }

    #[test]
    fn rank_column_header() {
        assert_eq!(TableColumn::Rank.header(), "Rank");
        assert_eq!(TableColumn::Expander.header(), "");
    }
}
