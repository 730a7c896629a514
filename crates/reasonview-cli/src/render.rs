//! Terminal output for `summary` and `table`.

use anyhow::Result;
use colored::Colorize;

use reasonview_core::{max_num_ag_nodes, AnswerTable, MessageStore, TableColumn};

/// Widest cell drawn before truncation.
const MAX_CELL_WIDTH: usize = 40;

pub struct Summary {
    pub query_nodes: usize,
    pub query_edges: usize,
    pub kg_nodes: usize,
    pub kg_edges: usize,
    pub results: usize,
    pub unknown_nodes: bool,
    pub prune_num: usize,
    pub largest_set: usize,
}

impl Summary {
    pub fn collect(store: &MessageStore) -> Result<Self> {
        let mut largest_set = 0;
        for (i, result) in store.results().iter().enumerate() {
            let id = result.id.clone().unwrap_or((i as u64).into());
            largest_set = largest_set.max(max_num_ag_nodes(store, Some(&id))?);
        }
        Ok(Self {
            query_nodes: store.num_qg_nodes(),
            query_edges: store.query_edges().len(),
            kg_nodes: store.num_kg_nodes(),
            kg_edges: store.kg_edges().len(),
            results: store.results().len(),
            unknown_nodes: store.has_unknown_nodes(),
            prune_num: store.config().prune_num,
            largest_set,
        })
    }
}

pub fn print_summary(s: &Summary) {
    println!("{}", "Message".bold());
    println!("  query graph:     {} nodes, {} edges", s.query_nodes, s.query_edges);
    println!("  knowledge graph: {} nodes, {} edges", s.kg_nodes, s.kg_edges);
    println!("  results:         {}", s.results);
    println!("  largest set:     {}", s.largest_set);

    if s.kg_nodes > s.prune_num {
        println!(
            "{} overview is pruned to {} of {} nodes",
            "info:".yellow().bold(),
            s.prune_num,
            s.kg_nodes
        );
    }
    if s.unknown_nodes {
        println!(
            "{} some results bind nodes missing from the knowledge graph",
            "warn:".red().bold()
        );
    } else {
        println!("{} every binding resolves", "ok".green().bold());
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    out.push_str("...");
    out
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

/// Plain-text grid; the expander column has no terminal counterpart.
pub fn table_lines(table: &AnswerTable) -> (String, Vec<String>) {
    let columns: Vec<&TableColumn> = table
        .columns
        .iter()
        .filter(|c| !matches!(c, TableColumn::Expander))
        .collect();

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| match col {
                    TableColumn::QueryNode(node) => clip(&row.cell_text(&node.id)),
                    TableColumn::Rank => row.rank(),
                    TableColumn::Expander => String::new(),
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(clip(col.header()).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad(&clip(col.header()), *w))
        .collect::<Vec<_>>()
        .join("  ");
    let body = rows
        .iter()
        .map(|cells| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| pad(cell, *w))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect();
    (header, body)
}

pub fn print_table(table: &AnswerTable) {
    let (header, body) = table_lines(table);
    println!("{}", header.bold());
    for line in body {
        println!("{}", line.trim_end());
    }
    if table.unknown_nodes {
        println!(
            "{} some cells stand in for nodes missing from the knowledge graph",
            "warn:".red().bold()
        );
    }
}
