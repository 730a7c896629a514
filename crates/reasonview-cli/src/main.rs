//! Reasonview CLI
//!
//! Scripting host for the view engine:
//! - `summary`: message statistics and degradation flags
//! - `prune`: size-bounded overview graph
//! - `answer`: dense view or answer graph of one result
//! - `table`: result table (terminal or JSON)
//! - `facets`: replay filter actions and dump the resulting view state
//!
//! Every command reads a reasoner message from a JSON file and never touches
//! the network.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use reasonview_core::{
    active_answer_graph, annotated_pruned_graph, answer_set_table, decorate, dense_answer,
    is_ag_pruned, max_num_ag_nodes, replay, Action, Message, MessageStore, ResultId, ViewConfig,
};

mod render;

#[derive(Parser)]
#[command(name = "reasonview")]
#[command(author, version, about = "Reasonview: derived views over reasoner messages")]
struct Cli {
    /// More log output on stderr (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// JSON file with `ViewConfig` overrides (prune_num, num_ag_set_nodes, ...).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print message statistics
    Summary {
        /// Reasoner message (JSON)
        input: PathBuf,
    },
    /// Prune the knowledge graph to an overview graph
    Prune(PruneArgs),
    /// Assemble the view of one result
    Answer(AnswerArgs),
    /// Build the result table
    Table(TableArgs),
    /// Replay facet actions and write the resulting view state
    Facets(FacetsArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (JSON). Prints to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Emit a decorated display graph instead of the raw derived graph.
    #[arg(long)]
    display: bool,
}

#[derive(Args)]
struct PruneArgs {
    /// Reasoner message (JSON)
    input: PathBuf,
    /// Target node count (overrides config).
    #[arg(long)]
    prune_num: Option<usize>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnswerView {
    Dense,
    Graph,
}

#[derive(Args)]
struct AnswerArgs {
    /// Reasoner message (JSON)
    input: PathBuf,
    /// Result id (a number for positional ids).
    #[arg(long)]
    result: String,
    /// dense|graph
    #[arg(long, value_enum, default_value = "graph")]
    view: AnswerView,
    /// Max members drawn per set binding (overrides config).
    #[arg(long)]
    set_cap: Option<usize>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct TableArgs {
    /// Reasoner message (JSON)
    input: PathBuf,
    /// Order rows by descending score.
    #[arg(long)]
    sort: bool,
    /// Write JSON instead of a terminal table.
    #[arg(long)]
    json: bool,
    /// Output file (JSON only).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct FacetsArgs {
    /// Reasoner message (JSON)
    input: PathBuf,
    /// JSON array of actions (`[{"action": "toggle", ...}]`).
    #[arg(long)]
    actions: Option<PathBuf>,
    /// Output file (JSON). Prints to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Summary { input } => cmd_summary(&input, config),
        Commands::Prune(args) => cmd_prune(&args, config),
        Commands::Answer(args) => cmd_answer(&args, config),
        Commands::Table(args) => cmd_table(&args, config),
        Commands::Facets(args) => cmd_facets(&args, config),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ViewConfig> {
    let Some(path) = path else {
        return Ok(ViewConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ViewConfig::from_json_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn load_store(input: &Path, config: ViewConfig) -> Result<MessageStore> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read message {}", input.display()))?;
    let message = Message::from_json_str(&text)
        .with_context(|| format!("failed to parse message {}", input.display()))?;
    Ok(MessageStore::load(message, config)?)
}

/// Positional ids are plain numbers; anything else is a string id. A number
/// that names no positional result is retried as a string id.
fn parse_result_id(store: &MessageStore, raw: &str) -> ResultId {
    if let Ok(i) = raw.trim().parse::<u64>() {
        let id = ResultId::Index(i);
        if store.result(&id).is_some() {
            return id;
        }
    }
    ResultId::Key(raw.to_string())
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn report_written(out: Option<&Path>, detail: std::fmt::Arguments<'_>) {
    if let Some(path) = out {
        eprintln!("{} {} ({})", "wrote".green().bold(), path.display().to_string().bold(), detail);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_summary(input: &Path, config: ViewConfig) -> Result<()> {
    let store = load_store(input, config)?;
    let summary = render::Summary::collect(&store)?;
    render::print_summary(&summary);
    Ok(())
}

fn cmd_prune(args: &PruneArgs, config: ViewConfig) -> Result<()> {
    let prune_num = args.prune_num.unwrap_or(config.prune_num);
    let store = load_store(&args.input, config)?;
    let graph = annotated_pruned_graph(&store, prune_num);

    let out = args.output.out.as_deref();
    if args.output.display {
        write_json(&decorate(&graph), out)?;
    } else {
        write_json(&graph, out)?;
    }
    report_written(
        out,
        format_args!(
            "nodes={} edges={} truncated={}",
            graph.nodes.len(),
            graph.edges.len(),
            graph.truncated
        ),
    );
    Ok(())
}

fn cmd_answer(args: &AnswerArgs, config: ViewConfig) -> Result<()> {
    let set_cap = args.set_cap.unwrap_or(config.num_ag_set_nodes);
    let store = load_store(&args.input, config)?;
    let id = parse_result_id(&store, &args.result);
    let out = args.output.out.as_deref();

    match args.view {
        AnswerView::Dense => {
            let dense = dense_answer(&store, &id)?;
            write_json(&dense, out)?;
            report_written(out, format_args!("result={} nodes={}", id, dense.nodes.len()));
        }
        AnswerView::Graph => {
            let graph = active_answer_graph(&store, &id, set_cap)?;
            if args.output.display {
                write_json(&decorate(&graph), out)?;
            } else {
                write_json(&graph, out)?;
            }
            report_written(
                out,
                format_args!(
                    "result={} nodes={} edges={} missing={}",
                    id,
                    graph.nodes.len(),
                    graph.edges.len(),
                    graph.missing
                ),
            );
            if is_ag_pruned(&store, Some(&id), set_cap)? {
                eprintln!(
                    "{} set bindings capped at {} of {} members",
                    "info:".yellow().bold(),
                    set_cap,
                    max_num_ag_nodes(&store, Some(&id))?
                );
            }
        }
    }
    Ok(())
}

fn cmd_table(args: &TableArgs, config: ViewConfig) -> Result<()> {
    if args.out.is_some() && !args.json {
        return Err(anyhow!("--out requires --json"));
    }
    let store = load_store(&args.input, config)?;
    let mut table = answer_set_table(&store);
    if args.sort {
        table.sort_by_rank();
    }

    if args.json {
        let out = args.out.as_deref();
        write_json(&table, out)?;
        report_written(
            out,
            format_args!("rows={} unknown_nodes={}", table.rows.len(), table.unknown_nodes),
        );
    } else {
        render::print_table(&table);
    }
    Ok(())
}

fn cmd_facets(args: &FacetsArgs, config: ViewConfig) -> Result<()> {
    let actions: Vec<Action> = match &args.actions {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read actions {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse actions {}", path.display()))?
        }
        None => Vec::new(),
    };

    let store = load_store(&args.input, config)?;
    let state = replay(&store, &actions).context("facet action rejected")?;

    let out = args.out.as_deref();
    write_json(&state, out)?;
    report_written(
        out,
        format_args!(
            "actions={} rows={}",
            actions.len(),
            state.facets.filtered_rows().len()
        ),
    );
    Ok(())
}
