//! MCF browser CLI
//!
//! Command-line interface for:
//! - Parsing `.mcf` files and `.tmcf` + CSV pairs into a session graph (`parse`)
//! - Displaying every triple of one node, optionally enriched from the
//!   remote Data Commons knowledge graph (`show`)
//! - Extracting StatVarObservation time series from template + data pairs
//!   (`series`)

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mcfb_graph::{Graph, NodeId, Target, DCID_NS, LOCAL_NS};
use mcfb_ingest::series::series_from_datapoints;
use mcfb_remote::client::DataCommonsClient;
use mcfb_remote::{fetch_remote_data, KgClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod files;

#[derive(Parser)]
#[command(name = "mcfb")]
#[command(
    author,
    version,
    about = "Browse MCF and TMCF files as a local knowledge graph"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse files and report declared subjects plus per-file errors.
    ///
    /// Files are taken in order: plain `.mcf` files parse directly, and each
    /// `.tmcf` template applies to the next file that is neither `.mcf` nor
    /// `.tmcf`.
    Parse {
        /// Input files (`.mcf`, `.tmcf`, CSV data)
        files: Vec<PathBuf>,
        /// Emit reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display every outgoing and incoming triple of one node.
    Show {
        /// Input files (`.mcf`, `.tmcf`, CSV data)
        files: Vec<PathBuf>,
        /// Node to display: full registry id, local reference or bare dcid
        #[arg(short, long)]
        node: String,
        /// Also pull the node's triples from the remote knowledge graph
        #[arg(long)]
        fetch_remote: bool,
        /// Alternate Data Commons API deployment
        #[arg(long)]
        api_root: Option<String>,
    },

    /// Extract StatVarObservation time series from template + data pairs.
    Series {
        /// Input files (`.tmcf` templates and their CSV data)
        files: Vec<PathBuf>,
        /// Emit series as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Parse { files, json } => cmd_parse(&files, json),
        Commands::Show {
            files,
            node,
            fetch_remote,
            api_root,
        } => cmd_show(&files, &node, fetch_remote, api_root.as_deref()).await,
        Commands::Series { files, json } => cmd_series(&files, json),
    }
}

fn cmd_parse(paths: &[PathBuf], json: bool) -> Result<()> {
    let mut graph = Graph::new();
    let reports = files::parse_files(&mut graph, paths)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut total_errors = 0;
    for report in &reports {
        println!(
            "{} {}",
            report.file_name.bold(),
            format!("{} nodes", report.local_nodes.len()).green()
        );
        for error in &report.errors {
            total_errors += 1;
            println!(
                "  {} line {}: {} {}",
                "error:".red().bold(),
                error.line_num,
                error.kind,
                format!("({})", error.line).dimmed()
            );
        }
    }
    println!(
        "{} {} subjects, {} assertions, {} errors",
        "parsed".green().bold(),
        graph.subject_ids().len(),
        graph.assertion_count(),
        total_errors
    );
    Ok(())
}

/// Resolves a user-supplied reference against the registry, trying the bare
/// id first and then the `l:` and `dcid:` keys.
fn resolve_node(graph: &Graph, id: &str) -> Option<NodeId> {
    graph
        .lookup(id)
        .or_else(|| graph.lookup(&format!("{LOCAL_NS}{id}")))
        .or_else(|| graph.lookup(&format!("{DCID_NS}{id}")))
}

fn target_ref(graph: &Graph, target: &Target) -> String {
    match target {
        Target::Node(id) => graph.node(*id).display_ref(),
        Target::Literal(text) => text.clone(),
    }
}

async fn cmd_show(
    paths: &[PathBuf],
    id: &str,
    fetch_remote: bool,
    api_root: Option<&str>,
) -> Result<()> {
    let mut graph = Graph::new();
    files::parse_files(&mut graph, paths)?;

    let node = resolve_node(&graph, id).ok_or_else(|| anyhow!("unknown node: {id}"))?;

    if fetch_remote {
        let mut client = DataCommonsClient::new();
        if let Some(root) = api_root {
            client = client.with_api_root(root);
        }
        fetch_remote_data(&mut graph, node, &client).await?;
        if let Some(dcid) = graph.node(node).dcid.clone() {
            println!("{}", client.name_of(&dcid).await?.bold().underline());
        }
    }

    println!("{}", graph.node(node).display_ref().bold());
    for assertion in graph.assertions_of(node) {
        println!(
            "  {} {}: {} {}",
            "->".cyan(),
            assertion.property,
            target_ref(&graph, &assertion.target),
            format!("[{}]", assertion.provenance).dimmed()
        );
    }
    for assertion in graph.inv_assertions_of(node) {
        println!(
            "  {} {}: {} {}",
            "<-".cyan(),
            assertion.property,
            graph.node(assertion.src).display_ref(),
            format!("[{}]", assertion.provenance).dimmed()
        );
    }
    Ok(())
}

fn cmd_series(paths: &[PathBuf], json: bool) -> Result<()> {
    let datapoints = files::extract_datapoints(paths)?;
    let (series, errors) = series_from_datapoints(&datapoints);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        for entry in &series {
            println!(
                "{} {} {}",
                entry.facet.variable_measured.bold(),
                "@".cyan(),
                entry.facet.observation_about.bold()
            );
            for (date, value) in &entry.points {
                println!("  {date}: {value}");
            }
        }
    }
    for error in &errors {
        eprintln!("{} {}", "error:".red().bold(), error);
    }
    Ok(())
}
