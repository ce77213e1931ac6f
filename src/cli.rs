use crate::config::load_config;
use crate::ir::Graph;
use crate::layout::{LayoutResult, compute_layout, normalize};
use crate::layout_dump::write_layout_json;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fgl",
    version,
    about = "Layered layout and orthogonal edge routing for binary-analysis graphs"
)]
pub struct Args {
    /// Input graph JSON or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    /// Print layout statistics to stderr
    #[arg(long)]
    pub stats: bool,

    /// Shift the layout so its bounding box starts at this margin
    #[arg(long, value_name = "PX")]
    pub margin: Option<f32>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let graph = Graph::from_json(&input).context("failed to decode graph")?;

    let mut layout = compute_layout(&graph, &config);
    if let Some(margin) = args.margin {
        normalize(&mut layout, margin);
    }
    if args.stats {
        eprintln!("{}", format_stats(&layout));
    }
    write_output(&layout, &graph, args.output.as_deref(), !args.compact)
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(
    layout: &LayoutResult,
    graph: &Graph,
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_layout_json(&mut writer, layout, graph, pretty)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_layout_json(&mut writer, layout, graph, pretty)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn format_stats(layout: &LayoutResult) -> String {
    let stats = &layout.stats;
    format!(
        "nodes={} edges={} layers={} back_edges={} self_loops={} crossings={} \
         dropped_edges={} duplicate_nodes={}",
        layout.nodes.len(),
        layout.edges.len(),
        stats.layers,
        stats.back_edges,
        stats.self_loops,
        stats.crossings,
        stats.dropped_edges,
        stats.duplicate_nodes,
    )
}
