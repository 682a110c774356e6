//! Ledgerline CLI
//!
//! Thin front end over the library crates:
//! - `resolve`: map labels to taxonomy concepts and show the tier that hit
//! - `run`: push extracted rows through the full pipeline and print verdicts
//! - `validate`: re-check a saved lineage document
//! - `trace`: walk a saved lineage graph from one node

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ledgerline_confidence::VerdictStatus;
use ledgerline_lineage::{LineageDocument, LineageGraph, NodeId, TraceOptions};
use ledgerline_pipeline::{load_rows, Pipeline, PipelineConfig, PipelineReport};
use ledgerline_resolver::{Resolver, ResolverConfig};
use ledgerline_taxonomy::{OverrideEntry, OverrideStore, ResolvedTaxonomy, TaxonomySnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledgerline")]
#[command(
    author,
    version,
    about = "Ledgerline: auditable spreadsheet-to-taxonomy mapping"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TaxonomyArgs {
    /// Taxonomy snapshot JSON
    #[arg(short, long)]
    taxonomy: PathBuf,
    /// Override entries JSON (a list of `{label, concept}` objects)
    #[arg(long)]
    overrides: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve labels to concepts.
    Resolve {
        #[command(flatten)]
        taxonomy: TaxonomyArgs,
        /// Pipeline config JSON; only its `resolver` section is used
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print resolutions as JSON
        #[arg(long)]
        json: bool,
        /// Labels to resolve
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Run extracted rows through resolution, aggregation and derived metrics.
    Run {
        #[command(flatten)]
        taxonomy: TaxonomyArgs,
        /// Extracted rows JSON
        #[arg(short, long)]
        rows: PathBuf,
        /// Pipeline config JSON, layered over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the lineage document here
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a saved lineage document.
    Validate {
        /// Lineage document JSON
        input: PathBuf,
    },

    /// Trace a node through a saved lineage document.
    Trace {
        /// Lineage document JSON
        input: PathBuf,
        /// Node id to start from
        node: String,
        /// Follow consumers instead of sources
        #[arg(long)]
        forward: bool,
        /// Include deactivated edges
        #[arg(long)]
        all: bool,
        /// Maximum hops
        #[arg(long)]
        depth: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Resolve {
            taxonomy,
            config,
            json,
            labels,
        } => cmd_resolve(&taxonomy, config.as_ref(), json, &labels),
        Commands::Run {
            taxonomy,
            rows,
            config,
            out,
            json,
        } => cmd_run(&taxonomy, &rows, config.as_ref(), out.as_ref(), json),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Trace {
            input,
            node,
            forward,
            all,
            depth,
        } => cmd_trace(&input, &node, forward, all, depth),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Loading
// ============================================================================

fn load_taxonomy(path: &Path) -> Result<ResolvedTaxonomy> {
    let snapshot = TaxonomySnapshot::load(path)
        .with_context(|| format!("loading taxonomy {}", path.display()))?;
    let (taxonomy, report) = ResolvedTaxonomy::build(snapshot)?;
    if !report.is_clean() {
        eprintln!(
            "{} {} rejected aliases, {} alias collisions, {} coerced weights, {} dangling references",
            "taxonomy".yellow().bold(),
            report.rejected_aliases.len(),
            report.alias_collisions.len(),
            report.coerced_weights.len(),
            report.dangling_references.len()
        );
    }
    Ok(taxonomy)
}

fn load_overrides(path: Option<&PathBuf>, taxonomy: &ResolvedTaxonomy) -> Result<OverrideStore> {
    let Some(path) = path else {
        return Ok(OverrideStore::new());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<OverrideEntry> = serde_json::from_str(&text)
        .with_context(|| format!("parsing overrides {}", path.display()))?;
    let (store, rejected) = OverrideStore::load(entries, taxonomy);
    for entry in &rejected {
        eprintln!(
            "{} override {:?} -> {}",
            "rejected".yellow().bold(),
            entry.label,
            entry.concept
        );
    }
    Ok(store)
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn load_graph(path: &Path) -> Result<LineageGraph> {
    let doc = LineageDocument::load(path)
        .with_context(|| format!("loading lineage {}", path.display()))?;
    Ok(LineageGraph::from_document(doc)?)
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_resolve(
    args: &TaxonomyArgs,
    config: Option<&PathBuf>,
    json: bool,
    labels: &[String],
) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)?;
    let overrides = load_overrides(args.overrides.as_ref(), &taxonomy)?;
    let resolver_config: ResolverConfig = load_config(config)?.resolver;
    let resolver = Resolver::new(&taxonomy, resolver_config).with_overrides(&overrides);

    let inputs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let resolutions = resolver.resolve_batch(&inputs);

    if json {
        println!("{}", serde_json::to_string_pretty(&resolutions)?);
        return Ok(());
    }

    for r in &resolutions {
        let concept = match &r.concept {
            Some(c) => c.to_string().cyan(),
            None => "unmapped".red(),
        };
        println!(
            "{:<40} {} ({}, {})",
            r.input,
            concept,
            r.method().yellow(),
            r.confidence
        );
        if let Some(path) = r.audit_path() {
            let steps: Vec<String> = path.iter().map(ToString::to_string).collect();
            println!("    via {}", steps.join(" -> "));
        }
        for alt in &r.alternatives {
            println!("    alt {} ({})", alt.concept, alt.confidence);
        }
    }
    Ok(())
}

fn cmd_run(
    args: &TaxonomyArgs,
    rows_path: &Path,
    config: Option<&PathBuf>,
    out: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)?;
    let overrides = load_overrides(args.overrides.as_ref(), &taxonomy)?;
    let config = load_config(config)?;
    let rows = load_rows(rows_path)
        .with_context(|| format!("loading rows {}", rows_path.display()))?;

    let pipeline = Pipeline::new(&taxonomy, config)?.with_overrides(&overrides);
    let report = pipeline.run(&rows)?;

    if let Some(out) = out {
        report
            .graph
            .to_document()
            .save(out)
            .with_context(|| format!("writing lineage {}", out.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    let stats = &report.resolution_stats;
    println!(
        "{} {} rows, {} mapped, coverage {:.1}%",
        "Resolved".green().bold(),
        stats.total(),
        stats.found(),
        report.quality.coverage * 100.0
    );

    for metric in &report.metrics {
        println!(
            "  {:<8} {:<16} {:>14.2}  ({})",
            metric.period.as_deref().unwrap_or("-"),
            metric.label,
            metric.value,
            metric.confidence
        );
    }

    for check in report.checks.iter().filter(|c| !c.valid) {
        println!(
            "  {} {} {:?}: {}",
            "check failed".red(),
            check.period.as_deref().unwrap_or("-"),
            check.kind,
            check.detail
        );
    }

    for verdict in &report.verdicts {
        println!(
            "{} {} (overall {})",
            verdict.model.bold(),
            status_label(verdict.status),
            verdict.overall_confidence
        );
        for reason in verdict.blocking_reasons() {
            println!("    {} {}", "x".red(), reason);
        }
        for reason in verdict.warning_reasons() {
            println!("    {} {}", "!".yellow(), reason);
        }
    }

    if !report.validation.is_valid() {
        println!(
            "{} {} lineage violations",
            "Invalid".red().bold(),
            report.validation.violations.len()
        );
    }
}

fn status_label(status: VerdictStatus) -> colored::ColoredString {
    match status {
        VerdictStatus::Pass => status.to_string().green().bold(),
        VerdictStatus::Warning => status.to_string().yellow().bold(),
        VerdictStatus::Blocked => status.to_string().red().bold(),
    }
}

fn cmd_validate(input: &Path) -> Result<()> {
    println!("{} {}", "Validating".green().bold(), input.display());
    let graph = load_graph(input)?;
    let report = graph.validate();
    let stats = graph.statistics();

    println!("  Session: {}", graph.metadata().session_id.cyan());
    println!(
        "  Nodes: {} ({} checked)",
        stats.total_nodes, report.nodes_checked
    );
    println!(
        "  Edges: {} ({} active, {} inactive)",
        stats.total_edges, stats.active_edges, stats.inactive_edges
    );

    if report.is_valid() {
        println!("{}", "Valid.".green());
        return Ok(());
    }
    for violation in &report.violations {
        println!(
            "  {} {} {}",
            violation.kind.to_string().red(),
            violation.subject.yellow(),
            violation.detail
        );
    }
    Err(anyhow!("{} violations", report.violations.len()))
}

fn cmd_trace(
    input: &Path,
    node: &str,
    forward: bool,
    all: bool,
    depth: Option<usize>,
) -> Result<()> {
    let graph = load_graph(input)?;
    let id = NodeId::from(node);
    let start = graph.get_node(&id)?;
    let options = TraceOptions {
        include_inactive: all,
        max_depth: depth,
    };
    let nodes = if forward {
        graph.trace_forward(&id, options)?
    } else {
        graph.trace_backward(&id, options)?
    };

    println!(
        "{} {} [{}] {}",
        if forward { "Consumers of" } else { "Sources of" }.green().bold(),
        start.id.to_string().cyan(),
        start.kind,
        start.display_name()
    );
    for n in &nodes {
        let value = n.value.map(|v| format!("{v}")).unwrap_or_else(|| "-".into());
        println!(
            "  {:<12} {:<32} {:>12}  {}  {}",
            n.kind.to_string(),
            n.id.to_string(),
            value,
            n.confidence,
            n.display_name()
        );
    }

    if !forward {
        let breakdown = graph.confidence_breakdown(&id)?;
        if let Some((weakest, confidence)) = &breakdown.weakest_ancestor {
            println!("{} {} ({})", "Weakest".yellow().bold(), weakest, confidence);
        }
    }
    Ok(())
}
