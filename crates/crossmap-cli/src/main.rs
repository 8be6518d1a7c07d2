//! Crossmap CLI — cross-reference compliance controls through a hub standard.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crossmap_core::config::{ColumnSpec, MappingConfig, Palette, ResolutionMode, RunReport};
use crossmap_core::graph::relationship_graph::RelationshipGraph;
use crossmap_core::graph::relationship_set::RelationshipSet;
use crossmap_core::ingest::read_rows;
use crossmap_core::output::{read_document, write_json};
use crossmap_core::phases::build::build_relationships;
use crossmap_core::phases::export::render_table;
use crossmap_core::phases::resolve::{PairwiseResolver, ResolutionIndex};
use crossmap_core::pipeline::{self, DOCUMENT_FILE};
use crossmap_core::sink::MappingStore;

#[derive(Parser)]
#[command(
    name = "crossmap",
    about = "Crossmap - Cross-reference compliance control identifiers across standards"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options describing how input columns map to standards.
#[derive(Args, Clone)]
struct ColumnArgs {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Header of the hub column
    #[arg(long)]
    hub_column: Option<String>,

    /// Name of the hub standard
    #[arg(long)]
    hub: Option<String>,

    /// Comma-separated peer columns (default: every other header)
    #[arg(long)]
    peers: Option<String>,
}

/// Options shared by the commands that resolve pairs.
#[derive(Args, Clone)]
struct ResolveArgs {
    /// Relate only literally linked standards, no hub mediation
    #[arg(long)]
    direct: bool,

    /// Write tables for pairs without any association (direct mode)
    #[arg(long)]
    include_empty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV/JSON control table into the intermediate mapping document
    Convert {
        /// Input table (.csv or .json)
        input: PathBuf,

        /// Output JSON file path
        #[arg(short, long, default_value = DOCUMENT_FILE)]
        output: String,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Show debug logging
        #[arg(long)]
        verbose: bool,
    },
    /// Export one CSV per standard pair from a mapping document
    Export {
        /// Mapping document produced by `convert`
        document: PathBuf,

        /// Output directory
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: String,

        /// JSON run configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Name of the hub standard
        #[arg(long)]
        hub: Option<String>,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
    /// Convert and export in one pass
    Run {
        /// Input table (.csv or .json)
        input: PathBuf,

        /// Output directory
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: String,

        #[command(flatten)]
        columns: ColumnArgs,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Show per-phase timing breakdown
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
    /// Print the relationship table between two standards
    Table {
        /// Mapping document produced by `convert`
        document: PathBuf,

        /// Standard whose items form the rows
        primary: String,

        /// Standard whose items are listed per row
        secondary: String,

        /// Name of the hub standard
        #[arg(long, default_value = "Master")]
        hub: String,

        /// Relate only literally linked standards
        #[arg(long)]
        direct: bool,
    },
    /// Export graph nodes and edges for the selected standards
    Graph {
        /// Mapping document produced by `convert`
        document: PathBuf,

        /// Comma-separated standards to include (default: all)
        #[arg(long)]
        standards: Option<String>,

        /// JSON palette mapping standard names to colours
        #[arg(long)]
        palette: Option<PathBuf>,

        /// Name of the hub standard
        #[arg(long, default_value = "Master")]
        hub: String,

        /// Output JSON file path
        #[arg(short, long, default_value = "crossmap_graph.json")]
        output: String,
    },
    /// Import exported CSV tables into a mapping store and print statistics
    Stats {
        /// Directory of exported `{a}_vs_{b}.csv` tables
        dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let (verbose, quiet) = match &cli.command {
        Commands::Convert { verbose, .. } => (*verbose, false),
        Commands::Run { verbose, quiet, .. } => (*verbose, *quiet),
        Commands::Export { quiet, .. } => (false, *quiet),
        _ => (false, false),
    };
    init_logging(verbose, quiet);

    match cli.command {
        Commands::Convert {
            input,
            output,
            columns,
            ..
        } => {
            let config = build_config(&input, &columns);
            run_convert(&config, &output);
        }
        Commands::Export {
            document,
            output_dir,
            config,
            hub,
            resolve,
            quiet,
        } => {
            let mut config = load_config(config.as_deref());
            config.input_path = document.to_string_lossy().to_string();
            config.output_dir = Some(output_dir);
            config.quiet = quiet;
            if let Some(hub) = hub {
                config.hub = hub;
            }
            apply_resolve_args(&mut config, &resolve);
            run_export(&config);
        }
        Commands::Run {
            input,
            output_dir,
            columns,
            resolve,
            verbose,
            quiet,
        } => {
            let mut config = build_config(&input, &columns);
            config.output_dir = Some(output_dir);
            config.verbose = verbose;
            config.quiet = quiet;
            apply_resolve_args(&mut config, &resolve);

            if quiet {
                run_quiet(&config);
            } else {
                run_with_progress(&config, verbose);
            }
        }
        Commands::Table {
            document,
            primary,
            secondary,
            hub,
            direct,
        } => run_table(&document, &primary, &secondary, &hub, direct),
        Commands::Graph {
            document,
            standards,
            palette,
            hub,
            output,
        } => run_graph(&document, standards.as_deref(), palette.as_deref(), &hub, &output),
        Commands::Stats { dir } => run_stats(&dir),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let log_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {e}");
    std::process::exit(1);
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration file (if any) overlaid with the column flags.
fn load_config(path: Option<&Path>) -> MappingConfig {
    match path {
        Some(path) => MappingConfig::from_json_file(path)
            .unwrap_or_else(|e| fail("Error reading configuration", e)),
        None => MappingConfig::default(),
    }
}

fn build_config(input: &Path, columns: &ColumnArgs) -> MappingConfig {
    let mut config = load_config(columns.config.as_deref());
    config.input_path = input.to_string_lossy().to_string();

    if let Some(hub) = &columns.hub {
        config.hub = hub.clone();
        config.anchor.standard = hub.clone();
    }
    if let Some(column) = &columns.hub_column {
        config.anchor.column = column.clone();
    }
    if let Some(peers) = &columns.peers {
        config.peers = split_list(peers)
            .iter()
            .map(|p| ColumnSpec::new(p, p))
            .collect();
    }
    config
}

fn apply_resolve_args(config: &mut MappingConfig, resolve: &ResolveArgs) {
    if resolve.direct {
        config.mode = ResolutionMode::Direct;
    }
    config.include_empty_tables |= resolve.include_empty;
}

fn run_convert(config: &MappingConfig, output_path: &str) {
    let batch = read_rows(&config.input_path).unwrap_or_else(|e| fail("Error reading input", e));
    let peers = config.resolved_peers(&batch.headers);
    let outcome = build_relationships(&batch.rows, &config.anchor, &peers)
        .unwrap_or_else(|e| fail("Conversion failed", e));

    if let Err(e) = write_json(&outcome.set.to_document(), output_path) {
        fail("Error writing output", e);
    }

    println!(
        "{}  Converted {} rows ({} skipped): {} standards, {} links",
        style("✓").green().bold(),
        outcome.rows_read,
        outcome.rows_skipped,
        outcome.set.standard_count(),
        outcome.set.link_count()
    );
    println!("  {} {}", style("Output written to:").green(), output_path);
}

fn run_export(config: &MappingConfig) {
    let document =
        read_document(&config.input_path).unwrap_or_else(|e| fail("Error reading document", e));
    let output = pipeline::resolve_document(&document, config, None)
        .unwrap_or_else(|e| fail("Export failed", e));

    if !config.quiet {
        for table in &output.tables {
            println!("  {} {}", style("Created").green(), table.file_name());
        }
        print_output_dir(config);
    }
}

fn run_quiet(config: &MappingConfig) {
    if let Err(e) = pipeline::run_pipeline(config, None) {
        fail("Run failed", e);
    }
}

fn run_with_progress(config: &MappingConfig, verbose: bool) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let start = Instant::now();
    let output = match pipeline::run_pipeline(config, Some(progress)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            fail("Run failed", e);
        }
    };
    pb.finish_and_clear();

    // Summary
    println!(
        "\n{}  Crossmap: {}",
        style("✓").green().bold(),
        style(
            Path::new(&config.input_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )
        .bold()
    );
    print_stat(&output.report, "Standards:", "standards");
    print_stat(&output.report, "Identifiers:", "identifiers");
    print_stat(&output.report, "Links:", "links");
    print_stat(&output.report, "Tables:", "tables");
    print_stat(&output.report, "Rows skipped:", "rows_skipped");

    let duration = start.elapsed();
    println!(
        "  {:<14} {:.1}ms",
        "Duration:",
        duration.as_secs_f64() * 1000.0
    );

    if verbose {
        let timings = output.report.metadata.get("phase_timings");
        if let Some(serde_json::Value::Object(timings)) = timings {
            println!("\n  Phase Timings:");
            for (phase, secs) in timings {
                if let Some(val) = secs.as_f64() {
                    println!("    {:<14} {:.1}ms", phase, val * 1000.0);
                }
            }
        }
    }

    print_output_dir(config);
}

fn print_stat(report: &RunReport, label: &str, key: &str) {
    println!(
        "  {:<14} {}",
        label,
        report.stats.get(key).unwrap_or(&serde_json::json!(0))
    );
}

fn print_output_dir(config: &MappingConfig) {
    if let Some(dir) = &config.output_dir {
        println!("\n  {} {}", style("Output written to:").green(), dir);
    }
}

fn load_set(document: &Path) -> RelationshipSet {
    let doc = read_document(document).unwrap_or_else(|e| fail("Error reading document", e));
    RelationshipSet::from_document(&doc)
}

fn run_table(document: &Path, primary: &str, secondary: &str, hub: &str, direct: bool) {
    let set = load_set(document);
    let index = if direct {
        ResolutionIndex::direct(&set)
    } else {
        ResolutionIndex::hub(&set, hub).unwrap_or_else(|e| fail("Invalid hub", e))
    };
    let mapping = PairwiseResolver::new(&set, &index)
        .resolve(primary, secondary)
        .unwrap_or_else(|e| fail("Cannot resolve pair", e));
    print!("{}", render_table(&mapping));
}

fn run_graph(
    document: &Path,
    standards: Option<&str>,
    palette: Option<&Path>,
    hub: &str,
    output_path: &str,
) {
    let set = load_set(document);
    let selection = standards.map(split_list).unwrap_or_default();
    let palette = match palette {
        Some(path) => {
            Palette::from_json_file(path).unwrap_or_else(|e| fail("Error reading palette", e))
        }
        None => Palette::default(),
    };
    let hub = set.has_standard(hub).then_some(hub);

    let graph = RelationshipGraph::build(&set, &selection, hub)
        .unwrap_or_else(|e| fail("Cannot build graph", e));
    if let Err(e) = write_json(&graph.to_export(&palette), output_path) {
        fail("Error writing output", e);
    }

    println!(
        "{}  Graph: {} nodes, {} edges ({})",
        style("✓").green().bold(),
        graph.node_count(),
        graph.edge_count(),
        graph.selection().join(", ")
    );
    println!("  {} {}", style("Output written to:").green(), output_path);
}

fn run_stats(dir: &Path) {
    let mut store = MappingStore::new();
    let (succeeded, total) = store
        .import_dir(dir)
        .unwrap_or_else(|e| fail("Import failed", e));
    let stats = store.stats();

    println!(
        "\n{}  Imported {} of {} tables",
        style("✓").green().bold(),
        succeeded,
        total
    );
    println!("  {:<14} {}", "Standards:", stats.standard_count);
    println!("  {:<14} {}", "Clauses:", stats.clause_count);
    println!("  {:<14} {}", "Mappings:", stats.mapping_count);

    if !stats.standard_stats.is_empty() {
        println!("\n  Clauses per standard:");
        for (standard, count) in &stats.standard_stats {
            println!("    {:<24} {}", standard, count);
        }
    }
    if !stats.mapping_stats.is_empty() {
        println!("\n  Mappings per pair:");
        for (a, b, count) in &stats.mapping_stats {
            println!("    {:<24} {}", format!("{a} → {b}"), count);
        }
    }
}
