//! NoI Hop-Count Explorer - Command Line Interface
//!
//! Usage:
//!   noi-sim sweep [OPTIONS]         Sweep topologies x floorplans x TSV layouts
//!   noi-sim snapshot [OPTIONS]      Export one interconnect as JSON or DOT
//!   noi-sim nodes [OPTIONS]         List node roles for one combination
//!   noi-sim init-config <PATH>      Write the default configuration

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;

use noi_hop_sim::prelude::*;

#[derive(Parser)]
#[command(name = "noi-sim")]
#[command(about = "Network-on-interposer topology explorer - traffic-weighted hop counts")]
#[command(version)]
struct Cli {
    /// Output results in JSON format (for machine parsing)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every topology over all floorplans and TSV layouts
    Sweep {
        /// TOML configuration file (built-in defaults if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the isolated-pattern sampler (overrides the config)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Evaluate combinations on all cores
        #[arg(short, long)]
        parallel: bool,

        /// Print every sample, not just the summary
        #[arg(short, long)]
        verbose: bool,
    },

    /// Export the interconnect and node labels for one combination
    Snapshot {
        #[command(flatten)]
        target: Target,

        /// Output format
        #[arg(short, long, value_enum, default_value = "dot")]
        format: SnapshotFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List each node's role, coordinate and chiplet
    Nodes {
        #[command(flatten)]
        target: Target,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

/// A single (topology, floorplan, layout) combination
#[derive(clap::Args)]
struct Target {
    /// Topology family (mesh, cmesh, dbutterfly, ftorus, bdonut)
    #[arg(short, long, default_value = "mesh")]
    topology: String,

    /// Comma-separated TSV pattern per chiplet, e.g. border,bundle,border,isolated
    #[arg(short, long, default_value = "border,border,border,border")]
    layout: String,

    /// Use the stacked floorplan instead of the 2x2 one
    #[arg(long)]
    non_square: bool,

    /// Nodes per row
    #[arg(long, default_value = "8")]
    x_dim: usize,

    /// Nodes per column
    #[arg(long, default_value = "16")]
    y_dim: usize,

    /// Seed for the isolated-pattern sampler
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SnapshotFormat {
    Json,
    Dot,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let json_output = cli.json;

    match cli.command {
        Commands::Sweep { config, seed, parallel, verbose } => {
            run_sweep(config, seed, parallel, verbose, json_output)
        }
        Commands::Snapshot { target, format, output } => {
            let format = if json_output { SnapshotFormat::Json } else { format };
            run_snapshot(&target, format, output)
        }
        Commands::Nodes { target } => show_nodes(&target, json_output),
        Commands::InitConfig { path } => {
            SweepConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn banner(title: &str) {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".cyan());
    println!("{}", format!("║  {:<60}║", title).cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".cyan());
    println!();
}

fn run_sweep(
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    parallel: bool,
    verbose: bool,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => SweepConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SweepConfig::default(),
    };
    if seed.is_some() {
        config.tsv.seed = seed;
    }

    let mut driver = SweepDriver::from_config(&config)?;

    if !json_output {
        banner("NoI Topology Design-Space Sweep");
        println!("{}", "Configuration:".yellow());
        print!("{}", toml::to_string_pretty(&config)?);
        println!();
        println!(
            "Evaluating {} combinations{}...",
            driver.total_combinations(),
            if parallel { " in parallel" } else { "" }
        );
        println!();
    }

    let start = std::time::Instant::now();
    let report = if parallel { driver.run_parallel() } else { driver.run() };
    let elapsed = start.elapsed();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if verbose {
        for summary in &report.topologies {
            println!("{}", format!("======= Topology: {}", summary.topology).yellow());
            for sample in &summary.samples {
                match sample.score {
                    Some(score) => println!(
                        "  HopCount when {}, {}: {:.4}",
                        sample.layout, sample.shape, score
                    ),
                    None => println!(
                        "  HopCount when {}, {}: {}",
                        sample.layout,
                        sample.shape,
                        sample.failure.as_deref().unwrap_or("failed").red()
                    ),
                }
            }
            println!();
        }
    }

    println!("{}", report.report());
    println!("Wall-clock time: {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn build_target(target: &Target) -> anyhow::Result<Combination> {
    let topology: Topology = target.topology.parse()?;
    let patterns: Vec<TsvPattern> = target
        .layout
        .split(',')
        .map(|p| TsvPattern::from(p.trim()))
        .collect();
    let Ok(patterns) = <[TsvPattern; 4]>::try_from(patterns) else {
        bail!("layout '{}' must name exactly four patterns", target.layout);
    };
    if target.x_dim == 0 || target.y_dim == 0 {
        bail!("grid {}x{} has no nodes", target.x_dim, target.y_dim);
    }

    let grid = Grid::new(target.x_dim, target.y_dim);
    let shape = GridShape::from_flag(!target.non_square);
    let mut cache = match target.seed {
        Some(seed) => IsolatedSiteCache::seeded(seed),
        None => IsolatedSiteCache::new(),
    };

    let combination =
        Combination::prepare(grid, topology, shape, &TsvLayout(patterns), &mut cache)?;
    Ok(combination)
}

fn run_snapshot(
    target: &Target,
    format: SnapshotFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let combination = build_target(target)?;
    let snapshot = NetworkSnapshot::from_combination(&combination);

    let text = match format {
        SnapshotFormat::Json => serde_json::to_string_pretty(&snapshot)?,
        SnapshotFormat::Dot => snapshot.to_dot(),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn show_nodes(target: &Target, json_output: bool) -> anyhow::Result<()> {
    let combination = build_target(target)?;
    let snapshot = NetworkSnapshot::from_combination(&combination);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&snapshot.nodes)?);
        return Ok(());
    }

    banner("Node Roles");
    println!(
        "Topology: {}  Floorplan: {}  Layout: {}",
        snapshot.topology, snapshot.shape, snapshot.layout
    );
    println!("──────────────────────────────────────────────────────────────────");
    print!("{}", snapshot.node_table());
    match combination.evaluate() {
        Ok(report) => println!("Average hop count: {:.4}", report.average),
        Err(e) => println!("{}: {}", "Not scorable".red(), e),
    }
    Ok(())
}
