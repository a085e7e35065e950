//! Fleet Validator CLI
//!
//! Validates the instance corpus against its schemas and exports the
//! relationship snapshot.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fleet_registry::{Corpus, FleetConfig, SchemaRegistry, Snapshot};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet-validator")]
#[command(about = "Validate the vehicle corpus and export relationships")]
struct Cli {
    /// Path to a config file (default: fleet.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema tree root (overrides config; default: compiled-in schemas)
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Instance tree root (overrides config)
    #[arg(short, long)]
    instances: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every document and check relationship integrity
    Validate,

    /// Validate, then write the car -> engines mapping
    Export {
        /// Output file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FleetConfig::load_from(cli.config.as_ref())?;
    let schemas_dir = cli.schemas.or(config.corpus.schemas_dir);
    let instances_dir = cli.instances.unwrap_or(config.corpus.instances_dir);

    let registry = match &schemas_dir {
        Some(dir) => SchemaRegistry::from_dir(dir)?,
        None => SchemaRegistry::embedded()?,
    };
    println!("🔍 Loaded {} schemas", registry.len());

    let snapshot = load_or_report(&registry, &instances_dir)?;
    println!(
        "✅ Corpus valid: {} instances, {} relationships (fingerprint {})",
        snapshot.store().len(),
        snapshot.graph().edge_count(),
        snapshot.fingerprint()
    );
    for warning in snapshot.warnings() {
        println!("⚠️  {warning}");
    }

    match cli.command {
        Commands::Validate => Ok(()),
        Commands::Export { output } => {
            let output = output.unwrap_or(config.export.output);
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            let mapping = snapshot.export_relationships();
            let content = if config.export.pretty {
                serde_json::to_string_pretty(&mapping)?
            } else {
                serde_json::to_string(&mapping)?
            };
            fs::write(&output, content)?;
            println!("📦 Relationship snapshot written to {}", output.display());
            Ok(())
        }
    }
}

fn load_or_report(registry: &SchemaRegistry, instances_dir: &PathBuf) -> anyhow::Result<Snapshot> {
    match Corpus::load_dir(registry, instances_dir) {
        Ok(snapshot) => Ok(snapshot),
        Err(failures) => {
            eprintln!("❌ Corpus load failed with {} error(s):", failures.len());
            for failure in &failures {
                eprintln!("  - {}", failure.error);
            }
            anyhow::bail!("corpus validation failed")
        }
    }
}
