//! Fleet Resolve CLI
//!
//! Loads the corpus and answers "which engine of variant V is installed in
//! car C" from the command line.

use std::path::PathBuf;

use clap::Parser;
use fleet_registry::{Corpus, EngineVariant, FleetConfig, SchemaRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet-resolve")]
#[command(about = "Resolve the engine of a given variant installed in a car")]
struct Cli {
    /// Path to a config file (default: fleet.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema tree root (default: compiled-in schemas)
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Instance tree root
    #[arg(short, long)]
    instances: Option<PathBuf>,

    /// Car uuid, e.g. car:sedan-1
    car_uuid: String,

    /// Engine variant: gas, electric, or hybrid
    variant: String,
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
    let variant: EngineVariant = cli.variant.parse()?;

    let config = FleetConfig::load_from(cli.config.as_ref())?;
    let schemas_dir = cli.schemas.or(config.corpus.schemas_dir);
    let instances_dir = cli.instances.unwrap_or(config.corpus.instances_dir);

    let registry = match &schemas_dir {
        Some(dir) => SchemaRegistry::from_dir(dir)?,
        None => SchemaRegistry::embedded()?,
    };

    let snapshot = match Corpus::load_dir(&registry, &instances_dir) {
        Ok(snapshot) => snapshot,
        Err(failures) => {
            for failure in &failures {
                eprintln!("  - {}", failure.error);
            }
            anyhow::bail!("corpus validation failed with {} error(s)", failures.len());
        }
    };

    match snapshot.resolve_engine(&cli.car_uuid, variant)? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => {
            println!("No {} engine installed in {}", variant, cli.car_uuid);
            Ok(())
        }
    }
}
