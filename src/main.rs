use clap::{Parser, Subcommand};
use hemavision::commands::{self, ClassifyArgs, ScaffoldArgs};
use hemavision_types::prelude::*;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "hemavision", version, about = "Blood cell classification from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify local images and print one JSON report per image.
    Classify(ClassifyArgs),
    /// Print reference information for one cell type, or all of them.
    Info { cell: Option<CellType> },
    /// Write a randomly initialized model so model mode can be exercised.
    ScaffoldModel(ScaffoldArgs),
}

fn main() -> anyhow::Result<()> {
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    match Cli::parse().command {
        Command::Classify(args) => commands::classify(args),
        Command::Info { cell } => {
            println!("{:#}", commands::cell_table(cell));
            Ok(())
        }
        Command::ScaffoldModel(args) => commands::scaffold_model(args),
    }
}
