use std::path::PathBuf;

use _model::Provider;
use anyhow::Result;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{config::Config, pipeline::Pipeline};

mod artifacts;
mod batch;
mod compare;
mod config;
mod distance;
mod ids;
mod ingest;
mod pipeline;
mod providers;
mod report;
mod stats;
mod utils;

/// Geocode a batch of addresses with several services and measure how far
/// each lands from the known location.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Pipeline configuration file
    #[arg(short, long, default_value = "geocompare.yaml", env = "GEOCOMPARE_CONFIG")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Ingest, geocode, compare and report in one go
    Run,
    /// Assign ids to the source table and write addresses.csv
    Ingest,
    /// Geocode addresses.csv with the configured or selected providers
    Geocode {
        #[arg(short, long)]
        provider: Vec<Provider>,
    },
    /// Rebuild the distance table and statistics from saved results
    Compare,
    /// Redraw the box plot and maps from saved artifacts
    Report,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "geocompare=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let pipeline = Pipeline::new(&config)?;
    info!("Writing artifacts to {}", pipeline.paths().root().display());

    match cli.command {
        Command::Run => {
            let geocoders = providers::build_all(&config)?;
            pipeline.run(&geocoders)?;
        }
        Command::Ingest => {
            pipeline.ingest()?;
        }
        Command::Geocode { provider } => {
            let selected = if provider.is_empty() {
                config.providers.clone()
            } else {
                provider.into_iter().unique().collect()
            };
            let geocoders: Vec<_> = selected
                .into_iter()
                .map(|x| providers::build(x, &config))
                .try_collect()?;
            let records = ingest::read_addresses(&pipeline.paths().addresses())?;
            pipeline.geocode(&records, &geocoders);
        }
        Command::Compare => {
            pipeline.compare_saved()?;
        }
        Command::Report => {
            pipeline.report_saved()?;
        }
    }

    pipeline.finish()
}
