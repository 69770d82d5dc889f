//! CLI entry point for the vaccine-access preprocessing tool.
//!
//! Normalizes each location's public-health exports into a population-center
//! file and a facility file. Without a subcommand every location is processed.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vax_access_prep::config::PipelineConfig;
use vax_access_prep::pipelines::{Chicago, Pipeline, SantaClara};

#[derive(Parser)]
#[command(name = "vax_access_prep")]
#[command(about = "Preprocess per-city vaccine accessibility data", long_about = None)]
struct Cli {
    /// JSON config file with source locations and output paths
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every location with its configured paths
    All,
    /// Process the Chicago ZIP-code exports
    Chicago(RunArgs),
    /// Process the Santa Clara census-tract exports
    SantaClara(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Directory holding the location's source CSVs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Population center output file
    #[arg(short, long)]
    population_output: Option<PathBuf>,

    /// Facility output file
    #[arg(short, long)]
    facility_output: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let _guard = init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command.unwrap_or(Commands::All) {
        Commands::All => {
            let chicago = config.chicago.clone();
            Chicago::new(config.chicago)
                .process(&chicago.population_output, &chicago.facility_output)?;

            let santa_clara = config.santa_clara.clone();
            SantaClara::new(config.santa_clara)
                .process(&santa_clara.population_output, &santa_clara.facility_output)?;
        }
        Commands::Chicago(args) => {
            let mut chicago = config.chicago;
            let (pop, fac) = args.apply(
                &mut chicago.data_dir,
                &chicago.population_output,
                &chicago.facility_output,
            );
            Chicago::new(chicago).process(&pop, &fac)?;
        }
        Commands::SantaClara(args) => {
            let mut santa_clara = config.santa_clara;
            let (pop, fac) = args.apply(
                &mut santa_clara.data_dir,
                &santa_clara.population_output,
                &santa_clara.facility_output,
            );
            SantaClara::new(santa_clara).process(&pop, &fac)?;
        }
    }

    info!("All requested locations processed");
    Ok(())
}

impl RunArgs {
    /// Overrides the configured data directory and returns the output paths
    /// to use, preferring those given on the command line.
    fn apply(self, data_dir: &mut PathBuf, pop: &Path, fac: &Path) -> (PathBuf, PathBuf) {
        if let Some(dir) = self.data_dir {
            *data_dir = dir;
        }
        (
            self.population_output.unwrap_or_else(|| pop.to_path_buf()),
            self.facility_output.unwrap_or_else(|| fac.to_path_buf()),
        )
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vax_access_prep.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vax_access_prep.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(default_directive("info")));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(default_directive("debug")));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn default_directive(level: &str) -> tracing_subscriber::filter::Directive {
    level
        .parse()
        .unwrap_or_else(|_| tracing::level_filters::LevelFilter::INFO.into())
}
