mod config;
mod data;
mod error;
mod evaluation;
mod experiment;
mod ml;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{ensure_valid, load_config, to_toml, ExperimentConfig};
use crate::data::{ChronologicalSplit, CsvFileSource, DatasetSource, HitFeatures};
use crate::error::ExperimentError;
use crate::experiment::Experiment;
use crate::ml::{ModelKind, ModelSuite};

#[derive(Parser)]
#[command(name = "hit-model-bench")]
#[command(version = "0.1.0")]
#[command(about = "Compare logistic regression, MLP and random forest on hit-within-5 training data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "hit_model_bench.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the three models and print the comparison report
    Compare {
        /// Training data CSV (overrides data.path)
        #[arg(short, long)]
        data: Option<String>,
        /// Also write the report as JSON to this path
        #[arg(long)]
        json: Option<String>,
        /// Seed for the MLP and random forest
        #[arg(long)]
        seed: Option<u64>,
        /// Model to break down per class (mlp, lr, rf)
        #[arg(long)]
        detail: Option<ModelKind>,
    },
    /// Summarise the training data without fitting anything
    Inspect {
        /// Training data CSV (overrides data.path)
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ExperimentError>() {
                Some(not_found) if not_found.is_data_not_found() => println!("❌ Error: {}", not_found),
                _ => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins when set, otherwise `--verbose` picks DEBUG over INFO
fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Compare { data, json, seed, detail } => {
            let mut config = config;
            if let Some(path) = data {
                config.data.path = path;
            }
            if let Some(path) = json {
                config.report.json_output = Some(path);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(model) = detail {
                config.report.detailed_model = model;
            }
            run_comparison(config)
        }
        Commands::Inspect { data } => {
            let mut config = config;
            if let Some(path) = data {
                config.data.path = path;
            }
            ensure_valid(&config)?;
            inspect_dataset(Path::new(&config.data.path), config.data.train_fraction)
        }
        Commands::ShowConfig => {
            print!("{}", to_toml(&config)?);
            Ok(())
        }
    }
}

fn run_comparison(config: ExperimentConfig) -> Result<()> {
    info!("═══════════════════════════════════════════════════");
    info!("Advanced Model Comparison");
    info!("═══════════════════════════════════════════════════");
    info!("Data: {}", config.data.path);
    info!(
        "MLP: hidden={:?}, max_iter={}, seed={}",
        config.mlp.hidden_layers, config.mlp.max_iter, config.mlp.seed
    );
    info!("Random forest: {} trees, seed={}", config.forest.n_trees, config.forest.seed);

    let experiment = Experiment::new(config)?;
    let source = CsvFileSource::new(&experiment.config().data.path);
    let models = ModelSuite::from_config(experiment.config());

    let report = experiment.run(&source, models)?;
    report.print_summary();

    if let Some(path) = &experiment.config().report.json_output {
        report.write_json(Path::new(path))?;
    }

    Ok(())
}

fn inspect_dataset(path: &Path, train_fraction: f64) -> Result<()> {
    let dataset = CsvFileSource::new(path).load()?;
    let n = dataset.len();
    let hits = dataset.positives();
    let split = ChronologicalSplit::new(dataset.rows(), train_fraction);

    println!("\n{}", "=".repeat(60));
    println!("                    DATASET SUMMARY");
    println!("{}", "=".repeat(60));
    println!("File:               {}", path.display());
    println!("Rows:               {}", n);
    println!("Hits (hit_in_5=1):  {} ({:.1}%)", hits, hits as f64 / n as f64 * 100.0);
    println!(
        "Split boundary:     row {} (train {}, test {})",
        split.split_idx,
        split.train.len(),
        split.test.len()
    );
    println!("{}", "-".repeat(60));
    println!("  {:<12}{:>12}{:>12}{:>12}{:>12}", "feature", "mean", "std", "min", "max");

    let matrix = data::feature_matrix(dataset.rows());
    for (j, name) in HitFeatures::NAMES.iter().enumerate() {
        let column = matrix.column(j);
        let mean = column.mean().unwrap_or(0.0);
        let std = if n > 1 { column.std(1.0) } else { 0.0 };
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("  {:<12}{:>12.4}{:>12.4}{:>12.4}{:>12.4}", name, mean, std, min, max);
    }
    println!("{}", "=".repeat(60));
    Ok(())
}
