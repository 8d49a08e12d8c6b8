use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use orders_etl::config::PipelineSettings;
use orders_etl::constants::DEFAULT_SETTINGS_PATH;
use orders_etl::logging;
use orders_etl::observability;
use orders_etl::pipeline::storage::{connect_primary, Loader};
use orders_etl::pipeline::{DatasetSummary, Pipeline, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "orders_etl")]
#[command(about = "Batch ETL for customer and order CSV exports")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, clean and load both datasets
    Run {
        #[command(flatten)]
        paths: PathArgs,
        /// Write Prometheus exposition text to this file when the run ends
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Extract and clean only; nothing is written to a store
    Validate {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Load the database config and probe the primary store
    CheckConfig {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args)]
struct PathArgs {
    /// Settings file (TOML); missing file means defaults
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,
    /// Customers CSV
    #[arg(long)]
    customers: Option<PathBuf>,
    /// Orders CSV
    #[arg(long)]
    orders: Option<PathBuf>,
    /// Database config (JSON)
    #[arg(long)]
    db_config: Option<PathBuf>,
    /// Embedded fallback database file
    #[arg(long)]
    fallback_db: Option<PathBuf>,
}

impl PathArgs {
    fn resolve(&self) -> anyhow::Result<PipelineSettings> {
        let mut settings = PipelineSettings::load(&self.settings)
            .with_context(|| format!("loading settings from {}", self.settings.display()))?;
        if let Some(path) = &self.customers {
            settings.customers_path = path.clone();
        }
        if let Some(path) = &self.orders {
            settings.orders_path = path.clone();
        }
        if let Some(path) = &self.db_config {
            settings.db_config_path = path.clone();
        }
        if let Some(path) = &self.fallback_db {
            settings.fallback_db_path = path.clone();
        }
        Ok(settings)
    }
}

fn print_dataset(label: &str, summary: &DatasetSummary) {
    println!(
        "   {label}: extracted {}, kept {}, dropped {}",
        summary.extracted, summary.kept, summary.dropped
    );
    for (reason, count) in &summary.dropped_by_reason {
        println!("      - {reason}: {count}");
    }
    if let Some(store) = &summary.store {
        println!("      loaded into {store}");
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Run {}:", summary.run_id);
    print_dataset("Customers", &summary.customers);
    print_dataset("Orders", &summary.orders);
    if let Some(e) = &summary.error {
        println!("   Error: {e}");
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(paths: &PathArgs, metrics_out: Option<PathBuf>) -> anyhow::Result<bool> {
    let settings = paths.resolve()?;
    if metrics_out.is_some() {
        observability::init()?;
    }

    let pipeline = Pipeline::from_settings(settings).await;
    let summary = pipeline.run().await;
    print_summary(&summary);

    if let Some(path) = metrics_out {
        observability::render_to_file(&path)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    if summary.success {
        println!("✅ ETL run completed successfully");
    } else {
        println!("❌ ETL run failed");
    }
    Ok(summary.success)
}

fn validate(paths: &PathArgs) -> anyhow::Result<bool> {
    let settings = paths.resolve()?;
    let pipeline = Pipeline::new(settings, Loader::new(None, None));
    let summary = pipeline.validate();
    print_summary(&summary);
    Ok(summary.customers.kept > 0)
}

async fn check_config(paths: &PathArgs) -> anyhow::Result<bool> {
    let settings = paths.resolve()?;
    let Some(store) = connect_primary(&settings.db_config_path).await else {
        println!("❌ Primary store is not configured");
        return Ok(false);
    };
    match store.ping().await {
        Ok(()) => {
            println!("✅ Primary store '{}' is reachable", store.name());
            Ok(true)
        }
        Err(e) => {
            println!("❌ Primary store probe failed: {e}");
            Ok(false)
        }
    }
}

/// Log directory comes from the settings file so logging can start before anything else runs
fn log_dir(paths: &PathArgs) -> PathBuf {
    PipelineSettings::load(&paths.settings)
        .map(|s| s.log_dir)
        .unwrap_or_else(|_| PipelineSettings::default().log_dir)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let paths = match &cli.command {
        Commands::Run { paths, .. }
        | Commands::Validate { paths }
        | Commands::CheckConfig { paths } => paths,
    };
    let _guard = match logging::init_logging(&log_dir(paths)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run {
            ref paths,
            metrics_out,
        } => run(paths, metrics_out).await,
        Commands::Validate { ref paths } => validate(paths),
        Commands::CheckConfig { ref paths } => check_config(paths).await,
    };

    match result {
        Ok(success) => exit_code(success),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
