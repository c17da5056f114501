//! `retailsense`: command-line driver for the analytics service.
//!
//! Reads a JSON history export, keeps artifacts in the configured directory
//! and prints every result as JSON on stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use retailsense_ai::{AnalyticsService, DiscardInsights, TrainingReport};
use retailsense_core::{CustomerId, ItemId};
use retailsense_forecast::ModelKind;
use retailsense_infra::{AnalyticsConfig, FsArtifactStore, JsonFileHistory};
use retailsense_observability::LogFormat;

type Service = AnalyticsService<FsArtifactStore, JsonFileHistory, DiscardInsights>;

#[derive(Parser, Debug)]
#[command(name = "retailsense")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sales forecasting, product affinity, customer segmentation and inventory analytics", long_about = None)]
struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON history export: {as_of, transactions, catalog, customers}
    #[arg(long, default_value = "history.json")]
    history: PathBuf,

    /// Evaluate the export as of this instant (RFC 3339)
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,

    /// Override the configured log format (json | pretty)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train one model, or all of them
    Train {
        #[arg(value_enum)]
        target: TrainTarget,

        /// Forecast model kind (random_forest | gradient_boosting | linear)
        #[arg(long)]
        model_kind: Option<ModelKind>,

        /// Number of customer clusters
        #[arg(long)]
        clusters: Option<usize>,
    },
    /// Forecast daily revenue
    Predict {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Items most similar to an item
    Recommend {
        #[arg(long)]
        item: ItemId,

        #[arg(long, default_value = "5")]
        top: usize,
    },
    /// Strongest item pairs across the catalog
    CrossSell,
    /// Segment one customer, or every customer with orders
    Segment {
        #[arg(long)]
        customer: Option<CustomerId>,
    },
    /// Inventory reports
    Inventory {
        #[arg(value_enum)]
        report: InventoryReport,

        /// Window for the slow-moving report
        #[arg(long)]
        days: Option<u32>,
    },
    /// One-screen overview of every engine
    Dashboard,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TrainTarget {
    Forecast,
    Affinity,
    Segmentation,
    All,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InventoryReport {
    Alerts,
    Reorder,
    Health,
    SlowMoving,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode result")?;
    println!("{out}");
    Ok(())
}

fn load_config(args: &Args) -> Result<AnalyticsConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    config.apply_env().context("Invalid environment override")?;
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn train(service: &Service, target: TrainTarget, model_kind: Option<ModelKind>, clusters: Option<usize>) -> Vec<TrainingReport> {
    match target {
        TrainTarget::Forecast => vec![service.train_sales_forecast(model_kind)],
        TrainTarget::Affinity => vec![service.train_product_affinity()],
        TrainTarget::Segmentation => vec![service.train_customer_segmentation(clusters)],
        TrainTarget::All => vec![
            service.train_sales_forecast(model_kind),
            service.train_product_affinity(),
            service.train_customer_segmentation(clusters),
        ],
    }
}

fn run(service: &Service, command: Command) -> Result<ExitCode> {
    match command {
        Command::Train {
            target,
            model_kind,
            clusters,
        } => {
            let reports = train(service, target, model_kind, clusters);
            print_json(&reports)?;
            let failed = reports.iter().filter(|r| !r.success).count();
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Predict { days } => print_json(&service.predict_sales(days)?)?,
        Command::Recommend { item, top } => print_json(&service.recommend_products(item, top)?)?,
        Command::CrossSell => print_json(&service.cross_sell_opportunities()?)?,
        Command::Segment { customer: Some(id) } => print_json(&service.segment_customer(id)?)?,
        Command::Segment { customer: None } => print_json(&service.segment_all_customers()?)?,
        Command::Inventory { report, days } => match report {
            InventoryReport::Alerts => print_json(&service.analyze_inventory()?)?,
            InventoryReport::Reorder => print_json(&service.reorder_recommendations()?)?,
            InventoryReport::Health => print_json(&service.inventory_health()?)?,
            InventoryReport::SlowMoving => print_json(&service.slow_moving_items(days)?)?,
        },
        Command::Dashboard => print_json(&service.dashboard_summary())?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(&args)?;
    retailsense_observability::init(config.log_format);

    let history = match args.as_of {
        Some(as_of) => JsonFileHistory::new(&args.history).with_as_of(as_of),
        None => JsonFileHistory::new(&args.history),
    };
    info!(
        history = %args.history.display(),
        artifacts = %config.artifact_dir.display(),
        "retailsense starting"
    );

    let service = AnalyticsService::new(
        Arc::new(FsArtifactStore::new(config.artifact_dir.clone())),
        history,
        DiscardInsights,
        config.engine_settings(),
    );
    run(&service, args.command)
}
