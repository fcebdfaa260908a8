//! Student Performance Predictor - Main Entry Point
//!
//! Loads the trained model artifacts and serves predictions over HTTP.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use student_performance::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    metrics::{MetricsReporter, ServiceMetrics},
    server::{self, AppState},
    PredictorContext,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "student-performance-predictor", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "SPP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Listen address, overrides `server.bind_addr`
    #[arg(long)]
    bind: Option<String>,

    /// Artifact directory, overrides `artifacts.dir`
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load_from_path(&args.config)?
        .with_overrides(args.bind, args.artifacts_dir);

    init_logging(&config.logging)?;
    info!(config = %args.config.display(), "Starting Student Performance Predictor");

    let context = Arc::new(PredictorContext::load(&config)?);
    log_model_summary(&context);

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    server::serve(&config.server, AppState::new(context, metrics.clone())).await?;

    info!("Service shutting down...");
    metrics.log_summary();
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().pretty()).try_init()
    };
    result.map_err(|e| anyhow!("Failed to init logging: {e}"))
}

fn log_model_summary(context: &PredictorContext) {
    info!(
        classifier = context.engine().classifier_name(),
        classes = ?context.classes(),
        "Model loaded"
    );

    for (class, info) in context.gpa_info() {
        info!(class = %class, gpa = %info["range"], "GPA category");
    }

    for (feature, range) in context.valid_ranges() {
        info!(feature = %feature, range = %range, "Feature range");
    }
}
