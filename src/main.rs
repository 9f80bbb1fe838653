//! # Charts Service Entry Point
//!
//! `charts serve` (the default) runs the reporting API and the scheduled data
//! pull; `charts sync` runs a single pull; `charts migrate` applies the schema.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

use charts::{
    config::{AppConfig, ConfigLoader},
    connectors::GitHubProjectClient,
    db,
    reconciler::Reconciler,
    scheduler::DataPullJob,
    server::run_server,
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "charts")]
#[command(about = "Burndown and burnup charts from project board snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the API and run the scheduled data pull
    Serve,
    /// Pull every configured source once and exit
    Sync,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = Arc::new(db::init_pool(&config).await?);
    Migrator::up(&*db, None)
        .await
        .context("failed to apply database migrations")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(Arc::new(config), db).await,
        Commands::Sync => sync(&config, db).await,
        Commands::Migrate => {
            tracing::info!("migrations applied");
            Ok(())
        }
    }
}

fn build_job(config: &AppConfig, db: Arc<DatabaseConnection>) -> Result<DataPullJob> {
    let client = GitHubProjectClient::new(&config.github).context("failed to build API client")?;
    let job = DataPullJob::new(
        &config.data_pull_job_cron,
        config.sources.clone(),
        Arc::new(client),
        Reconciler::new(db),
    )?;
    Ok(job)
}

async fn serve(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Result<()> {
    let job = build_job(&config, db.clone())?;
    job.start()?;

    let result = run_server(config, db, shutdown_signal()).await;

    job.stop().await;
    result
}

async fn sync(config: &AppConfig, db: Arc<DatabaseConnection>) -> Result<()> {
    let job = build_job(config, db)?;
    let stats = job.run_once().await;

    if stats.has_failures() {
        anyhow::bail!(
            "{} of {} sources failed to sync",
            stats.failed,
            stats.processed
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
