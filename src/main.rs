//! # Devfolio API Main Entry Point
//!
//! `devfolio serve` (the default) migrates the database and starts the HTTP
//! server; `devfolio migrate` only applies or rolls back migrations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use devfolio::{
    config::{AppConfig, ConfigLoader},
    db,
    migration::{Migrator, MigratorTrait},
    server::run_server,
    telemetry,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "devfolio", version, about = "Devfolio API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations and serve the API
    Serve,
    /// Apply pending migrations and exit
    Migrate {
        /// Roll back the most recent migration instead
        #[arg(long)]
        rollback: bool,
    },
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            run_server(config, db).await
        }
        Command::Migrate { rollback: false } => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Migrate { rollback: true } => {
            Migrator::down(&db, Some(1))
                .await
                .context("rolling back migration")?;
            info!("Rolled back the latest migration");
            Ok(())
        }
    }
}
