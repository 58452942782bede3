use anyhow::Result;
use bct_core::{config::Config, migration, server, server::AppState, telemetry};
use clap::{Parser, Subcommand};
use tracing::info;

/// BCT administrative backend
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
    /// Mirror every Keycloak user into the local database
    SyncUsers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let prometheus_handle = telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                realm = %config.keycloak.realm,
                "Starting BCT Core on {}",
                config.http_addr()
            );
            server::run(config, prometheus_handle).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::SyncUsers => {
            let state = AppState::init(config, None).await?;
            let report = state.admin_user_service.sync_all_users().await?;
            info!(
                total = report.total,
                synced = report.synced,
                failed = report.failed,
                "User sync finished"
            );
            Ok(())
        }
    }
}
