mod auth;
mod commands;
mod config;

use std::process::ExitCode;

use clap::Parser;
use roomstore_core::{RoomCatalog, StoreError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    if let Some(admin) = config.command.admin_args() {
        if let Err(e) = auth::verify_admin(config.admin_password.as_deref(), admin.password.as_deref()) {
            eprintln!("error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    }

    let store = config.build_store()?;
    info!(
        "Using {:?} backend, base path {}, {} ordinals",
        config.backend, config.base_path, config.ordinal_scheme
    );
    let catalog = RoomCatalog::new(store, config.base_path.clone(), config.ordinal_scheme);

    let mut stdout = std::io::stdout().lock();
    match commands::run(config.command, &catalog, &mut stdout).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Command failed: {:#}", e);
            let message = match e.downcast_ref::<StoreError>() {
                Some(store_error) => store_error.user_message(),
                None => format!("{:#}", e),
            };
            eprintln!("error: {}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}
