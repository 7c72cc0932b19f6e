mod command;
mod config;
mod format;
mod platform;
mod report;
mod speedtest;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::SpeedtestCommand;
use crate::config::Config;
use crate::speedtest::CliEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,speedbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!(
        "  Speedtest: {} {}",
        config.speedtest.command,
        config.speedtest.args.join(" ")
    );
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);

    let engine = Arc::new(CliEngine::new(&config.speedtest));
    let command = Arc::new(SpeedtestCommand::new(engine));
    let bot = teloxide::Bot::new(&config.telegram.bot_token);

    info!("Bot is starting...");
    platform::telegram::run(command, config.telegram.allowed_user_ids.clone(), bot).await?;

    Ok(())
}
