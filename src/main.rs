mod bot;
mod command;
mod config;
mod error;
mod handlers;
mod messenger;
mod server;
mod webhook_api;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::BotContext;
use crate::command::Command;
use crate::config::Config;
use crate::webhook_api::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hookbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.telegram.api_url);
    info!("  Listen: {}", config.server.listen_addr);
    info!("  Path: {}", config.server.path);

    let api_url = reqwest::Url::parse(&config.telegram.api_url)
        .with_context(|| format!("Invalid API url: {}", config.telegram.api_url))?;
    let bot = Bot::new(&config.telegram.bot_token).set_api_url(api_url);

    let me = bot
        .get_me()
        .await
        .context("Failed to fetch bot identity (is BOT_TOKEN valid?)")?;
    info!("Running as @{}", me.username());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to publish command list: {}", e);
    }

    let webhook = server::webhook_options(&config)?;

    let ctx = Arc::new(BotContext {
        messenger: Arc::new(bot.clone()),
        webhook_api: Arc::new(WebhookClient::new(
            &config.telegram.api_url,
            config.api_timeout(),
        )?),
        notice_delete_after: config.notice_delete_after(),
    });

    info!("Bot is starting...");
    bot::run(bot, ctx, webhook).await?;

    Ok(())
}
