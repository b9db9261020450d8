use anyhow::{Context, Result};
use reqwest::Url;
use teloxide::update_listeners::webhooks::Options;

use crate::config::Config;

/// Webhook listener settings, or `None` when no public URL is configured
/// and the bot should long-poll instead.
///
/// Telegram is limited to one open connection so it delivers updates one
/// at a time, which keeps their arrival order intact.
pub fn webhook_options(config: &Config) -> Result<Option<Options>> {
    let Some(webhook_url) = config.webhook_url() else {
        return Ok(None);
    };
    let url = Url::parse(&webhook_url)
        .with_context(|| format!("Invalid webhook url: {}", webhook_url))?;

    let mut options = Options::new(config.server.listen_addr, url).max_connections(1);
    if let Some(secret) = &config.server.secret_token {
        options = options.secret_token(secret.clone());
    }
    Ok(Some(options))
}
