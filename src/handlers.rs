use std::sync::Arc;

use teloxide::types::{ChatId, MessageId};
use tracing::{error, info, warn};

use crate::bot::BotContext;
use crate::command::Directive;
use crate::error::BotError;
use crate::messenger::Messenger;
use crate::webhook_api::WebhookAction;

pub const WELCOME_TEXT: &str = "*Welcome!* ✨\n\
    _You can set or delete Telegram webhooks with this bot._\n\n\
    *To set a webhook:*\n\
    _1. Use the /set command.\n\
    2. Format the message like this\n\
    /set <bot token> <webhook url>_\n\n\
    *To delete a webhook:*\n\
    _1. Use the /del command.\n\
    2. Format the message like this\n\
    /del <bot token> <webhook url>_";

pub const HELP_TEXT: &str = "*Webhook manager.*\n\n\
    _This bot sets and deletes webhooks for your own Telegram bot projects._";

pub const LIST_TEXT: &str = "*Here are the commands available:*\n\n\
    _/start Start the bot\n\
    /help Know more\n\
    /set <token> <url>\n\
    /del <token> <url>_";

pub const WRONG_FORMAT_TEXT: &str = "*Wrong format. You have to use the /set or /del commands.\n\
    For a full list of commands tap on /list.*";

pub const GENERIC_ERROR_TEXT: &str = "An error occurred";

pub async fn start(ctx: &BotContext, chat_id: ChatId) -> Result<(), BotError> {
    ctx.messenger.reply(chat_id, WELCOME_TEXT).await?;
    info!("Welcome message sent to chat {}", chat_id);
    Ok(())
}

pub async fn help(ctx: &BotContext, chat_id: ChatId) -> Result<(), BotError> {
    ctx.messenger.reply(chat_id, HELP_TEXT).await?;
    info!("Help sent to chat {}", chat_id);
    Ok(())
}

pub async fn list(ctx: &BotContext, chat_id: ChatId) -> Result<(), BotError> {
    ctx.messenger.reply(chat_id, LIST_TEXT).await?;
    info!("Command list sent to chat {}", chat_id);
    Ok(())
}

pub fn usage_text(action: WebhookAction) -> String {
    format!(
        "*Wrong format.*\n_Use /{} <bot token> <webhook url>_",
        action.command()
    )
}

pub fn success_text(action: WebhookAction, description: &str) -> String {
    format!(
        "*Webhook was {} successfully.*\n_Message from Telegram:_ {}.",
        action.past_participle(),
        description
    )
}

pub fn failure_text(action: WebhookAction, description: &str) -> String {
    format!(
        "*Webhook couldn't be {}. Error:* {}",
        action.past_participle(),
        description
    )
}

/// Handle `/set` and `/del`: parse the directive, call the target bot's
/// webhook method and relay Telegram's answer.
///
/// Failures of the outbound call are answered in the chat here; only errors
/// delivering the reply itself are returned.
pub async fn change_webhook(
    ctx: &BotContext,
    chat_id: ChatId,
    action: WebhookAction,
    text: &str,
) -> Result<(), BotError> {
    let Some(directive) = Directive::parse(action, text) else {
        warn!("Invalid input format for /{}: {}", action.command(), text);
        ctx.messenger.reply(chat_id, &usage_text(action)).await?;
        return Ok(());
    };

    let reply = match ctx.webhook_api.call(action, &directive).await {
        Ok(response) if response.succeeded() => {
            info!(
                "{} succeeded ({}): {}",
                action.method(),
                response.status,
                response.body
            );
            success_text(action, response.description())
        }
        Ok(response) => {
            warn!(
                "{} rejected ({}): {}",
                action.method(),
                response.status,
                response.description()
            );
            failure_text(action, response.description())
        }
        Err(e) => {
            error!("{} failed: {}", action.method(), e);
            failure_text(action, "could not reach the Telegram API")
        }
    };

    ctx.messenger.reply(chat_id, &reply).await?;
    Ok(())
}

/// Answer unrecognized text with a usage notice that removes itself after
/// the configured delay.
pub async fn fallback(ctx: &BotContext, chat_id: ChatId) -> Result<(), BotError> {
    let notice = ctx.messenger.reply(chat_id, WRONG_FORMAT_TEXT).await?;
    schedule_delete(
        Arc::clone(&ctx.messenger),
        chat_id,
        notice,
        ctx.notice_delete_after,
    );
    Ok(())
}

fn schedule_delete(
    messenger: Arc<dyn Messenger>,
    chat_id: ChatId,
    message_id: MessageId,
    delay: std::time::Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = messenger.delete(chat_id, message_id).await {
            warn!(
                "Failed to delete notice {} in chat {}: {}",
                message_id.0, chat_id, e
            );
        }
    });
}
