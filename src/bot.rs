use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use teloxide::dispatching::UpdateHandler;
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::error::{BotError, ErrorKind, HandlerError};
use crate::handlers;
use crate::messenger::Messenger;
use crate::webhook_api::{WebhookAction, WebhookApi};

/// Everything a handler needs, built once at startup and shared by all chats.
pub struct BotContext {
    pub messenger: Arc<dyn Messenger>,
    pub webhook_api: Arc<dyn WebhookApi>,
    pub notice_delete_after: Duration,
}

/// Start the dispatcher. Updates arrive through the webhook listener when
/// `webhook` is set, otherwise through long polling.
pub async fn run(bot: Bot, ctx: Arc<BotContext>, webhook: Option<Options>) -> Result<()> {
    let error_sink = ErrorSink::new(Arc::clone(&ctx.messenger));

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![ctx])
        .distribution_function(chat_key)
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(error_sink)
        .enable_ctrlc_handler()
        .build();

    match webhook {
        Some(options) => {
            info!("Setting webhook URL: {}", options.url);
            let listener = webhooks::axum(bot, options)
                .await
                .context("Failed to set up webhook listener")?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("webhook listener"),
                )
                .await;
        }
        None => {
            info!("No public_url configured, using long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}

/// Updates with the same key are handled one at a time in arrival order;
/// different chats are handled concurrently.
pub fn chat_key(update: &Update) -> Option<ChatId> {
    update.chat().map(|chat| chat.id)
}

/// Text messages are logged, then routed to a command or the fallback notice.
pub fn schema() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .inspect(|msg: Message| log_sender(&msg))
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(answer_command),
        )
        .branch(dptree::endpoint(answer_unknown))
}

fn log_sender(msg: &Message) {
    let text = msg.text().unwrap_or_default();
    match msg.from.as_ref() {
        Some(user) => {
            let name = match &user.last_name {
                Some(last) => format!("{} {}", user.first_name, last),
                None => user.first_name.clone(),
            };
            info!(
                "From: {} (@{}) ID: {}\nMessage: {}",
                name,
                user.username.as_deref().unwrap_or("-"),
                user.id,
                text
            );
        }
        None => info!("From: unknown sender in chat {}\nMessage: {}", msg.chat.id, text),
    }
}

async fn answer_command(
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> Result<(), HandlerError> {
    let text = msg.text().unwrap_or_default();
    timed(msg.chat.id, text, run_command(&ctx, msg.chat.id, cmd, text)).await
}

async fn answer_unknown(msg: Message, ctx: Arc<BotContext>) -> Result<(), HandlerError> {
    let text = msg.text().unwrap_or_default();
    timed(msg.chat.id, text, handlers::fallback(&ctx, msg.chat.id)).await
}

async fn run_command(
    ctx: &BotContext,
    chat_id: ChatId,
    cmd: Command,
    text: &str,
) -> Result<(), BotError> {
    match cmd {
        Command::Start => handlers::start(ctx, chat_id).await,
        Command::Help => handlers::help(ctx, chat_id).await,
        Command::List => handlers::list(ctx, chat_id).await,
        Command::Set(args) => {
            debug!("/set arguments: {}", args);
            handlers::change_webhook(ctx, chat_id, WebhookAction::Set, text).await
        }
        Command::Del(args) => {
            debug!("/del arguments: {}", args);
            handlers::change_webhook(ctx, chat_id, WebhookAction::Delete, text).await
        }
    }
}

/// Run a handler, log how long it took and attach the chat to any error.
async fn timed<F>(chat_id: ChatId, query: &str, work: F) -> Result<(), HandlerError>
where
    F: Future<Output = Result<(), BotError>>,
{
    let started = Instant::now();
    let result = work.await;
    info!("Response time: {} ms", started.elapsed().as_millis());
    result.map_err(|source| HandlerError {
        chat_id,
        query: query.to_string(),
        source,
    })
}

/// Dispatcher error handler: the last stop for anything a handler returned.
pub struct ErrorSink {
    messenger: Arc<dyn Messenger>,
}

impl ErrorSink {
    pub fn new(messenger: Arc<dyn Messenger>) -> Arc<Self> {
        Arc::new(Self { messenger })
    }
}

impl ErrorHandler<HandlerError> for ErrorSink {
    fn handle_error(self: Arc<Self>, error: HandlerError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            report_error(self.messenger.as_ref(), &error).await;
        })
    }
}

/// Log `err` and, when the chat is still reachable, tell the user something
/// went wrong. Never fails; returns whether a notice was delivered.
pub async fn report_error(messenger: &dyn Messenger, err: &HandlerError) -> bool {
    if err.source.kind() == ErrorKind::BlockedByUser {
        info!("Bot was blocked by the user in chat {}", err.chat_id);
        return false;
    }

    error!(
        "Error while handling message in chat {}\nQuery: {}\n{}",
        err.chat_id, err.query, err.source
    );

    if !err.source.can_reply() {
        return false;
    }

    match messenger
        .reply(err.chat_id, handlers::GENERIC_ERROR_TEXT)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            warn!(
                "Failed to notify chat {} about the error: {}",
                err.chat_id, e
            );
            false
        }
    }
}
