use std::sync::LazyLock;

use regex::Regex;
use teloxide::utils::command::BotCommands;

use crate::webhook_api::WebhookAction;

/// Commands understood by the bot.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Here are the commands available:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Know more")]
    Help,
    #[command(description = "List available commands", alias = "cmd")]
    List,
    #[command(description = "Set a webhook: /set <token> <url>", alias = "setwebhook")]
    Set(String),
    #[command(description = "Delete a webhook: /del <token> <url>")]
    Del(String),
}

// `(?:@\S+)?` accepts commands addressed to the bot by mention.
static SET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:set|setwebhook)(?:@\S+)?\s+(\S+)\s+(\S+)").expect("valid set pattern")
});
static DEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/del(?:@\S+)?\s+(\S+)\s+(\S+)").expect("valid del pattern"));

/// Target bot token and webhook URL extracted from a `/set` or `/del` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub bot_token: String,
    pub webhook_url: String,
}

impl Directive {
    /// Extract `(token, url)` from the raw message text. Anything after the
    /// second argument is ignored; no further validation is done.
    pub fn parse(action: WebhookAction, text: &str) -> Option<Self> {
        let pattern = match action {
            WebhookAction::Set => &SET_PATTERN,
            WebhookAction::Delete => &DEL_PATTERN,
        };
        let captures = pattern.captures(text)?;
        Some(Self {
            bot_token: captures[1].to_string(),
            webhook_url: captures[2].to_string(),
        })
    }
}
