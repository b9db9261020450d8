use teloxide::types::ChatId;
use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// Broad classification of a pipeline failure, used by the global error sink
/// to decide between logging and replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The chat partner blocked the bot; nothing can be delivered.
    BlockedByUser,
    /// Telegram rejected one of our own requests (send/delete message).
    ApiRejection,
    /// Telegram could not be reached to deliver a reply.
    Network,
    /// The outbound webhook call failed at the transport level.
    TransportFailure,
    /// The outbound webhook call returned a body that is not JSON.
    MalformedResponse,
    Unknown,
}

/// Error raised while handling a single update.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("{0}")]
    BlockedByUser(String),

    #[error("error in request: {0}")]
    ApiRejection(String),

    #[error("could not contact Telegram: {0}")]
    Network(String),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::BlockedByUser(_) => ErrorKind::BlockedByUser,
            BotError::ApiRejection(_) => ErrorKind::ApiRejection,
            BotError::Network(_) => ErrorKind::Network,
            BotError::Transport(_) => ErrorKind::TransportFailure,
            BotError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            BotError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Whether the chat is still reachable after this error, so a generic
    /// notice can be sent back.
    pub fn can_reply(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ApiRejection | ErrorKind::TransportFailure | ErrorKind::MalformedResponse
        )
    }
}

impl From<RequestError> for BotError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(ApiError::BotBlocked) => {
                BotError::BlockedByUser(ApiError::BotBlocked.to_string())
            }
            RequestError::Api(api) => BotError::ApiRejection(api.to_string()),
            e @ (RequestError::RetryAfter(_) | RequestError::MigrateToChatId(_)) => {
                BotError::ApiRejection(e.to_string())
            }
            RequestError::Network(e) => BotError::Network(e.to_string()),
            other => BotError::Unknown(other.to_string()),
        }
    }
}

/// A handler failure together with the chat it happened in, so the
/// dispatcher's error handler can still answer there.
#[derive(Debug, Error)]
#[error("while handling {query:?} in chat {chat_id}: {source}")]
pub struct HandlerError {
    pub chat_id: ChatId,
    pub query: String,
    #[source]
    pub source: BotError,
}
