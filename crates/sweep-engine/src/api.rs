//! Collaborator contract the engine consumes from the chat platform.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{CredentialTier, MessageRef, UserRoles};

/// Slack Web API error codes the engine distinguishes. Mapped once at the
/// client boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackErrorKind {
    /// `cant_delete_message`: the credential may not delete it, or it is too old.
    CantDeleteMessage,
    MessageNotFound,
    ThreadNotFound,
    ChannelNotFound,
    NotInChannel,
    UserNotFound,
    MissingScope,
    NotAuthed,
    InvalidAuth,
    TokenRevoked,
    Ratelimited,
    Other(String),
}

impl SlackErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "cant_delete_message" => Self::CantDeleteMessage,
            "message_not_found" => Self::MessageNotFound,
            "thread_not_found" => Self::ThreadNotFound,
            "channel_not_found" => Self::ChannelNotFound,
            "not_in_channel" => Self::NotInChannel,
            "user_not_found" => Self::UserNotFound,
            "missing_scope" => Self::MissingScope,
            "not_authed" => Self::NotAuthed,
            "invalid_auth" => Self::InvalidAuth,
            "token_revoked" => Self::TokenRevoked,
            "ratelimited" => Self::Ratelimited,
            "" => Self::Other("unknown_error".to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::CantDeleteMessage => "cant_delete_message",
            Self::MessageNotFound => "message_not_found",
            Self::ThreadNotFound => "thread_not_found",
            Self::ChannelNotFound => "channel_not_found",
            Self::NotInChannel => "not_in_channel",
            Self::UserNotFound => "user_not_found",
            Self::MissingScope => "missing_scope",
            Self::NotAuthed => "not_authed",
            Self::InvalidAuth => "invalid_auth",
            Self::TokenRevoked => "token_revoked",
            Self::Ratelimited => "ratelimited",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for SlackErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack api {operation} failed: {kind}")]
    Slack {
        operation: &'static str,
        kind: SlackErrorKind,
    },
    #[error("slack api {operation} returned a malformed response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ApiError {
    pub fn slack(operation: &'static str, code: &str) -> Self {
        Self::Slack {
            operation,
            kind: SlackErrorKind::from_code(code),
        }
    }

    pub fn slack_kind(&self) -> Option<&SlackErrorKind> {
        match self {
            Self::Slack { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Channel history request bounded below by `oldest_ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub channel_id: String,
    pub oldest_ts: String,
    pub inclusive: bool,
    pub limit: usize,
    pub tier: CredentialTier,
}

#[async_trait]
/// Platform capabilities used by the deletion engine.
pub trait ModerationApi: Send + Sync {
    /// Whether a delegated elevated credential was configured at startup.
    fn elevated_credential_configured(&self) -> bool;

    async fn get_user_roles(&self, user_id: &str) -> Result<UserRoles, ApiError>;

    /// Root message followed by its replies, oldest first.
    async fn list_thread_replies(
        &self,
        channel_id: &str,
        root_ts: &str,
        tier: CredentialTier,
    ) -> Result<Vec<MessageRef>, ApiError>;

    async fn delete_message(
        &self,
        channel_id: &str,
        ts: &str,
        tier: CredentialTier,
    ) -> Result<(), ApiError>;

    async fn list_channel_history(&self, query: &HistoryQuery)
        -> Result<Vec<MessageRef>, ApiError>;

    async fn notify_user_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ApiError>;
}
