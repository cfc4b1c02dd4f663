//! User-facing notices produced by the orchestrator and their delivery.

use tracing::{debug, warn};

use crate::api::ModerationApi;

/// Why a window sweep deleted nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFailureCause {
    /// Elevated requester whose delegated credential is not configured.
    ElevatedWithoutCredential,
    /// Member requester targeting messages they did not author.
    InsufficientRights,
    /// The platform refused, or the messages are too old.
    TooOldOrNoPermission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Elevated rights present but the elevated credential is missing.
    ConfigurationWarning,
    PermissionDenied,
    InvalidPeriod { input: String, command: String },
    Usage { command: String },
    ThreadNothingDeleted,
    FallbackCantDelete,
    FallbackFailed { reason: String },
    WindowNothingDeleted { cause: WindowFailureCause },
    WindowPartial { deleted: usize, failed: usize },
    ApiFailure { operation: String },
}

impl UserNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationWarning => "configuration_warning",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidPeriod { .. } => "invalid_period",
            Self::Usage { .. } => "usage",
            Self::ThreadNothingDeleted => "thread_nothing_deleted",
            Self::FallbackCantDelete => "fallback_cant_delete",
            Self::FallbackFailed { .. } => "fallback_failed",
            Self::WindowNothingDeleted { .. } => "window_nothing_deleted",
            Self::WindowPartial { .. } => "window_partial",
            Self::ApiFailure { .. } => "api_failure",
        }
    }
}

pub fn time_window_usage(command: &str) -> String {
    [
        format!("Usage: `{command} <period>`"),
        "Deletes orphaned thread stubs (and their replies) posted within the period.".to_string(),
        format!(
            "Examples: `{command} 2H`, `{command} 30m`, `{command} 3D`, `{command} 2 hours`, `{command} 15 minutes`, `{command} 1 day`"
        ),
    ]
    .join("\n")
}

pub fn render_notice(notice: &UserNotice) -> String {
    match notice {
        UserNotice::ConfigurationWarning => "⚠️ Admin detected but user token not configured. You can only delete your own messages and bot messages until a workspace owner configures SLACK_USER_TOKEN.".to_string(),
        UserNotice::PermissionDenied => "❌ You can only delete your own messages. Only workspace admins can delete messages from other users.".to_string(),
        UserNotice::InvalidPeriod { input, command } => format!(
            "❌ Could not understand `{}` as a time period.\n{}",
            sweep_core::clip_text(input, 80),
            time_window_usage(command)
        ),
        UserNotice::Usage { command } => time_window_usage(command),
        UserNotice::ThreadNothingDeleted => "❌ No messages could be deleted. You may not have permission to delete these messages, or they may be too old to delete.".to_string(),
        UserNotice::FallbackCantDelete => "❌ Cannot delete this message. You may not have permission or the message may be too old.".to_string(),
        UserNotice::FallbackFailed { reason } => format!(
            "❌ Failed to remove message: {}",
            sweep_core::clip_text(reason, 200)
        ),
        UserNotice::WindowNothingDeleted { cause } => match cause {
            WindowFailureCause::ElevatedWithoutCredential => "❌ No messages were deleted. Admin rights detected, but the user token is not configured, so only your own messages and bot messages can be removed.".to_string(),
            WindowFailureCause::InsufficientRights => "❌ No messages were deleted. You can only delete your own messages and bot messages.".to_string(),
            WindowFailureCause::TooOldOrNoPermission => "❌ No messages could be deleted. They may be too old, or the app may not have permission to delete them.".to_string(),
        },
        UserNotice::WindowPartial { deleted, failed } => format!(
            "⚠️ Deleted {deleted} message(s), but {failed} could not be deleted (missing permission or too old)."
        ),
        UserNotice::ApiFailure { operation } => format!(
            "❌ An error occurred while {operation}. Please try again later."
        ),
    }
}

/// Sends each notice to the requester as an ephemeral message. Delivery is
/// best effort: failures are logged and otherwise ignored.
pub async fn deliver_notices(
    api: &dyn ModerationApi,
    channel_id: &str,
    user_id: &str,
    notices: &[UserNotice],
) {
    for notice in notices {
        let text = render_notice(notice);
        match api.notify_user_ephemeral(channel_id, user_id, &text).await {
            Ok(()) => debug!(
                channel = %channel_id,
                user = %user_id,
                notice = notice.kind(),
                "delivered notice"
            ),
            Err(error) => warn!(
                channel = %channel_id,
                user = %user_id,
                notice = notice.kind(),
                error = %error,
                "failed to deliver notice"
            ),
        }
    }
}
