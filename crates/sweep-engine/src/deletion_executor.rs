//! Single-message deletion with outcome classification.

use tracing::{debug, info, warn};

use crate::api::{ModerationApi, SlackErrorKind};
use crate::types::{CredentialTier, DeletionOutcome, MessageRef};

/// Deletes one message and classifies the result. Never retries: a failure is
/// final for this message within the current run.
pub async fn delete_message(
    api: &dyn ModerationApi,
    message: &MessageRef,
    tier: CredentialTier,
) -> DeletionOutcome {
    match api
        .delete_message(&message.channel_id, &message.ts, tier)
        .await
    {
        Ok(()) => {
            debug!(
                channel = %message.channel_id,
                ts = %message.ts,
                tier = tier.as_str(),
                "deleted message"
            );
            DeletionOutcome::Deleted
        }
        Err(error) if error.slack_kind() == Some(&SlackErrorKind::CantDeleteMessage) => {
            info!(
                channel = %message.channel_id,
                ts = %message.ts,
                tier = tier.as_str(),
                "message cannot be deleted: missing permission or too old"
            );
            DeletionOutcome::SkippedTooOld
        }
        Err(error) => {
            warn!(
                channel = %message.channel_id,
                ts = %message.ts,
                tier = tier.as_str(),
                error = %error,
                "failed to delete message"
            );
            DeletionOutcome::FailedOther(error.to_string())
        }
    }
}
