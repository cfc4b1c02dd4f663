//! Deletion rights of a requester over individual messages.

use crate::types::{CredentialTier, MessageRef, Requester};

/// Elevated credential only when the requester holds elevated rights and the
/// delegated credential was configured; the bot credential otherwise.
pub fn select_credential_tier(requester: &Requester, elevated_configured: bool) -> CredentialTier {
    if requester.has_elevated_rights() && elevated_configured {
        CredentialTier::Elevated
    } else {
        CredentialTier::Standard
    }
}

/// Elevated requesters whose rights cannot be exercised because the delegated
/// credential is missing. They run with standard rights and get one warning.
pub fn needs_configuration_warning(requester: &Requester, elevated_configured: bool) -> bool {
    requester.has_elevated_rights() && !elevated_configured
}

/// Entry check for a thread deletion request: own root, or elevated rights.
pub fn has_base_right(requester: &Requester, root: &MessageRef) -> bool {
    root.is_authored_by(&requester.id) || requester.has_elevated_rights()
}

/// Whether `message` may be deleted by `requester` using the credential `tier`.
///
/// The elevated credential acts as the workspace itself, so authorship is
/// irrelevant there. The bot credential can only remove the requester's own
/// messages and messages from automated authors.
pub fn can_delete(requester: &Requester, message: &MessageRef, tier: CredentialTier) -> bool {
    match tier {
        CredentialTier::Elevated => requester.has_elevated_rights(),
        CredentialTier::Standard => {
            message.is_authored_by(&requester.id) || message.is_automated_author
        }
    }
}
