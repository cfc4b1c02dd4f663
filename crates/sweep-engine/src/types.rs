//! Value types shared by the deletion engine components.

use std::fmt;

/// Role flags and display name reported by the platform for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRoles {
    pub is_admin: bool,
    pub is_owner: bool,
    pub is_primary_owner: bool,
    pub display_name: Option<String>,
}

/// Privilege level derived from [`UserRoles`]; the highest flag wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeTier {
    Member,
    Admin,
    Owner,
    PrimaryOwner,
}

impl PrivilegeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::PrimaryOwner => "primary_owner",
        }
    }
}

/// The user who triggered an invocation. Fixed for the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: String,
    pub roles: UserRoles,
}

impl Requester {
    pub fn new(id: impl Into<String>, roles: UserRoles) -> Self {
        Self {
            id: id.into(),
            roles,
        }
    }

    /// Requester with no elevated flags, used when role lookup fails.
    pub fn member(id: impl Into<String>) -> Self {
        Self::new(id, UserRoles::default())
    }

    pub fn privilege_tier(&self) -> PrivilegeTier {
        if self.roles.is_primary_owner {
            PrivilegeTier::PrimaryOwner
        } else if self.roles.is_owner {
            PrivilegeTier::Owner
        } else if self.roles.is_admin {
            PrivilegeTier::Admin
        } else {
            PrivilegeTier::Member
        }
    }

    pub fn has_elevated_rights(&self) -> bool {
        self.roles.is_admin || self.roles.is_owner || self.roles.is_primary_owner
    }
}

/// Which platform credential a deletion is performed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTier {
    /// The bot's own token: own messages and automated-author messages only.
    Standard,
    /// A delegated user token that can delete messages from anyone.
    Elevated,
}

impl CredentialTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Elevated => "elevated",
        }
    }
}

/// Reference to one message in a channel. `ts` is unique within the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub ts: String,
    pub author_id: Option<String>,
    pub is_automated_author: bool,
    pub subtype: Option<String>,
    pub text_preview: String,
}

pub const TOMBSTONE_SUBTYPE: &str = "tombstone";

impl MessageRef {
    pub fn new(channel_id: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            ts: ts.into(),
            author_id: None,
            is_automated_author: false,
            subtype: None,
            text_preview: String::new(),
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    pub fn with_automated_author(mut self) -> Self {
        self.is_automated_author = true;
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_text_preview(mut self, text_preview: impl Into<String>) -> Self {
        self.text_preview = text_preview.into();
        self
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id.as_deref() == Some(user_id)
    }

    pub fn is_tombstone(&self) -> bool {
        self.subtype.as_deref() == Some(TOMBSTONE_SUBTYPE)
    }
}

/// What a single invocation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    SingleThread(MessageRef),
    TimeWindow { channel_id: String, cutoff_ts: String },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleThread(root) => write!(f, "thread {}/{}", root.channel_id, root.ts),
            Self::TimeWindow {
                channel_id,
                cutoff_ts,
            } => write!(f, "window {channel_id} since {cutoff_ts}"),
        }
    }
}

/// Result of attempting to delete one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    SkippedPermission,
    SkippedTooOld,
    FailedOther(String),
}

impl DeletionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::SkippedPermission => "skipped_permission",
            Self::SkippedTooOld => "skipped_too_old",
            Self::FailedOther(_) => "failed_other",
        }
    }
}

/// Per-outcome counts for one batch of deletion attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub considered: usize,
    pub deleted: usize,
    pub skipped_permission: usize,
    pub skipped_too_old: usize,
    pub failed_other: usize,
}

impl BatchResult {
    pub fn record(&mut self, outcome: &DeletionOutcome) {
        self.considered = self.considered.saturating_add(1);
        let counter = match outcome {
            DeletionOutcome::Deleted => &mut self.deleted,
            DeletionOutcome::SkippedPermission => &mut self.skipped_permission,
            DeletionOutcome::SkippedTooOld => &mut self.skipped_too_old,
            DeletionOutcome::FailedOther(_) => &mut self.failed_other,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn merge(&mut self, other: &BatchResult) {
        self.considered = self.considered.saturating_add(other.considered);
        self.deleted = self.deleted.saturating_add(other.deleted);
        self.skipped_permission = self
            .skipped_permission
            .saturating_add(other.skipped_permission);
        self.skipped_too_old = self.skipped_too_old.saturating_add(other.skipped_too_old);
        self.failed_other = self.failed_other.saturating_add(other.failed_other);
    }

    pub fn failures(&self) -> usize {
        self.skipped_permission
            .saturating_add(self.skipped_too_old)
            .saturating_add(self.failed_other)
    }

    /// True when nothing was deleted but at least one message was attempted.
    pub fn is_total_failure(&self) -> bool {
        self.deleted == 0 && self.failures() > 0
    }

    /// True when every failure in the batch was a permission skip.
    pub fn failures_are_permission_only(&self) -> bool {
        self.skipped_permission > 0 && self.skipped_too_old == 0 && self.failed_other == 0
    }
}
