//! Thread-aware bulk deletion engine for the threadsweep moderation bot.
//!
//! The engine resolves a deletion scope (one thread, or a channel time window)
//! into concrete messages, applies the per-message permission policy, deletes
//! what it may and folds the per-message outcomes into user-facing notices.
//! Everything it needs from the chat platform goes through [`ModerationApi`].

pub mod api;
pub mod deletion_executor;
pub mod orchestrator;
pub mod permissions;
pub mod report;
pub mod thread_resolver;
pub mod time_window;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, HistoryQuery, ModerationApi, SlackErrorKind};
pub use deletion_executor::delete_message;
pub use orchestrator::{
    BulkDeletionOrchestrator, CandidateFilter, OrchestratorConfig, ThreadDeletionReport,
    ThreadTerminal, TimeWindowRequest, WindowDeletionReport, WindowTerminal,
};
pub use permissions::{
    can_delete, has_base_right, needs_configuration_warning, select_credential_tier,
};
pub use report::{deliver_notices, render_notice, time_window_usage, UserNotice, WindowFailureCause};
pub use thread_resolver::{deletion_order, resolve_thread, LookupError};
pub use time_window::{cutoff_timestamp, parse_time_window, ParseError, DEFAULT_CUTOFF_GRACE};
pub use types::{
    BatchResult, CredentialTier, DeletionOutcome, MessageRef, PrivilegeTier, Requester, Scope,
    UserRoles,
};
