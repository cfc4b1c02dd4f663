//! Thread and time-window deletion flows built on the engine primitives.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::{ApiError, HistoryQuery, ModerationApi};
use crate::deletion_executor::delete_message;
use crate::permissions::{
    can_delete, has_base_right, needs_configuration_warning, select_credential_tier,
};
use crate::report::{UserNotice, WindowFailureCause};
use crate::thread_resolver::{deletion_order, resolve_thread, LookupError};
use crate::time_window::{cutoff_timestamp, parse_time_window, DEFAULT_CUTOFF_GRACE};
use crate::types::{BatchResult, CredentialTier, DeletionOutcome, MessageRef, Requester, Scope};

const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Which history messages a window sweep may delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateFilter {
    /// Only `tombstone` stubs left behind by deleted thread parents.
    #[default]
    TombstonesOnly,
    AllMessages,
}

impl CandidateFilter {
    pub fn admits(&self, message: &MessageRef) -> bool {
        match self {
            Self::TombstonesOnly => message.is_tombstone(),
            Self::AllMessages => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub history_limit: usize,
    pub candidate_filter: CandidateFilter,
    pub cutoff_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            candidate_filter: CandidateFilter::default(),
            cutoff_grace: DEFAULT_CUTOFF_GRACE,
        }
    }
}

/// Final state of a single-thread deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadTerminal {
    /// Requester had no right over the root; nothing was touched.
    Denied,
    /// Thread lookup failed and only the root was attempted.
    FallbackSingleDelete,
    FilterAndDeleteEach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDeletionReport {
    pub scope: Scope,
    pub requester: Requester,
    pub tier: CredentialTier,
    pub terminal: ThreadTerminal,
    pub batch: BatchResult,
    pub notices: Vec<UserNotice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindowRequest {
    pub requester_id: String,
    pub channel_id: String,
    pub period_text: String,
    /// Command name as typed by the user, e.g. `/sweep`.
    pub command: String,
    /// Timestamp of the message that carried the command, when there is one.
    pub echo_ts: Option<String>,
}

impl TimeWindowRequest {
    fn invocation_text(&self) -> String {
        format!("{} {}", self.command.trim(), self.period_text.trim())
    }

    fn is_echo(&self, message: &MessageRef) -> bool {
        if self.echo_ts.as_deref() == Some(message.ts.as_str()) {
            return true;
        }
        message.text_preview.trim() == self.invocation_text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTerminal {
    UsageRequested,
    InvalidPeriod,
    HistoryUnavailable,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDeletionReport {
    pub scope: Option<Scope>,
    pub requester: Option<Requester>,
    pub tier: Option<CredentialTier>,
    pub terminal: WindowTerminal,
    /// History messages that passed the candidate filter.
    pub candidates: usize,
    /// History messages of other kinds; not failures.
    pub skipped_ineligible: usize,
    pub batch: BatchResult,
    pub notices: Vec<UserNotice>,
}

impl WindowDeletionReport {
    fn terminated_early(terminal: WindowTerminal, notice: UserNotice) -> Self {
        Self {
            scope: None,
            requester: None,
            tier: None,
            terminal,
            candidates: 0,
            skipped_ineligible: 0,
            batch: BatchResult::default(),
            notices: vec![notice],
        }
    }
}

enum ThreadStep {
    PermissionCheck,
    ResolveThread,
    FallbackSingleDelete(LookupError),
    FilterAndDeleteEach(Vec<MessageRef>),
    Finished(ThreadTerminal),
}

struct ThreadRun {
    terminal: ThreadTerminal,
    batch: BatchResult,
    fallback_outcome: Option<DeletionOutcome>,
}

/// Drives resolve-then-delete passes against an injected platform client.
/// Holds no state between invocations.
pub struct BulkDeletionOrchestrator {
    api: Arc<dyn ModerationApi>,
    config: OrchestratorConfig,
    clock: fn() -> DateTime<Utc>,
}

impl BulkDeletionOrchestrator {
    pub fn new(api: Arc<dyn ModerationApi>, config: OrchestratorConfig) -> Self {
        Self {
            api,
            config,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn api(&self) -> &dyn ModerationApi {
        self.api.as_ref()
    }

    /// Looks up the requester's roles. A failed lookup degrades to member
    /// rights rather than aborting the invocation.
    pub async fn resolve_requester(&self, user_id: &str) -> Requester {
        match self.api.get_user_roles(user_id).await {
            Ok(roles) => {
                let requester = Requester::new(user_id, roles);
                debug!(
                    user = %user_id,
                    privilege = requester.privilege_tier().as_str(),
                    "resolved requester roles"
                );
                requester
            }
            Err(error) => {
                warn!(
                    user = %user_id,
                    error = %error,
                    "failed to look up requester roles; continuing with member rights"
                );
                Requester::member(user_id)
            }
        }
    }

    /// Deletes `root` and its replies on behalf of `requester_id`.
    pub async fn delete_thread(&self, requester_id: &str, root: MessageRef) -> ThreadDeletionReport {
        let requester = self.resolve_requester(requester_id).await;
        let tier =
            select_credential_tier(&requester, self.api.elevated_credential_configured());
        let mut notices = Vec::new();
        let run = self
            .run_thread_machine(&requester, &root, tier, ThreadStep::PermissionCheck, &mut notices)
            .await;

        match (&run.terminal, &run.fallback_outcome) {
            (ThreadTerminal::FallbackSingleDelete, Some(DeletionOutcome::SkippedTooOld))
            | (ThreadTerminal::FallbackSingleDelete, Some(DeletionOutcome::SkippedPermission)) => {
                notices.push(UserNotice::FallbackCantDelete);
            }
            (ThreadTerminal::FallbackSingleDelete, Some(DeletionOutcome::FailedOther(reason))) => {
                notices.push(UserNotice::FallbackFailed {
                    reason: reason.clone(),
                });
            }
            (ThreadTerminal::FilterAndDeleteEach, _) if run.batch.is_total_failure() => {
                notices.push(UserNotice::ThreadNothingDeleted);
            }
            _ => {}
        }

        info!(
            channel = %root.channel_id,
            root_ts = %root.ts,
            requester = %requester.id,
            tier = tier.as_str(),
            terminal = ?run.terminal,
            considered = run.batch.considered,
            deleted = run.batch.deleted,
            failed = run.batch.failures(),
            "thread deletion finished"
        );

        ThreadDeletionReport {
            scope: Scope::SingleThread(root),
            requester,
            tier,
            terminal: run.terminal,
            batch: run.batch,
            notices,
        }
    }

    /// Deletes eligible history messages newer than the requested period,
    /// each together with its thread.
    pub async fn delete_time_window(&self, request: &TimeWindowRequest) -> WindowDeletionReport {
        let period_text = request.period_text.trim();
        if period_text.is_empty() || period_text.eq_ignore_ascii_case("help") {
            return WindowDeletionReport::terminated_early(
                WindowTerminal::UsageRequested,
                UserNotice::Usage {
                    command: request.command.clone(),
                },
            );
        }
        let window = match parse_time_window(period_text) {
            Ok(window) => window,
            Err(error) => {
                info!(
                    channel = %request.channel_id,
                    requester = %request.requester_id,
                    error = %error,
                    "rejected time window request"
                );
                return WindowDeletionReport::terminated_early(
                    WindowTerminal::InvalidPeriod,
                    UserNotice::InvalidPeriod {
                        input: period_text.to_string(),
                        command: request.command.clone(),
                    },
                );
            }
        };

        let cutoff_ts = cutoff_timestamp(window, self.config.cutoff_grace, (self.clock)());
        let scope = Scope::TimeWindow {
            channel_id: request.channel_id.clone(),
            cutoff_ts: cutoff_ts.clone(),
        };
        let requester = self.resolve_requester(&request.requester_id).await;
        let elevated_configured = self.api.elevated_credential_configured();
        let tier = select_credential_tier(&requester, elevated_configured);
        let mut notices = Vec::new();
        if needs_configuration_warning(&requester, elevated_configured) {
            notices.push(UserNotice::ConfigurationWarning);
        }

        let history = match self
            .fetch_window_history(&request.channel_id, &cutoff_ts, tier)
            .await
        {
            Ok(history) => history,
            Err(error) => {
                warn!(
                    channel = %request.channel_id,
                    error = %error,
                    "failed to fetch channel history"
                );
                notices.push(UserNotice::ApiFailure {
                    operation: "fetching channel history".to_string(),
                });
                return WindowDeletionReport {
                    scope: Some(scope),
                    requester: Some(requester),
                    tier: Some(tier),
                    terminal: WindowTerminal::HistoryUnavailable,
                    candidates: 0,
                    skipped_ineligible: 0,
                    batch: BatchResult::default(),
                    notices,
                };
            }
        };

        let mut candidates = 0_usize;
        let mut skipped_ineligible = 0_usize;
        let mut batch = BatchResult::default();
        for message in history.into_iter().filter(|message| !request.is_echo(message)) {
            if !self.config.candidate_filter.admits(&message) {
                skipped_ineligible = skipped_ineligible.saturating_add(1);
                continue;
            }
            candidates = candidates.saturating_add(1);
            let run = self
                .run_thread_machine(
                    &requester,
                    &message,
                    tier,
                    ThreadStep::ResolveThread,
                    &mut notices,
                )
                .await;
            batch.merge(&run.batch);
        }

        if let Some(summary) = window_summary_notice(&requester, elevated_configured, &batch) {
            notices.push(summary);
        }

        info!(
            scope = %scope,
            requester = %requester.id,
            tier = tier.as_str(),
            candidates,
            skipped_ineligible,
            considered = batch.considered,
            deleted = batch.deleted,
            failed = batch.failures(),
            "time window deletion finished"
        );

        WindowDeletionReport {
            scope: Some(scope),
            requester: Some(requester),
            tier: Some(tier),
            terminal: WindowTerminal::Completed,
            candidates,
            skipped_ineligible,
            batch,
            notices,
        }
    }

    async fn fetch_window_history(
        &self,
        channel_id: &str,
        cutoff_ts: &str,
        tier: CredentialTier,
    ) -> Result<Vec<MessageRef>, ApiError> {
        let mut query = HistoryQuery {
            channel_id: channel_id.to_string(),
            oldest_ts: cutoff_ts.to_string(),
            inclusive: true,
            limit: self.config.history_limit.max(1),
            tier,
        };
        let messages = self.api.list_channel_history(&query).await?;
        if !messages.is_empty() {
            return Ok(messages);
        }
        // Inclusive lookups have been seen to return nothing at the boundary.
        debug!(channel = %channel_id, "inclusive history was empty; retrying exclusive");
        query.inclusive = false;
        self.api.list_channel_history(&query).await
    }

    async fn run_thread_machine(
        &self,
        requester: &Requester,
        root: &MessageRef,
        tier: CredentialTier,
        start: ThreadStep,
        notices: &mut Vec<UserNotice>,
    ) -> ThreadRun {
        let mut batch = BatchResult::default();
        let mut fallback_outcome = None;
        let mut step = start;
        loop {
            step = match step {
                ThreadStep::PermissionCheck => {
                    if !has_base_right(requester, root) {
                        info!(
                            channel = %root.channel_id,
                            root_ts = %root.ts,
                            requester = %requester.id,
                            "thread deletion denied"
                        );
                        notices.push(UserNotice::PermissionDenied);
                        ThreadStep::Finished(ThreadTerminal::Denied)
                    } else {
                        if needs_configuration_warning(
                            requester,
                            self.api.elevated_credential_configured(),
                        ) {
                            notices.push(UserNotice::ConfigurationWarning);
                        }
                        ThreadStep::ResolveThread
                    }
                }
                ThreadStep::ResolveThread => {
                    match resolve_thread(self.api.as_ref(), root, tier).await {
                        Ok(resolved) => {
                            ThreadStep::FilterAndDeleteEach(deletion_order(root, resolved))
                        }
                        Err(error) => ThreadStep::FallbackSingleDelete(error),
                    }
                }
                ThreadStep::FallbackSingleDelete(error) => {
                    warn!(error = %error, "thread lookup failed; deleting the root message only");
                    let outcome = self.delete_if_permitted(requester, root, tier).await;
                    batch.record(&outcome);
                    fallback_outcome = Some(outcome);
                    ThreadStep::Finished(ThreadTerminal::FallbackSingleDelete)
                }
                ThreadStep::FilterAndDeleteEach(messages) => {
                    for message in &messages {
                        let outcome = self.delete_if_permitted(requester, message, tier).await;
                        batch.record(&outcome);
                    }
                    ThreadStep::Finished(ThreadTerminal::FilterAndDeleteEach)
                }
                ThreadStep::Finished(terminal) => {
                    return ThreadRun {
                        terminal,
                        batch,
                        fallback_outcome,
                    };
                }
            };
        }
    }

    async fn delete_if_permitted(
        &self,
        requester: &Requester,
        message: &MessageRef,
        tier: CredentialTier,
    ) -> DeletionOutcome {
        if !can_delete(requester, message, tier) {
            debug!(
                channel = %message.channel_id,
                ts = %message.ts,
                author = message.author_id.as_deref().unwrap_or("unknown"),
                tier = tier.as_str(),
                "skipping message: insufficient permissions"
            );
            return DeletionOutcome::SkippedPermission;
        }
        delete_message(self.api.as_ref(), message, tier).await
    }
}

fn window_summary_notice(
    requester: &Requester,
    elevated_configured: bool,
    batch: &BatchResult,
) -> Option<UserNotice> {
    if batch.is_total_failure() {
        let cause = if !batch.failures_are_permission_only() {
            WindowFailureCause::TooOldOrNoPermission
        } else if needs_configuration_warning(requester, elevated_configured) {
            WindowFailureCause::ElevatedWithoutCredential
        } else if !requester.has_elevated_rights() {
            WindowFailureCause::InsufficientRights
        } else {
            WindowFailureCause::TooOldOrNoPermission
        };
        return Some(UserNotice::WindowNothingDeleted { cause });
    }
    if batch.deleted > 0 && batch.failures() >= batch.deleted {
        return Some(UserNotice::WindowPartial {
            deleted: batch.deleted,
            failed: batch.failures(),
        });
    }
    None
}
