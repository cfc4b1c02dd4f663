//! Scripted in-memory collaborator used by engine unit tests.

use std::{collections::HashMap, sync::Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::api::{ApiError, HistoryQuery, ModerationApi};
use crate::types::{CredentialTier, MessageRef, UserRoles};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    UserRoles {
        user_id: String,
    },
    ThreadReplies {
        root_ts: String,
        tier: CredentialTier,
    },
    Delete {
        ts: String,
        tier: CredentialTier,
    },
    History {
        oldest_ts: String,
        inclusive: bool,
        tier: CredentialTier,
    },
    Ephemeral {
        user_id: String,
        text: String,
    },
}

#[derive(Debug, Clone)]
enum ScriptedFailure {
    Slack(String),
    Transport(String),
}

impl ScriptedFailure {
    fn to_error(&self, operation: &'static str) -> ApiError {
        match self {
            Self::Slack(code) => ApiError::slack(operation, code),
            Self::Transport(message) => ApiError::Transport(anyhow!(message.clone())),
        }
    }
}

#[derive(Default)]
pub(crate) struct ScriptedModerationApi {
    elevated_configured: bool,
    roles: HashMap<String, UserRoles>,
    threads: HashMap<String, Result<Vec<MessageRef>, ScriptedFailure>>,
    delete_errors: HashMap<String, ScriptedFailure>,
    inclusive_history: Vec<MessageRef>,
    exclusive_history: Vec<MessageRef>,
    history_failure: Option<ScriptedFailure>,
    ephemeral_failure: bool,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedModerationApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_elevated_credential(mut self) -> Self {
        self.elevated_configured = true;
        self
    }

    pub(crate) fn with_roles(mut self, user_id: &str, roles: UserRoles) -> Self {
        self.roles.insert(user_id.to_string(), roles);
        self
    }

    pub(crate) fn with_admin(self, user_id: &str) -> Self {
        self.with_roles(
            user_id,
            UserRoles {
                is_admin: true,
                ..UserRoles::default()
            },
        )
    }

    pub(crate) fn with_member(self, user_id: &str) -> Self {
        self.with_roles(user_id, UserRoles::default())
    }

    pub(crate) fn with_thread(mut self, root: &MessageRef, messages: Vec<MessageRef>) -> Self {
        self.threads.insert(root.ts.clone(), Ok(messages));
        self
    }

    pub(crate) fn with_failing_thread(mut self, root: &MessageRef, code: &str) -> Self {
        self.threads
            .insert(root.ts.clone(), Err(ScriptedFailure::Slack(code.to_string())));
        self
    }

    pub(crate) fn with_delete_error(mut self, ts: &str, code: &str) -> Self {
        self.delete_errors
            .insert(ts.to_string(), ScriptedFailure::Slack(code.to_string()));
        self
    }

    pub(crate) fn with_delete_transport_error(mut self, ts: &str, message: &str) -> Self {
        self.delete_errors
            .insert(ts.to_string(), ScriptedFailure::Transport(message.to_string()));
        self
    }

    pub(crate) fn with_history(
        mut self,
        inclusive: Vec<MessageRef>,
        exclusive: Vec<MessageRef>,
    ) -> Self {
        self.inclusive_history = inclusive;
        self.exclusive_history = exclusive;
        self
    }

    pub(crate) fn with_failing_history(mut self, message: &str) -> Self {
        self.history_failure = Some(ScriptedFailure::Transport(message.to_string()));
        self
    }

    pub(crate) fn with_failing_ephemeral(mut self) -> Self {
        self.ephemeral_failure = true;
        self
    }

    fn record(&self, call: ApiCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Delete { ts, .. } => Some(ts),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ephemeral_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Ephemeral { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ModerationApi for ScriptedModerationApi {
    fn elevated_credential_configured(&self) -> bool {
        self.elevated_configured
    }

    async fn get_user_roles(&self, user_id: &str) -> Result<UserRoles, ApiError> {
        self.record(ApiCall::UserRoles {
            user_id: user_id.to_string(),
        });
        self.roles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::slack("users.info", "user_not_found"))
    }

    async fn list_thread_replies(
        &self,
        _channel_id: &str,
        root_ts: &str,
        tier: CredentialTier,
    ) -> Result<Vec<MessageRef>, ApiError> {
        self.record(ApiCall::ThreadReplies {
            root_ts: root_ts.to_string(),
            tier,
        });
        match self.threads.get(root_ts) {
            Some(Ok(messages)) => Ok(messages.clone()),
            Some(Err(failure)) => Err(failure.to_error("conversations.replies")),
            None => Ok(Vec::new()),
        }
    }

    async fn delete_message(
        &self,
        _channel_id: &str,
        ts: &str,
        tier: CredentialTier,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::Delete {
            ts: ts.to_string(),
            tier,
        });
        match self.delete_errors.get(ts) {
            Some(failure) => Err(failure.to_error("chat.delete")),
            None => Ok(()),
        }
    }

    async fn list_channel_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<MessageRef>, ApiError> {
        self.record(ApiCall::History {
            oldest_ts: query.oldest_ts.clone(),
            inclusive: query.inclusive,
            tier: query.tier,
        });
        if let Some(failure) = &self.history_failure {
            return Err(failure.to_error("conversations.history"));
        }
        let messages = if query.inclusive {
            &self.inclusive_history
        } else {
            &self.exclusive_history
        };
        Ok(messages.iter().take(query.limit).cloned().collect())
    }

    async fn notify_user_ephemeral(
        &self,
        _channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::Ephemeral {
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
        if self.ephemeral_failure {
            return Err(ApiError::slack("chat.postEphemeral", "channel_not_found"));
        }
        Ok(())
    }
}
