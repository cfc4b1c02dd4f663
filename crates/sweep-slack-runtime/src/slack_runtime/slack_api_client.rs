//! Slack Web API client used by the socket loop and the deletion engine.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sweep_core::preview_text;
use sweep_engine::{ApiError, CredentialTier, HistoryQuery, MessageRef, ModerationApi, UserRoles};

use super::slack_retry::{
    is_rate_limited_body, retry_after_hint, RetrySignal, SlackRetryPolicy, RETRY_ATTEMPT_HEADER,
};

const SLACK_MAX_PAGE_SIZE: usize = 200;
const SLACK_MAX_PAGES: usize = 50;
const MESSAGE_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackAckResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUsersInfoResponse {
    ok: bool,
    user: Option<SlackUser>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    is_owner: bool,
    #[serde(default)]
    is_primary_owner: bool,
    #[serde(default)]
    profile: Option<SlackUserProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackUserProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

impl SlackUser {
    fn display_name(&self) -> Option<String> {
        let profile = self.profile.clone().unwrap_or_default();
        [
            self.real_name.clone(),
            profile.real_name,
            profile.display_name,
            self.name.clone(),
        ]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
    }

    fn into_roles(self) -> UserRoles {
        UserRoles {
            display_name: self.display_name(),
            is_admin: self.is_admin,
            is_owner: self.is_owner,
            is_primary_owner: self.is_primary_owner,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SlackMessagesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    response_metadata: Option<SlackResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl SlackMessagesResponse {
    fn next_cursor(&self) -> Option<String> {
        self.response_metadata
            .as_ref()
            .and_then(|metadata| metadata.next_cursor.as_deref())
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string)
    }
}

/// Message object as it appears in history, replies and interactive payloads.
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct SlackMessage {
    pub(super) ts: String,
    #[serde(default)]
    pub(super) user: Option<String>,
    #[serde(default)]
    pub(super) bot_id: Option<String>,
    #[serde(default)]
    pub(super) subtype: Option<String>,
    #[serde(default)]
    pub(super) text: Option<String>,
}

impl SlackMessage {
    pub(super) fn into_message_ref(self, channel_id: &str) -> MessageRef {
        let is_automated_author =
            self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message");
        MessageRef {
            channel_id: channel_id.to_string(),
            ts: self.ts,
            author_id: self.user.filter(|user| !user.trim().is_empty()),
            is_automated_author,
            subtype: self.subtype,
            text_preview: preview_text(self.text.as_deref().unwrap_or_default(), MESSAGE_PREVIEW_CHARS),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct SlackPostedMessage {
    pub(super) channel: String,
    pub(super) ts: String,
}

/// Tokens read once at startup. `user_token` is the optional delegated
/// credential that allows deleting other users' messages.
#[derive(Clone)]
pub struct SlackCredentials {
    pub app_token: String,
    pub bot_token: String,
    pub user_token: Option<String>,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
    user_token: Option<String>,
    retry: SlackRetryPolicy,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        credentials: SlackCredentials,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("threadsweep-slack-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: credentials.app_token.trim().to_string(),
            bot_token: credentials.bot_token.trim().to_string(),
            user_token: credentials
                .user_token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            retry: SlackRetryPolicy::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    fn token_for(&self, tier: CredentialTier) -> &str {
        match (tier, self.user_token.as_deref()) {
            (CredentialTier::Elevated, Some(user_token)) => user_token,
            _ => &self.bot_token,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json(
                "auth.test",
                || self.http.post(self.endpoint("auth.test")).bearer_auth(&self.bot_token),
            )
            .await?;

        if !response.ok {
            bail!(
                "slack auth.test failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    pub(super) async fn open_socket_connection(&self) -> Result<String> {
        let response: SlackOpenSocketResponse = self
            .request_json(
                "apps.connections.open",
                || {
                    self.http
                        .post(self.endpoint("apps.connections.open"))
                        .bearer_auth(&self.app_token)
                },
            )
            .await?;
        if !response.ok {
            bail!(
                "slack apps.connections.open failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub(super) async fn post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<SlackPostedMessage> {
        let payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });

        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                || {
                    self.http
                        .post(self.endpoint("chat.postMessage"))
                        .bearer_auth(&self.bot_token)
                        .json(&payload)
                },
            )
            .await?;

        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    async fn collect_messages(
        &self,
        operation: &'static str,
        channel_id: &str,
        base_params: Vec<(&'static str, String)>,
        token: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageRef>, ApiError> {
        let limit = limit.map(|limit| limit.max(1));
        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..SLACK_MAX_PAGES {
            let page_size = match limit {
                Some(limit) => limit.saturating_sub(collected.len()).min(SLACK_MAX_PAGE_SIZE),
                None => SLACK_MAX_PAGE_SIZE,
            };
            if page_size == 0 {
                break;
            }
            let mut params = base_params.clone();
            params.push(("limit", page_size.to_string()));
            if let Some(cursor) = cursor.as_ref() {
                params.push(("cursor", cursor.clone()));
            }

            let response: SlackMessagesResponse = self
                .request_json(
                    operation,
                    || {
                        self.http
                            .post(self.endpoint(operation))
                            .bearer_auth(token)
                            .form(&params)
                    },
                )
                .await?;
            if !response.ok {
                return Err(ApiError::slack(
                    operation,
                    response.error.as_deref().unwrap_or_default(),
                ));
            }
            cursor = response.next_cursor();
            collected.extend(
                response
                    .messages
                    .into_iter()
                    .map(|message| message.into_message_ref(channel_id)),
            );
            if cursor.is_none() {
                break;
            }
        }
        if cursor.is_some() && limit.map_or(true, |limit| collected.len() < limit) {
            tracing::warn!(
                operation,
                channel_id,
                collected = collected.len(),
                max_pages = SLACK_MAX_PAGES,
                "slack pagination stopped at page ceiling with more results pending"
            );
        }
        if let Some(limit) = limit {
            collected.truncate(limit);
        }
        Ok(collected)
    }

    async fn request_ack(
        &self,
        operation: &'static str,
        token: &str,
        payload: &Value,
    ) -> Result<(), ApiError> {
        let response: SlackAckResponse = self
            .request_json(
                operation,
                || {
                    self.http
                        .post(self.endpoint(operation))
                        .bearer_auth(token)
                        .json(payload)
                },
            )
            .await?;
        if response.ok {
            Ok(())
        } else {
            Err(ApiError::slack(
                operation,
                response.error.as_deref().unwrap_or_default(),
            ))
        }
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let decode = |body: Value| {
            serde_json::from_value::<T>(body)
                .with_context(|| format!("failed to decode slack {operation}"))
        };
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let sent = builder()
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            let signal = match sent {
                Ok(response) if response.status().is_success() => {
                    let retry_after = retry_after_hint(response.headers());
                    let body = response
                        .json::<Value>()
                        .await
                        .with_context(|| format!("failed to decode slack {operation}"))?;
                    if !is_rate_limited_body(&body) {
                        return decode(body);
                    }
                    RetrySignal::RateLimited { retry_after, body }
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = retry_after_hint(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    RetrySignal::Status {
                        status,
                        retry_after,
                        body,
                    }
                }
                Err(error) => RetrySignal::Transport(error),
            };

            match self.retry.delay_after(attempt, &signal) {
                Some(delay) => {
                    tracing::debug!(
                        operation,
                        attempt,
                        reason = signal.label(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying slack api request"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return match signal {
                        RetrySignal::RateLimited { body, .. } => decode(body),
                        other => Err(other.into_error(operation)),
                    };
                }
            }
        }
    }
}

#[async_trait]
impl ModerationApi for SlackApiClient {
    fn elevated_credential_configured(&self) -> bool {
        self.user_token.is_some()
    }

    async fn get_user_roles(&self, user_id: &str) -> Result<UserRoles, ApiError> {
        let operation = "users.info";
        let params = [("user", user_id.to_string())];
        let response: SlackUsersInfoResponse = self
            .request_json(
                operation,
                || {
                    self.http
                        .post(self.endpoint(operation))
                        .bearer_auth(&self.bot_token)
                        .form(&params)
                },
            )
            .await?;
        if !response.ok {
            return Err(ApiError::slack(
                operation,
                response.error.as_deref().unwrap_or_default(),
            ));
        }
        let user = response.user.ok_or_else(|| ApiError::Decode {
            operation,
            detail: "response missing user".to_string(),
        })?;
        Ok(user.into_roles())
    }

    async fn list_thread_replies(
        &self,
        channel_id: &str,
        root_ts: &str,
        tier: CredentialTier,
    ) -> Result<Vec<MessageRef>, ApiError> {
        self.collect_messages(
            "conversations.replies",
            channel_id,
            vec![
                ("channel", channel_id.to_string()),
                ("ts", root_ts.to_string()),
            ],
            self.token_for(tier),
            None,
        )
        .await
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        ts: &str,
        tier: CredentialTier,
    ) -> Result<(), ApiError> {
        self.request_ack(
            "chat.delete",
            self.token_for(tier),
            &json!({ "channel": channel_id, "ts": ts }),
        )
        .await
    }

    async fn list_channel_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<MessageRef>, ApiError> {
        self.collect_messages(
            "conversations.history",
            &query.channel_id,
            vec![
                ("channel", query.channel_id.clone()),
                ("oldest", query.oldest_ts.clone()),
                ("inclusive", query.inclusive.to_string()),
            ],
            self.token_for(query.tier),
            Some(query.limit),
        )
        .await
    }

    async fn notify_user_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ApiError> {
        self.request_ack(
            "chat.postEphemeral",
            &self.bot_token,
            &json!({ "channel": channel_id, "user": user_id, "text": text }),
        )
        .await
    }
}
