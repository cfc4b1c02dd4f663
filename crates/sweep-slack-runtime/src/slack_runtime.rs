//! Socket Mode loop that turns Slack triggers into deletion runs.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use sweep_engine::{
    deliver_notices, BulkDeletionOrchestrator, MessageRef, ModerationApi, OrchestratorConfig,
    Requester, TimeWindowRequest,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

mod slack_api_client;
mod slack_envelope_cache;
mod slack_render_helpers;
mod slack_retry;
mod slack_trigger_helpers;

pub use slack_api_client::{SlackApiClient, SlackCredentials};

use slack_envelope_cache::ProcessedEnvelopeCache;
use slack_render_helpers::{render_role_greeting, PLAIN_GREETING};
use slack_trigger_helpers::{normalize_socket_envelope, SlackTrigger};

#[derive(Clone)]
/// Runtime configuration for the Socket Mode sweeper loop.
pub struct SlackSweepRuntimeConfig {
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub user_token: Option<String>,
    pub bot_user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_delay: Duration,
    pub processed_envelope_cap: usize,
    pub shortcut_callback_id: String,
    pub slash_command: String,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSocketEnvelope {
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionExit {
    Shutdown,
    Reconnect,
}

/// Connects to Slack and processes triggers until Ctrl-C.
pub async fn run_slack_sweeper(config: SlackSweepRuntimeConfig) -> Result<()> {
    let mut runtime = SlackSweepRuntime::new(config).await?;
    runtime.run().await
}

struct SlackSweepRuntime {
    config: SlackSweepRuntimeConfig,
    slack_client: Arc<SlackApiClient>,
    orchestrator: BulkDeletionOrchestrator,
    bot_user_id: String,
    processed: ProcessedEnvelopeCache,
}

impl SlackSweepRuntime {
    async fn new(config: SlackSweepRuntimeConfig) -> Result<Self> {
        let slack_client = Arc::new(SlackApiClient::new(
            config.api_base.clone(),
            SlackCredentials {
                app_token: config.app_token.clone(),
                bot_token: config.bot_token.clone(),
                user_token: config.user_token.clone(),
            },
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?);

        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => slack_client.resolve_bot_user_id().await?,
        };

        if !slack_client.elevated_credential_configured() {
            warn!("no slack user token configured; admins can only delete their own and bot messages");
        }

        let api: Arc<dyn ModerationApi> = slack_client.clone();
        let orchestrator = BulkDeletionOrchestrator::new(api, config.orchestrator.clone());
        let processed = ProcessedEnvelopeCache::new(config.processed_envelope_cap);

        Ok(Self {
            config,
            slack_client,
            orchestrator,
            bot_user_id,
            processed,
        })
    }

    async fn run(&mut self) -> Result<()> {
        let mut failure_streak = 0_usize;
        loop {
            let socket_url = match self.slack_client.open_socket_connection().await {
                Ok(url) => url,
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    warn!(failure_streak, error = %error, "failed to open slack socket connection");
                    if self.wait_before_reconnect().await {
                        return Ok(());
                    }
                    continue;
                }
            };

            info!(bot_user_id = %self.bot_user_id, "slack socket connected");
            match self.run_socket_session(&socket_url).await {
                Ok(SessionExit::Shutdown) => {
                    info!("slack sweeper shutdown requested");
                    return Ok(());
                }
                Ok(SessionExit::Reconnect) => {
                    failure_streak = 0;
                }
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    warn!(failure_streak, error = %error, "slack socket session error");
                }
            }

            if self.wait_before_reconnect().await {
                return Ok(());
            }
        }
    }

    /// Returns `true` when Ctrl-C arrived during the wait.
    async fn wait_before_reconnect(&self) -> bool {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("slack sweeper shutdown requested");
                true
            }
            _ = tokio::time::sleep(self.config.reconnect_delay) => false,
        }
    }

    async fn run_socket_session(&mut self, socket_url: &str) -> Result<SessionExit> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .with_context(|| "failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SessionExit::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionExit::Reconnect);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    if matches!(message, WsMessage::Close(_)) {
                        return Ok(SessionExit::Reconnect);
                    }
                    let Some(envelope) = parse_socket_envelope(message)? else {
                        continue;
                    };
                    match envelope.envelope_type.as_str() {
                        "hello" => {
                            debug!("slack socket hello received");
                            continue;
                        }
                        "disconnect" => {
                            info!(
                                reason = envelope.reason.as_deref().unwrap_or("unknown"),
                                "slack requested socket disconnect"
                            );
                            return Ok(SessionExit::Reconnect);
                        }
                        _ => {}
                    }
                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        self.ack_envelope(&mut sink, envelope_id).await?;
                    }
                    if let Err(error) = self.handle_envelope(envelope).await {
                        warn!(error = %error, "failed to handle slack envelope");
                    }
                }
            }
        }
    }

    async fn ack_envelope<S>(&self, sink: &mut S, envelope_id: &str) -> Result<()>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .context("failed to send slack socket ack")
    }

    async fn handle_envelope(&mut self, envelope: SlackSocketEnvelope) -> Result<()> {
        if let Some(envelope_id) = envelope.envelope_id.as_deref() {
            if self.processed.contains(envelope_id) {
                debug!(envelope_id, "skipping redelivered slack envelope");
                return Ok(());
            }
            self.processed.mark_processed(envelope_id);
        }

        let Some(trigger) = normalize_socket_envelope(
            &envelope,
            &self.bot_user_id,
            &self.config.shortcut_callback_id,
            &self.config.slash_command,
        )?
        else {
            debug!(envelope_type = %envelope.envelope_type, "ignoring slack envelope");
            return Ok(());
        };

        info!(
            trigger = trigger.kind(),
            processed_envelopes = self.processed.len(),
            "handling slack trigger"
        );
        match trigger {
            SlackTrigger::Mention {
                channel_id,
                user_id,
                ts,
            } => self.handle_mention(&channel_id, &user_id, &ts).await,
            SlackTrigger::DeleteThread {
                channel_id,
                user_id,
                root,
            } => {
                self.handle_delete_thread(&channel_id, &user_id, root).await;
                Ok(())
            }
            SlackTrigger::SweepCommand {
                channel_id,
                user_id,
                command,
                text,
            } => {
                self.handle_sweep_command(channel_id, user_id, command, text)
                    .await;
                Ok(())
            }
        }
    }

    async fn handle_mention(&self, channel_id: &str, user_id: &str, ts: &str) -> Result<()> {
        let greeting = match self.slack_client.get_user_roles(user_id).await {
            Ok(roles) => render_role_greeting(
                &Requester::new(user_id, roles),
                self.slack_client.elevated_credential_configured(),
            ),
            Err(error) => {
                warn!(user = %user_id, error = %error, "failed to look up mentioning user");
                PLAIN_GREETING.to_string()
            }
        };
        let posted = self
            .slack_client
            .post_message(channel_id, &greeting)
            .await?;
        debug!(
            channel = %posted.channel,
            mention_ts = %ts,
            reply_ts = %posted.ts,
            "posted mention greeting"
        );
        Ok(())
    }

    async fn handle_delete_thread(&self, channel_id: &str, user_id: &str, root: MessageRef) {
        let report = self.orchestrator.delete_thread(user_id, root).await;
        deliver_notices(self.orchestrator.api(), channel_id, user_id, &report.notices).await;
    }

    async fn handle_sweep_command(
        &self,
        channel_id: String,
        user_id: String,
        command: String,
        text: String,
    ) {
        let request = TimeWindowRequest {
            requester_id: user_id,
            channel_id,
            period_text: text,
            command,
            echo_ts: None,
        };
        let report = self.orchestrator.delete_time_window(&request).await;
        deliver_notices(
            self.orchestrator.api(),
            &request.channel_id,
            &request.requester_id,
            &report.notices,
        )
        .await;
    }
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_owned(),
        WsMessage::Binary(bytes) => {
            String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return Ok(None)
        }
    };
    let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
        .context("failed to parse slack socket envelope")?;
    Ok(Some(envelope))
}
