use anyhow::{Context, Result};
use serde::Deserialize;
use sweep_engine::MessageRef;

use super::slack_api_client::SlackMessage;
use super::SlackSocketEnvelope;

/// Invocation recognised from a Socket Mode envelope.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum SlackTrigger {
    Mention {
        channel_id: String,
        user_id: String,
        ts: String,
    },
    DeleteThread {
        channel_id: String,
        user_id: String,
        root: MessageRef,
    },
    SweepCommand {
        channel_id: String,
        user_id: String,
        command: String,
        text: String,
    },
}

impl SlackTrigger {
    pub(super) fn kind(&self) -> &'static str {
        match self {
            Self::Mention { .. } => "mention",
            Self::DeleteThread { .. } => "delete_thread",
            Self::SweepCommand { .. } => "sweep_command",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackInteractivePayload {
    #[serde(rename = "type")]
    payload_type: String,
    #[serde(default)]
    callback_id: Option<String>,
    #[serde(default)]
    user: Option<SlackIdRef>,
    #[serde(default)]
    channel: Option<SlackIdRef>,
    #[serde(default)]
    message: Option<SlackMessage>,
}

#[derive(Debug, Deserialize)]
struct SlackIdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SlackSlashCommandPayload {
    command: String,
    #[serde(default)]
    text: Option<String>,
    user_id: String,
    channel_id: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Maps an envelope to a trigger. Envelopes for other callbacks, commands or
/// event types, and events authored by the bot itself, yield `None`.
pub(super) fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
    shortcut_callback_id: &str,
    slash_command: &str,
) -> Result<Option<SlackTrigger>> {
    match envelope.envelope_type.as_str() {
        "events_api" => normalize_event_callback(envelope, bot_user_id),
        "interactive" => normalize_interactive(envelope, shortcut_callback_id),
        "slash_commands" => normalize_slash_command(envelope, slash_command),
        _ => Ok(None),
    }
}

fn normalize_event_callback(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
) -> Result<Option<SlackTrigger>> {
    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" || callback.event.event_type != "app_mention" {
        return Ok(None);
    }
    let event = callback.event;
    let Some(user_id) = non_empty(event.user) else {
        return Ok(None);
    };
    if user_id == bot_user_id {
        return Ok(None);
    }
    let (Some(channel_id), Some(ts)) = (non_empty(event.channel), non_empty(event.ts)) else {
        return Ok(None);
    };
    Ok(Some(SlackTrigger::Mention {
        channel_id,
        user_id,
        ts,
    }))
}

fn normalize_interactive(
    envelope: &SlackSocketEnvelope,
    shortcut_callback_id: &str,
) -> Result<Option<SlackTrigger>> {
    let payload = serde_json::from_value::<SlackInteractivePayload>(envelope.payload.clone())
        .context("failed to decode slack interactive payload")?;
    if payload.payload_type != "message_action"
        || payload.callback_id.as_deref() != Some(shortcut_callback_id)
    {
        return Ok(None);
    }
    let (Some(user), Some(channel), Some(message)) =
        (payload.user, payload.channel, payload.message)
    else {
        return Ok(None);
    };
    if user.id.trim().is_empty() || channel.id.trim().is_empty() || message.ts.trim().is_empty() {
        return Ok(None);
    }
    let root = message.into_message_ref(&channel.id);
    Ok(Some(SlackTrigger::DeleteThread {
        channel_id: channel.id,
        user_id: user.id,
        root,
    }))
}

fn normalize_slash_command(
    envelope: &SlackSocketEnvelope,
    slash_command: &str,
) -> Result<Option<SlackTrigger>> {
    let payload = serde_json::from_value::<SlackSlashCommandPayload>(envelope.payload.clone())
        .context("failed to decode slack slash command payload")?;
    if payload.command.trim() != slash_command {
        return Ok(None);
    }
    Ok(Some(SlackTrigger::SweepCommand {
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        command: payload.command.trim().to_string(),
        text: payload.text.unwrap_or_default().trim().to_string(),
    }))
}
