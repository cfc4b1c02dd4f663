use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use sweep_engine::{
    deliver_notices, BulkDeletionOrchestrator, CredentialTier, ModerationApi, OrchestratorConfig,
    TimeWindowRequest, UserNotice, WindowFailureCause, WindowTerminal,
};
use sweep_slack_runtime::{SlackApiClient, SlackCredentials};

fn fixed_clock() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .expect("valid timestamp")
}

fn slack_client(base_url: &str, user_token: Option<&str>) -> Arc<SlackApiClient> {
    Arc::new(
        SlackApiClient::new(
            base_url.to_string(),
            SlackCredentials {
                app_token: "xapp-it".to_string(),
                bot_token: "xoxb-it".to_string(),
                user_token: user_token.map(str::to_string),
            },
            2_000,
            2,
            1,
        )
        .expect("slack client"),
    )
}

fn orchestrator(client: Arc<SlackApiClient>) -> BulkDeletionOrchestrator {
    let api: Arc<dyn ModerationApi> = client;
    BulkDeletionOrchestrator::new(api, OrchestratorConfig::default()).with_clock(fixed_clock)
}

fn request(period: &str) -> TimeWindowRequest {
    TimeWindowRequest {
        requester_id: "UADMIN".to_string(),
        channel_id: "C1".to_string(),
        period_text: period.to_string(),
        command: "/sweep".to_string(),
        echo_ts: None,
    }
}

fn mock_admin(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/users.info").body_includes("user=UADMIN");
        then.status(200).json_body(json!({
            "ok": true,
            "user": {"id": "UADMIN", "real_name": "Admin", "is_admin": true}
        }));
    });
}

#[tokio::test]
async fn integration_admin_sweep_deletes_tombstoned_threads_with_user_token() {
    let server = MockServer::start();
    mock_admin(&server);
    let history = server.mock(|when, then| {
        when.method(POST)
            .path("/conversations.history")
            .header("authorization", "Bearer xoxp-it")
            .body_includes("oldest=1699992770.000000")
            .body_includes("inclusive=true");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": "1699999000.000200", "user": "U2", "text": "still here"},
                {"ts": "1699995000.000100", "user": "USLACKBOT", "subtype": "tombstone", "text": "This message was deleted."}
            ]
        }));
    });
    let replies = server.mock(|when, then| {
        when.method(POST)
            .path("/conversations.replies")
            .header("authorization", "Bearer xoxp-it")
            .body_includes("ts=1699995000.000100");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": "1699995000.000100", "user": "USLACKBOT", "subtype": "tombstone", "text": "This message was deleted."},
                {"ts": "1699995001.000000", "user": "U2", "text": "orphaned reply"}
            ]
        }));
    });
    let delete_reply = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.delete")
            .header("authorization", "Bearer xoxp-it")
            .body_includes("\"ts\":\"1699995001.000000\"");
        then.status(200).json_body(json!({"ok": true}));
    });
    let delete_root = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.delete")
            .header("authorization", "Bearer xoxp-it")
            .body_includes("\"ts\":\"1699995000.000100\"");
        then.status(200).json_body(json!({"ok": true}));
    });

    let client = slack_client(&server.base_url(), Some("xoxp-it"));
    let report = orchestrator(client).delete_time_window(&request("2H")).await;

    assert_eq!(report.terminal, WindowTerminal::Completed);
    assert_eq!(report.tier, Some(CredentialTier::Elevated));
    assert_eq!(report.candidates, 1);
    assert_eq!(report.skipped_ineligible, 1);
    assert_eq!(report.batch.deleted, 2);
    assert_eq!(report.batch.failures(), 0);
    assert!(report.notices.is_empty());
    assert_eq!(history.calls(), 1);
    assert_eq!(replies.calls(), 1);
    assert_eq!(delete_reply.calls(), 1);
    assert_eq!(delete_root.calls(), 1);
}

#[tokio::test]
async fn integration_admin_sweep_without_user_token_warns_once_and_deletes_nothing() {
    let server = MockServer::start();
    mock_admin(&server);
    let inclusive = server.mock(|when, then| {
        when.method(POST)
            .path("/conversations.history")
            .header("authorization", "Bearer xoxb-it")
            .body_includes("oldest=1699913570.000000")
            .body_includes("inclusive=true");
        then.status(200).json_body(json!({"ok": true, "messages": []}));
    });
    let exclusive = server.mock(|when, then| {
        when.method(POST)
            .path("/conversations.history")
            .body_includes("inclusive=false");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": "1699950000.000100", "user": "USLACKBOT", "subtype": "tombstone", "text": "This message was deleted."}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/conversations.replies");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": "1699950000.000100", "user": "USLACKBOT", "subtype": "tombstone", "text": "This message was deleted."},
                {"ts": "1699950002.000000", "user": "U2", "text": "reply"}
            ]
        }));
    });
    let delete = server.mock(|when, then| {
        when.method(POST).path("/chat.delete");
        then.status(200).json_body(json!({"ok": true}));
    });
    let ephemeral = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postEphemeral")
            .body_includes("\"user\":\"UADMIN\"");
        then.status(200).json_body(json!({"ok": true}));
    });

    let client = slack_client(&server.base_url(), None);
    let orchestrator = orchestrator(client);
    let report = orchestrator.delete_time_window(&request("1 day")).await;

    assert_eq!(report.tier, Some(CredentialTier::Standard));
    assert_eq!(report.batch.deleted, 0);
    assert_eq!(report.batch.skipped_permission, 2);
    assert_eq!(
        report.notices,
        vec![
            UserNotice::ConfigurationWarning,
            UserNotice::WindowNothingDeleted {
                cause: WindowFailureCause::ElevatedWithoutCredential,
            },
        ]
    );
    assert_eq!(inclusive.calls(), 1);
    assert_eq!(exclusive.calls(), 1);
    assert_eq!(delete.calls(), 0);

    deliver_notices(orchestrator.api(), "C1", "UADMIN", &report.notices).await;
    assert_eq!(ephemeral.calls(), 2);
}

#[tokio::test]
async fn integration_sweep_with_unparseable_period_makes_no_slack_calls() {
    let server = MockServer::start();
    let any_call = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({"ok": true}));
    });

    let client = slack_client(&server.base_url(), Some("xoxp-it"));
    let report = orchestrator(client).delete_time_window(&request("2 weeks")).await;

    assert_eq!(report.terminal, WindowTerminal::InvalidPeriod);
    assert!(matches!(
        report.notices.as_slice(),
        [UserNotice::InvalidPeriod { .. }]
    ));
    assert_eq!(any_call.calls(), 0);
}
