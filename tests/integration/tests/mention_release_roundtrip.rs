use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use mirrorbot_release::{ReleaseLookup, ReleaseLookupConfig};
use mirrorbot_slack_runtime::{
    InboundMessage, MirrorMessageHandler, ReplySender, DEFAULT_MENTION_KEYWORD,
};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

const BOT_USER_ID: &str = "UBOT";

#[derive(Default)]
struct RecordingSender {
    sent: AsyncMutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSender {
    fn failing() -> Self {
        Self {
            sent: AsyncMutex::new(Vec::new()),
            fail: true,
        }
    }

    async fn replies(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
        if self.fail {
            bail!("channel_not_found");
        }
        self.sent
            .lock()
            .await
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

fn handler_for(base_url: &str) -> MirrorMessageHandler {
    let lookup = ReleaseLookup::new(ReleaseLookupConfig {
        mirror_base_url: format!("{base_url}/pub/openshift-v4/clients/"),
        release_status_base_url: base_url.to_string(),
        request_timeout_ms: 3_000,
        ..ReleaseLookupConfig::default()
    })
    .expect("release lookup");
    MirrorMessageHandler::new(Arc::new(lookup), DEFAULT_MENTION_KEYWORD)
}

fn mention(text: &str) -> InboundMessage {
    InboundMessage {
        channel_id: "C-releases".to_string(),
        user_id: "U-human".to_string(),
        text: text.to_string(),
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 11, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn mock_mirror_folders(server: &MockServer, primary: &str, dev_preview: &str) {
    server.mock(|when, then| {
        when.method(GET).path("/pub/openshift-v4/clients/ocp/");
        then.status(200).body(primary);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/pub/openshift-v4/clients/ocp-dev-preview/");
        then.status(200).body(dev_preview);
    });
}

#[tokio::test]
async fn integration_mention_resolves_latest_release_across_folders_and_streams() {
    let server = MockServer::start();
    mock_mirror_folders(
        &server,
        concat!(
            r#"<a href="4.16.0-rc.3/">4.16.0-rc.3/</a>"#,
            r#"<a href="4.16.1/">4.16.1/</a>"#,
        ),
        r#"<a href="4.16.0-ec.5/">4.16.0-ec.5/</a>"#,
    );
    let dev_preview_status = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/releasestream/4-dev-preview/release/4.16.1");
        then.status(404).body("not found");
    });
    let stable_status = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/releasestream/4-stable/release/4.16.1");
        then.status(200).json_body(json!({
            "phase": "Accepted",
            "pullSpec": "quay.invalid/openshift-release-dev/ocp-release:4.16.1-x86_64",
            "changeLogJson": {
                "to": { "created": "2024-06-08T09:00:00Z" },
                "components": [
                    { "name": "Kubernetes", "version": "1.29.5" },
                    {
                        "name": "Red Hat Enterprise Linux CoreOS",
                        "version": "416.94.202406041234-0",
                        "from": "416.94.202405291527-0"
                    }
                ]
            },
            "results": {
                "informingJobs": {
                    "aws": { "state": "Succeeded" },
                    "gcp": { "state": "Succeeded" },
                    "metal": { "state": "Failed" },
                    "vsphere": { "state": "Pending" }
                }
            }
        }));
    });

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::default();
    let replied = handler
        .handle_message_at(
            &mention("@mirrorbot anything new for 4.16 today?"),
            BOT_USER_ID,
            &sender,
            fixed_now(),
        )
        .await
        .expect("handle mention");
    assert!(replied);

    let replies = sender.replies().await;
    assert_eq!(replies.len(), 1);
    let (channel, reply) = &replies[0];
    assert_eq!(channel, "C-releases");
    let expected = [
        "Latest 4.16 release in ocp: 4.16.1".to_string(),
        format!(
            "URL: {}/pub/openshift-v4/clients/ocp/4.16.1/",
            server.base_url()
        ),
        "Created: 3 days ago (2024-06-08T09:00:00Z)".to_string(),
        "Phase: Accepted (2 Pass / 1 Fail)".to_string(),
        "Kubernetes Version: <https://kubernetes.io/releases/#release-v1-29|1.29.5>".to_string(),
        "RHCOS Version: 416.94.202406041234-0 (416.94.202405291527-0)".to_string(),
        format!(
            "Click <{}/releasestream/4-stable/release/4.16.1|here> for release info",
            server.base_url()
        ),
        "Install: oc adm release extract --command=oc --from=quay.invalid/openshift-release-dev/ocp-release:4.16.1-x86_64".to_string(),
    ]
    .join("\n");
    assert_eq!(reply, &format!(">```{expected}```"));

    // status and detail each query both streams
    dev_preview_status.assert_calls(2);
    stable_status.assert_calls(2);
}

#[tokio::test]
async fn integration_mention_without_any_matching_release_reports_not_found() {
    let server = MockServer::start();
    mock_mirror_folders(
        &server,
        r#"<a href="4.15.2/">4.15.2/</a>"#,
        r#"<a href="4.17.0-ec.1/">4.17.0-ec.1/</a>"#,
    );

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::default();
    handler
        .handle_message_at(&mention("<@UBOT> 4.16"), BOT_USER_ID, &sender, fixed_now())
        .await
        .expect("handle mention");

    let replies = sender.replies().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1, "No releases found for 4.16");
}

#[tokio::test]
async fn integration_mirror_folder_outage_still_reports_other_folder() {
    let server = MockServer::start();
    let primary = server.mock(|when, then| {
        when.method(GET).path("/pub/openshift-v4/clients/ocp/");
        then.status(503).body("maintenance");
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/pub/openshift-v4/clients/ocp-dev-preview/");
        then.status(200).body(r#"<a href="4.16.0-ec.5/">x</a>"#);
    });

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::default();
    handler
        .handle_message_at(&mention("@MIRRORBOT 4.16"), BOT_USER_ID, &sender, fixed_now())
        .await
        .expect("handle mention");

    let replies = sender.replies().await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0]
        .1
        .starts_with(">```Latest 4.16 release in ocp-dev-preview: 4.16.0-ec.5\n"));
    primary.assert_calls(1);
}

#[tokio::test]
async fn integration_unreachable_mirror_reports_listing_error() {
    let lookup = ReleaseLookup::new(ReleaseLookupConfig {
        mirror_base_url: "http://127.0.0.1:9/pub/openshift-v4/clients/".to_string(),
        release_status_base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_ms: 1_000,
        ..ReleaseLookupConfig::default()
    })
    .expect("release lookup");
    let handler = MirrorMessageHandler::new(Arc::new(lookup), DEFAULT_MENTION_KEYWORD);
    let sender = RecordingSender::default();
    handler
        .handle_message_at(&mention("@mirrorbot 4.16"), BOT_USER_ID, &sender, fixed_now())
        .await
        .expect("handle mention");

    let replies = sender.replies().await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1.starts_with("Error fetching releases for 4.16: "));
}

#[tokio::test]
async fn integration_unresolved_status_still_replies_with_mirror_lines() {
    let server = MockServer::start();
    mock_mirror_folders(&server, "", r#"<a href="4.17.0-ec.2/">x</a>"#);

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::default();
    handler
        .handle_message_at(&mention("@mirrorbot 4.17"), BOT_USER_ID, &sender, fixed_now())
        .await
        .expect("handle mention");

    let replies = sender.replies().await;
    assert_eq!(
        replies[0].1,
        format!(
            ">```Latest 4.17 release in ocp-dev-preview: 4.17.0-ec.2\nURL: {}/pub/openshift-v4/clients/ocp-dev-preview/4.17.0-ec.2/```",
            server.base_url()
        )
    );
}

#[tokio::test]
async fn integration_messages_without_mention_or_version_are_ignored() {
    let server = MockServer::start();
    let primary = server.mock(|when, then| {
        when.method(GET).path("/pub/openshift-v4/clients/ocp/");
        then.status(200).body("");
    });
    let dev_preview = server.mock(|when, then| {
        when.method(GET)
            .path("/pub/openshift-v4/clients/ocp-dev-preview/");
        then.status(200).body("");
    });

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::default();
    for text in ["4.16 is out?", "@mirrorbot hello there", "@mirrorbot 4.16.1"] {
        let replied = handler
            .handle_message_at(&mention(text), BOT_USER_ID, &sender, fixed_now())
            .await
            .expect("handle message");
        assert!(!replied, "unexpected reply for {text:?}");
    }

    let own = InboundMessage {
        user_id: BOT_USER_ID.to_string(),
        ..mention("@mirrorbot 4.16")
    };
    assert!(!handler
        .handle_message_at(&own, BOT_USER_ID, &sender, fixed_now())
        .await
        .expect("handle own message"));

    assert!(sender.replies().await.is_empty());
    primary.assert_calls(0);
    dev_preview.assert_calls(0);
}

#[tokio::test]
async fn regression_reply_delivery_failure_surfaces_as_error() {
    let server = MockServer::start();
    mock_mirror_folders(&server, "", "");

    let handler = handler_for(&server.base_url());
    let sender = RecordingSender::failing();
    let error = handler
        .handle_message_at(&mention("@mirrorbot 4.16"), BOT_USER_ID, &sender, fixed_now())
        .await
        .expect_err("delivery failure");
    let rendered = format!("{error:#}");
    assert!(rendered.contains("failed to post reply to channel C-releases"));
    assert!(rendered.contains("channel_not_found"));
}
