//! tests/health_server/status.rs
//! The status endpoint reports counters inside the standard envelope.

use crate::common;
use blaze_thumb_bot::bot::pending::PendingVideo;
use blaze_thumb_bot::config::state::AppState;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn status_reports_pending_and_counters() {
    let state: AppState = AppState::new(common::test_env(&[("ENVIRONMENT", "staging")]));
    state.stats.set_username(Some("blaze_thumb_bot".to_string()));
    state.stats.record_video();
    state.stats.record_applied();
    state.pending.insert(
        42,
        PendingVideo {
            message_id: 1,
            file_id: "VID".to_string(),
            file_size: None,
            duration: 5,
            width: 640,
            height: 360,
            caption: String::new(),
        },
    );

    let base_url: String = common::spawn_app_with(state);

    let resp: reqwest::Response = reqwest::Client::new()
        .get(format!("{}/status", base_url))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["code"], 200);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["environment"], "staging");
    assert_eq!(json["data"]["bot_username"], "blaze_thumb_bot");
    assert_eq!(json["data"]["pending_videos"], 1);
    assert_eq!(json["data"]["pending_evicted"], 0);
    assert_eq!(json["data"]["videos_received"], 1);
    assert_eq!(json["data"]["thumbnails_applied"], 1);
    assert_eq!(json["data"]["failures"], 0);
    assert_eq!(json["messages"][0], "Bot is running");
    assert!(json["date"].is_string());
}

#[tokio::test]
async fn status_counts_evicted_pending_videos() {
    let state: AppState = AppState::new(common::test_env(&[("MAX_PENDING_VIDEOS", "1")]));
    for chat_id in [1, 2, 3] {
        state.pending.insert(
            chat_id,
            PendingVideo {
                message_id: 1,
                file_id: format!("VID{chat_id}"),
                file_size: None,
                duration: 5,
                width: 640,
                height: 360,
                caption: String::new(),
            },
        );
    }

    let base_url: String = common::spawn_app_with(state);

    let json: Value = reqwest::get(format!("{}/status", base_url))
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();

    assert_eq!(json["data"]["pending_videos"], 1);
    assert_eq!(json["data"]["pending_evicted"], 2);
}
