//! tests/health_server/alive.rs
//! The liveness probe answers in plain text, outside the JSON envelope.

use crate::common;
use reqwest::StatusCode;

#[tokio::test]
async fn root_reports_bot_is_alive() {
    let base_url: String = common::spawn_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .get(format!("{}/", base_url))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "Bot is alive");
}
