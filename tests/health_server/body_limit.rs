//! tests/health_server/body_limit.rs
//! Ensures that a body over MAX_REQUEST_BODY_SIZE yields 413 in the envelope.

use crate::common;
use axum::{body::Bytes, routing::post, Router};
use blaze_thumb_bot::config::state::AppState;
use reqwest::StatusCode;
use serde_json::Value;

fn echo_routes() -> Router<AppState> {
    Router::new().route("/echo", post(|body: Bytes| async move { body.len().to_string() }))
}

#[tokio::test]
async fn returns_413_when_payload_exceeds_limit() {
    let base_url: String = common::spawn_enveloped(echo_routes(), &[("MAX_REQUEST_BODY_SIZE", "1024")]);

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/echo", base_url))
        .body(vec![b'X'; 1024 + 100])
        .send()
        .await
        .expect("Failed to send large request.");

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json: Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(json["status"], "PAYLOAD_TOO_LARGE");
    assert_eq!(json["code"], 413);
}

#[tokio::test]
async fn accepts_payload_within_limit() {
    let base_url: String = common::spawn_enveloped(echo_routes(), &[("MAX_REQUEST_BODY_SIZE", "1024")]);

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/echo", base_url))
        .body(vec![b'X'; 512])
        .send()
        .await
        .expect("Failed to send request.");

    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["code"], 200);
}
