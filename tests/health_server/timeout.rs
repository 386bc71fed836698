//! tests/health_server/timeout.rs
//! Ensures that a handler running past DEFAULT_TIMEOUT_SECONDS yields 408 in the envelope.

use crate::common;
use axum::{routing::get, Router};
use blaze_thumb_bot::config::state::AppState;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn returns_408_when_request_times_out() {
    let routes: Router<AppState> = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let base_url: String = common::spawn_enveloped(routes, &[("DEFAULT_TIMEOUT_SECONDS", "1")]);

    let resp_result: Result<Result<reqwest::Response, reqwest::Error>, tokio::time::error::Elapsed> =
        timeout(Duration::from_secs(4), async {
            reqwest::Client::new()
                .get(format!("{}/slow", base_url))
                .send()
                .await
        })
        .await;

    assert!(resp_result.is_ok(), "Client timed out waiting for server.");
    let resp: reqwest::Response = resp_result.unwrap().expect("Request failed unexpectedly.");

    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

    let json: Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(json["status"], "REQUEST_TIMEOUT");
    assert_eq!(json["code"], 408);
    assert!(json["date"].is_string());
}
