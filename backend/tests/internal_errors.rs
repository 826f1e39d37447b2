//! Runs in its own process: the detail switch is process-wide.

use axum::response::IntoResponse;
use http_body_util::BodyExt;

use moodsync_api::error::{expose_internal_details, AppError};

#[tokio::test]
async fn development_mode_shows_internal_detail() {
    expose_internal_details(true);
    // first call wins
    expose_internal_details(false);

    let response =
        AppError::Internal(anyhow::anyhow!("pool exhausted")).into_response();
    assert_eq!(response.status(), 500);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "pool exhausted");
    assert_eq!(body["success"], false);
}
