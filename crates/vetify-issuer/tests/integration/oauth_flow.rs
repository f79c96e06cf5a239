//! Integration tests for the redirect-based OAuth flow.

use axum::http::StatusCode;

use crate::common::{REDIRECT_URI, TestHarness, body_json, location, query_param};

#[tokio::test]
async fn test_oauth_redirects_upstream_with_callback() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("google")).await;
    let resp = harness.get("/google/authorize", Some(&cookie)).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let upstream = location(&resp);
    assert!(upstream.starts_with("https://accounts.example.com/"));
    assert_eq!(
        query_param(&upstream, "redirect_uri").as_deref(),
        Some("https://auth.vetify.co.ao/google/callback")
    );
    assert!(query_param(&upstream, "state").is_some());
}

#[tokio::test]
async fn test_oauth_callback_completes() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("google")).await;
    let resp = harness.get("/google/authorize", Some(&cookie)).await;
    let state = query_param(&location(&resp), "state").unwrap();

    let resp = harness
        .get(
            &format!("/google/callback?code=upstream-code&state={state}"),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with(REDIRECT_URI));
}

#[tokio::test]
async fn test_oauth_callback_state_mismatch() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("google")).await;
    harness.get("/google/authorize", Some(&cookie)).await;

    let resp = harness
        .get("/google/callback?code=upstream-code&state=forged", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_callback_upstream_error() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("google")).await;
    harness.get("/google/authorize", Some(&cookie)).await;

    let resp = harness
        .get("/google/callback?error=access_denied", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert!(
        body["error_description"]
            .as_str()
            .unwrap()
            .contains("access_denied")
    );
}

#[tokio::test]
async fn test_oauth_exchange_rejected() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("google")).await;
    let resp = harness.get("/google/authorize", Some(&cookie)).await;
    let state = query_param(&location(&resp), "state").unwrap();

    let resp = harness
        .get(
            &format!("/google/callback?code=rejected&state={state}"),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_code_provider_has_no_callback() {
    let harness = TestHarness::new();
    let cookie = harness.start(Some("code")).await;
    let resp = harness
        .get("/code/callback?code=x&state=y", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
