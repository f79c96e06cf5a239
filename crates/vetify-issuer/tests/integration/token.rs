//! Integration tests for the token endpoint and issued tokens.

use axum::http::StatusCode;
use vetify_issuer::SubjectVerifier;

use crate::common::{
    CLIENT_ID, ISSUER_URL, Member, SECRET, TestHarness, body_json, encode, location, query_param,
};

async fn authorization_code(harness: &TestHarness, email: &str) -> String {
    let resp = harness.code_login(email).await;
    query_param(&location(&resp), "code").unwrap()
}

#[tokio::test]
async fn test_exchange_issues_verifiable_access_token() {
    let harness = TestHarness::code_only();
    let code = authorization_code(&harness, "a@x.com").await;

    let resp = harness.exchange(&code).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "no-store");

    let body = body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 60 * 60 * 24 * 30);
    assert!(body["refresh_token"].as_str().is_some());

    let verifier = SubjectVerifier::<Member>::new(ISSUER_URL, SECRET).with_audience(&[CLIENT_ID]);
    let verified = verifier
        .verify(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(verified.subject.email, "a@x.com");
    assert!(verified.id.starts_with("member:"));
    assert_eq!(verified.client_id, CLIENT_ID);
}

#[tokio::test]
async fn test_same_properties_yield_same_subject_id() {
    let harness = TestHarness::code_only();
    let verifier = SubjectVerifier::<Member>::new(ISSUER_URL, SECRET);

    let mut ids = Vec::new();
    for _ in 0..2 {
        let code = authorization_code(&harness, "a@x.com").await;
        let body = body_json(harness.exchange(&code).await).await;
        let verified = verifier
            .verify(body["access_token"].as_str().unwrap())
            .unwrap();
        ids.push(verified.id);
    }
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_authorization_code_is_single_use() {
    let harness = TestHarness::code_only();
    let code = authorization_code(&harness, "a@x.com").await;

    assert_eq!(harness.exchange(&code).await.status(), StatusCode::OK);
    let resp = harness.exchange(&code).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_grant");
}

#[tokio::test]
async fn test_exchange_redirect_mismatch() {
    let harness = TestHarness::code_only();
    let code = authorization_code(&harness, "a@x.com").await;

    let resp = harness
        .post_form(
            "/token",
            None,
            &format!(
                "grant_type=authorization_code&code={code}&redirect_uri={}",
                encode("https://evil.example.com/cb")
            ),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_grant");

    // A rejected exchange leaves the code for its rightful client
    assert_eq!(harness.exchange(&code).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotates_token() {
    let harness = TestHarness::code_only();
    let code = authorization_code(&harness, "a@x.com").await;
    let body = body_json(harness.exchange(&code).await).await;
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let form = format!("grant_type=refresh_token&refresh_token={refresh}");
    let resp = harness.post_form("/token", None, &form).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated = body_json(resp).await;
    assert_ne!(rotated["refresh_token"], body["refresh_token"]);

    // The old refresh token is consumed
    let resp = harness.post_form("/token", None, &form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_from_other_client_keeps_token() {
    let harness = TestHarness::code_only();
    let code = authorization_code(&harness, "a@x.com").await;
    let body = body_json(harness.exchange(&code).await).await;
    let refresh = body["refresh_token"].as_str().unwrap();

    let grant = format!("grant_type=refresh_token&refresh_token={refresh}");
    let foreign = format!("{grant}&client_id=vetify-other");
    let resp = harness.post_form("/token", None, &foreign).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_grant");

    let own = format!("{grant}&client_id={CLIENT_ID}");
    let resp = harness.post_form("/token", None, &own).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let harness = TestHarness::code_only();
    let resp = harness
        .post_form("/token", None, "grant_type=password&username=a&password=b")
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "unsupported_grant_type");
}
