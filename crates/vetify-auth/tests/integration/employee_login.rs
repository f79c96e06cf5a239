//! Employee login through Google, plus the shared entry points.

use axum::http::StatusCode;
use vetify_auth::{EmployeeSubject, VetifySubject};

use crate::common::{
    CLIENT_ID, REDIRECT_URI, TestHarness, body_json, body_string, encode, location, query_param,
    verifier,
};

#[tokio::test]
async fn test_employee_with_name() {
    let harness = TestHarness::new();
    let verified = harness.redeem(harness.google_login("joao").await).await;

    assert_eq!(
        verified.subject,
        VetifySubject::Employee(EmployeeSubject {
            email: "joao@vetify.co.ao".to_string(),
            name: Some("João Silva".to_string()),
        })
    );
    assert!(verified.id.starts_with("employee:"));
}

#[tokio::test]
async fn test_employee_without_name() {
    let harness = TestHarness::new();
    let verified = harness.redeem(harness.google_login("ana").await).await;

    let VetifySubject::Employee(employee) = verified.subject else {
        unreachable!("Expected an employee subject");
    };
    assert_eq!(employee.email, "ana@vetify.co.ao");
    assert_eq!(employee.name, None);
}

#[tokio::test]
async fn test_id_token_without_email_fails() {
    let harness = TestHarness::new();
    let resp = harness.google_login("anonymous").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get("location").is_none());
}

#[tokio::test]
async fn test_upstream_rejection_fails() {
    let harness = TestHarness::new();
    let resp = harness.google_login("revoked").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_google_redirect_uses_issuer_callback() {
    let harness = TestHarness::new();
    let cookie = harness.start("google").await;
    let resp = harness.get("/google/authorize", Some(&cookie)).await;

    let upstream = location(&resp);
    assert!(upstream.starts_with("https://accounts.google.com/"));
    assert_eq!(
        query_param(&upstream, "redirect_uri").as_deref(),
        Some("https://auth.vetify.co.ao/google/callback")
    );
}

#[tokio::test]
async fn test_select_page_lists_both_logins() {
    let harness = TestHarness::new();
    let resp = harness
        .get(
            &format!(
                "/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=code",
                encode(REDIRECT_URI)
            ),
            None,
        )
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_string(resp).await;
    assert!(page.contains("<title>Vetify</title>"));
    assert!(page.contains(r#"href="/code/authorize">Revendedores</a>"#));
    assert!(page.contains(r#"href="/google/authorize">Funcionários</a>"#));
    assert!(page.contains("#207697"));
    assert!(page.contains("vetify_icone.svg"));
}

#[tokio::test]
async fn test_foreign_client_is_rejected() {
    let harness = TestHarness::new();
    let resp = harness
        .get(
            &format!(
                "/authorize?client_id=partner-app&redirect_uri={}&response_type=code",
                encode(REDIRECT_URI)
            ),
            None,
        )
        .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "unauthorized_client");
}

#[tokio::test]
async fn test_refresh_keeps_subject() {
    let harness = TestHarness::new();
    let login = harness.google_login("joao").await;
    let code = query_param(&location(&login), "code").unwrap();
    let first = body_json(harness.exchange(&code).await).await;

    let resp = harness
        .post_form(
            "/token",
            None,
            &format!(
                "grant_type=refresh_token&refresh_token={}&client_id={CLIENT_ID}",
                first["refresh_token"].as_str().unwrap()
            ),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = body_json(resp).await;
    assert_eq!(second["expires_in"], 2_592_000);

    let before = verifier()
        .verify(first["access_token"].as_str().unwrap())
        .unwrap();
    let after = verifier()
        .verify(second["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(before.subject, after.subject);
    assert_eq!(before.id, after.id);
}
