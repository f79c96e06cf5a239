//! Customer login through the emailed code.

use axum::http::StatusCode;
use std::sync::atomic::Ordering;
use vetify_auth::{CustomerSubject, VetifySubject};
use vetify_mail::CODE_SUBJECT;

use crate::common::{CLIENT_ID, FROM_EMAIL, TestHarness, attempt_cookie, body_string};

#[tokio::test]
async fn test_registered_customer_gets_subject() {
    let harness = TestHarness::new();
    let (cookie, resp) = harness.request_code("a@x.com").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_string(resp).await;
    assert!(page.contains("Código enviado para: a@x.com"));

    let email = harness.outbox.last();
    assert_eq!(email.to, "a@x.com");
    assert_eq!(email.subject, CODE_SUBJECT);
    assert!(email.from.contains(FROM_EMAIL));

    let code = harness.outbox.last_code();
    let verified = harness.redeem(harness.verify_code(&cookie, &code).await).await;

    assert_eq!(
        verified.subject,
        VetifySubject::Customer(CustomerSubject {
            email: "a@x.com".to_string(),
            name: Some("Ana Lda".to_string()),
            fiscal_id: "5417000001".to_string(),
        })
    );
    assert!(verified.id.starts_with("customer:"));
    assert_eq!(verified.client_id, CLIENT_ID);
}

#[tokio::test]
async fn test_registry_checked_at_send_and_at_issue() {
    let harness = TestHarness::new();
    let (cookie, _) = harness.request_code("a@x.com").await;
    assert_eq!(harness.registry.lookups.load(Ordering::SeqCst), 1);

    let code = harness.outbox.last_code();
    harness.redeem(harness.verify_code(&cookie, &code).await).await;
    assert_eq!(harness.registry.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_email_shows_invalid_and_sends_nothing() {
    let harness = TestHarness::new();
    let (_, resp) = harness.request_code("b@x.com").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_string(resp).await;
    assert!(page.contains("Email inválido"));
    assert_eq!(harness.outbox.count(), 0);
}

#[tokio::test]
async fn test_wrong_code_shows_invalid() {
    let harness = TestHarness::new();
    let (cookie, _) = harness.request_code("a@x.com").await;
    let wrong = if harness.outbox.last_code() == "000000" {
        "111111"
    } else {
        "000000"
    };

    let resp = harness.verify_code(&cookie, wrong).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Código inválido"));
}

#[tokio::test]
async fn test_wrong_guesses_expire_the_code() {
    let harness = TestHarness::new();
    let (cookie, _) = harness.request_code("a@x.com").await;
    let code = harness.outbox.last_code();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let mut last = String::new();
    for _ in 0..5 {
        last = body_string(harness.verify_code(&cookie, wrong).await).await;
    }
    assert!(last.contains("Código expirado. Peça um novo código."));

    let resp = harness.verify_code(&cookie, &code).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resend_delivers_a_fresh_code() {
    let harness = TestHarness::new();
    let (cookie, _) = harness.request_code("a@x.com").await;

    let resp = harness
        .post_form("/code/authorize", Some(&cookie), "action=resend")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Código reenviado para: a@x.com"));
    assert_eq!(harness.outbox.count(), 2);

    let code = harness.outbox.last_code();
    let verified = harness.redeem(harness.verify_code(&cookie, &code).await).await;
    assert_eq!(verified.subject.email(), "a@x.com");
}

#[tokio::test]
async fn test_mail_failure_is_a_server_error() {
    let harness = TestHarness::failing_mail();
    let (_, resp) = harness.request_code("a@x.com").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(resp).await;
    assert!(body.contains("server_error"));
    assert!(!body.contains("connection refused"));
}

#[tokio::test]
async fn test_client_removed_before_verify_fails_issuance() {
    let harness = TestHarness::new();
    let (cookie, _) = harness.request_code("a@x.com").await;
    let code = harness.outbox.last_code();

    harness.registry.remove("a@x.com");
    let resp = harness.verify_code(&cookie, &code).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get("location").is_none());
}

#[tokio::test]
async fn test_returning_customer_keeps_subject_id() {
    let harness = TestHarness::new();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (cookie, _) = harness.request_code("a@x.com").await;
        let code = harness.outbox.last_code();
        let verified = harness.redeem(harness.verify_code(&cookie, &code).await).await;
        ids.push(verified.id);
    }
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_attempt_cookie_is_secure_on_https() {
    let harness = TestHarness::new();
    let resp = harness
        .get(
            "/authorize?client_id=vetify-portal&redirect_uri=https%3A%2F%2Fportal.vetify.co.ao%2Fauth%2Fcallback&response_type=code",
            None,
        )
        .await;
    assert!(attempt_cookie(&resp).is_some());
    let header = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(header.contains("Secure"));
    assert!(header.contains("HttpOnly"));
}
