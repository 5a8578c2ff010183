mod common;

use std::time::Duration;

use common::*;
use serde_json::json;
use videogen_core::auth::{CredentialPair, SessionStatus};
use videogen_core::models::ResetPasswordRequest;
use videogen_core::ApiError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_startup_without_credentials_makes_no_requests() {
    let h = Harness::start().await;
    assert_eq!(h.cache.status(), SessionStatus::Loading);

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert!(session.identity.is_none());
    assert_eq!(h.request_count().await, 0);
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_restores_session() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.user().map(|u| u.name.as_str()), Some("Ann"));
    assert!(h.manager.is_authenticated());
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_refreshes_expired_access() {
    let h = Harness::signed_in("old-access", "old-refresh").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("new-access", "new-refresh")))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(h.store.get(), Some(CredentialPair::new("new-access", "new-refresh")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_with_rejected_refresh_clears_everything() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid refresh token")))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
    assert!(h.store.refresh_token().is_none());
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_server_error_keeps_credentials() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_bad_request_keeps_credentials() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("Bad request")))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_startup_failed_envelope_clears_credentials() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failure("User not found")))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h.manager.startup().await;

    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
    h.assert_consistent();
}

// ============================================================================
// Credential-issuing flows
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "ann@example.com", "password": "secret123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_envelope("u1", "Ann", "a1", "r1")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .manager
        .login("ann@example.com", "secret123")
        .await
        .expect("login should succeed");

    assert_eq!(user.id, "u1");
    assert_eq!(h.cache.status(), SessionStatus::Authenticated);
    assert_eq!(h.manager.current_user().map(|u| u.id), Some("u1".to_string()));
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_wrong_password_leaves_signed_out() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid credentials")))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .manager
        .login("ann@example.com", "wrong")
        .await
        .expect_err("login must fail");

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(h.cache.status(), SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
    h.assert_consistent();
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid credentials")))
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    h.manager
        .login("bob@example.com", "wrong")
        .await
        .expect_err("login must fail");

    assert_eq!(h.cache.status(), SessionStatus::Authenticated);
    assert_eq!(h.manager.current_user().map(|u| u.name), Some("Ann".to_string()));
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_signup_signs_in() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({ "name": "Ann", "email": "ann@example.com", "password": "secret123" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_envelope("u1", "Ann", "a1", "r1")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .manager
        .signup("Ann", "ann@example.com", "secret123")
        .await
        .expect("signup should succeed");

    assert_eq!(user.name, "Ann");
    assert!(h.manager.is_authenticated());
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_reset_password_signs_in() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/reset-password"))
        .and(body_json(json!({ "email": "ann@example.com", "code": "123456", "password": "newpass1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_envelope("u1", "Ann", "a2", "r2")))
        .expect(1)
        .mount(&h.server)
        .await;

    let request = ResetPasswordRequest::with_code("ann@example.com", "123456", "newpass1");
    h.manager
        .reset_password(&request)
        .await
        .expect("reset should succeed");

    assert!(h.manager.is_authenticated());
    assert_eq!(h.store.get(), Some(CredentialPair::new("a2", "r2")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_verify_email_fetches_missing_user() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-email"))
        .and(body_json(json!({ "userId": "u1", "code": "654321" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("a1", "r1")))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .manager
        .verify_email("u1", "654321")
        .await
        .expect("verification should succeed");

    assert_eq!(user.name, "Ann");
    assert!(h.manager.is_authenticated());
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_verify_email_bad_code_writes_nothing() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-email"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("Invalid or expired code")))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .manager
        .verify_email("u1", "000000")
        .await
        .expect_err("verification must fail");

    assert!(matches!(err, ApiError::Rejected(_)));
    assert_eq!(h.cache.status(), SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
}

#[tokio::test]
async fn test_forgot_password_returns_challenge() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .and(body_json(json!({ "email": "ann@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Reset code sent",
            "data": { "challengeId": "ch-42" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let challenge = h
        .manager
        .forgot_password("ann@example.com")
        .await
        .expect("request should succeed");

    assert_eq!(challenge.as_deref(), Some("ch-42"));
    assert!(h.store.get().is_none());
}

#[tokio::test]
async fn test_forgot_password_without_data() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .mount(&h.server)
        .await;

    let challenge = h
        .manager
        .forgot_password("ann@example.com")
        .await
        .expect("request should succeed");
    assert!(challenge.is_none());
}

// ============================================================================
// Logout & account
// ============================================================================

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    assert!(h.manager.is_authenticated());

    h.manager.logout().await;

    assert_eq!(h.cache.status(), SessionStatus::Unauthenticated);
    assert!(h.manager.current_user().is_none());
    assert!(h.store.get().is_none());
    h.assert_consistent();
}

#[tokio::test]
async fn test_update_profile_replaces_identity() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .and(body_json(json!({ "name": "Annie" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Annie")))
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    let user = h.manager.update_profile("Annie").await.expect("update should succeed");

    assert_eq!(user.name, "Annie");
    assert_eq!(h.manager.current_user().map(|u| u.name), Some("Annie".to_string()));
    h.assert_consistent();
}

#[tokio::test]
async fn test_delete_account_signs_out() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/auth/account"))
        .and(body_json(json!({ "password": "secret123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    h.manager.delete_account("secret123").await.expect("delete should succeed");

    assert_eq!(h.cache.status(), SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
    h.assert_consistent();
}

#[tokio::test]
async fn test_delete_account_wrong_password_keeps_session() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/auth/account"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("Incorrect password")))
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    let err = h.manager.delete_account("nope").await.expect_err("delete must fail");

    assert_eq!(err.to_string(), "Incorrect password");
    assert!(h.manager.is_authenticated());
    assert_eq!(h.store.get(), Some(CredentialPair::new("a1", "r1")));
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_stale_login_is_discarded() {
    let h = Harness::start().await;
    h.manager.startup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_envelope("u1", "Ann", "a1", "r1"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .mount(&h.server)
        .await;

    let (login, ()) = futures::join!(h.manager.login("ann@example.com", "secret123"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.manager.logout().await;
    });

    assert!(matches!(login, Err(ApiError::Superseded)));
    assert_eq!(h.cache.status(), SessionStatus::Unauthenticated);
    assert!(h.store.get().is_none());
    h.assert_consistent();
}

#[tokio::test]
async fn test_profile_update_does_not_supersede_login() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_envelope("u2", "Bob", "a2", "r2"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Annie")))
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.startup().await;

    let (login, _) = futures::join!(h.manager.login("bob@example.com", "secret123"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.manager.update_profile("Annie").await
    });

    let user = login.expect("login must not be superseded by a profile update");
    assert_eq!(user.id, "u2");
    assert_eq!(h.manager.current_user().map(|u| u.id), Some("u2".to_string()));
    assert_eq!(h.store.get(), Some(CredentialPair::new("a2", "r2")));
    h.assert_consistent();
}

#[tokio::test]
async fn test_subscriber_sees_invalidation() {
    let h = Harness::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_envelope("u1", "Ann")))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;

    h.manager.startup().await;
    let mut rx = h.manager.subscribe();
    assert!(rx.borrow_and_update().is_authenticated());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    h.api().fetch_me().await.expect_err("call must fail");

    rx.changed().await.expect("session channel closed");
    let session = rx.borrow_and_update().clone();
    assert_eq!(session.status, SessionStatus::Unauthenticated);
    assert!(session.identity.is_none());
    h.assert_consistent();
}
