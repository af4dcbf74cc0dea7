/// Integration tests for the session lifecycle
///
/// These run against a live Postgres (DATABASE_URL) and verify:
/// - Registration, duplicate-email conflict
/// - Login success and uniform failure
/// - Refresh rotation: single use, continuity, garbage rejection
/// - Logout idempotence
/// - Profile access behind the authentication gate

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_register_and_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email("reg");

    let body = ctx.register(&email, "secret-password-1", "Ada").await;

    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["accessToken"].as_str().unwrap().len() > 20);
    assert!(body["refreshToken"].as_str().unwrap().len() > 20);
    // The access token is never its own refresh token
    assert_ne!(body["accessToken"], body["refreshToken"]);

    // Same email again -> conflict
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "secret-password-2", "name": "Ada 2" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    ctx.cleanup_users(&[&email]).await.unwrap();
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "long-enough-pw", "name": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": TestContext::unique_email("short"),
                "password": "short",
                "name": "X"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_success_and_uniform_failure() {
    let ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email("login");

    ctx.register(&email, "correct-password", "Bea").await;

    // Wrong password
    let (status, wrong_pw) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown email gets the exact same error payload: the response never
    // says which half of the credentials was wrong
    let (status, unknown_email) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": TestContext::unique_email("ghost"), "password": "whatever-pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["message"], unknown_email["message"]);

    // Correct credentials
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "correct-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["accessToken"].as_str().unwrap().len() > 20);

    ctx.cleanup_users(&[&email]).await.unwrap();
}

#[tokio::test]
async fn test_refresh_rotation() {
    let ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email("rot");

    let session = ctx.register(&email, "secret-password-1", "Cyn").await;
    let r1 = session["refreshToken"].as_str().unwrap().to_string();

    // First refresh succeeds and yields a new token
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refreshToken": r1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let r2 = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(r1, r2);
    assert_eq!(body["user"]["email"], email.as_str());

    // The old token was consumed by rotation: reuse fails
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refreshToken": r1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The chain continues from the replacement
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refreshToken": r2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let r3 = body["refreshToken"].as_str().unwrap();
    assert_ne!(r3, r1);
    assert_ne!(r3, r2);

    // Garbage is rejected the same way
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refreshToken": "garbage" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup_users(&[&email]).await.unwrap();
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email("out");

    let session = ctx.register(&email, "secret-password-1", "Dee").await;
    let refresh_token = session["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/logout",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Logging out the same token again is still a success
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/logout",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // But the token is gone for refresh purposes
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup_users(&[&email]).await.unwrap();
}

#[tokio::test]
async fn test_profile_behind_authentication_gate() {
    let ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email("me");

    let session = ctx.register(&email, "first-password-1", "Eve").await;
    let access = session["accessToken"].as_str().unwrap().to_string();
    let refresh = session["refreshToken"].as_str().unwrap().to_string();

    // No token, malformed token, and a refresh token in the access slot all
    // get the same 401
    let (status, _) = ctx.request("GET", "/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request("GET", "/v1/users/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request("GET", "/v1/users/me", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // With the access token the profile is visible
    let (status, body) = ctx.request("GET", "/v1/users/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["name"], "Eve");

    // Rename and change password
    let (status, body) = ctx
        .request(
            "PATCH",
            "/v1/users/me",
            Some(&access),
            Some(json!({ "name": "Evelyn", "password": "second-password-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "Evelyn");

    // Only the new password logs in now
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "first-password-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "second-password-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup_users(&[&email]).await.unwrap();
}
