use serde_json::json;

mod common;
use common::utils::spawn_app;
use mintturf_backend::models::user::Role;

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let test_app = spawn_app().await;
    test_app.seed_user("loginuser", Role::ClubFan, "password123").await;

    let response = test_app
        .client
        .post(test_app.url("/api/auth/login"))
        .json(&json!({ "username": "loginuser", "password": "password123" }))
        .send()
        .await
        .expect("login request failed");

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("response was not json");
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["profile"]["username"], "loginuser");
}

#[tokio::test]
async fn login_returns_401_for_wrong_password() {
    let test_app = spawn_app().await;
    test_app.seed_user("wrongpassuser", Role::ClubFan, "correct-password").await;

    let response = test_app
        .client
        .post(test_app.url("/api/auth/login"))
        .json(&json!({ "username": "wrongpassuser", "password": "not-the-password" }))
        .send()
        .await
        .expect("login request failed");

    assert_eq!(401, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("response was not json");
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_returns_401_for_unknown_username() {
    let test_app = spawn_app().await;

    let response = test_app
        .client
        .post(test_app.url("/api/auth/login"))
        .json(&json!({ "username": "nobody-here", "password": "whatever123" }))
        .send()
        .await
        .expect("login request failed");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rotates_the_token_and_rejects_the_old_one_on_replay() {
    let test_app = spawn_app().await;
    test_app.seed_user("refreshuser", Role::ClubFan, "password123").await;
    let (_, login_body) = test_app.login("refreshuser", "password123").await;
    let first_refresh = login_body["refresh_token"].as_str().unwrap().to_string();

    let refreshed = test_app
        .client
        .post(test_app.url("/api/auth/refresh"))
        .json(&json!({ "refresh_token": first_refresh }))
        .send()
        .await
        .expect("refresh request failed");
    assert_eq!(200, refreshed.status().as_u16());
    let refreshed_body: serde_json::Value = refreshed.json().await.expect("response was not json");
    let second_refresh = refreshed_body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, second_refresh);

    // Replaying the rotated-out token must be rejected and revoke the family.
    let replay = test_app
        .client
        .post(test_app.url("/api/auth/refresh"))
        .json(&json!({ "refresh_token": first_refresh }))
        .send()
        .await
        .expect("refresh request failed");
    assert_eq!(401, replay.status().as_u16());

    let now_locked_out = test_app
        .client
        .post(test_app.url("/api/auth/refresh"))
        .json(&json!({ "refresh_token": second_refresh }))
        .send()
        .await
        .expect("refresh request failed");
    assert_eq!(401, now_locked_out.status().as_u16());
}

#[tokio::test]
async fn profile_requires_a_bearer_token() {
    let test_app = spawn_app().await;

    let response = test_app
        .client
        .get(test_app.url("/api/auth/profile"))
        .send()
        .await
        .expect("profile request failed");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn profile_returns_the_caller_with_a_valid_token() {
    let test_app = spawn_app().await;
    test_app.seed_user("profileuser", Role::TeamPlayer, "password123").await;
    let (token, _) = test_app.login("profileuser", "password123").await;

    let response = test_app
        .client
        .get(test_app.url("/api/auth/profile"))
        .bearer_auth(token)
        .send()
        .await
        .expect("profile request failed");

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("response was not json");
    assert_eq!(body["data"]["username"], "profileuser");
}
