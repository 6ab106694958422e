use serde_json::json;
use uuid::Uuid;

mod common;
use common::utils::spawn_app;
use mintturf_backend::models::user::Role;
use mintturf_backend::store::StoreGateway;

#[tokio::test]
async fn admin_invites_a_club_manager_who_validates_and_consumes_the_code() {
    let test_app = spawn_app().await;
    test_app.seed_user("the-admin", Role::Admin, "password123").await;
    let (admin_token, _) = test_app.login("the-admin", "password123").await;

    let club = test_app
        .store
        .create_club(mintturf_backend::models::club::CreateClubRequest {
            name: "Riverside FC".to_string(),
            city: None,
            website: None,
            description: None,
            pro_academy: false,
        })
        .await
        .expect("failed to seed club");

    let created = test_app
        .client
        .post(test_app.url("/api/invites/admin/club-manager"))
        .bearer_auth(&admin_token)
        .json(&json!({ "club_id": club.id, "max_uses": 1, "ttl": 3600 }))
        .send()
        .await
        .expect("create invite request failed");
    assert_eq!(201, created.status().as_u16());
    let invite: serde_json::Value = created.json().await.expect("response was not json");
    let code = invite["code"].as_str().unwrap().to_string();

    let validated = test_app
        .client
        .get(test_app.url(&format!("/api/invites/validate/{code}")))
        .send()
        .await
        .expect("validate request failed");
    assert_eq!(200, validated.status().as_u16());
    let validation: serde_json::Value = validated.json().await.expect("response was not json");
    assert_eq!(validation["invite_type"], "club_manager");
    assert_eq!(validation["remaining"], 1);
    // Validation must never leak who issued the invite.
    assert!(validation.get("created_by").is_none());

    let signup = test_app
        .client
        .post(test_app.url("/api/auth/signup"))
        .json(&json!({
            "username": format!("manager{}", Uuid::new_v4().simple()),
            "password": "password123",
            "email": "manager@example.com",
            "invite_code": code,
        }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(201, signup.status().as_u16());
    let signup_body: serde_json::Value = signup.json().await.expect("response was not json");
    assert_eq!(signup_body["profile"]["role"], "club_manager");
    assert_eq!(signup_body["profile"]["club_id"], club.id.to_string());

    // A single-use invite is now exhausted.
    let second_attempt = test_app
        .client
        .post(test_app.url("/api/auth/signup"))
        .json(&json!({
            "username": format!("manager{}", Uuid::new_v4().simple()),
            "password": "password123",
            "email": "manager2@example.com",
            "invite_code": code,
        }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(410, second_attempt.status().as_u16());
    let second_body: serde_json::Value = second_attempt.json().await.expect("response was not json");
    assert_eq!(second_body["error"]["code"], "INVITE_EXHAUSTED");
}

#[tokio::test]
async fn club_fan_may_not_issue_invites() {
    let test_app = spawn_app().await;
    test_app.seed_user("a-fan", Role::ClubFan, "password123").await;
    let (fan_token, _) = test_app.login("a-fan", "password123").await;

    let response = test_app
        .client
        .post(test_app.url("/api/invites/club_fan/club-fan"))
        .bearer_auth(&fan_token)
        .json(&json!({ "max_uses": 1, "ttl": 3600 }))
        .send()
        .await
        .expect("create invite request failed");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn signup_without_invite_code_is_rejected() {
    let test_app = spawn_app().await;

    let response = test_app
        .client
        .post(test_app.url("/api/auth/signup"))
        .json(&json!({
            "username": "no-invite-user",
            "password": "password123",
            "email": "noinvite@example.com",
        }))
        .send()
        .await
        .expect("signup request failed");

    assert_eq!(400, response.status().as_u16());
}
