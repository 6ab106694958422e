use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

mod common;
use common::utils::spawn_app;
use mintturf_backend::models::user::Role;

fn submission_payload(external_match_id: &str, home_score: i32, away_score: i32) -> serde_json::Value {
    json!({
        "home_team": "Riverside FC",
        "away_team": "Lakeside United",
        "league": "Metro Youth League",
        "season": "2026",
        "age_group": "U12",
        "division": "Division A",
        "match_type": "league",
        "match_date": Utc::now().to_rfc3339(),
        "match_time": null,
        "location": "Field 3",
        "status": "completed",
        "home_score": home_score,
        "away_score": away_score,
        "external_match_id": external_match_id,
    })
}

#[tokio::test]
async fn submitted_match_is_queued_then_ingested_and_visible_through_standings() {
    let test_app = spawn_app().await;
    test_app.seed_user("ingest-admin", Role::Admin, "password123").await;
    let (admin_token, _) = test_app.login("ingest-admin", "password123").await;

    let submitted = test_app
        .client
        .post(test_app.url("/api/matches/submit"))
        .bearer_auth(&admin_token)
        .json(&submission_payload("EXT-001", 2, 1))
        .send()
        .await
        .expect("submit request failed");
    assert_eq!(202, submitted.status().as_u16());
    let submit_body: serde_json::Value = submitted.json().await.expect("response was not json");
    let task_id = submit_body["task_id"].as_str().unwrap().to_string();

    let pending = test_app
        .client
        .get(test_app.url(&format!("/api/matches/task/{task_id}")))
        .send()
        .await
        .expect("task status request failed");
    assert_eq!(200, pending.status().as_u16());
    let pending_body: serde_json::Value = pending.json().await.expect("response was not json");
    assert_eq!(pending_body["ready"], false);

    let mut auto_create = HashMap::new();
    auto_create.insert("ingest-admin".to_string(), true);
    let worker = test_app.ingestion_worker(auto_create);
    let processed = worker
        .run_once(Duration::from_millis(50))
        .await
        .expect("worker run_once failed");
    assert!(processed, "expected the submitted job to be dequeued");

    let finished = test_app
        .client
        .get(test_app.url(&format!("/api/matches/task/{task_id}")))
        .send()
        .await
        .expect("task status request failed");
    assert_eq!(200, finished.status().as_u16());
    let finished_body: serde_json::Value = finished.json().await.expect("response was not json");
    assert_eq!(finished_body["state"], "SUCCESS");
    assert_eq!(finished_body["ready"], true);
    assert_eq!(finished_body["result"]["action"], "created");
}

#[tokio::test]
async fn ingestion_fails_closed_for_unknown_entities_when_producer_has_no_auto_create_policy() {
    let test_app = spawn_app().await;
    test_app.seed_user("strict-admin", Role::Admin, "password123").await;
    let (admin_token, _) = test_app.login("strict-admin", "password123").await;

    let submitted = test_app
        .client
        .post(test_app.url("/api/matches/submit"))
        .bearer_auth(&admin_token)
        .json(&submission_payload("EXT-002", 0, 0))
        .send()
        .await
        .expect("submit request failed");
    assert_eq!(202, submitted.status().as_u16());
    let submit_body: serde_json::Value = submitted.json().await.expect("response was not json");
    let task_id = submit_body["task_id"].as_str().unwrap().to_string();

    // No entry for "strict-admin" in the policy map: defaults to fail-closed.
    let worker = test_app.ingestion_worker(HashMap::new());
    worker
        .run_once(Duration::from_millis(50))
        .await
        .expect("worker run_once failed");

    let finished = test_app
        .client
        .get(test_app.url(&format!("/api/matches/task/{task_id}")))
        .send()
        .await
        .expect("task status request failed");
    let finished_body: serde_json::Value = finished.json().await.expect("response was not json");
    assert_eq!(finished_body["state"], "FAILURE");
    assert_eq!(finished_body["error"], "UNKNOWN_ENTITY");
}

#[tokio::test]
async fn non_admin_cannot_submit_ingestion_jobs() {
    let test_app = spawn_app().await;
    test_app.seed_user("regular-fan", Role::ClubFan, "password123").await;
    let (fan_token, _) = test_app.login("regular-fan", "password123").await;

    let response = test_app
        .client
        .post(test_app.url("/api/matches/submit"))
        .bearer_auth(&fan_token)
        .json(&submission_payload("EXT-003", 0, 0))
        .send()
        .await
        .expect("submit request failed");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn score_locked_match_is_not_overwritten_by_a_later_ingestion_submission() {
    let test_app = spawn_app().await;
    test_app.seed_user("lock-admin", Role::Admin, "password123").await;
    let (admin_token, _) = test_app.login("lock-admin", "password123").await;
    let mut auto_create = HashMap::new();
    auto_create.insert("lock-admin".to_string(), true);
    let worker = test_app.ingestion_worker(auto_create);

    let submitted = test_app
        .client
        .post(test_app.url("/api/matches/submit"))
        .bearer_auth(&admin_token)
        .json(&submission_payload("EXT-LOCK", 1, 0))
        .send()
        .await
        .expect("submit request failed");
    assert_eq!(202, submitted.status().as_u16());
    let task_id = submitted.json::<serde_json::Value>().await.unwrap()["task_id"]
        .as_str()
        .unwrap()
        .to_string();
    worker.run_once(Duration::from_millis(50)).await.expect("worker run_once failed");
    let status: serde_json::Value = test_app
        .client
        .get(test_app.url(&format!("/api/matches/task/{task_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let match_id = status["result"]["match_id"].as_str().unwrap().to_string();

    let locked = test_app
        .client
        .patch(test_app.url(&format!("/api/matches/{match_id}")))
        .bearer_auth(&admin_token)
        .json(&json!({ "home_score": 3, "away_score": 3, "score_locked": true }))
        .send()
        .await
        .expect("lock patch failed");
    assert_eq!(200, locked.status().as_u16());

    // Resubmit under the same external_match_id with different scores and a
    // different location — location should still update, scores must not.
    let mut resubmit_payload = submission_payload("EXT-LOCK", 9, 9);
    resubmit_payload["location"] = json!("Field 7");
    let resubmitted = test_app
        .client
        .post(test_app.url("/api/matches/submit"))
        .bearer_auth(&admin_token)
        .json(&resubmit_payload)
        .send()
        .await
        .expect("resubmit request failed");
    assert_eq!(202, resubmitted.status().as_u16());
    worker.run_once(Duration::from_millis(50)).await.expect("worker run_once failed");

    let fetched: serde_json::Value = test_app
        .client
        .get(test_app.url(&format!("/api/matches/{match_id}")))
        .send()
        .await
        .expect("get match failed")
        .json()
        .await
        .expect("response was not json");
    assert_eq!(fetched["home_score"], 3);
    assert_eq!(fetched["away_score"], 3);
    assert_eq!(fetched["location"], "Field 7");
}
