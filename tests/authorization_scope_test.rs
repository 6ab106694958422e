use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

mod common;
use common::utils::spawn_app;
use mintturf_backend::models::league::{CreateDivisionRequest, CreateLeagueRequest, CreateSeasonRequest, MatchTypeKind};
use mintturf_backend::models::match_entity::{Match, MatchSource, MatchStatus};
use mintturf_backend::models::team::CreateTeamRequest;
use mintturf_backend::models::user::Role;
use mintturf_backend::store::StoreGateway;

/// Builds the reference data a match needs (league/division/season/age
/// group/match type/two teams), all under one league, so the test below
/// only has to vary which teams a match is between.
async fn seed_fixture(store: &dyn StoreGateway) -> (Uuid, Uuid, Uuid, Uuid, Uuid, Uuid, Uuid) {
    let league = store
        .create_league(CreateLeagueRequest { name: format!("League-{}", Uuid::new_v4()) })
        .await
        .expect("create league failed");
    let division = store
        .create_division(CreateDivisionRequest { name: "Division A".into(), league_id: league.id, level: 1 })
        .await
        .expect("create division failed");
    let now = Utc::now();
    let season = store
        .create_season(CreateSeasonRequest {
            name: format!("Season-{}", Uuid::new_v4()),
            start_date: now,
            end_date: now + chrono::Duration::days(180),
        })
        .await
        .expect("create season failed");
    let age_group = store.create_age_group(format!("AgeGroup-{}", Uuid::new_v4())).await.expect("create age group failed");
    let match_type = store
        .list_match_types()
        .await
        .expect("list match types failed")
        .into_iter()
        .find(|m| m.kind == MatchTypeKind::League)
        .expect("league match type should be seeded by default");

    let team_a = store
        .create_team(CreateTeamRequest { name: "Team A".into(), city: None, club_id: None, league_id: league.id, academy_team: false })
        .await
        .expect("create team a failed");
    let team_b = store
        .create_team(CreateTeamRequest { name: "Team B".into(), city: None, club_id: None, league_id: league.id, academy_team: false })
        .await
        .expect("create team b failed");
    let team_c = store
        .create_team(CreateTeamRequest { name: "Team C".into(), city: None, club_id: None, league_id: league.id, academy_team: false })
        .await
        .expect("create team c failed");

    (team_a.id, team_b.id, team_c.id, season.id, age_group.id, match_type.id, division.id)
}

#[allow(clippy::too_many_arguments)]
async fn seed_match(
    store: &dyn StoreGateway,
    home_team_id: Uuid,
    away_team_id: Uuid,
    season_id: Uuid,
    age_group_id: Uuid,
    match_type_id: Uuid,
    division_id: Uuid,
) -> Uuid {
    let now = Utc::now();
    let m = Match {
        id: Uuid::new_v4(),
        home_team_id,
        away_team_id,
        home_score: None,
        away_score: None,
        match_date: now,
        match_time: None,
        location: Some("Field 1".into()),
        season_id,
        age_group_id,
        match_type_id,
        division_id,
        status: MatchStatus::Scheduled,
        external_match_id: None,
        source: MatchSource::Manual,
        score_locked: false,
        version: 1,
        created_at: now,
        updated_at: now,
    };
    store.create_match(m).await.expect("seed match failed").id
}

/// spec.md §8 S6: a team_manager assigned to team 10 may PATCH matches
/// involving team 10, whether it's the home or the away side, but not a
/// match between two teams they don't manage.
#[tokio::test]
async fn team_manager_may_update_matches_where_their_team_is_either_side() {
    let test_app = spawn_app().await;
    let (team_a, team_b, team_c, season_id, age_group_id, match_type_id, division_id) = seed_fixture(&*test_app.store).await;

    let manager = test_app.seed_user("away-side-manager", Role::TeamManager, "password123").await;
    test_app
        .store
        .assign_team_manager(manager.id, team_a)
        .await
        .expect("assign_team_manager failed");
    let (manager_token, _) = test_app.login("away-side-manager", "password123").await;

    // Team A is the away side here — must still be authorized.
    let match_id = seed_match(&*test_app.store, team_b, team_a, season_id, age_group_id, match_type_id, division_id).await;
    let response = test_app
        .client
        .patch(test_app.url(&format!("/api/matches/{match_id}")))
        .bearer_auth(&manager_token)
        .json(&json!({ "location": "Field 9" }))
        .send()
        .await
        .expect("patch request failed");
    assert_eq!(200, response.status().as_u16());

    // Neither side of this match is managed by this team_manager.
    let other_match_id = seed_match(&*test_app.store, team_b, team_c, season_id, age_group_id, match_type_id, division_id).await;
    let denied = test_app
        .client
        .patch(test_app.url(&format!("/api/matches/{other_match_id}")))
        .bearer_auth(&manager_token)
        .json(&json!({ "location": "Field 9" }))
        .send()
        .await
        .expect("patch request failed");
    assert_eq!(403, denied.status().as_u16());
}
