//! Query Service (spec.md §4.8/C8): standings computation and the
//! composite "with names" reads the Store Gateway's own interface doesn't
//! attempt to denormalize itself (spec.md §4.1 — "team with club/league,
//! match with denormalized names" are composed here from plain entity
//! reads, not pushed down into the gateway as bespoke joins).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CacheLayer;
use crate::errors::AppError;
use crate::models::match_entity::{Match, MatchFilter, MatchStatus, MatchWithNames};
use crate::models::team::{TeamFilter, TeamWithDetails};
use crate::store::StoreGateway;

const STANDINGS_TTL: Duration = Duration::from_secs(120);

/// One team's row in a standings table (spec.md §4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team_id: Uuid,
    pub team_name: String,
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
}

fn row_for<'a>(rows: &'a mut HashMap<Uuid, StandingsRow>, id: Uuid, name: &str) -> &'a mut StandingsRow {
    rows.entry(id).or_insert_with(|| StandingsRow {
        team_id: id,
        team_name: name.to_string(),
        played: 0,
        wins: 0,
        draws: 0,
        losses: 0,
        goals_for: 0,
        goals_against: 0,
        goal_difference: 0,
        points: 0,
    })
}

pub struct QueryService {
    store: Arc<dyn StoreGateway>,
    cache: CacheLayer,
}

impl QueryService {
    pub fn new(store: Arc<dyn StoreGateway>, cache: CacheLayer) -> Self {
        Self { store, cache }
    }

    /// Standings for one (league, division, season, age_group) scope, cached
    /// by that key and invalidated by the ingestion worker and match
    /// handlers on any write that touches the scope (spec.md §4.8).
    #[tracing::instrument(skip(self))]
    pub async fn standings(
        &self,
        league_id: Uuid,
        division_id: Uuid,
        season_id: Uuid,
        age_group_id: Uuid,
    ) -> Result<Vec<StandingsRow>, AppError> {
        let key = crate::cache::standings_key(league_id, division_id, season_id, age_group_id);
        let store = self.store.clone();
        self.cache
            .get_or_load(&key, STANDINGS_TTL, || {
                Self::compute_standings(store, league_id, division_id, season_id, age_group_id)
            })
            .await
    }

    /// Ranking per spec.md §4.8: points desc, goal difference desc, goals
    /// for desc, team name asc — a total order, so repeated calls over the
    /// same match set are deterministic (S5, testable property 7).
    async fn compute_standings(
        store: Arc<dyn StoreGateway>,
        league_id: Uuid,
        division_id: Uuid,
        season_id: Uuid,
        age_group_id: Uuid,
    ) -> Result<Vec<StandingsRow>, AppError> {
        let filter = MatchFilter {
            season_id: Some(season_id),
            age_group_id: Some(age_group_id),
            division_id: Some(division_id),
            league_id: Some(league_id),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        let matches = store.list_matches(filter).await?;

        let mut rows: HashMap<Uuid, StandingsRow> = HashMap::new();
        for m in &matches {
            let (Some(home_score), Some(away_score)) = (m.home_score, m.away_score) else {
                continue;
            };
            let home_team = store.get_team(m.home_team_id).await?;
            let away_team = store.get_team(m.away_team_id).await?;

            {
                let home = row_for(&mut rows, m.home_team_id, &home_team.name);
                home.played += 1;
                home.goals_for += home_score;
                home.goals_against += away_score;
            }
            {
                let away = row_for(&mut rows, m.away_team_id, &away_team.name);
                away.played += 1;
                away.goals_for += away_score;
                away.goals_against += home_score;
            }

            use std::cmp::Ordering;
            match home_score.cmp(&away_score) {
                Ordering::Greater => {
                    row_for(&mut rows, m.home_team_id, &home_team.name).wins += 1;
                    row_for(&mut rows, m.home_team_id, &home_team.name).points += 3;
                    row_for(&mut rows, m.away_team_id, &away_team.name).losses += 1;
                }
                Ordering::Less => {
                    row_for(&mut rows, m.away_team_id, &away_team.name).wins += 1;
                    row_for(&mut rows, m.away_team_id, &away_team.name).points += 3;
                    row_for(&mut rows, m.home_team_id, &home_team.name).losses += 1;
                }
                Ordering::Equal => {
                    row_for(&mut rows, m.home_team_id, &home_team.name).draws += 1;
                    row_for(&mut rows, m.home_team_id, &home_team.name).points += 1;
                    row_for(&mut rows, m.away_team_id, &away_team.name).draws += 1;
                    row_for(&mut rows, m.away_team_id, &away_team.name).points += 1;
                }
            }
        }

        let mut out: Vec<StandingsRow> = rows
            .into_values()
            .map(|mut r| {
                r.goal_difference = r.goals_for - r.goals_against;
                r
            })
            .collect();

        out.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.goal_difference.cmp(&a.goal_difference))
                .then(b.goals_for.cmp(&a.goals_for))
                .then(a.team_name.cmp(&b.team_name))
        });

        Ok(out)
    }

    pub async fn team_with_details(&self, id: Uuid) -> Result<TeamWithDetails, AppError> {
        let team = self.store.get_team(id).await?;
        self.attach_team_details(team).await
    }

    pub async fn list_teams_with_details(&self, filter: TeamFilter) -> Result<Vec<TeamWithDetails>, AppError> {
        let teams = self.store.list_teams(filter).await?;
        let mut out = Vec::with_capacity(teams.len());
        for team in teams {
            out.push(self.attach_team_details(team).await?);
        }
        Ok(out)
    }

    async fn attach_team_details(&self, team: crate::models::team::Team) -> Result<TeamWithDetails, AppError> {
        let league = self.store.get_league(team.league_id).await?;
        let club_name = match team.club_id {
            Some(cid) => Some(self.store.get_club(cid).await?.name),
            None => None,
        };
        Ok(TeamWithDetails {
            team,
            club_name,
            league_name: league.name,
        })
    }

    pub async fn match_with_names(&self, id: Uuid) -> Result<MatchWithNames, AppError> {
        let m = self.store.get_match(id).await?;
        self.attach_match_names(m).await
    }

    pub async fn list_matches_with_names(&self, filter: MatchFilter) -> Result<Vec<MatchWithNames>, AppError> {
        let matches = self.store.list_matches(filter).await?;
        let mut out = Vec::with_capacity(matches.len());
        for m in matches {
            out.push(self.attach_match_names(m).await?);
        }
        Ok(out)
    }

    async fn attach_match_names(&self, m: Match) -> Result<MatchWithNames, AppError> {
        let home = self.store.get_team(m.home_team_id).await?;
        let away = self.store.get_team(m.away_team_id).await?;
        Ok(MatchWithNames {
            home_team_name: home.name,
            away_team_name: away.name,
            m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::models::club::CreateClubRequest;
    use crate::models::league::{CreateDivisionRequest, CreateLeagueRequest, CreateSeasonRequest};
    use crate::models::match_entity::MatchSource;
    use crate::models::team::CreateTeamRequest;
    use crate::store::memory::InMemoryStoreGateway;
    use chrono::Utc;

    async fn seeded() -> (Arc<InMemoryStoreGateway>, Uuid, Uuid, Uuid, Uuid, Uuid, Uuid, Uuid) {
        let store = Arc::new(InMemoryStoreGateway::new());
        let league = store
            .create_league(CreateLeagueRequest { name: "Metro Youth League".into() })
            .await
            .unwrap();
        let division = store
            .create_division(CreateDivisionRequest { name: "Northeast".into(), league_id: league.id, level: 0 })
            .await
            .unwrap();
        let season = store
            .create_season(CreateSeasonRequest {
                name: "2025-26".into(),
                start_date: Utc::now(),
                end_date: Utc::now() + chrono::Duration::days(300),
            })
            .await
            .unwrap();
        let age_group = store.create_age_group("U14".into()).await.unwrap();
        let club = store
            .create_club(CreateClubRequest {
                name: "IFA Academy".into(),
                city: None,
                website: None,
                description: None,
                pro_academy: false,
            })
            .await
            .unwrap();
        let team_a = store
            .create_team(CreateTeamRequest {
                name: "A".into(),
                city: None,
                club_id: Some(club.id),
                league_id: league.id,
                academy_team: false,
            })
            .await
            .unwrap();
        let team_b = store
            .create_team(CreateTeamRequest { name: "B".into(), city: None, club_id: None, league_id: league.id, academy_team: false })
            .await
            .unwrap();
        let team_c = store
            .create_team(CreateTeamRequest { name: "C".into(), city: None, club_id: None, league_id: league.id, academy_team: false })
            .await
            .unwrap();
        (store, league.id, division.id, season.id, age_group.id, team_a.id, team_b.id, team_c.id)
    }

    async fn completed_match(
        store: &InMemoryStoreGateway,
        league: Uuid,
        division: Uuid,
        season: Uuid,
        age_group: Uuid,
        match_type: Uuid,
        home: Uuid,
        away: Uuid,
        home_score: i32,
        away_score: i32,
    ) {
        store
            .create_match(Match {
                id: Uuid::new_v4(),
                home_team_id: home,
                away_team_id: away,
                home_score: Some(home_score),
                away_score: Some(away_score),
                match_date: Utc::now(),
                match_time: None,
                location: None,
                season_id: season,
                age_group_id: age_group,
                match_type_id: match_type,
                division_id: division,
                status: MatchStatus::Completed,
                external_match_id: None,
                source: MatchSource::Manual,
                score_locked: false,
                version: 1,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn standings_match_scenario_s5() {
        let (store, league, division, season, age_group, a, b, c) = seeded().await;
        let match_type = store.list_match_types().await.unwrap()[0].id;

        completed_match(&store, league, division, season, age_group, match_type, a, b, 3, 1).await;
        completed_match(&store, league, division, season, age_group, match_type, b, c, 2, 2).await;
        completed_match(&store, league, division, season, age_group, match_type, c, a, 0, 1).await;

        let query = QueryService::new(store, CacheLayer::disabled());
        let table = query.standings(league, division, season, age_group).await.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0].team_id, a);
        assert_eq!(table[0].points, 6);
        assert_eq!(table[0].goal_difference, 3);
        assert_eq!(table[1].team_id, b);
        assert_eq!(table[2].team_id, c);
        assert_eq!(table[1].points, 1);
        assert_eq!(table[2].points, 1);
        assert!(table[1].goals_for >= table[2].goals_for);
    }

    #[tokio::test]
    async fn standings_are_deterministic_across_calls() {
        let (store, league, division, season, age_group, a, b, _c) = seeded().await;
        let match_type = store.list_match_types().await.unwrap()[0].id;
        completed_match(&store, league, division, season, age_group, match_type, a, b, 2, 0).await;

        let query = QueryService::new(store, CacheLayer::disabled());
        let first = query.standings(league, division, season, age_group).await.unwrap();
        let second = query.standings(league, division, season, age_group).await.unwrap();
        assert_eq!(first, second);
    }
}
