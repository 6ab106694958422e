//! `InMemoryStoreGateway` — enforces the same invariants as the Postgres
//! implementation in plain Rust, so unit and service-level tests don't need
//! a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::club::{Club, ClubFilter, CreateClubRequest, UpdateClubRequest};
use crate::models::invitation::{Invitation, InviteStatus};
use crate::models::league::{
    AgeGroup, CreateDivisionRequest, CreateLeagueRequest, CreateSeasonRequest, Division, League,
    MatchType, MatchTypeKind, Season,
};
use crate::models::match_entity::{Match, MatchFilter, MatchNaturalKey, MatchStatus};
use crate::models::player_history::PlayerTeamHistory;
use crate::models::team::{CreateTeamRequest, Team, TeamFilter, TeamManagerAssignment, UpdateTeamRequest};
use crate::models::user::UserProfile;

use super::{SchemaVersion, StoreError, StoreGateway, StoreResult, UpsertOutcome};

#[derive(Default)]
struct Tables {
    clubs: HashMap<Uuid, Club>,
    leagues: HashMap<Uuid, League>,
    divisions: HashMap<Uuid, Division>,
    age_groups: HashMap<Uuid, AgeGroup>,
    seasons: HashMap<Uuid, Season>,
    match_types: HashMap<Uuid, MatchType>,
    teams: HashMap<Uuid, Team>,
    manager_assignments: Vec<TeamManagerAssignment>,
    profiles: HashMap<Uuid, UserProfile>,
    invitations: HashMap<Uuid, Invitation>,
    player_history: HashMap<(Uuid, Uuid, Uuid), PlayerTeamHistory>,
    matches: HashMap<Uuid, Match>,
}

pub struct InMemoryStoreGateway {
    tables: RwLock<Tables>,
}

impl InMemoryStoreGateway {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        // Seed the four default match types.
        for (name, kind) in [
            ("League", MatchTypeKind::League),
            ("Friendly", MatchTypeKind::Friendly),
            ("Tournament", MatchTypeKind::Tournament),
            ("Playoff", MatchTypeKind::Playoff),
        ] {
            let id = Uuid::new_v4();
            tables.match_types.insert(
                id,
                MatchType {
                    id,
                    name: name.to_string(),
                    kind,
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for InMemoryStoreGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreGateway for InMemoryStoreGateway {
    async fn create_club(&self, req: CreateClubRequest) -> StoreResult<Club> {
        let mut t = self.tables.write().await;
        if t.clubs.values().any(|c| c.name == req.name) {
            return Err(StoreError::Conflict(format!("club '{}' already exists", req.name)));
        }
        let now = Utc::now();
        let club = Club {
            id: Uuid::new_v4(),
            name: req.name,
            city: req.city,
            website: req.website,
            description: req.description,
            pro_academy: req.pro_academy,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.clubs.insert(club.id, club.clone());
        Ok(club)
    }

    async fn get_club(&self, id: Uuid) -> StoreResult<Club> {
        self.tables
            .read()
            .await
            .clubs
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("club".into()))
    }

    async fn list_clubs(&self, filter: ClubFilter) -> StoreResult<Vec<Club>> {
        let t = self.tables.read().await;
        Ok(t.clubs
            .values()
            .filter(|c| filter.is_active.map_or(true, |a| a == c.is_active))
            .cloned()
            .collect())
    }

    async fn update_club(&self, id: Uuid, req: UpdateClubRequest) -> StoreResult<Club> {
        let mut t = self.tables.write().await;
        let club = t
            .clubs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("club".into()))?;
        if let Some(name) = req.name {
            club.name = name;
        }
        if let Some(city) = req.city {
            club.city = Some(city);
        }
        if let Some(website) = req.website {
            club.website = Some(website);
        }
        if let Some(description) = req.description {
            club.description = Some(description);
        }
        if let Some(pro_academy) = req.pro_academy {
            club.pro_academy = pro_academy;
        }
        if let Some(is_active) = req.is_active {
            club.is_active = is_active;
        }
        club.updated_at = Utc::now();
        Ok(club.clone())
    }

    async fn delete_club(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let club = t
            .clubs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("club".into()))?;
        club.is_active = false;
        club.updated_at = Utc::now();
        Ok(())
    }

    async fn find_club_by_name(&self, name: &str) -> StoreResult<Option<Club>> {
        Ok(self.tables.read().await.clubs.values().find(|c| c.name == name).cloned())
    }

    async fn create_league(&self, req: CreateLeagueRequest) -> StoreResult<League> {
        let mut t = self.tables.write().await;
        if t.leagues.values().any(|l| l.name == req.name) {
            return Err(StoreError::Conflict(format!("league '{}' already exists", req.name)));
        }
        let now = Utc::now();
        let league = League {
            id: Uuid::new_v4(),
            name: req.name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.leagues.insert(league.id, league.clone());
        Ok(league)
    }

    async fn get_league(&self, id: Uuid) -> StoreResult<League> {
        self.tables
            .read()
            .await
            .leagues
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("league".into()))
    }

    async fn list_leagues(&self) -> StoreResult<Vec<League>> {
        Ok(self.tables.read().await.leagues.values().cloned().collect())
    }

    async fn find_league_by_name(&self, name: &str) -> StoreResult<Option<League>> {
        Ok(self.tables.read().await.leagues.values().find(|l| l.name == name).cloned())
    }

    async fn create_division(&self, req: CreateDivisionRequest) -> StoreResult<Division> {
        let mut t = self.tables.write().await;
        if t.divisions
            .values()
            .any(|d| d.name == req.name && d.league_id == req.league_id)
        {
            return Err(StoreError::Conflict(format!(
                "division '{}' already exists in this league",
                req.name
            )));
        }
        let now = Utc::now();
        let division = Division {
            id: Uuid::new_v4(),
            name: req.name,
            league_id: req.league_id,
            level: req.level,
            created_at: now,
            updated_at: now,
        };
        t.divisions.insert(division.id, division.clone());
        Ok(division)
    }

    async fn get_division(&self, id: Uuid) -> StoreResult<Division> {
        self.tables
            .read()
            .await
            .divisions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("division".into()))
    }

    async fn find_division_by_name(&self, league_id: Uuid, name: &str) -> StoreResult<Option<Division>> {
        Ok(self
            .tables
            .read()
            .await
            .divisions
            .values()
            .find(|d| d.league_id == league_id && d.name == name)
            .cloned())
    }

    async fn create_age_group(&self, name: String) -> StoreResult<AgeGroup> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.age_groups.values().find(|a| a.name == name) {
            return Ok(existing.clone());
        }
        let age_group = AgeGroup {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        };
        t.age_groups.insert(age_group.id, age_group.clone());
        Ok(age_group)
    }

    async fn get_age_group(&self, id: Uuid) -> StoreResult<AgeGroup> {
        self.tables
            .read()
            .await
            .age_groups
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("age group".into()))
    }

    async fn find_age_group_by_name(&self, name: &str) -> StoreResult<Option<AgeGroup>> {
        Ok(self
            .tables
            .read()
            .await
            .age_groups
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn list_age_groups(&self) -> StoreResult<Vec<AgeGroup>> {
        Ok(self.tables.read().await.age_groups.values().cloned().collect())
    }

    async fn create_season(&self, req: CreateSeasonRequest) -> StoreResult<Season> {
        let mut t = self.tables.write().await;
        if t.seasons.values().any(|s| s.name == req.name) {
            return Err(StoreError::Conflict(format!("season '{}' already exists", req.name)));
        }
        let season = Season {
            id: Uuid::new_v4(),
            name: req.name,
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: true,
            created_at: Utc::now(),
        };
        t.seasons.insert(season.id, season.clone());
        Ok(season)
    }

    async fn get_season(&self, id: Uuid) -> StoreResult<Season> {
        self.tables
            .read()
            .await
            .seasons
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("season".into()))
    }

    async fn find_season_by_name(&self, name: &str) -> StoreResult<Option<Season>> {
        Ok(self.tables.read().await.seasons.values().find(|s| s.name == name).cloned())
    }

    async fn list_seasons(&self) -> StoreResult<Vec<Season>> {
        Ok(self.tables.read().await.seasons.values().cloned().collect())
    }

    async fn get_match_type(&self, id: Uuid) -> StoreResult<MatchType> {
        self.tables
            .read()
            .await
            .match_types
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("match type".into()))
    }

    async fn find_match_type_by_name(&self, name: &str) -> StoreResult<Option<MatchType>> {
        Ok(self
            .tables
            .read()
            .await
            .match_types
            .values()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_match_types(&self) -> StoreResult<Vec<MatchType>> {
        Ok(self.tables.read().await.match_types.values().cloned().collect())
    }

    async fn create_team(&self, req: CreateTeamRequest) -> StoreResult<Team> {
        let mut t = self.tables.write().await;
        if t.teams.values().any(|team| {
            team.name == req.name && team.club_id == req.club_id && team.league_id == req.league_id
        }) {
            return Err(StoreError::Conflict(format!(
                "team '{}' already exists in this club/league",
                req.name
            )));
        }
        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name: req.name,
            city: req.city,
            club_id: req.club_id,
            league_id: req.league_id,
            academy_team: req.academy_team,
            created_at: now,
            updated_at: now,
        };
        t.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Team> {
        self.tables
            .read()
            .await
            .teams
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("team".into()))
    }

    async fn list_teams(&self, filter: TeamFilter) -> StoreResult<Vec<Team>> {
        let t = self.tables.read().await;
        Ok(t.teams
            .values()
            .filter(|team| filter.club_id.map_or(true, |c| team.club_id == Some(c)))
            .filter(|team| filter.league_id.map_or(true, |l| team.league_id == l))
            .cloned()
            .collect())
    }

    async fn update_team(&self, id: Uuid, req: UpdateTeamRequest) -> StoreResult<Team> {
        let mut t = self.tables.write().await;
        let team = t
            .teams
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("team".into()))?;
        if let Some(name) = req.name {
            team.name = name;
        }
        if let Some(city) = req.city {
            team.city = Some(city);
        }
        if req.club_id.is_some() {
            team.club_id = req.club_id;
        }
        if let Some(academy) = req.academy_team {
            team.academy_team = academy;
        }
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.teams.remove(&id).ok_or_else(|| StoreError::NotFound("team".into()))?;
        Ok(())
    }

    async fn find_team_by_name(&self, name: &str, league_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self
            .tables
            .read()
            .await
            .teams
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name) && t.league_id == league_id)
            .cloned())
    }

    async fn assign_team_manager(&self, user_id: Uuid, team_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if !t.manager_assignments
            .iter()
            .any(|a| a.user_id == user_id && a.team_id == team_id)
        {
            t.manager_assignments.push(TeamManagerAssignment {
                user_id,
                team_id,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn manager_assignments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TeamManagerAssignment>> {
        Ok(self
            .tables
            .read()
            .await
            .manager_assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_profile(&self, profile: UserProfile) -> StoreResult<UserProfile> {
        let mut t = self.tables.write().await;
        if t.profiles.values().any(|p| p.username == profile.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already taken",
                profile.username
            )));
        }
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<UserProfile> {
        self.tables
            .read()
            .await
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("profile".into()))
    }

    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut UserProfile) + Send>,
    ) -> StoreResult<UserProfile> {
        let mut t = self.tables.write().await;
        let profile = t
            .profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("profile".into()))?;
        mutate(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let profile = t
            .profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("profile".into()))?;
        profile.last_login = Some(at);
        Ok(())
    }

    async fn insert_invitation(&self, invite: Invitation) -> StoreResult<Invitation> {
        let mut t = self.tables.write().await;
        if t.invitations.values().any(|i| i.code == invite.code) {
            return Err(StoreError::Conflict("invite code collision".into()));
        }
        t.invitations.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        self.tables
            .read()
            .await
            .invitations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("invitation".into()))
    }

    async fn find_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>> {
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .values()
            .find(|i| i.code == code)
            .cloned())
    }

    async fn list_invitations(&self, created_by: Option<Uuid>) -> StoreResult<Vec<Invitation>> {
        let t = self.tables.read().await;
        Ok(t.invitations
            .values()
            .filter(|i| created_by.map_or(true, |c| i.created_by == c))
            .cloned()
            .collect())
    }

    async fn try_consume_invitation(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Option<Invitation>> {
        let mut t = self.tables.write().await;
        let Some(invite) = t.invitations.values_mut().find(|i| i.code == code) else {
            return Ok(None);
        };
        if invite.status != InviteStatus::Pending
            || invite.current_uses >= invite.max_uses
            || invite.expires_at <= now
        {
            return Ok(None);
        }
        invite.current_uses += 1;
        if invite.current_uses >= invite.max_uses {
            invite.status = InviteStatus::Consumed;
        }
        Ok(Some(invite.clone()))
    }

    async fn cancel_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        let mut t = self.tables.write().await;
        let invite = t
            .invitations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("invitation".into()))?;
        if invite.status != InviteStatus::Pending {
            return Err(StoreError::InvariantViolation(
                "only pending invites may be cancelled".into(),
            ));
        }
        invite.status = InviteStatus::Cancelled;
        Ok(invite.clone())
    }

    async fn upsert_player_history(&self, row: PlayerTeamHistory) -> StoreResult<PlayerTeamHistory> {
        let mut t = self.tables.write().await;
        if row.is_current {
            for existing in t.player_history.values_mut() {
                if existing.player_id == row.player_id && existing.season_id != row.season_id {
                    existing.is_current = false;
                }
            }
        }
        let key = (row.player_id, row.team_id, row.season_id);
        t.player_history.insert(key, row.clone());
        Ok(row)
    }

    async fn current_history_for_player(&self, player_id: Uuid) -> StoreResult<Option<PlayerTeamHistory>> {
        Ok(self
            .tables
            .read()
            .await
            .player_history
            .values()
            .find(|h| h.player_id == player_id && h.is_current)
            .cloned())
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Match> {
        self.tables
            .read()
            .await
            .matches
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("match".into()))
    }

    async fn list_matches(&self, filter: MatchFilter) -> StoreResult<Vec<Match>> {
        let t = self.tables.read().await;
        Ok(t.matches
            .values()
            .filter(|m| filter.season_id.map_or(true, |v| m.season_id == v))
            .filter(|m| filter.age_group_id.map_or(true, |v| m.age_group_id == v))
            .filter(|m| filter.division_id.map_or(true, |v| m.division_id == v))
            .filter(|m| {
                filter.league_id.map_or(true, |v| {
                    t.divisions.get(&m.division_id).is_some_and(|d| d.league_id == v)
                })
            })
            .filter(|m| filter.status.map_or(true, |v| m.status == v))
            .filter(|m| {
                filter
                    .team_id
                    .map_or(true, |v| m.home_team_id == v || m.away_team_id == v)
            })
            .filter(|m| filter.date_from.map_or(true, |v| m.match_date >= v))
            .filter(|m| filter.date_to.map_or(true, |v| m.match_date <= v))
            .cloned()
            .collect())
    }

    async fn find_match_by_external_id(&self, external_match_id: &str) -> StoreResult<Option<Match>> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .values()
            .find(|m| m.external_match_id.as_deref() == Some(external_match_id))
            .cloned())
    }

    async fn find_match_by_natural_key(&self, key: &MatchNaturalKey) -> StoreResult<Option<Match>> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .values()
            .find(|m| &m.natural_key() == key)
            .cloned())
    }

    async fn create_match(&self, m: Match) -> StoreResult<Match> {
        m.validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;
        let mut t = self.tables.write().await;
        t.matches.insert(m.id, m.clone());
        Ok(m)
    }

    async fn delete_match(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.matches.remove(&id).ok_or_else(|| StoreError::NotFound("match".into()))?;
        Ok(())
    }

    async fn manual_update_match(
        &self,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut Match) + Send>,
    ) -> StoreResult<Match> {
        let mut t = self.tables.write().await;
        let m = t
            .matches
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("match".into()))?;
        mutate(m);
        m.validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;
        m.version += 1;
        m.updated_at = Utc::now();
        Ok(m.clone())
    }

    async fn upsert_match_from_ingestion(
        &self,
        existing_id: Option<Uuid>,
        incoming: Match,
    ) -> StoreResult<(Match, UpsertOutcome)> {
        incoming
            .validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;
        let mut t = self.tables.write().await;
        let Some(id) = existing_id else {
            let mut row = incoming;
            row.id = Uuid::new_v4();
            row.version = 1;
            let now = Utc::now();
            row.created_at = now;
            row.updated_at = now;
            t.matches.insert(row.id, row.clone());
            return Ok((row, UpsertOutcome::Created));
        };
        let existing = t
            .matches
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("match".into()))?;

        let mut updated = existing.clone();
        updated.status = incoming.status;
        updated.match_time = incoming.match_time;
        updated.location = incoming.location.clone();
        updated.match_date = incoming.match_date;
        if !existing.score_locked {
            updated.home_score = incoming.home_score;
            updated.away_score = incoming.away_score;
        }
        if existing.external_match_id.is_none() {
            updated.external_match_id = incoming.external_match_id.clone();
        }

        let unchanged = updated.status == existing.status
            && updated.home_score == existing.home_score
            && updated.away_score == existing.away_score
            && updated.location == existing.location
            && updated.match_time == existing.match_time
            && updated.match_date == existing.match_date;
        if unchanged {
            return Ok((existing, UpsertOutcome::Skipped));
        }

        updated.version += 1;
        updated.updated_at = Utc::now();
        t.matches.insert(id, updated.clone());
        Ok((updated, UpsertOutcome::Updated))
    }

    async fn current_schema_version(&self) -> StoreResult<SchemaVersion> {
        Ok(SchemaVersion {
            major: 1,
            minor: 0,
            patch: 0,
        })
    }
}
