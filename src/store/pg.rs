//! Postgres-backed `StoreGateway`. One method body per operation, one
//! transaction per composite write, `sqlx::query!`/`query_as!` throughout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::club::{Club, ClubFilter, CreateClubRequest, UpdateClubRequest};
use crate::models::invitation::{Invitation, InviteStatus};
use crate::models::league::{
    AgeGroup, CreateDivisionRequest, CreateLeagueRequest, CreateSeasonRequest, Division, League,
    MatchType, Season,
};
use crate::models::match_entity::{Match, MatchFilter, MatchNaturalKey};
use crate::models::player_history::PlayerTeamHistory;
use crate::models::team::{CreateTeamRequest, Team, TeamFilter, TeamManagerAssignment, UpdateTeamRequest};
use crate::models::user::UserProfile;

use super::{SchemaVersion, StoreError, StoreGateway, StoreResult, UpsertOutcome};

pub struct PgStoreGateway {
    pool: PgPool,
}

impl PgStoreGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Transient(e.to_string()),
            other => StoreError::Transient(other.to_string()),
        }
    }
}

#[async_trait]
impl StoreGateway for PgStoreGateway {
    async fn create_club(&self, req: CreateClubRequest) -> StoreResult<Club> {
        let club = sqlx::query_as!(
            Club,
            r#"
            INSERT INTO clubs (id, name, city, website, description, pro_academy, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, true, now(), now())
            RETURNING id, name, city, website, description, pro_academy, is_active, created_at, updated_at
            "#,
            Uuid::new_v4(),
            req.name,
            req.city,
            req.website,
            req.description,
            req.pro_academy,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(club)
    }

    async fn get_club(&self, id: Uuid) -> StoreResult<Club> {
        let club = sqlx::query_as!(
            Club,
            r#"SELECT id, name, city, website, description, pro_academy, is_active, created_at, updated_at
               FROM clubs WHERE id = $1"#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("club".into()))?;
        Ok(club)
    }

    async fn list_clubs(&self, filter: ClubFilter) -> StoreResult<Vec<Club>> {
        let clubs = sqlx::query_as!(
            Club,
            r#"SELECT id, name, city, website, description, pro_academy, is_active, created_at, updated_at
               FROM clubs WHERE ($1::bool IS NULL OR is_active = $1) ORDER BY name"#,
            filter.is_active,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(clubs)
    }

    async fn update_club(&self, id: Uuid, req: UpdateClubRequest) -> StoreResult<Club> {
        let club = sqlx::query_as!(
            Club,
            r#"
            UPDATE clubs SET
                name = COALESCE($2, name),
                city = COALESCE($3, city),
                website = COALESCE($4, website),
                description = COALESCE($5, description),
                pro_academy = COALESCE($6, pro_academy),
                is_active = COALESCE($7, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, city, website, description, pro_academy, is_active, created_at, updated_at
            "#,
            id,
            req.name,
            req.city,
            req.website,
            req.description,
            req.pro_academy,
            req.is_active,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("club".into()))?;
        Ok(club)
    }

    async fn delete_club(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query!("UPDATE clubs SET is_active = false, updated_at = now() WHERE id = $1", id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("club".into()));
        }
        Ok(())
    }

    async fn find_club_by_name(&self, name: &str) -> StoreResult<Option<Club>> {
        let club = sqlx::query_as!(
            Club,
            r#"SELECT id, name, city, website, description, pro_academy, is_active, created_at, updated_at
               FROM clubs WHERE name = $1"#,
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(club)
    }

    async fn create_league(&self, req: CreateLeagueRequest) -> StoreResult<League> {
        let league = sqlx::query_as!(
            League,
            r#"INSERT INTO leagues (id, name, is_active, created_at, updated_at)
               VALUES ($1, $2, true, now(), now())
               RETURNING id, name, is_active, created_at, updated_at"#,
            Uuid::new_v4(),
            req.name,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(league)
    }

    async fn get_league(&self, id: Uuid) -> StoreResult<League> {
        let league = sqlx::query_as!(
            League,
            "SELECT id, name, is_active, created_at, updated_at FROM leagues WHERE id = $1",
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("league".into()))?;
        Ok(league)
    }

    async fn list_leagues(&self) -> StoreResult<Vec<League>> {
        let leagues = sqlx::query_as!(
            League,
            "SELECT id, name, is_active, created_at, updated_at FROM leagues ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(leagues)
    }

    async fn find_league_by_name(&self, name: &str) -> StoreResult<Option<League>> {
        let league = sqlx::query_as!(
            League,
            "SELECT id, name, is_active, created_at, updated_at FROM leagues WHERE name = $1",
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(league)
    }

    async fn create_division(&self, req: CreateDivisionRequest) -> StoreResult<Division> {
        let division = sqlx::query_as!(
            Division,
            r#"INSERT INTO divisions (id, name, league_id, level, created_at, updated_at)
               VALUES ($1, $2, $3, $4, now(), now())
               RETURNING id, name, league_id, level, created_at, updated_at"#,
            Uuid::new_v4(),
            req.name,
            req.league_id,
            req.level,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(division)
    }

    async fn get_division(&self, id: Uuid) -> StoreResult<Division> {
        let division = sqlx::query_as!(
            Division,
            "SELECT id, name, league_id, level, created_at, updated_at FROM divisions WHERE id = $1",
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("division".into()))?;
        Ok(division)
    }

    async fn find_division_by_name(&self, league_id: Uuid, name: &str) -> StoreResult<Option<Division>> {
        let division = sqlx::query_as!(
            Division,
            "SELECT id, name, league_id, level, created_at, updated_at FROM divisions WHERE league_id = $1 AND name = $2",
            league_id,
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(division)
    }

    async fn create_age_group(&self, name: String) -> StoreResult<AgeGroup> {
        let age_group = sqlx::query_as!(
            AgeGroup,
            r#"INSERT INTO age_groups (id, name, created_at) VALUES ($1, $2, now())
               ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, name, created_at"#,
            Uuid::new_v4(),
            name,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(age_group)
    }

    async fn get_age_group(&self, id: Uuid) -> StoreResult<AgeGroup> {
        let age_group = sqlx::query_as!(
            AgeGroup,
            "SELECT id, name, created_at FROM age_groups WHERE id = $1",
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("age group".into()))?;
        Ok(age_group)
    }

    async fn find_age_group_by_name(&self, name: &str) -> StoreResult<Option<AgeGroup>> {
        let age_group = sqlx::query_as!(
            AgeGroup,
            "SELECT id, name, created_at FROM age_groups WHERE name = $1",
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(age_group)
    }

    async fn list_age_groups(&self) -> StoreResult<Vec<AgeGroup>> {
        let rows = sqlx::query_as!(AgeGroup, "SELECT id, name, created_at FROM age_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_season(&self, req: CreateSeasonRequest) -> StoreResult<Season> {
        let season = sqlx::query_as!(
            Season,
            r#"INSERT INTO seasons (id, name, start_date, end_date, is_active, created_at)
               VALUES ($1, $2, $3, $4, true, now())
               RETURNING id, name, start_date, end_date, is_active, created_at"#,
            Uuid::new_v4(),
            req.name,
            req.start_date,
            req.end_date,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(season)
    }

    async fn get_season(&self, id: Uuid) -> StoreResult<Season> {
        let season = sqlx::query_as!(
            Season,
            "SELECT id, name, start_date, end_date, is_active, created_at FROM seasons WHERE id = $1",
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("season".into()))?;
        Ok(season)
    }

    async fn find_season_by_name(&self, name: &str) -> StoreResult<Option<Season>> {
        let season = sqlx::query_as!(
            Season,
            "SELECT id, name, start_date, end_date, is_active, created_at FROM seasons WHERE name = $1",
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(season)
    }

    async fn list_seasons(&self) -> StoreResult<Vec<Season>> {
        let rows = sqlx::query_as!(
            Season,
            "SELECT id, name, start_date, end_date, is_active, created_at FROM seasons ORDER BY start_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_match_type(&self, id: Uuid) -> StoreResult<MatchType> {
        let row = sqlx::query_as!(
            MatchType,
            r#"SELECT id, name, kind as "kind: _" FROM match_types WHERE id = $1"#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("match type".into()))?;
        Ok(row)
    }

    async fn find_match_type_by_name(&self, name: &str) -> StoreResult<Option<MatchType>> {
        let row = sqlx::query_as!(
            MatchType,
            r#"SELECT id, name, kind as "kind: _" FROM match_types WHERE lower(name) = lower($1)"#,
            name,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_match_types(&self) -> StoreResult<Vec<MatchType>> {
        let rows = sqlx::query_as!(MatchType, r#"SELECT id, name, kind as "kind: _" FROM match_types ORDER BY name"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_team(&self, req: CreateTeamRequest) -> StoreResult<Team> {
        let team = sqlx::query_as!(
            Team,
            r#"INSERT INTO teams (id, name, city, club_id, league_id, academy_team, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, now(), now())
               RETURNING id, name, city, club_id, league_id, academy_team, created_at, updated_at"#,
            Uuid::new_v4(),
            req.name,
            req.city,
            req.club_id,
            req.league_id,
            req.academy_team,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(team)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Team> {
        let team = sqlx::query_as!(
            Team,
            "SELECT id, name, city, club_id, league_id, academy_team, created_at, updated_at FROM teams WHERE id = $1",
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("team".into()))?;
        Ok(team)
    }

    async fn list_teams(&self, filter: TeamFilter) -> StoreResult<Vec<Team>> {
        let teams = sqlx::query_as!(
            Team,
            r#"SELECT id, name, city, club_id, league_id, academy_team, created_at, updated_at
               FROM teams
               WHERE ($1::uuid IS NULL OR club_id = $1) AND ($2::uuid IS NULL OR league_id = $2)
               ORDER BY name"#,
            filter.club_id,
            filter.league_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn update_team(&self, id: Uuid, req: UpdateTeamRequest) -> StoreResult<Team> {
        let team = sqlx::query_as!(
            Team,
            r#"
            UPDATE teams SET
                name = COALESCE($2, name),
                city = COALESCE($3, city),
                club_id = COALESCE($4, club_id),
                academy_team = COALESCE($5, academy_team),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, city, club_id, league_id, academy_team, created_at, updated_at
            "#,
            id,
            req.name,
            req.city,
            req.club_id,
            req.academy_team,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("team".into()))?;
        Ok(team)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query!("DELETE FROM teams WHERE id = $1", id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("team".into()));
        }
        Ok(())
    }

    async fn find_team_by_name(&self, name: &str, league_id: Uuid) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as!(
            Team,
            r#"SELECT id, name, city, club_id, league_id, academy_team, created_at, updated_at
               FROM teams WHERE lower(name) = lower($1) AND league_id = $2"#,
            name,
            league_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn assign_team_manager(&self, user_id: Uuid, team_id: Uuid) -> StoreResult<()> {
        sqlx::query!(
            r#"INSERT INTO team_manager_assignments (user_id, team_id, created_at)
               VALUES ($1, $2, now())
               ON CONFLICT (user_id, team_id) DO NOTHING"#,
            user_id,
            team_id,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn manager_assignments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TeamManagerAssignment>> {
        let rows = sqlx::query_as!(
            TeamManagerAssignment,
            "SELECT user_id, team_id, created_at FROM team_manager_assignments WHERE user_id = $1",
            user_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_profile(&self, profile: UserProfile) -> StoreResult<UserProfile> {
        let row = sqlx::query_as!(
            UserProfile,
            r#"
            INSERT INTO user_profiles (
                id, username, email, phone_number, role, team_id, club_id, display_name,
                player_number, positions, assigned_age_group_id, invited_via_code,
                created_at, updated_at, last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now(), now(), NULL)
            RETURNING id, username, email, phone_number, role as "role: _", team_id, club_id,
                      display_name, player_number, positions, assigned_age_group_id,
                      invited_via_code, created_at, updated_at, last_login
            "#,
            profile.id,
            profile.username,
            profile.email,
            profile.phone_number,
            profile.role as _,
            profile.team_id,
            profile.club_id,
            profile.display_name,
            profile.player_number,
            &profile.positions,
            profile.assigned_age_group_id,
            profile.invited_via_code,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<UserProfile> {
        let row = sqlx::query_as!(
            UserProfile,
            r#"SELECT id, username, email, phone_number, role as "role: _", team_id, club_id,
                      display_name, player_number, positions, assigned_age_group_id,
                      invited_via_code, created_at, updated_at, last_login
               FROM user_profiles WHERE id = $1"#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("profile".into()))?;
        Ok(row)
    }

    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query_as!(
            UserProfile,
            r#"SELECT id, username, email, phone_number, role as "role: _", team_id, club_id,
                      display_name, player_number, positions, assigned_age_group_id,
                      invited_via_code, created_at, updated_at, last_login
               FROM user_profiles WHERE username = $1"#,
            username,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut UserProfile) + Send>,
    ) -> StoreResult<UserProfile> {
        let mut tx = self.pool.begin().await?;
        let mut row = sqlx::query_as!(
            UserProfile,
            r#"SELECT id, username, email, phone_number, role as "role: _", team_id, club_id,
                      display_name, player_number, positions, assigned_age_group_id,
                      invited_via_code, created_at, updated_at, last_login
               FROM user_profiles WHERE id = $1 FOR UPDATE"#,
            id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound("profile".into()))?;

        mutate(&mut row);
        row.updated_at = Utc::now();

        sqlx::query!(
            r#"
            UPDATE user_profiles SET
                email = $2, phone_number = $3, display_name = $4, player_number = $5,
                positions = $6, updated_at = $7
            WHERE id = $1
            "#,
            id,
            row.email,
            row.phone_number,
            row.display_name,
            row.player_number,
            &row.positions,
            row.updated_at,
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query!("UPDATE user_profiles SET last_login = $2 WHERE id = $1", id, at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_invitation(&self, invite: Invitation) -> StoreResult<Invitation> {
        let row = sqlx::query_as!(
            Invitation,
            r#"
            INSERT INTO invitations (
                id, code, invite_type, team_id, club_id, age_group_id, max_uses, current_uses,
                expires_at, status, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, 'pending', $9, now())
            RETURNING id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
            "#,
            invite.id,
            invite.code,
            invite.invite_type as _,
            invite.team_id,
            invite.club_id,
            invite.age_group_id,
            invite.max_uses,
            invite.expires_at,
            invite.created_by,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        let row = sqlx::query_as!(
            Invitation,
            r#"SELECT id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
               FROM invitations WHERE id = $1"#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("invitation".into()))?;
        Ok(row)
    }

    async fn find_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as!(
            Invitation,
            r#"SELECT id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
               FROM invitations WHERE code = $1"#,
            code,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_invitations(&self, created_by: Option<Uuid>) -> StoreResult<Vec<Invitation>> {
        let rows = sqlx::query_as!(
            Invitation,
            r#"SELECT id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
               FROM invitations
               WHERE ($1::uuid IS NULL OR created_by = $1)
               ORDER BY created_at DESC"#,
            created_by,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Single conditional `UPDATE ... RETURNING` — the compare-and-increment
    /// that makes concurrent consume attempts on the same code safe without a
    /// transaction.
    async fn try_consume_invitation(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as!(
            Invitation,
            r#"
            UPDATE invitations
            SET current_uses = current_uses + 1,
                status = CASE WHEN current_uses + 1 >= max_uses THEN 'consumed' ELSE status END
            WHERE code = $1 AND status = 'pending' AND current_uses < max_uses AND expires_at > $2
            RETURNING id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
            "#,
            code,
            now,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn cancel_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        let row = sqlx::query_as!(
            Invitation,
            r#"
            UPDATE invitations SET status = 'cancelled'
            WHERE id = $1 AND status = 'pending'
            RETURNING id, code, invite_type as "invite_type: _", team_id, club_id, age_group_id,
                      max_uses, current_uses, expires_at, status as "status: _", created_by, created_at
            "#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::InvariantViolation("only pending invites may be cancelled".into()))?;
        Ok(row)
    }

    async fn upsert_player_history(&self, row: PlayerTeamHistory) -> StoreResult<PlayerTeamHistory> {
        let mut tx = self.pool.begin().await?;
        if row.is_current {
            sqlx::query!(
                "UPDATE player_team_history SET is_current = false WHERE player_id = $1 AND season_id <> $2",
                row.player_id,
                row.season_id,
            )
            .execute(&mut *tx)
            .await?;
        }
        let stored = sqlx::query_as!(
            PlayerTeamHistory,
            r#"
            INSERT INTO player_team_history (
                player_id, team_id, season_id, league_id, division_id, age_group_id,
                jersey_number, positions, is_current, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (player_id, team_id, season_id) DO UPDATE SET
                league_id = EXCLUDED.league_id,
                division_id = EXCLUDED.division_id,
                age_group_id = EXCLUDED.age_group_id,
                jersey_number = EXCLUDED.jersey_number,
                positions = EXCLUDED.positions,
                is_current = EXCLUDED.is_current
            RETURNING player_id, team_id, season_id, league_id, division_id, age_group_id,
                      jersey_number, positions, is_current, created_at
            "#,
            row.player_id,
            row.team_id,
            row.season_id,
            row.league_id,
            row.division_id,
            row.age_group_id,
            row.jersey_number,
            &row.positions,
            row.is_current,
        )
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn current_history_for_player(&self, player_id: Uuid) -> StoreResult<Option<PlayerTeamHistory>> {
        let row = sqlx::query_as!(
            PlayerTeamHistory,
            r#"SELECT player_id, team_id, season_id, league_id, division_id, age_group_id,
                      jersey_number, positions, is_current, created_at
               FROM player_team_history WHERE player_id = $1 AND is_current = true"#,
            player_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Match> {
        let row = sqlx::query_as!(
            Match,
            r#"SELECT id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
               FROM matches WHERE id = $1"#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("match".into()))?;
        Ok(row)
    }

    async fn list_matches(&self, filter: MatchFilter) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query_as!(
            Match,
            r#"
            SELECT m.id, m.home_team_id, m.away_team_id, m.home_score, m.away_score, m.match_date,
                   m.match_time, m.location, m.season_id, m.age_group_id, m.match_type_id,
                   m.division_id, m.status as "status: _", m.external_match_id,
                   m.source as "source: _", m.score_locked, m.version, m.created_at, m.updated_at
            FROM matches m
            JOIN divisions d ON d.id = m.division_id
            WHERE ($1::uuid IS NULL OR m.season_id = $1)
              AND ($2::uuid IS NULL OR m.age_group_id = $2)
              AND ($3::uuid IS NULL OR m.division_id = $3)
              AND ($4::uuid IS NULL OR d.league_id = $4)
              AND ($5::varchar IS NULL OR m.status = $5)
              AND ($6::uuid IS NULL OR m.home_team_id = $6 OR m.away_team_id = $6)
              AND ($7::timestamptz IS NULL OR m.match_date >= $7)
              AND ($8::timestamptz IS NULL OR m.match_date <= $8)
            ORDER BY m.match_date DESC
            "#,
            filter.season_id,
            filter.age_group_id,
            filter.division_id,
            filter.league_id,
            filter.status.map(|s| s.to_string()),
            filter.team_id,
            filter.date_from,
            filter.date_to,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_match_by_external_id(&self, external_match_id: &str) -> StoreResult<Option<Match>> {
        let row = sqlx::query_as!(
            Match,
            r#"SELECT id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
               FROM matches WHERE external_match_id = $1"#,
            external_match_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_match_by_natural_key(&self, key: &MatchNaturalKey) -> StoreResult<Option<Match>> {
        let row = sqlx::query_as!(
            Match,
            r#"SELECT id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
               FROM matches
               WHERE home_team_id = $1 AND away_team_id = $2 AND match_date = $3 AND season_id = $4
                 AND age_group_id = $5 AND match_type_id = $6 AND division_id = $7"#,
            key.home_team_id,
            key.away_team_id,
            key.match_date,
            key.season_id,
            key.age_group_id,
            key.match_type_id,
            key.division_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_match(&self, m: Match) -> StoreResult<Match> {
        m.validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;
        let row = sqlx::query_as!(
            Match,
            r#"
            INSERT INTO matches (
                id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                location, season_id, age_group_id, match_type_id, division_id, status,
                external_match_id, source, score_locked, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 1, now(), now())
            RETURNING id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
            "#,
            m.id,
            m.home_team_id,
            m.away_team_id,
            m.home_score,
            m.away_score,
            m.match_date,
            m.match_time,
            m.location,
            m.season_id,
            m.age_group_id,
            m.match_type_id,
            m.division_id,
            m.status as _,
            m.external_match_id,
            m.source as _,
            m.score_locked,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_match(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query!("DELETE FROM matches WHERE id = $1", id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("match".into()));
        }
        Ok(())
    }

    async fn manual_update_match(
        &self,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut Match) + Send>,
    ) -> StoreResult<Match> {
        let mut tx = self.pool.begin().await?;
        let mut m = sqlx::query_as!(
            Match,
            r#"SELECT id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
               FROM matches WHERE id = $1 FOR UPDATE"#,
            id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound("match".into()))?;

        mutate(&mut m);
        m.validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;
        m.version += 1;
        m.updated_at = Utc::now();

        sqlx::query!(
            r#"
            UPDATE matches SET
                home_score = $2, away_score = $3, match_date = $4, match_time = $5, location = $6,
                status = $7, score_locked = $8, version = $9, updated_at = $10
            WHERE id = $1
            "#,
            id,
            m.home_score,
            m.away_score,
            m.match_date,
            m.match_time,
            m.location,
            m.status as _,
            m.score_locked,
            m.version,
            m.updated_at,
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(m)
    }

    /// Ingestion upsert: one transaction, `SELECT ... FOR UPDATE` to pin the
    /// row before applying the score lock and bumping `version` —
    /// `score_locked` rows never have their score overwritten by ingestion,
    /// only by `manual_update_match`.
    async fn upsert_match_from_ingestion(
        &self,
        existing_id: Option<Uuid>,
        incoming: Match,
    ) -> StoreResult<(Match, UpsertOutcome)> {
        incoming
            .validate_teams_and_scores()
            .map_err(StoreError::InvariantViolation)?;

        let mut tx = self.pool.begin().await?;

        let Some(id) = existing_id else {
            let row = sqlx::query_as!(
                Match,
                r#"
                INSERT INTO matches (
                    id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                    location, season_id, age_group_id, match_type_id, division_id, status,
                    external_match_id, source, score_locked, version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'scraper', false, 1, now(), now())
                RETURNING id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                          location, season_id, age_group_id, match_type_id, division_id,
                          status as "status: _", external_match_id, source as "source: _", score_locked,
                          version, created_at, updated_at
                "#,
                Uuid::new_v4(),
                incoming.home_team_id,
                incoming.away_team_id,
                incoming.home_score,
                incoming.away_score,
                incoming.match_date,
                incoming.match_time,
                incoming.location,
                incoming.season_id,
                incoming.age_group_id,
                incoming.match_type_id,
                incoming.division_id,
                incoming.status as _,
                incoming.external_match_id,
            )
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok((row, UpsertOutcome::Created));
        };

        let existing = sqlx::query_as!(
            Match,
            r#"SELECT id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
               FROM matches WHERE id = $1 FOR UPDATE"#,
            id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound("match".into()))?;

        let (new_home_score, new_away_score) = if existing.score_locked {
            (existing.home_score, existing.away_score)
        } else {
            (incoming.home_score, incoming.away_score)
        };
        let new_external_id = existing.external_match_id.clone().or(incoming.external_match_id.clone());

        let unchanged = existing.status == incoming.status
            && existing.home_score == new_home_score
            && existing.away_score == new_away_score
            && existing.location == incoming.location
            && existing.match_time == incoming.match_time
            && existing.match_date == incoming.match_date;
        if unchanged {
            tx.commit().await?;
            return Ok((existing, UpsertOutcome::Skipped));
        }

        let row = sqlx::query_as!(
            Match,
            r#"
            UPDATE matches SET
                home_score = $2, away_score = $3, match_date = $4, match_time = $5, location = $6,
                status = $7, external_match_id = $8, version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $9
            RETURNING id, home_team_id, away_team_id, home_score, away_score, match_date, match_time,
                      location, season_id, age_group_id, match_type_id, division_id,
                      status as "status: _", external_match_id, source as "source: _", score_locked,
                      version, created_at, updated_at
            "#,
            id,
            new_home_score,
            new_away_score,
            incoming.match_date,
            incoming.match_time,
            incoming.location,
            incoming.status as _,
            new_external_id,
            existing.version,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Transient("match version changed concurrently".into()))?;

        tx.commit().await?;
        Ok((row, UpsertOutcome::Updated))
    }

    async fn current_schema_version(&self) -> StoreResult<SchemaVersion> {
        let row = sqlx::query!(
            "SELECT major, minor, patch FROM schema_versions ORDER BY major DESC, minor DESC, patch DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => Ok(SchemaVersion {
                major: r.major,
                minor: r.minor,
                patch: r.patch,
            }),
            None => Err(StoreError::Transient("no schema_versions row applied".into())),
        }
    }
}
