//! The capability interface Design Notes §9 mandates for "Polymorphic DAO
//! with multiple backends": one trait, one production Postgres
//! implementation, one in-memory implementation for tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::club::{Club, ClubFilter, CreateClubRequest, UpdateClubRequest};
use crate::models::invitation::Invitation;
use crate::models::league::{AgeGroup, CreateDivisionRequest, CreateLeagueRequest, CreateSeasonRequest, Division, League, MatchType, Season};
use crate::models::match_entity::{Match, MatchFilter, MatchNaturalKey};
use crate::models::player_history::PlayerTeamHistory;
use crate::models::team::{CreateTeamRequest, Team, TeamFilter, TeamManagerAssignment, UpdateTeamRequest};
use crate::models::user::UserProfile;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("{0}")]
    Transient(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A schema version triple, applied monotonically out-of-band (spec.md §1,
/// §6). The gateway only reports the highest applied version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Outcome of an ingestion upsert, used by the worker to build its
/// `{match_id, action}` result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Skipped,
}

#[async_trait]
pub trait StoreGateway: Send + Sync {
    // -- Club --
    async fn create_club(&self, req: CreateClubRequest) -> StoreResult<Club>;
    async fn get_club(&self, id: Uuid) -> StoreResult<Club>;
    async fn list_clubs(&self, filter: ClubFilter) -> StoreResult<Vec<Club>>;
    async fn update_club(&self, id: Uuid, req: UpdateClubRequest) -> StoreResult<Club>;
    async fn delete_club(&self, id: Uuid) -> StoreResult<()>;
    async fn find_club_by_name(&self, name: &str) -> StoreResult<Option<Club>>;

    // -- League / Division / AgeGroup / Season / MatchType --
    async fn create_league(&self, req: CreateLeagueRequest) -> StoreResult<League>;
    async fn get_league(&self, id: Uuid) -> StoreResult<League>;
    async fn list_leagues(&self) -> StoreResult<Vec<League>>;
    async fn find_league_by_name(&self, name: &str) -> StoreResult<Option<League>>;

    async fn create_division(&self, req: CreateDivisionRequest) -> StoreResult<Division>;
    async fn get_division(&self, id: Uuid) -> StoreResult<Division>;
    async fn find_division_by_name(&self, league_id: Uuid, name: &str) -> StoreResult<Option<Division>>;

    async fn create_age_group(&self, name: String) -> StoreResult<AgeGroup>;
    async fn get_age_group(&self, id: Uuid) -> StoreResult<AgeGroup>;
    async fn find_age_group_by_name(&self, name: &str) -> StoreResult<Option<AgeGroup>>;
    async fn list_age_groups(&self) -> StoreResult<Vec<AgeGroup>>;

    async fn create_season(&self, req: CreateSeasonRequest) -> StoreResult<Season>;
    async fn get_season(&self, id: Uuid) -> StoreResult<Season>;
    async fn find_season_by_name(&self, name: &str) -> StoreResult<Option<Season>>;
    async fn list_seasons(&self) -> StoreResult<Vec<Season>>;

    async fn get_match_type(&self, id: Uuid) -> StoreResult<MatchType>;
    async fn find_match_type_by_name(&self, name: &str) -> StoreResult<Option<MatchType>>;
    async fn list_match_types(&self) -> StoreResult<Vec<MatchType>>;

    // -- Team --
    async fn create_team(&self, req: CreateTeamRequest) -> StoreResult<Team>;
    async fn get_team(&self, id: Uuid) -> StoreResult<Team>;
    async fn list_teams(&self, filter: TeamFilter) -> StoreResult<Vec<Team>>;
    async fn update_team(&self, id: Uuid, req: UpdateTeamRequest) -> StoreResult<Team>;
    async fn delete_team(&self, id: Uuid) -> StoreResult<()>;
    async fn find_team_by_name(&self, name: &str, league_id: Uuid) -> StoreResult<Option<Team>>;

    async fn assign_team_manager(&self, user_id: Uuid, team_id: Uuid) -> StoreResult<()>;
    async fn manager_assignments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TeamManagerAssignment>>;

    // -- UserProfile --
    async fn create_profile(&self, profile: UserProfile) -> StoreResult<UserProfile>;
    async fn get_profile(&self, id: Uuid) -> StoreResult<UserProfile>;
    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>>;
    async fn update_profile(&self, id: Uuid, mutate: Box<dyn FnOnce(&mut UserProfile) + Send>) -> StoreResult<UserProfile>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    // -- Invitation (serialized per code; see InviteService for the
    // conditional-update consume operation) --
    async fn insert_invitation(&self, invite: Invitation) -> StoreResult<Invitation>;
    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation>;
    async fn find_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>>;
    async fn list_invitations(&self, created_by: Option<Uuid>) -> StoreResult<Vec<Invitation>>;
    /// Atomic compare-and-increment: succeeds only when
    /// `status='pending' AND current_uses < max_uses AND expires_at > now`.
    /// Returns the updated row, or `None` on zero-rows-affected (contention
    /// or terminal state) per spec.md §4.5.
    async fn try_consume_invitation(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Option<Invitation>>;
    async fn cancel_invitation(&self, id: Uuid) -> StoreResult<Invitation>;

    // -- PlayerTeamHistory --
    async fn upsert_player_history(&self, row: PlayerTeamHistory) -> StoreResult<PlayerTeamHistory>;
    async fn current_history_for_player(&self, player_id: Uuid) -> StoreResult<Option<PlayerTeamHistory>>;

    // -- Match --
    async fn get_match(&self, id: Uuid) -> StoreResult<Match>;
    async fn list_matches(&self, filter: MatchFilter) -> StoreResult<Vec<Match>>;
    async fn find_match_by_external_id(&self, external_match_id: &str) -> StoreResult<Option<Match>>;
    async fn find_match_by_natural_key(&self, key: &MatchNaturalKey) -> StoreResult<Option<Match>>;
    async fn create_match(&self, m: Match) -> StoreResult<Match>;
    async fn delete_match(&self, id: Uuid) -> StoreResult<()>;
    /// Manual edit path (admin PATCH): always wins over `score_locked`
    /// (spec.md §3 invariant 6).
    async fn manual_update_match(&self, id: Uuid, mutate: Box<dyn FnOnce(&mut Match) + Send>) -> StoreResult<Match>;
    /// Ingestion upsert entry point encoding invariant 6 (score lock) and the
    /// optimistic-concurrency version check from §5. `incoming` carries the
    /// fields resolved from the submission; scores are only applied when
    /// `score_locked` is false on the stored row.
    async fn upsert_match_from_ingestion(
        &self,
        existing_id: Option<Uuid>,
        incoming: Match,
    ) -> StoreResult<(Match, UpsertOutcome)>;

    async fn current_schema_version(&self) -> StoreResult<SchemaVersion>;
}
