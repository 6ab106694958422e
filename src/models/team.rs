// src/models/team.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub club_id: Option<Uuid>,
    pub league_id: Uuid,
    pub academy_team: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Team joined with its club and league names, for the composite reads the
/// Store Gateway exposes (spec.md §4.1).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TeamWithDetails {
    #[serde(flatten)]
    pub team: Team,
    pub club_name: Option<String>,
    pub league_name: String,
}

#[derive(Debug, Validate, Deserialize, Clone)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub city: Option<String>,
    pub club_id: Option<Uuid>,
    pub league_id: Uuid,
    #[serde(default)]
    pub academy_team: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub club_id: Option<Uuid>,
    pub academy_team: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TeamFilter {
    pub club_id: Option<Uuid>,
    pub league_id: Option<Uuid>,
}

/// One (user, team) management assignment — a team manager may manage
/// several teams (spec.md §3 TeamManagerAssignment).
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct TeamManagerAssignment {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub created_at: DateTime<Utc>,
}
