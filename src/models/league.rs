// src/models/league.rs — reference/scheduling data: leagues, divisions, age
// groups, seasons, match types. Distinct from the `Match` entity itself,
// which lives in `models::match_entity`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct League {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Division {
    pub id: Uuid,
    pub name: String,
    pub league_id: Uuid,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct AgeGroup {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Season {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchTypeKind {
    League,
    Friendly,
    Tournament,
    Playoff,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct MatchType {
    pub id: Uuid,
    pub name: String,
    pub kind: MatchTypeKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateLeagueRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateDivisionRequest {
    pub name: String,
    pub league_id: Uuid,
    pub level: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateSeasonRequest {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}
