// src/models/player_history.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Snapshot of a player's league/division/age_group/jersey/positions for one
/// season on one team. Unique per (player_id, team_id, season_id); at most
/// one row per player has `is_current = true` (spec.md §3 invariant 7).
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct PlayerTeamHistory {
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub season_id: Uuid,
    pub league_id: Uuid,
    pub division_id: Option<Uuid>,
    pub age_group_id: Uuid,
    pub jersey_number: Option<i32>,
    pub positions: Vec<String>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}
