// src/models/match_entity.rs
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Tbd,
    Live,
    Completed,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "tbd" => Some(Self::Tbd),
            "live" => Some(Self::Live),
            "completed" => Some(Self::Completed),
            "postponed" => Some(Self::Postponed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Tbd => "tbd",
            Self::Live => "live",
            Self::Completed => "completed",
            Self::Postponed => "postponed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Manual,
    Scraper,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Match {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub match_date: DateTime<Utc>,
    pub match_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub season_id: Uuid,
    pub age_group_id: Uuid,
    pub match_type_id: Uuid,
    pub division_id: Uuid,
    pub status: MatchStatus,
    pub external_match_id: Option<String>,
    pub source: MatchSource,
    pub score_locked: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Invariant 3.
    pub fn validate_teams_and_scores(&self) -> Result<(), String> {
        if self.home_team_id == self.away_team_id {
            return Err("home_team_id and away_team_id must differ".to_string());
        }
        if self.home_score.is_some_and(|s| s < 0) || self.away_score.is_some_and(|s| s < 0) {
            return Err("scores must be non-negative".to_string());
        }
        Ok(())
    }

    /// The natural key used for idempotent lookup when `external_match_id`
    /// is absent (spec.md §3 invariant 4).
    pub fn natural_key(&self) -> MatchNaturalKey {
        MatchNaturalKey {
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
            match_date: self.match_date,
            season_id: self.season_id,
            age_group_id: self.age_group_id,
            match_type_id: self.match_type_id,
            division_id: self.division_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchNaturalKey {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub match_date: DateTime<Utc>,
    pub season_id: Uuid,
    pub age_group_id: Uuid,
    pub match_type_id: Uuid,
    pub division_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchWithNames {
    #[serde(flatten)]
    pub m: Match,
    pub home_team_name: String,
    pub away_team_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateMatchRequest {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub match_date: DateTime<Utc>,
    pub match_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub season_id: Uuid,
    pub age_group_id: Uuid,
    pub match_type_id: Uuid,
    pub division_id: Uuid,
    #[serde(default = "default_status")]
    pub status: MatchStatus,
    pub external_match_id: Option<String>,
}

fn default_status() -> MatchStatus {
    MatchStatus::Scheduled
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateMatchRequest {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub match_date: Option<DateTime<Utc>>,
    pub match_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub status: Option<MatchStatus>,
    pub score_locked: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchFilter {
    pub season_id: Option<Uuid>,
    pub age_group_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    pub league_id: Option<Uuid>,
    pub status: Option<MatchStatus>,
    pub team_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}
