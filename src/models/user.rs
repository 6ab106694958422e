// src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role hierarchy, descending privilege (spec.md §3 invariant 1). Encoded as
/// an exhaustive enum per Design Notes §9 ("Dynamic role strings"); legacy
/// hyphen/underscore string variants are mapped onto this type at the
/// boundary (see `Role::parse`), never carried as strings internally.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ClubManager,
    TeamManager,
    TeamPlayer,
    ClubFan,
    TeamFan,
}

impl Role {
    /// Accepts the hyphen/underscore/mixed-case variants that show up across
    /// older clients and maps them onto the typed form once, at the edge.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().replace('-', "_").as_str() {
            "admin" => Some(Role::Admin),
            "club_manager" => Some(Role::ClubManager),
            "team_manager" => Some(Role::TeamManager),
            "team_player" => Some(Role::TeamPlayer),
            "club_fan" => Some(Role::ClubFan),
            "team_fan" => Some(Role::TeamFan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ClubManager => "club_manager",
            Role::TeamManager => "team_manager",
            Role::TeamPlayer => "team_player",
            Role::ClubFan => "club_fan",
            Role::TeamFan => "team_fan",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub club_id: Option<Uuid>,
    pub display_name: Option<String>,
    pub player_number: Option<i32>,
    pub positions: Vec<String>,
    pub assigned_age_group_id: Option<Uuid>,
    pub invited_via_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Usernames are the login identifier; 3-50 chars, `[A-Za-z0-9_]` only
/// (spec.md §3).
pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (3..=50).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub player_number: Option<i32>,
    pub positions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
}
