// src/models/invitation.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteType {
    ClubManager,
    ClubFan,
    TeamManager,
    TeamPlayer,
    TeamFan,
}

impl InviteType {
    /// Accepts hyphen/underscore path-segment spellings (e.g.
    /// `club-manager` from `POST /api/invites/admin/club-manager`) and maps
    /// them onto the typed form once, at the edge (Design Notes §9).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().replace('-', "_").as_str() {
            "club_manager" => Some(InviteType::ClubManager),
            "club_fan" => Some(InviteType::ClubFan),
            "team_manager" => Some(InviteType::TeamManager),
            "team_player" => Some(InviteType::TeamPlayer),
            "team_fan" => Some(InviteType::TeamFan),
            _ => None,
        }
    }

    /// The role a consumed invite of this type grants the new profile.
    pub fn grants_role(&self) -> Role {
        match self {
            InviteType::ClubManager => Role::ClubManager,
            InviteType::ClubFan => Role::ClubFan,
            InviteType::TeamManager => Role::TeamManager,
            InviteType::TeamPlayer => Role::TeamPlayer,
            InviteType::TeamFan => Role::TeamFan,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InviteType::ClubManager => "club_manager",
            InviteType::ClubFan => "club_fan",
            InviteType::TeamManager => "team_manager",
            InviteType::TeamPlayer => "team_player",
            InviteType::TeamFan => "team_fan",
        }
    }
}

/// Stored status column. `effective_status` (below) is what callers should
/// actually read — `Pending` collapses to `Expired` once `expires_at` has
/// passed, independent of this column (spec.md §3 invariant 5, §4.5).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Consumed,
    Cancelled,
    Expired,
}

/// The (club, team, age_group) triple applied to the new profile on
/// successful consume (glossary: "Scope").
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct InviteScope {
    pub club_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub age_group_id: Option<Uuid>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Invitation {
    pub id: Uuid,
    pub code: String,
    pub invite_type: InviteType,
    pub team_id: Option<Uuid>,
    pub club_id: Option<Uuid>,
    pub age_group_id: Option<Uuid>,
    pub max_uses: i32,
    pub current_uses: i32,
    pub expires_at: DateTime<Utc>,
    pub status: InviteStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn scope(&self) -> InviteScope {
        InviteScope {
            club_id: self.club_id,
            team_id: self.team_id,
            age_group_id: self.age_group_id,
        }
    }

    /// Derives the status a reader should see "on read" per spec.md §3
    /// invariant 5, without mutating the stored row.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InviteStatus {
        match self.status {
            InviteStatus::Pending if self.expires_at < now => InviteStatus::Expired,
            InviteStatus::Pending if self.current_uses >= self.max_uses => InviteStatus::Consumed,
            other => other,
        }
    }

    pub fn remaining_uses(&self) -> i32 {
        (self.max_uses - self.current_uses).max(0)
    }
}

/// Public-facing validation response. Never includes `created_by`
/// (spec.md §4.5: "never reveals created_by").
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InviteValidation {
    pub invite_type: InviteType,
    pub club_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub age_group_id: Option<Uuid>,
    pub remaining: i32,
}

impl From<&Invitation> for InviteValidation {
    fn from(inv: &Invitation) -> Self {
        InviteValidation {
            invite_type: inv.invite_type,
            club_id: inv.club_id,
            team_id: inv.team_id,
            age_group_id: inv.age_group_id,
            remaining: inv.remaining_uses(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateInviteRequest {
    pub invite_type: InviteType,
    #[serde(default)]
    pub club_id: Option<Uuid>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub age_group_id: Option<Uuid>,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    /// Seconds until expiry.
    pub ttl: i64,
}

fn default_max_uses() -> i32 {
    1
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateInviteResponse {
    pub id: Uuid,
    pub code: String,
    pub invite_type: InviteType,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InviteListFilter {
    pub status: Option<InviteStatus>,
}
