// src/models/club.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub pro_academy: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate, Deserialize, Clone)]
pub struct CreateClubRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub city: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub pro_academy: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub pro_academy: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClubFilter {
    pub is_active: Option<bool>,
}
