use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub level: Option<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub tags: Vec<String>,
    /// Assets the persona should ask for, e.g. `resume`, `cover_letter`.
    pub must_have_assets: Vec<String>,
    pub conversation_mode: Option<String>,
    pub created_at: DateTime<Utc>,
}
