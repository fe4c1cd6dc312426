use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub values: Vec<String>,
    pub culture: Option<String>,
    pub tone: Option<String>,
    pub cultural_keywords: Vec<String>,
    pub hr_contact_email: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
