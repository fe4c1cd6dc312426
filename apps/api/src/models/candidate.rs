use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome of a completed chat interview.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub answers: Value,
    pub fit_score: Option<f64>,
    pub summary_candidate: Option<String>,
    pub summary_recruiter: Option<String>,
    pub resume_url: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub created_at: DateTime<Utc>,
}
