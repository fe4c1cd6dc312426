use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Stored as `{"questions": [...]}` in the `question_sequence` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionSequence {
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonaRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub persona_name: String,
    pub tone: Option<String>,
    pub conversation_mode: Option<String>,
    pub system_prompt: Option<String>,
    pub question_sequence: Option<Json<QuestionSequence>>,
    pub scoring_prompt: Option<String>,
    pub email_prompt: Option<String>,
    pub fallback_message: Option<String>,
    pub end_message: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
