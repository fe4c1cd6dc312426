use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::catalog::queries::{PERSONA_COLUMNS, ROLE_COLUMNS};
use crate::errors::AppError;
use crate::interview::mode::{persona_mode, ConversationMode};
use crate::models::persona::{PersonaRow, Question, QuestionSequence};
use crate::models::role::RoleRow;

/// Body of `POST /api/roles`: a role and the persona that interviews for it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRoleRequest {
    #[serde(alias = "companyId")]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    pub level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default, alias = "mustHaveAssets")]
    pub must_have_assets: Vec<String>,
    #[serde(default)]
    pub persona: NewPersona,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPersona {
    #[serde(default)]
    pub persona_name: String,
    pub tone: Option<String>,
    /// Structured when omitted.
    pub conversation_mode: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub question_sequence: QuestionSequence,
    pub scoring_prompt: Option<String>,
    pub email_prompt: Option<String>,
    pub fallback_message: Option<String>,
    pub end_message: Option<String>,
    pub avatar_url: Option<String>,
}

/// A posting that passed validation; every text field is trimmed and blanks are gone.
#[derive(Debug, Clone)]
pub struct ValidRole {
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub level: Option<String>,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub must_have_assets: Vec<String>,
    pub mode: ConversationMode,
    pub persona_name: String,
    pub tone: Option<String>,
    pub system_prompt: Option<String>,
    pub questions: Vec<Question>,
    pub scoring_prompt: Option<String>,
    pub email_prompt: Option<String>,
    pub fallback_message: Option<String>,
    pub end_message: Option<String>,
    pub avatar_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect()
}

/// Drops questions with no text and numbers the ones that came without an id.
fn clean_questions(questions: Vec<Question>) -> Vec<Question> {
    questions
        .into_iter()
        .filter(|q| !q.text.trim().is_empty())
        .enumerate()
        .map(|(i, q)| Question {
            id: if q.id.trim().is_empty() {
                format!("q{}", i + 1)
            } else {
                q.id
            },
            text: q.text.trim().to_string(),
            kind: q.kind,
        })
        .collect()
}

impl NewRoleRequest {
    pub fn validate(self) -> Result<ValidRole, AppError> {
        let company_id = self
            .company_id
            .ok_or_else(|| AppError::Validation("Company ID is required".into()))?;
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Role title is required".into()));
        }

        let persona = self.persona;
        let persona_name = persona.persona_name.trim().to_string();
        if persona_name.is_empty() {
            return Err(AppError::Validation("Persona name is required".into()));
        }

        let questions = clean_questions(persona.question_sequence.questions);
        let raw_mode = non_blank(persona.conversation_mode);
        let mode = persona_mode(
            raw_mode.as_deref().unwrap_or(ConversationMode::Structured.as_str()),
            questions.len(),
        )
        .map_err(|e| AppError::Validation(format!("Invalid persona: {e}")))?;

        Ok(ValidRole {
            company_id,
            title,
            description: self.description.trim().to_string(),
            location: non_blank(self.location),
            level: non_blank(self.level),
            tags: clean_list(self.tags),
            requirements: clean_list(self.requirements),
            responsibilities: clean_list(self.responsibilities),
            must_have_assets: clean_list(self.must_have_assets),
            mode,
            persona_name,
            tone: non_blank(persona.tone),
            system_prompt: non_blank(persona.system_prompt),
            questions,
            scoring_prompt: non_blank(persona.scoring_prompt),
            email_prompt: non_blank(persona.email_prompt),
            fallback_message: non_blank(persona.fallback_message),
            end_message: non_blank(persona.end_message),
            avatar_url: non_blank(persona.avatar_url),
        })
    }
}

/// Inserts the role and its persona together; neither is kept if the other fails.
pub async fn insert_role_with_persona(
    pool: &PgPool,
    posting: &ValidRole,
) -> Result<(RoleRow, PersonaRow), AppError> {
    let mut tx = pool.begin().await?;

    let role = sqlx::query_as::<_, RoleRow>(&format!(
        r#"
        INSERT INTO roles
            (company_id, title, description, location, level, requirements,
             responsibilities, tags, must_have_assets, conversation_mode)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {ROLE_COLUMNS}
        "#
    ))
    .bind(posting.company_id)
    .bind(&posting.title)
    .bind(&posting.description)
    .bind(posting.location.as_deref())
    .bind(posting.level.as_deref())
    .bind(&posting.requirements)
    .bind(&posting.responsibilities)
    .bind(&posting.tags)
    .bind(&posting.must_have_assets)
    .bind(posting.mode.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let sequence = Json(QuestionSequence {
        questions: posting.questions.clone(),
    });
    let persona = sqlx::query_as::<_, PersonaRow>(&format!(
        r#"
        INSERT INTO personas
            (role_id, persona_name, tone, conversation_mode, system_prompt,
             question_sequence, scoring_prompt, email_prompt, fallback_message,
             end_message, avatar_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {PERSONA_COLUMNS}
        "#
    ))
    .bind(role.id)
    .bind(&posting.persona_name)
    .bind(posting.tone.as_deref())
    .bind(posting.mode.as_str())
    .bind(posting.system_prompt.as_deref())
    .bind(&sequence)
    .bind(posting.scoring_prompt.as_deref())
    .bind(posting.email_prompt.as_deref())
    .bind(posting.fallback_message.as_deref())
    .bind(posting.end_message.as_deref())
    .bind(posting.avatar_url.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Posted role '{}' ({}) with persona {} in {} mode",
        role.title, role.id, persona.persona_name, posting.mode
    );
    Ok((role, persona))
}
