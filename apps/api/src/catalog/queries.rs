use sqlx::PgPool;
use uuid::Uuid;

use crate::models::company::CompanyRow;
use crate::models::persona::PersonaRow;
use crate::models::role::RoleRow;

// Array columns may be NULL on rows created outside the seed script.
pub(crate) const ROLE_COLUMNS: &str = r#"
    id, company_id, title,
    COALESCE(description, '') AS description,
    location, level,
    COALESCE(requirements, '{}') AS requirements,
    COALESCE(responsibilities, '{}') AS responsibilities,
    COALESCE(tags, '{}') AS tags,
    COALESCE(must_have_assets, '{}') AS must_have_assets,
    conversation_mode, created_at
"#;

const COMPANY_COLUMNS: &str = r#"
    id, name, tagline, description, website, industry,
    COALESCE("values", '{}') AS "values",
    culture, tone,
    COALESCE(cultural_keywords, '{}') AS cultural_keywords,
    hr_contact_email, logo_url, created_at
"#;

pub(crate) const PERSONA_COLUMNS: &str = r#"
    id, role_id, persona_name, tone, conversation_mode, system_prompt,
    question_sequence, scoring_prompt, email_prompt, fallback_message,
    end_message, avatar_url, created_at
"#;

/// All roles, newest first.
pub async fn fetch_roles(pool: &PgPool) -> Result<Vec<RoleRow>, sqlx::Error> {
    sqlx::query_as::<_, RoleRow>(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Roles owned by one company, newest first.
pub async fn fetch_roles_by_company(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Vec<RoleRow>, sqlx::Error> {
    sqlx::query_as::<_, RoleRow>(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles WHERE company_id = $1 ORDER BY created_at DESC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_role_by_id(pool: &PgPool, role_id: Uuid) -> Result<Option<RoleRow>, sqlx::Error> {
    sqlx::query_as::<_, RoleRow>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
        .bind(role_id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_company_by_id(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Option<CompanyRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
    ))
    .bind(company_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_companies_by_ids(
    pool: &PgPool,
    company_ids: &[Uuid],
) -> Result<Vec<CompanyRow>, sqlx::Error> {
    if company_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ANY($1)"
    ))
    .bind(company_ids)
    .fetch_all(pool)
    .await
}

/// A role has at most one persona; the oldest wins if the table holds duplicates.
pub async fn fetch_persona_by_role_id(
    pool: &PgPool,
    role_id: Uuid,
) -> Result<Option<PersonaRow>, sqlx::Error> {
    sqlx::query_as::<_, PersonaRow>(&format!(
        "SELECT {PERSONA_COLUMNS} FROM personas WHERE role_id = $1 ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(role_id)
    .fetch_optional(pool)
    .await
}

/// Role with its owning company, the unit most read paths need.
pub struct RoleWithCompany {
    pub role: RoleRow,
    pub company: CompanyRow,
}

/// Loads a role and its company. `Ok(None)` when either row is missing.
pub async fn fetch_role_with_company(
    pool: &PgPool,
    role_id: Uuid,
) -> Result<Option<RoleWithCompany>, sqlx::Error> {
    let Some(role) = fetch_role_by_id(pool, role_id).await? else {
        return Ok(None);
    };
    let Some(company) = fetch_company_by_id(pool, role.company_id).await? else {
        tracing::warn!("Role {role_id} references missing company {}", role.company_id);
        return Ok(None);
    };
    Ok(Some(RoleWithCompany { role, company }))
}
