//! Idempotent loader for a company, its roles, and their interview personas.
//!
//! Each record is looked up by its natural key: company by name, role by title
//! within the company, persona by role. Missing records are inserted. Existing
//! ones are rewritten only when one of the seeded columns is NULL, otherwise
//! left alone. Running the seed twice is a no-op the second time.

use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::mode::{persona_mode, ConversationMode};
use crate::models::persona::{Question, QuestionSequence};

/// Dataset compiled into the binary; used when no path is given.
pub const BUNDLED_DATASET: &str = include_str!("../seed/smartjoules.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDataset {
    pub company: CompanySeed,
    pub roles: Vec<RoleSeed>,
    pub personas: Vec<PersonaSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanySeed {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub website: String,
    pub industry: String,
    pub values: Vec<String>,
    pub culture: String,
    pub tone: String,
    pub cultural_keywords: Vec<String>,
    pub hr_contact_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleSeed {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub level: Option<String>,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    pub tags: Vec<String>,
    pub must_have_assets: Vec<String>,
    pub conversation_mode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaSeed {
    /// Links the persona to a role in the same dataset.
    pub role_title: String,
    pub persona_name: String,
    pub tone: String,
    pub conversation_mode: String,
    pub avatar_url: String,
    pub system_prompt: String,
    pub questions: Vec<Question>,
    pub scoring_prompt: String,
    pub email_prompt: String,
    pub fallback_message: String,
    pub end_message: String,
}

impl SeedDataset {
    pub fn parse(json: &str) -> Result<Self> {
        let dataset: SeedDataset = serde_json::from_str(json).context("Seed dataset is not valid JSON")?;
        dataset.check()?;
        Ok(dataset)
    }

    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_DATASET)
    }

    /// Structural checks that need no database.
    fn check(&self) -> Result<()> {
        let mut titles = HashSet::new();
        for role in &self.roles {
            if !titles.insert(role.title.as_str()) {
                bail!("Role '{}' appears twice in the dataset", role.title);
            }
            parse_mode(&role.conversation_mode, &role.title)?;
        }

        for persona in &self.personas {
            if !titles.contains(persona.role_title.as_str()) {
                bail!(
                    "Persona '{}' references unknown role '{}'",
                    persona.persona_name,
                    persona.role_title
                );
            }
            persona_mode(&persona.conversation_mode, persona.questions.len())
                .map_err(|e| anyhow::anyhow!("Persona '{}': {e}", persona.persona_name))?;
        }
        Ok(())
    }
}

fn parse_mode(raw: &str, owner: &str) -> Result<ConversationMode> {
    raw.parse::<ConversationMode>()
        .map_err(|e| anyhow::anyhow!("{owner}: {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    Updated,
    Skipped,
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeedOutcome::Inserted => "INSERTED",
            SeedOutcome::Updated => "UPDATED",
            SeedOutcome::Skipped => "SKIPPED",
        })
    }
}

fn update_outcome(rows_affected: u64) -> SeedOutcome {
    if rows_affected > 0 {
        SeedOutcome::Updated
    } else {
        SeedOutcome::Skipped
    }
}

#[derive(Debug)]
pub struct SeedReport {
    pub company_id: Uuid,
    pub roles_linked: i64,
    pub personas_linked: i64,
}

pub async fn run(pool: &PgPool, dataset: &SeedDataset) -> Result<SeedReport> {
    info!("Seeding company '{}'", dataset.company.name);
    let company_id = upsert_company(pool, &dataset.company).await?;

    let mut role_ids: HashMap<&str, Uuid> = HashMap::new();
    for role in &dataset.roles {
        let id = upsert_role(pool, company_id, role).await?;
        role_ids.insert(role.title.as_str(), id);
    }

    for persona in &dataset.personas {
        // `check` guarantees every persona's role is in the dataset
        let Some(&role_id) = role_ids.get(persona.role_title.as_str()) else {
            warn!("Skipping persona {}: role not seeded", persona.persona_name);
            continue;
        };
        upsert_persona(pool, role_id, persona).await?;
    }

    let report = verify(pool, company_id).await?;
    if report.roles_linked < dataset.roles.len() as i64 {
        bail!(
            "Expected at least {} roles for company {company_id}, found {}",
            dataset.roles.len(),
            report.roles_linked
        );
    }
    if report.personas_linked < dataset.personas.len() as i64 {
        bail!(
            "Expected at least {} personas for company {company_id}, found {}",
            dataset.personas.len(),
            report.personas_linked
        );
    }

    info!(
        "All {} roles and {} personas are linked to '{}'",
        report.roles_linked, report.personas_linked, dataset.company.name
    );
    Ok(report)
}

async fn upsert_company(pool: &PgPool, company: &CompanySeed) -> Result<Uuid> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM companies WHERE name = $1 LIMIT 1")
        .bind(&company.name)
        .fetch_optional(pool)
        .await?;

    let (id, outcome) = match existing {
        None => {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO companies
                    (name, tagline, description, website, industry, "values",
                     culture, tone, cultural_keywords, hr_contact_email)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#,
            )
            .bind(&company.name)
            .bind(&company.tagline)
            .bind(&company.description)
            .bind(&company.website)
            .bind(&company.industry)
            .bind(&company.values)
            .bind(&company.culture)
            .bind(&company.tone)
            .bind(&company.cultural_keywords)
            .bind(&company.hr_contact_email)
            .fetch_one(pool)
            .await?;
            (id, SeedOutcome::Inserted)
        }
        Some(id) => {
            let result = sqlx::query(
                r#"
                UPDATE companies SET
                    tagline = $2, description = $3, website = $4, industry = $5,
                    "values" = $6, culture = $7, tone = $8, cultural_keywords = $9,
                    hr_contact_email = $10
                WHERE id = $1 AND (
                    tagline IS NULL OR description IS NULL OR website IS NULL
                    OR industry IS NULL OR "values" IS NULL OR culture IS NULL
                    OR tone IS NULL OR cultural_keywords IS NULL OR hr_contact_email IS NULL
                )
                "#,
            )
            .bind(id)
            .bind(&company.tagline)
            .bind(&company.description)
            .bind(&company.website)
            .bind(&company.industry)
            .bind(&company.values)
            .bind(&company.culture)
            .bind(&company.tone)
            .bind(&company.cultural_keywords)
            .bind(&company.hr_contact_email)
            .execute(pool)
            .await?;
            (id, update_outcome(result.rows_affected()))
        }
    };

    info!("[{outcome}] Company: {} ({id})", company.name);
    Ok(id)
}

async fn upsert_role(pool: &PgPool, company_id: Uuid, role: &RoleSeed) -> Result<Uuid> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM roles WHERE title = $1 AND company_id = $2 LIMIT 1")
            .bind(&role.title)
            .bind(company_id)
            .fetch_optional(pool)
            .await?;

    let (id, outcome) = match existing {
        None => {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO roles
                    (company_id, title, description, location, level, requirements,
                     responsibilities, tags, must_have_assets, conversation_mode)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#,
            )
            .bind(company_id)
            .bind(&role.title)
            .bind(&role.description)
            .bind(&role.location)
            .bind(role.level.as_deref())
            .bind(&role.requirements)
            .bind(&role.responsibilities)
            .bind(&role.tags)
            .bind(&role.must_have_assets)
            .bind(&role.conversation_mode)
            .fetch_one(pool)
            .await?;
            (id, SeedOutcome::Inserted)
        }
        Some(id) => {
            let result = sqlx::query(
                r#"
                UPDATE roles SET
                    description = $2, location = $3, requirements = $4,
                    responsibilities = $5, tags = $6, must_have_assets = $7,
                    conversation_mode = $8
                WHERE id = $1 AND (
                    description IS NULL OR location IS NULL OR requirements IS NULL
                    OR responsibilities IS NULL OR tags IS NULL
                    OR must_have_assets IS NULL OR conversation_mode IS NULL
                )
                "#,
            )
            .bind(id)
            .bind(&role.description)
            .bind(&role.location)
            .bind(&role.requirements)
            .bind(&role.responsibilities)
            .bind(&role.tags)
            .bind(&role.must_have_assets)
            .bind(&role.conversation_mode)
            .execute(pool)
            .await?;
            (id, update_outcome(result.rows_affected()))
        }
    };

    info!("[{outcome}] Role: {} ({id})", role.title);
    Ok(id)
}

async fn upsert_persona(pool: &PgPool, role_id: Uuid, persona: &PersonaSeed) -> Result<Uuid> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM personas WHERE role_id = $1 ORDER BY created_at ASC LIMIT 1",
    )
    .bind(role_id)
    .fetch_optional(pool)
    .await?;

    let sequence = Json(QuestionSequence {
        questions: persona.questions.clone(),
    });

    let (id, outcome) = match existing {
        None => {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO personas
                    (role_id, persona_name, tone, conversation_mode, system_prompt,
                     question_sequence, scoring_prompt, email_prompt, fallback_message,
                     end_message, avatar_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id
                "#,
            )
            .bind(role_id)
            .bind(&persona.persona_name)
            .bind(&persona.tone)
            .bind(&persona.conversation_mode)
            .bind(&persona.system_prompt)
            .bind(&sequence)
            .bind(&persona.scoring_prompt)
            .bind(&persona.email_prompt)
            .bind(&persona.fallback_message)
            .bind(&persona.end_message)
            .bind(&persona.avatar_url)
            .fetch_one(pool)
            .await?;
            (id, SeedOutcome::Inserted)
        }
        Some(id) => {
            let result = sqlx::query(
                r#"
                UPDATE personas SET
                    persona_name = $2, tone = $3, conversation_mode = $4, system_prompt = $5,
                    question_sequence = $6, scoring_prompt = $7, email_prompt = $8,
                    fallback_message = $9, end_message = $10, avatar_url = $11
                WHERE id = $1 AND (
                    tone IS NULL OR conversation_mode IS NULL OR system_prompt IS NULL
                    OR question_sequence IS NULL OR scoring_prompt IS NULL
                    OR email_prompt IS NULL OR fallback_message IS NULL
                    OR end_message IS NULL OR avatar_url IS NULL
                )
                "#,
            )
            .bind(id)
            .bind(&persona.persona_name)
            .bind(&persona.tone)
            .bind(&persona.conversation_mode)
            .bind(&persona.system_prompt)
            .bind(&sequence)
            .bind(&persona.scoring_prompt)
            .bind(&persona.email_prompt)
            .bind(&persona.fallback_message)
            .bind(&persona.end_message)
            .bind(&persona.avatar_url)
            .execute(pool)
            .await?;
            (id, update_outcome(result.rows_affected()))
        }
    };

    info!(
        "[{outcome}] Persona: {} for role {role_id} ({id})",
        persona.persona_name
    );
    Ok(id)
}

async fn verify(pool: &PgPool, company_id: Uuid) -> Result<SeedReport> {
    let roles_linked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE company_id = $1")
        .bind(company_id)
        .fetch_one(pool)
        .await?;
    let personas_linked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM personas p JOIN roles r ON r.id = p.role_id WHERE r.company_id = $1",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await?;

    Ok(SeedReport {
        company_id,
        roles_linked,
        personas_linked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_dataset_is_consistent() {
        let dataset = SeedDataset::bundled().unwrap();
        assert_eq!(dataset.company.name, "SmartJoules");
        assert_eq!(dataset.roles.len(), 4);
        assert_eq!(dataset.personas.len(), 4);
        assert!(dataset
            .personas
            .iter()
            .all(|p| p.end_message.contains("careers@smartjoules.in")));
    }

    #[test]
    fn test_persona_for_unknown_role_is_rejected() {
        let mut dataset = SeedDataset::bundled().unwrap();
        dataset.personas[0].role_title = "Chief Vibes Officer".into();
        let err = dataset.check().unwrap_err();
        assert!(err.to_string().contains("unknown role 'Chief Vibes Officer'"));
    }

    #[test]
    fn test_structured_persona_needs_questions() {
        let mut dataset = SeedDataset::bundled().unwrap();
        let structured = dataset
            .personas
            .iter_mut()
            .find(|p| p.conversation_mode == "structured")
            .unwrap();
        structured.questions.clear();
        assert!(dataset.check().is_err());
    }

    #[test]
    fn test_duplicate_role_titles_rejected() {
        let mut dataset = SeedDataset::bundled().unwrap();
        let copy = dataset.roles[0].clone();
        dataset.roles.push(copy);
        assert!(dataset.check().is_err());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(update_outcome(1).to_string(), "UPDATED");
        assert_eq!(update_outcome(0).to_string(), "SKIPPED");
        assert_eq!(SeedOutcome::Inserted.to_string(), "INSERTED");
    }
}
