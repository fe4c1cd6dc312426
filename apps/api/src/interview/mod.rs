// AI persona interviews: conversation modes, session state, the turn engine
// and its canned-reply fallback, scoring, and the session store.

pub mod engine;
pub mod evaluation;
pub mod fallback;
pub mod handlers;
pub mod mode;
pub mod persona;
pub mod prompts;
pub mod responder;
pub mod session;
pub mod store;

use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::queries::{fetch_persona_by_role_id, fetch_role_with_company};
use crate::errors::AppError;
use crate::interview::persona::InterviewContext;

/// Role, company and persona for `role_id`, with the default persona
/// substituted when the role has none.
pub async fn load_context(pool: &PgPool, role_id: Uuid) -> Result<InterviewContext, AppError> {
    let loaded = fetch_role_with_company(pool, role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {role_id} not found")))?;
    let persona = fetch_persona_by_role_id(pool, role_id).await?;
    Ok(InterviewContext::new(loaded, persona))
}
