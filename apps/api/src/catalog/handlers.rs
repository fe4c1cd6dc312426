use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::posting::{self, NewRoleRequest};
use crate::catalog::queries::{self, RoleWithCompany};
use crate::errors::AppError;
use crate::interview::load_context;
use crate::interview::persona::{InterviewContext, PersonaProfile};
use crate::models::company::CompanyRow;
use crate::models::role::RoleRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoleListing {
    #[serde(flatten)]
    pub role: RoleRow,
    pub company: Option<CompanyRow>,
}

#[derive(Debug, Serialize)]
pub struct RoleDetail {
    pub role: RoleRow,
    pub company: CompanyRow,
    pub persona: PersonaProfile,
}

#[derive(Debug, Serialize)]
pub struct CompanyProfile {
    #[serde(flatten)]
    pub company: CompanyRow,
    pub roles: Vec<RoleRow>,
}

/// GET /api/roles
/// All roles, newest first, each with its company.
pub async fn handle_list_roles(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleListing>>, AppError> {
    let roles = queries::fetch_roles(&state.db).await?;

    let mut company_ids: Vec<Uuid> = roles.iter().map(|r| r.company_id).collect();
    company_ids.sort();
    company_ids.dedup();
    let companies: HashMap<Uuid, CompanyRow> = queries::fetch_companies_by_ids(&state.db, &company_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(Json(join_companies(roles, &companies)))
}

fn join_companies(roles: Vec<RoleRow>, companies: &HashMap<Uuid, CompanyRow>) -> Vec<RoleListing> {
    roles
        .into_iter()
        .map(|role| RoleListing {
            company: companies.get(&role.company_id).cloned(),
            role,
        })
        .collect()
}

/// GET /api/roles/:id
pub async fn handle_get_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<RoleDetail>, AppError> {
    let ctx = load_context(&state.db, role_id).await?;
    Ok(Json(RoleDetail {
        role: ctx.role,
        company: ctx.company,
        persona: ctx.persona,
    }))
}

/// POST /api/roles
/// Creates a role and its interview persona.
pub async fn handle_create_role(
    State(state): State<AppState>,
    Json(req): Json<NewRoleRequest>,
) -> Result<(StatusCode, Json<RoleDetail>), AppError> {
    let valid = req.validate()?;
    let company = queries::fetch_company_by_id(&state.db, valid.company_id)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid company selected".into()))?;

    let (role, persona) = posting::insert_role_with_persona(&state.db, &valid).await?;
    let ctx = InterviewContext::new(RoleWithCompany { role, company }, Some(persona));

    Ok((
        StatusCode::CREATED,
        Json(RoleDetail {
            role: ctx.role,
            company: ctx.company,
            persona: ctx.persona,
        }),
    ))
}

/// GET /api/companies/:id
/// Company profile with every role it has posted.
pub async fn handle_get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyProfile>, AppError> {
    let company = queries::fetch_company_by_id(&state.db, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {company_id} not found")))?;
    let roles = queries::fetch_roles_by_company(&state.db, company_id).await?;
    Ok(Json(CompanyProfile { company, roles }))
}
