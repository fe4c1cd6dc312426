use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use uuid::Uuid;

use crate::applications::quick_apply::{self, QuickApplyForm, QuickApplyResponse};
use crate::errors::AppError;
use crate::state::AppState;
use crate::uploads::form::MultipartForm;

/// POST /api/apply
/// Multipart: roleId, name, email, phone, coverLetter (optional), resume.
pub async fn handle_apply(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<QuickApplyResponse>, AppError> {
    let form = MultipartForm::read(multipart).await?;
    let app = QuickApplyForm::from_multipart(form, None).validate()?;
    let response = quick_apply::submit(&state.db, state.storage.as_ref(), app).await?;
    Ok(Json(response))
}

/// POST /api/applications/quick-apply/:role_id
pub async fn handle_quick_apply(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<QuickApplyResponse>, AppError> {
    let form = MultipartForm::read(multipart).await?;
    let app = QuickApplyForm::from_multipart(form, Some(role_id)).validate()?;
    let response = quick_apply::submit(&state.db, state.storage.as_ref(), app).await?;
    Ok(Json(response))
}
