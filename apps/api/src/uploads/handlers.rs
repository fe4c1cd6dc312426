use axum::{extract::Multipart, extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::object_key;
use crate::uploads::form::MultipartForm;
use crate::uploads::validation::{validate_file, AssetKind, FileValidationError, MAX_FILE_SIZE};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub file_name: String,
    pub size: usize,
}

/// POST /api/upload
/// Multipart: `file`, `roleId`, optional `kind` (default resume).
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let role_id = form
        .text_any(&["roleId", "role_id"])
        .ok_or_else(|| AppError::Validation("Role ID is required".into()))?;
    let role_id = Uuid::parse_str(&role_id)
        .map_err(|_| AppError::Validation("Invalid role ID format".into()))?;
    let kind = form
        .text("kind")
        .map(|k| k.parse::<AssetKind>())
        .transpose()?
        .unwrap_or(AssetKind::Resume);
    let file = form.take_file("file").ok_or(FileValidationError::Missing)?;

    let validated = validate_file(file, kind.allowed_types(), MAX_FILE_SIZE)?;
    let role_id = role_id.to_string();
    let key = object_key(&[kind.storage_prefix(), &role_id], &validated.file().file_name);
    let stored = state.storage.put(&key, &validated).await?;

    Ok(Json(UploadResponse {
        url: stored.url,
        key: stored.key,
        file_name: validated.file().file_name.clone(),
        size: validated.file().size(),
    }))
}
