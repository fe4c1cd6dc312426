use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::catalog::queries::fetch_role_by_id;
use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::storage::{object_key, ObjectStore};
use crate::uploads::form::MultipartForm;
use crate::uploads::validation::{
    validate_file, FileValidationError, UploadedFile, ValidatedFile, APPLICATION_RESUME_TYPES,
    MAX_FILE_SIZE,
};

const MISSING_FIELDS: &str = "Missing required fields";
const INVALID_ROLE: &str = "Invalid role selected";
const BAD_RESUME_TYPE: &str = "Resume must be a PDF or Word document";
const RESUME_TOO_LARGE: &str = "Resume must be less than 5MB";

/// Raw quick-apply submission as read from the multipart body.
#[derive(Debug, Default)]
pub struct QuickApplyForm {
    pub role_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub resume: Option<UploadedFile>,
}

impl QuickApplyForm {
    /// Accepts both camelCase and snake_case field names. A role id taken from
    /// the URL overrides the form's.
    pub fn from_multipart(mut form: MultipartForm, path_role_id: Option<Uuid>) -> Self {
        Self {
            role_id: path_role_id
                .map(|id| id.to_string())
                .or_else(|| form.text_any(&["roleId", "role_id"])),
            name: form.text_any(&["name", "fullName", "full_name"]),
            email: form.text("email"),
            phone: form.text("phone"),
            cover_letter: form.text_any(&["coverLetter", "cover_letter"]),
            resume: form.take_file("resume"),
        }
    }

    /// Checks fields, then resume type, then resume size, then the role id's shape.
    pub fn validate(self) -> Result<ValidApplication, AppError> {
        let (Some(role_id), Some(name), Some(email), Some(phone), Some(resume)) =
            (self.role_id, self.name, self.email, self.phone, self.resume)
        else {
            return Err(AppError::Validation(MISSING_FIELDS.into()));
        };

        let resume = validate_file(resume, APPLICATION_RESUME_TYPES, MAX_FILE_SIZE).map_err(|e| {
            let message = match e {
                FileValidationError::Missing => MISSING_FIELDS,
                FileValidationError::UnsupportedType { .. } => BAD_RESUME_TYPE,
                FileValidationError::TooLarge { .. } => RESUME_TOO_LARGE,
            };
            AppError::Validation(message.into())
        })?;

        let role_id =
            Uuid::parse_str(&role_id).map_err(|_| AppError::Validation(INVALID_ROLE.into()))?;

        Ok(ValidApplication {
            role_id,
            name,
            email,
            phone,
            cover_letter: self.cover_letter,
            resume,
        })
    }
}

#[derive(Debug)]
pub struct ValidApplication {
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cover_letter: Option<String>,
    pub resume: ValidatedFile,
}

#[derive(Debug, Serialize)]
pub struct QuickApplyResponse {
    pub success: bool,
    pub application_id: Uuid,
    pub message: String,
}

/// Confirms the role exists, stores the resume, and records a pending application.
pub async fn submit(
    pool: &PgPool,
    storage: &dyn ObjectStore,
    app: ValidApplication,
) -> Result<QuickApplyResponse, AppError> {
    let role = fetch_role_by_id(pool, app.role_id)
        .await?
        .ok_or_else(|| AppError::Validation(INVALID_ROLE.into()))?;

    let role_id = role.id.to_string();
    let key = object_key(
        &["applications", &role_id, &app.email],
        &app.resume.file().file_name,
    );
    let stored = storage.put(&key, &app.resume).await?;

    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (role_id, applicant_name, applicant_email, applicant_phone,
             cover_letter, resume_url, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, role_id, applicant_name, applicant_email, applicant_phone,
                  cover_letter, resume_url, status, applied_at
        "#,
    )
    .bind(role.id)
    .bind(&app.name)
    .bind(&app.email)
    .bind(&app.phone)
    .bind(app.cover_letter.as_deref())
    .bind(&stored.url)
    .bind(ApplicationStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    info!("Application {} received for role '{}'", row.id, role.title);

    Ok(QuickApplyResponse {
        success: true,
        application_id: row.id,
        message: format!(
            "Thank you for applying for {}, {}! We'll review your application and get back to you soon.",
            role.title, app.name
        ),
    })
}
