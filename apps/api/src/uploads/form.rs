use std::collections::HashMap;

use axum::extract::Multipart;

use crate::errors::AppError;
use crate::uploads::validation::{infer_content_type, UploadedFile};

/// A multipart body split into text fields and file parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let declared = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                    // Browsers send an empty part when the file input is left blank.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    let content_type = resolve_content_type(declared.as_deref(), &file_name);
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                    form.text.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// First present text value among `names`, for fields clients spell differently.
    pub fn text_any(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.text(n))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub fn from_parts(text: &[(&str, &str)], files: Vec<(&str, UploadedFile)>) -> Self {
        Self {
            text: text
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files.into_iter().map(|(k, f)| (k.to_string(), f)).collect(),
        }
    }
}

fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => infer_content_type(file_name)
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}
