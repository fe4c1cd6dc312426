use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

pub const PDF: &str = "application/pdf";
const DOC: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TEXT: &str = "text/plain";

/// Accepted for a quick-apply resume.
pub const APPLICATION_RESUME_TYPES: &[&str] = &[PDF, DOC, DOCX];
/// Accepted for a resume shared inside a chat.
pub const RESUME_TYPES: &[&str] = &[PDF, DOC, DOCX, TEXT];
pub const PORTFOLIO_TYPES: &[&str] = &[PDF, DOC, DOCX, "image/jpeg", "image/png", "image/gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Resume,
    Portfolio,
    Other,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Resume => "resume",
            AssetKind::Portfolio => "portfolio",
            AssetKind::Other => "other",
        }
    }

    /// Top-level folder in the bucket for this kind of file.
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            AssetKind::Resume => "resumes",
            AssetKind::Portfolio | AssetKind::Other => "portfolios",
        }
    }

    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Resume => RESUME_TYPES,
            AssetKind::Portfolio | AssetKind::Other => PORTFOLIO_TYPES,
        }
    }
}

impl FromStr for AssetKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resume" => Ok(AssetKind::Resume),
            "portfolio" => Ok(AssetKind::Portfolio),
            "other" => Ok(AssetKind::Other),
            other => Err(AppError::Validation(format!("Unknown asset type '{other}'"))),
        }
    }
}

/// A file part pulled out of a multipart form, not yet checked.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF
    }
}

/// A file that has passed size and type checks. Only these can be handed to storage.
#[derive(Debug, Clone)]
pub struct ValidatedFile(UploadedFile);

impl ValidatedFile {
    pub fn file(&self) -> &UploadedFile {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FileValidationError {
    #[error("No file was provided")]
    Missing,

    #[error("File must be less than {max_mb}MB")]
    TooLarge { max_mb: usize },

    #[error("File type '{content_type}' is not allowed")]
    UnsupportedType { content_type: String },
}

impl From<FileValidationError> for AppError {
    fn from(e: FileValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Checks type before size so an oversized file of the wrong type reports the type.
pub fn validate_file(
    file: UploadedFile,
    allowed_types: &[&str],
    max_size: usize,
) -> Result<ValidatedFile, FileValidationError> {
    if !allowed_types.contains(&file.content_type.as_str()) {
        return Err(FileValidationError::UnsupportedType {
            content_type: file.content_type,
        });
    }
    if file.size() > max_size {
        return Err(FileValidationError::TooLarge {
            max_mb: max_size / (1024 * 1024),
        });
    }
    Ok(ValidatedFile(file))
}

/// Guesses a MIME type from the file extension, for clients that send
/// `application/octet-stream` or nothing at all.
pub fn infer_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    let mime = match ext.as_str() {
        "pdf" => PDF,
        "doc" => DOC,
        "docx" => DOCX,
        "txt" => TEXT,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime)
}

/// Storage-safe file name: path components dropped, whitespace runs become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = base.split_whitespace().collect::<Vec<_>>().join("_");
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
