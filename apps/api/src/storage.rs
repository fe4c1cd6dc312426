use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::uploads::validation::{sanitize_file_name, ValidatedFile};

const CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Put-only object storage. Accepts validated files exclusively.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, file: &ValidatedFile) -> Result<StoredObject, AppError>;
}

/// `<prefix>/.../<unix millis>-<sanitized name>`.
pub fn object_key(prefix: &[&str], file_name: &str) -> String {
    let mut parts: Vec<String> = prefix.iter().map(|p| p.trim_matches('/').to_string()).collect();
    parts.push(format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(file_name)
    ));
    parts.join("/")
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, file: &ValidatedFile) -> Result<StoredObject, AppError> {
        let file = file.file();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(file.data.clone()))
            .content_type(&file.content_type)
            .cache_control(CACHE_CONTROL)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

        info!("Uploaded {} bytes to s3://{}/{}", file.size(), self.bucket, key);

        Ok(StoredObject {
            key: key.to_string(),
            url: public_url(&self.public_base_url, key),
        })
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Records every put. Can be told to fail to exercise error paths.
    #[derive(Default)]
    pub struct MemoryObjectStore {
        puts: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    impl MemoryObjectStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        pub fn keys(&self) -> Vec<String> {
            self.puts.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn put(&self, key: &str, file: &ValidatedFile) -> Result<StoredObject, AppError> {
            if self.fail {
                return Err(AppError::Storage("bucket unavailable".into()));
            }
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), file.file().size()));
            Ok(StoredObject {
                key: key.to_string(),
                url: public_url("https://files.test/uploads", key),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let key = object_key(&["applications", "role-1", "a@b.com"], "My CV.pdf");
        let (prefix, name) = key.rsplit_once('/').unwrap();
        assert_eq!(prefix, "applications/role-1/a@b.com");
        let (ts, rest) = name.split_once('-').unwrap();
        assert!(ts.parse::<i64>().is_ok());
        assert_eq!(rest, "My_CV.pdf");
    }

    #[test]
    fn test_public_url_joins_once() {
        assert_eq!(
            public_url("https://cdn.example.com/bucket/", "resumes/x.pdf"),
            "https://cdn.example.com/bucket/resumes/x.pdf"
        );
    }
}
