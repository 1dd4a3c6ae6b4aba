//! Moderation document storage.
//!
//! Documents exist only while an account is pending; both terminal
//! transitions delete them. Deletion is idempotent so a partially failed
//! transition can always be retried.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store the bytes and return an opaque reference to them.
    async fn store(&self, content_type: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// Remove a stored document. A reference that no longer resolves is not
    /// an error.
    async fn delete(&self, reference: &str) -> Result<(), AppError>;
}

/// Stores documents as individual files under a configured directory, named
/// by a generated identifier rather than anything client-supplied.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "application/pdf" => "pdf",
            _ => "bin",
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn store(&self, content_type: &str, bytes: &[u8]) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create document dir: {}", e)))?;

        let reference = format!("{}.{}", Uuid::new_v4(), Self::extension_for(content_type));
        tokio::fs::write(self.root.join(&reference), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store document: {}", e)))?;

        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), AppError> {
        if reference.contains('/') || reference.contains('\\') {
            return Err(AppError::Internal(format!(
                "Invalid document reference: {}",
                reference
            )));
        }

        match tokio::fs::remove_file(self.root.join(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to delete document: {}",
                e
            ))),
        }
    }
}

/// Keeps documents in a map; used by the test suite.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    files: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryDocumentStore {
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.files.lock().unwrap().contains_key(reference)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn store(&self, content_type: &str, bytes: &[u8]) -> Result<String, AppError> {
        let reference = Uuid::new_v4().to_string();
        self.files.lock().unwrap().insert(
            reference.clone(),
            (content_type.to_string(), bytes.to_vec()),
        );
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), AppError> {
        self.files.lock().unwrap().remove(reference);
        Ok(())
    }
}
