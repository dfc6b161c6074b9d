use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use db::{
    DBService, DbErr,
    models::{
        attachment::{Attachment, AttachmentError, CreateAttachment},
        task::Task,
    },
};
use thiserror::Error;
use uuid::Uuid;

pub const MAX_ATTACHMENT_SIZE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Boundary to the external binary store. The registry is its only consumer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

/// Filesystem-backed store rooted under the asset directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and local tooling.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: std::sync::Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(ObjectStoreError::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or(ObjectStoreError::NotFound)
    }
}

#[derive(Debug, Error)]
pub enum AttachmentServiceError {
    #[error("Attachment not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Uploader not found")]
    UploaderNotFound,
    #[error("File is too large ({size} bytes); the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("Storage error: {0}")]
    Storage(#[from] ObjectStoreError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<AttachmentError> for AttachmentServiceError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound => Self::NotFound,
            AttachmentError::TaskNotFound => Self::TaskNotFound,
            AttachmentError::UploaderNotFound => Self::UploaderNotFound,
            AttachmentError::Database(db_err) => Self::Database(db_err),
        }
    }
}

/// Keeps the binary object and its metadata record paired. The metadata row
/// is the source of truth: a binary is only removed once no row points at
/// it, and a binary whose row failed to land is removed immediately.
#[derive(Clone)]
pub struct AttachmentService {
    db: DBService,
    store: Arc<dyn ObjectStore>,
}

impl AttachmentService {
    pub fn new(db: DBService, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, store }
    }

    pub async fn upload(
        &self,
        task_id: Uuid,
        bytes: &[u8],
        file_name: &str,
        mime_type: Option<String>,
        uploaded_by: Uuid,
    ) -> Result<Attachment, AttachmentServiceError> {
        let size = bytes.len() as u64;
        if size > MAX_ATTACHMENT_SIZE_BYTES {
            return Err(AttachmentServiceError::TooLarge {
                size,
                max: MAX_ATTACHMENT_SIZE_BYTES,
            });
        }

        let task = Task::find_by_id(&self.db.conn, task_id)
            .await?
            .ok_or(AttachmentServiceError::TaskNotFound)?;

        let storage_key = format!(
            "org/{}/task/{}/{}-{}",
            task.organisation_id,
            task.id,
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name)
        );

        self.store.put(&storage_key, bytes).await?;

        let created = Attachment::create(
            &self.db.conn,
            task_id,
            uploaded_by,
            &CreateAttachment {
                file_name: file_name.to_string(),
                size_bytes: size as i64,
                mime_type,
                storage_key: storage_key.clone(),
            },
        )
        .await;

        match created {
            Ok(attachment) => Ok(attachment),
            Err(err) => {
                if let Err(cleanup_err) = self.store.delete(&storage_key).await {
                    tracing::error!(
                        key = %storage_key,
                        error = %cleanup_err,
                        "Failed to remove binary after metadata write failure"
                    );
                }
                Err(err.into())
            }
        }
    }

    pub async fn download(
        &self,
        attachment_id: Uuid,
    ) -> Result<(Attachment, Vec<u8>), AttachmentServiceError> {
        let attachment = Attachment::find_by_id(&self.db.conn, attachment_id)
            .await?
            .ok_or(AttachmentServiceError::NotFound)?;
        let bytes = self.store.get(&attachment.storage_key).await?;
        Ok((attachment, bytes))
    }

    pub async fn delete(&self, attachment_id: Uuid) -> Result<(), AttachmentServiceError> {
        let attachment = Attachment::find_by_id(&self.db.conn, attachment_id)
            .await?
            .ok_or(AttachmentServiceError::NotFound)?;

        let removed = Attachment::delete(&self.db.conn, attachment_id).await?;
        if removed == 0 {
            return Err(AttachmentServiceError::NotFound);
        }

        // Once the metadata row is gone nothing points at the binary; a
        // failed removal leaves it for the reconciliation sweep.
        if let Err(err) = self.store.delete(&attachment.storage_key).await {
            tracing::warn!(
                key = %attachment.storage_key,
                error = %err,
                "Binary removal failed; object left for reconciliation"
            );
        }
        Ok(())
    }

    pub async fn list(&self, task_id: Uuid) -> Result<Vec<Attachment>, AttachmentServiceError> {
        Ok(Attachment::find_by_task_id(&self.db.conn, task_id).await?)
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
