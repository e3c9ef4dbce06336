use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::UploadError;

/// Where a new bundle reference is inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTarget {
    pub worksheet_uuid: String,
    pub after_sort_key: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub source: FileSource,
}

impl SelectedFile {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_string();
        Some(Self {
            name,
            source: FileSource::Path(path),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes.into()),
        }
    }

    /// Loads the whole file into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, UploadError> {
        match &self.source {
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| UploadError::ReadFile {
                        name: self.name.clone(),
                        source,
                    })
            }
            FileSource::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// User-facing metadata sent with the create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleMetadata {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file: SelectedFile,
    pub metadata: BundleMetadata,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleHandle(pub String);

impl std::fmt::Display for BundleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    MetadataCreation,
    ContentUpload,
}

/// Progress of a single upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    MetadataRequested,
    MetadataCreated(BundleHandle),
    ContentUploading(BundleHandle),
    Completed(BundleHandle),
    Failed(FailedStage),
}

impl UploadPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, UploadPhase::Completed(_) | UploadPhase::Failed(_))
    }

    pub fn label(&self) -> String {
        match self {
            UploadPhase::Idle => "Idle".to_string(),
            UploadPhase::MetadataRequested => "Creating bundle...".to_string(),
            UploadPhase::MetadataCreated(handle) => format!("Created {}", handle),
            UploadPhase::ContentUploading(handle) => format!("Uploading to {}", handle),
            UploadPhase::Completed(handle) => format!("Uploaded as {}", handle),
            UploadPhase::Failed(FailedStage::MetadataCreation) => {
                "Failed to create bundle".to_string()
            }
            UploadPhase::Failed(FailedStage::ContentUpload) => {
                "Failed to upload contents".to_string()
            }
        }
    }
}

pub enum MetadataOutcome {
    Created(BundleHandle),
    Failed(UploadError),
}

pub enum ContentOutcome {
    Uploaded,
    Failed(UploadError),
}
