mod client;
pub mod naming;
mod types;
mod workflow;

pub use client::{BundleService, RestBundleClient};
pub use types::{
    BundleHandle, BundleMetadata, FailedStage, PendingUpload, SelectedFile, UploadPhase,
    UploadTarget,
};
pub use workflow::{UploadObserver, UploadWorkflow};
