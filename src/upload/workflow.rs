use std::sync::Arc;
use tracing::{debug, error, info};

use super::client::BundleService;
use super::naming::ContentUploadParams;
use super::types::{
    BundleHandle, ContentOutcome, FailedStage, MetadataOutcome, PendingUpload, SelectedFile,
    UploadPhase, UploadTarget,
};
use crate::error::UploadError;

/// Receives the visible effects of one upload attempt.
pub trait UploadObserver: Send + Sync {
    fn phase_changed(&self, _file_name: &str, _phase: &UploadPhase) {}

    /// Blocking, user-facing error report.
    fn alert(&self, message: &str);

    fn reload_worksheet(&self);
}

/// Runs the create-then-upload sequence for one file at a time. Each call
/// to [`UploadWorkflow::select_file`] is an independent attempt.
#[derive(Clone)]
pub struct UploadWorkflow {
    service: Arc<dyn BundleService>,
    target: UploadTarget,
}

impl UploadWorkflow {
    pub fn new(service: Arc<dyn BundleService>, target: UploadTarget) -> Self {
        Self { service, target }
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    pub async fn select_file(
        &self,
        pending: Option<PendingUpload>,
        observer: &dyn UploadObserver,
    ) -> UploadPhase {
        let Some(pending) = pending else {
            return UploadPhase::Idle;
        };
        let file_name = pending.file.name.clone();
        info!("Starting upload of {}", file_name);
        if let Some(url) = &pending.source_url {
            debug!("Clone URL {} is recorded but not fetched", url);
        }

        observer.phase_changed(&file_name, &UploadPhase::MetadataRequested);
        let handle = match self.create_metadata(&pending).await {
            MetadataOutcome::Created(handle) => handle,
            MetadataOutcome::Failed(err) => {
                return Self::fail(&file_name, FailedStage::MetadataCreation, err, observer)
            }
        };
        observer.phase_changed(&file_name, &UploadPhase::MetadataCreated(handle.clone()));

        observer.phase_changed(&file_name, &UploadPhase::ContentUploading(handle.clone()));
        match self.upload_content(&pending.file, &handle).await {
            ContentOutcome::Uploaded => {
                let phase = UploadPhase::Completed(handle);
                observer.phase_changed(&file_name, &phase);
                info!("Finished upload of {}", file_name);
                observer.reload_worksheet();
                phase
            }
            ContentOutcome::Failed(err) => {
                // The bundle created above stays behind on the server.
                Self::fail(&file_name, FailedStage::ContentUpload, err, observer)
            }
        }
    }

    async fn create_metadata(&self, pending: &PendingUpload) -> MetadataOutcome {
        match self
            .service
            .create_bundle(&self.target, &pending.metadata)
            .await
        {
            Ok(handle) => MetadataOutcome::Created(handle),
            Err(err) => MetadataOutcome::Failed(err),
        }
    }

    async fn upload_content(&self, file: &SelectedFile, handle: &BundleHandle) -> ContentOutcome {
        let bytes = match file.read_bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                return ContentOutcome::Failed(UploadError::ContentUpload {
                    url: self.service.contents_url(handle),
                    message: err.to_string(),
                })
            }
        };

        let params = ContentUploadParams::for_file(&file.name);
        match self.service.upload_contents(handle, &params, bytes).await {
            Ok(()) => ContentOutcome::Uploaded,
            Err(err) => ContentOutcome::Failed(err),
        }
    }

    fn fail(
        file_name: &str,
        stage: FailedStage,
        err: UploadError,
        observer: &dyn UploadObserver,
    ) -> UploadPhase {
        error!("Upload of {} failed during {:?}: {}", file_name, stage, err);
        let phase = UploadPhase::Failed(stage);
        observer.phase_changed(file_name, &phase);
        observer.alert(&err.alert_text());
        phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::BundleMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(UploadTarget, BundleMetadata),
        Upload(BundleHandle, ContentUploadParams, Vec<u8>),
    }

    #[derive(Default)]
    struct FakeService {
        calls: Mutex<Vec<Call>>,
        reject_create: Option<String>,
        reject_upload: Option<String>,
    }

    impl FakeService {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BundleService for FakeService {
        fn create_bundle_url(&self, target: &UploadTarget) -> String {
            format!("http://fake/rest/bundles?worksheet={}", target.worksheet_uuid)
        }

        fn contents_url(&self, handle: &BundleHandle) -> String {
            format!("http://fake/rest/bundles/{}/contents/blob/", handle)
        }

        async fn create_bundle(
            &self,
            target: &UploadTarget,
            metadata: &BundleMetadata,
        ) -> Result<BundleHandle, UploadError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Create(target.clone(), metadata.clone()));
            match &self.reject_create {
                Some(text) => Err(UploadError::MetadataCreation {
                    url: self.create_bundle_url(target),
                    message: text.clone(),
                }),
                None => Ok(BundleHandle("0xfeed".to_string())),
            }
        }

        async fn upload_contents(
            &self,
            handle: &BundleHandle,
            params: &ContentUploadParams,
            bytes: Vec<u8>,
        ) -> Result<(), UploadError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Upload(handle.clone(), params.clone(), bytes));
            match &self.reject_upload {
                Some(text) => Err(UploadError::ContentUpload {
                    url: self.contents_url(handle),
                    message: text.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        alerts: Mutex<Vec<String>>,
        phases: Mutex<Vec<UploadPhase>>,
        reloads: AtomicUsize,
    }

    impl UploadObserver for RecordingObserver {
        fn phase_changed(&self, _file_name: &str, phase: &UploadPhase) {
            self.phases.lock().unwrap().push(phase.clone());
        }

        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }

        fn reload_worksheet(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn target() -> UploadTarget {
        UploadTarget {
            worksheet_uuid: "0xws".to_string(),
            after_sort_key: Some(4),
        }
    }

    fn pending(name: &str, bytes: &[u8]) -> PendingUpload {
        PendingUpload {
            file: SelectedFile::from_bytes(name, bytes.to_vec()),
            metadata: BundleMetadata {
                name: "upload".to_string(),
                ..BundleMetadata::default()
            },
            source_url: None,
        }
    }

    fn workflow(service: &Arc<FakeService>) -> UploadWorkflow {
        UploadWorkflow::new(service.clone(), target())
    }

    #[tokio::test]
    async fn no_file_is_a_no_op() {
        let service = Arc::new(FakeService::default());
        let observer = RecordingObserver::default();

        let phase = workflow(&service).select_file(None, &observer).await;

        assert_eq!(phase, UploadPhase::Idle);
        assert!(service.calls().is_empty());
        assert!(observer.phases.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zip_upload_requests_unpack_and_reloads_once() {
        let service = Arc::new(FakeService::default());
        let observer = RecordingObserver::default();

        let phase = workflow(&service)
            .select_file(Some(pending("data.zip", b"PK")), &observer)
            .await;

        let handle = BundleHandle("0xfeed".to_string());
        assert_eq!(phase, UploadPhase::Completed(handle.clone()));
        let calls = service.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], Call::Create(t, m) if *t == target() && m.name == "upload"));
        match &calls[1] {
            Call::Upload(h, params, bytes) => {
                assert_eq!(*h, handle);
                assert_eq!(params.unpack, 1);
                assert_eq!(params.finalize, 1);
                assert!(params.filename.ends_with(".zip"));
                assert_eq!(bytes.as_slice(), b"PK");
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(observer.reloads.load(Ordering::SeqCst), 1);
        assert!(observer.alerts.lock().unwrap().is_empty());
        assert_eq!(
            *observer.phases.lock().unwrap(),
            vec![
                UploadPhase::MetadataRequested,
                UploadPhase::MetadataCreated(handle.clone()),
                UploadPhase::ContentUploading(handle.clone()),
                UploadPhase::Completed(handle),
            ]
        );
    }

    #[tokio::test]
    async fn text_upload_is_not_unpacked() {
        let service = Arc::new(FakeService::default());
        let observer = RecordingObserver::default();

        workflow(&service)
            .select_file(Some(pending("notes.txt", b"hi")), &observer)
            .await;

        match &service.calls()[1] {
            Call::Upload(_, params, _) => {
                assert_eq!(params.unpack, 0);
                assert_eq!(params.filename, "notes.txt");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn metadata_failure_alerts_once_and_skips_upload() {
        let service = Arc::new(FakeService {
            reject_create: Some("Invalid worksheet".to_string()),
            ..FakeService::default()
        });
        let observer = RecordingObserver::default();

        let phase = workflow(&service)
            .select_file(Some(pending("data.zip", b"PK")), &observer)
            .await;

        assert_eq!(phase, UploadPhase::Failed(FailedStage::MetadataCreation));
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::Create(..)));

        let alerts = observer.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("http://fake/rest/bundles?worksheet=0xws"));
        assert!(alerts[0].contains("Invalid worksheet"));
        assert_eq!(observer.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_failure_alerts_once_and_never_reloads() {
        let service = Arc::new(FakeService {
            reject_upload: Some("Disk full".to_string()),
            ..FakeService::default()
        });
        let observer = RecordingObserver::default();

        let phase = workflow(&service)
            .select_file(Some(pending("notes.txt", b"hi")), &observer)
            .await;

        assert_eq!(phase, UploadPhase::Failed(FailedStage::ContentUpload));
        assert_eq!(service.calls().len(), 2);

        let alerts = observer.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("/bundles/0xfeed/contents/blob/"));
        assert!(alerts[0].contains("Disk full"));
        assert_eq!(observer.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_file_fails_content_stage_without_upload() {
        let dir = tempfile::tempdir().unwrap();
        let missing = SelectedFile::from_path(dir.path().join("missing.csv")).unwrap();
        let service = Arc::new(FakeService::default());
        let observer = RecordingObserver::default();

        let phase = workflow(&service)
            .select_file(
                Some(PendingUpload {
                    file: missing,
                    metadata: BundleMetadata::default(),
                    source_url: None,
                }),
                &observer,
            )
            .await;

        assert_eq!(phase, UploadPhase::Failed(FailedStage::ContentUpload));
        assert_eq!(service.calls().len(), 1);
        assert_eq!(observer.alerts.lock().unwrap().len(), 1);
        assert_eq!(observer.reloads.load(Ordering::SeqCst), 0);
    }
}
