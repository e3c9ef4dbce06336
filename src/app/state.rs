use crate::upload::naming::{default_bundle_name, DEFAULT_BUNDLE_NAME};
use crate::upload::{BundleMetadata, PendingUpload, SelectedFile, UploadPhase};
use derivative::Derivative;
use eframe::egui::{Pos2, Rect};
use std::collections::VecDeque;
use std::path::PathBuf;

/// User-editable metadata for the next upload.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Default, Debug)]
pub struct FormState {
    #[derivative(Default(value = "DEFAULT_BUNDLE_NAME.to_string()"))]
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub url: String,
}

impl FormState {
    pub fn clear_form(&mut self) {
        *self = FormState::default();
    }

    /// Appends a tag unless it is blank or already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Metadata for `file_name`; an untouched name field falls back to a
    /// name derived from the file.
    pub fn metadata_for(&self, file_name: &str) -> BundleMetadata {
        let name = self.name.trim();
        let name = if name.is_empty() || name == DEFAULT_BUNDLE_NAME {
            default_bundle_name(file_name)
        } else {
            name.to_string()
        };

        BundleMetadata {
            name,
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn pending_upload(&self, file: SelectedFile) -> PendingUpload {
        let url = self.url.trim();
        PendingUpload {
            metadata: self.metadata_for(&file.name),
            file,
            source_url: (!url.is_empty()).then(|| url.to_string()),
        }
    }
}

/// Hover feedback for one drop target. The rect is the one painted on the
/// previous frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropZone {
    pub hovering: bool,
    pub rect: Option<Rect>,
}

impl DropZone {
    pub fn contains(&self, pos: Pos2) -> bool {
        self.rect.map_or(false, |rect| rect.contains(pos))
    }

    pub fn opacity(&self) -> f32 {
        if self.hovering {
            0.5
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Directory,
    File,
}

/// Files dropped outside the directory zone, or while the pointer position
/// is unknown, go to the single-file zone.
pub fn route_drop(pointer: Option<Pos2>, directory_zone: &DropZone) -> DropTarget {
    match pointer {
        Some(pos) if directory_zone.contains(pos) => DropTarget::Directory,
        _ => DropTarget::File,
    }
}

#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub id: usize,
    pub file_name: String,
    pub phase: UploadPhase,
}

#[derive(Default)]
pub struct UploadState {
    pub attempts: Vec<UploadAttempt>,
    pub alerts: VecDeque<String>,
    pub captured_directory: Vec<PathBuf>,
    pub reload_count: usize,
    pub show_details: bool,
    next_attempt: usize,
}

impl UploadState {
    pub fn begin_attempt(&mut self, file_name: &str) -> usize {
        let id = self.next_attempt;
        self.next_attempt += 1;
        self.attempts.push(UploadAttempt {
            id,
            file_name: file_name.to_string(),
            phase: UploadPhase::Idle,
        });
        id
    }

    pub fn set_phase(&mut self, attempt: usize, phase: UploadPhase) {
        if let Some(entry) = self.attempts.iter_mut().find(|a| a.id == attempt) {
            entry.phase = phase;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !a.phase.is_finished())
            .count()
    }

    pub fn get_status_text(&self) -> String {
        let completed = self
            .attempts
            .iter()
            .filter(|a| matches!(a.phase, UploadPhase::Completed(_)))
            .count();
        let failed = self
            .attempts
            .iter()
            .filter(|a| matches!(a.phase, UploadPhase::Failed(_)))
            .count();
        format!(
            "In progress: {} | ✅ Uploaded: {} | ❌ Failed: {}",
            self.in_flight(),
            completed,
            failed
        )
    }
}
