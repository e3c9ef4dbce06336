mod state;
mod ui;

use crate::upload::{SelectedFile, UploadObserver, UploadPhase, UploadWorkflow};
use eframe::egui::{self, DroppedFile};
use ignore::WalkBuilder;
use state::{DropTarget, DropZone, FormState, UploadState};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Messages from background upload flows to the UI thread.
#[derive(Debug)]
enum WidgetEvent {
    Phase { attempt: usize, phase: UploadPhase },
    Alert(String),
    ReloadWorksheet,
    DirectoryCaptured(Vec<PathBuf>),
}

struct ChannelObserver {
    attempt: usize,
    sender: std_mpsc::Sender<WidgetEvent>,
    ctx: egui::Context,
}

impl ChannelObserver {
    fn send(&self, event: WidgetEvent) {
        if self.sender.send(event).is_err() {
            warn!("Upload widget closed, dropping event for attempt {}", self.attempt);
            return;
        }
        self.ctx.request_repaint();
    }
}

impl UploadObserver for ChannelObserver {
    fn phase_changed(&self, _file_name: &str, phase: &UploadPhase) {
        self.send(WidgetEvent::Phase {
            attempt: self.attempt,
            phase: phase.clone(),
        });
    }

    fn alert(&self, message: &str) {
        self.send(WidgetEvent::Alert(message.to_string()));
    }

    fn reload_worksheet(&self) {
        self.send(WidgetEvent::ReloadWorksheet);
    }
}

pub struct UploadWidget {
    form: FormState,
    tag_input: String,
    file_zone: DropZone,
    directory_zone: DropZone,
    state: UploadState,
    workflow: UploadWorkflow,
    runtime: Runtime,
    reload_worksheet: Box<dyn FnMut()>,
    event_sender: std_mpsc::Sender<WidgetEvent>,
    event_receiver: std_mpsc::Receiver<WidgetEvent>,
}

impl UploadWidget {
    pub fn new(
        workflow: UploadWorkflow,
        runtime: Runtime,
        reload_worksheet: impl FnMut() + 'static,
    ) -> Self {
        info!(
            "Initializing upload widget for worksheet {}",
            workflow.target().worksheet_uuid
        );
        let (event_sender, event_receiver) = std_mpsc::channel();
        Self {
            form: FormState::default(),
            tag_input: String::new(),
            file_zone: DropZone::default(),
            directory_zone: DropZone::default(),
            state: UploadState::default(),
            workflow,
            runtime,
            reload_worksheet: Box::new(reload_worksheet),
            event_sender,
            event_receiver,
        }
    }

    /// Starts an independent upload attempt for `file`. `None` does nothing.
    pub fn select_file(&mut self, ctx: &egui::Context, file: Option<SelectedFile>) {
        let Some(file) = file else {
            return;
        };

        let attempt = self.state.begin_attempt(&file.name);
        let pending = self.form.pending_upload(file);
        let workflow = self.workflow.clone();
        let observer = ChannelObserver {
            attempt,
            sender: self.event_sender.clone(),
            ctx: ctx.clone(),
        };

        self.runtime.spawn(async move {
            workflow.select_file(Some(pending), &observer).await;
        });
    }

    pub fn clear_form(&mut self) {
        info!("Clearing upload form");
        self.form.clear_form();
        self.tag_input.clear();
    }

    /// Lists the files under each dropped directory off the UI thread.
    /// Directory upload itself is not supported, so nothing is sent.
    fn capture_directory(&mut self, ctx: &egui::Context, paths: Vec<PathBuf>) {
        let sender = self.event_sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            let captured = list_directory_files(&paths);
            info!(
                "Captured {} files from directory drop (directory upload is not available)",
                captured.len()
            );
            if sender.send(WidgetEvent::DirectoryCaptured(captured)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    fn pick_file(&mut self, ctx: &egui::Context) {
        let file = rfd::FileDialog::new()
            .pick_file()
            .and_then(SelectedFile::from_path);
        self.select_file(ctx, file);
    }

    fn pick_directory(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            self.capture_directory(ctx, vec![path]);
        }
    }

    fn handle_file_drops(&mut self, ctx: &egui::Context) {
        let (files_hovered, pointer, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.pointer.hover_pos(),
                i.raw.dropped_files.clone(),
            )
        });

        let hovered_target =
            files_hovered.then(|| state::route_drop(pointer, &self.directory_zone));
        self.directory_zone.hovering = hovered_target == Some(DropTarget::Directory);
        self.file_zone.hovering = hovered_target == Some(DropTarget::File);

        if dropped.is_empty() {
            return;
        }

        match state::route_drop(pointer, &self.directory_zone) {
            DropTarget::Directory => {
                let paths: Vec<PathBuf> = dropped.into_iter().filter_map(|f| f.path).collect();
                self.capture_directory(ctx, paths);
            }
            DropTarget::File => {
                for dropped_file in dropped {
                    let file = Self::dropped_to_selected(dropped_file);
                    self.select_file(ctx, file);
                }
            }
        }
    }

    fn dropped_to_selected(file: DroppedFile) -> Option<SelectedFile> {
        match (file.path, file.bytes) {
            (Some(path), _) if path.is_dir() => {
                warn!("Ignoring directory {} dropped on file zone", path.display());
                None
            }
            (Some(path), _) => SelectedFile::from_path(path),
            (None, Some(bytes)) => Some(SelectedFile::from_bytes(file.name, bytes)),
            (None, None) => None,
        }
    }

    pub fn update_state(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                WidgetEvent::Phase { attempt, phase } => self.state.set_phase(attempt, phase),
                WidgetEvent::Alert(message) => self.state.alerts.push_back(message),
                WidgetEvent::ReloadWorksheet => {
                    self.state.reload_count += 1;
                    (self.reload_worksheet)();
                }
                WidgetEvent::DirectoryCaptured(files) => self.state.captured_directory = files,
            }
        }
    }
}

/// Every regular file below `paths`, hidden and ignored files included.
fn list_directory_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        let walker = WalkBuilder::new(path).standard_filters(false).build();
        files.extend(
            walker
                .flatten()
                .map(|entry| entry.into_path())
                .filter(|p| p.is_file()),
        );
    }
    files
}

impl eframe::App for UploadWidget {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state();
        self.handle_file_drops(ctx);
        self.render(ctx);
    }
}
