use super::state::DropZone;
use super::UploadWidget;
use crate::upload::UploadPhase;
use eframe::egui::{self, Align2, Color32, FontId, RichText, Sense, Stroke};

const ACCENT: Color32 = Color32::from_rgb(66, 133, 244);

impl UploadWidget {
    pub fn render(&mut self, ctx: &egui::Context) {
        let alert_open = !self.state.alerts.is_empty();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!alert_open, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Upload to Worksheet");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new(format!(
                                "Worksheet {}",
                                self.workflow.target().worksheet_uuid
                            ))
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_drop_zones(ctx, ui);

                    ui.add_space(20.0);
                    self.render_form(ui);

                    if !self.state.attempts.is_empty() {
                        ui.add_space(20.0);
                        self.render_progress(ui);
                    }

                    if !self.state.captured_directory.is_empty() {
                        ui.add_space(10.0);
                        ui.label(format!(
                            "📁 {} files captured from directory drop. Directory upload is not available yet.",
                            self.state.captured_directory.len()
                        ));
                    }
                });
            });
        });

        if alert_open {
            self.render_alert(ctx);
        }
    }

    fn render_drop_zones(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let width = (ui.available_width() - 10.0) / 2.0;
        let size = egui::vec2(width.max(120.0), 100.0);

        ui.horizontal(|ui| {
            let directory =
                paint_drop_zone(ui, &mut self.directory_zone, size, "📁 Upload a directory");
            let file = paint_drop_zone(ui, &mut self.file_zone, size, "📄 Upload a file");

            if directory.clicked() {
                self.pick_directory(ctx);
            }
            if file.clicked() {
                self.pick_file(ctx);
            }
        });
    }

    fn render_form(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Clone from URL");
            ui.add(
                egui::TextEdit::singleline(&mut self.form.url)
                    .desired_width(ui.available_width())
                    .hint_text("https://..."),
            );

            ui.add_space(10.0);
            egui::Grid::new("bundle_metadata")
                .num_columns(2)
                .spacing([8.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut self.form.name);
                    ui.end_row();

                    ui.label("Description");
                    ui.text_edit_multiline(&mut self.form.description);
                    ui.end_row();
                });

            ui.add_space(6.0);
            let mut remove = None;
            ui.horizontal_wrapped(|ui| {
                ui.label("Tags");
                for (index, tag) in self.form.tags.iter().enumerate() {
                    if ui.small_button(format!("{} ✕", tag)).clicked() {
                        remove = Some(index);
                    }
                }
            });
            if let Some(index) = remove {
                self.form.remove_tag(index);
            }

            ui.horizontal(|ui| {
                let response = ui.text_edit_singleline(&mut self.tag_input);
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Add tag").clicked() || submitted {
                    let tag = std::mem::take(&mut self.tag_input);
                    self.form.add_tag(&tag);
                }
            });

            ui.add_space(6.0);
            if ui.button("🗑 Clear").clicked() {
                self.clear_form();
            }
        });
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(self.state.get_status_text());
            if self.state.reload_count > 0 {
                ui.label(format!("Worksheet reloaded {} times", self.state.reload_count));
            }

            if ui
                .button(if self.state.show_details {
                    "Hide Details"
                } else {
                    "Show Details"
                })
                .clicked()
            {
                self.state.show_details = !self.state.show_details;
            }

            if self.state.show_details {
                egui::ScrollArea::vertical()
                    .max_height(200.0)
                    .show(ui, |ui| {
                        for attempt in self.state.attempts.iter().rev() {
                            let (icon, color) = match &attempt.phase {
                                UploadPhase::Completed(_) => ("✅", Color32::from_rgb(0, 180, 0)),
                                UploadPhase::Failed(_) => ("❌", Color32::from_rgb(220, 50, 50)),
                                _ => ("⏳", Color32::from_rgb(150, 150, 150)),
                            };
                            ui.horizontal(|ui| {
                                ui.label(icon);
                                ui.colored_label(
                                    color,
                                    format!("{} - {}", attempt.file_name, attempt.phase.label()),
                                );
                            });
                        }
                    });
            }
        });
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.state.alerts.front().cloned() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new("Upload failed")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.colored_label(Color32::from_rgb(220, 50, 50), message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.state.alerts.pop_front();
        }
    }
}

fn paint_drop_zone(
    ui: &mut egui::Ui,
    zone: &mut DropZone,
    size: egui::Vec2,
    label: &str,
) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());
    zone.rect = Some(rect);

    let opacity = zone.opacity();
    let visuals = if response.hovered() {
        ui.visuals().widgets.hovered
    } else {
        ui.visuals().widgets.inactive
    };

    ui.painter()
        .rect(rect, 6.0, visuals.bg_fill.gamma_multiply(opacity), Stroke::NONE);
    ui.painter()
        .rect_stroke(rect, 6.0, Stroke::new(2.0, ACCENT.gamma_multiply(opacity)));
    ui.painter().text(
        rect.center(),
        Align2::CENTER_CENTER,
        label,
        FontId::proportional(15.0),
        ui.visuals().text_color().gamma_multiply(opacity),
    );

    response.on_hover_text("Drop here or click to browse")
}
