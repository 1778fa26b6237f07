use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{domain::DocumentId, protocol::Document};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiErrorCategory, UiEvent},
    orchestration::{dispatch_backend_command, dispatch_upload, resolve_row_action, row_command},
    reducer::{reduce, DeskState},
};

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);
const ROW_PREVIEW_CHARS: usize = 100;

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Network",
        UiErrorCategory::Server => "Server",
        UiErrorCategory::Payload => "Response",
        UiErrorCategory::Validation => "Input",
        UiErrorCategory::Unknown => "Error",
    }
}

fn row_preview(text: &str) -> String {
    let mut preview: String = text.chars().take(ROW_PREVIEW_CHARS).collect();
    if text.chars().count() > ROW_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

pub struct DocumentDeskApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    state: DeskState,
}

impl DocumentDeskApp {
    pub fn bootstrap(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            state: DeskState {
                status: "Loading documents...".to_string(),
                ..DeskState::default()
            },
        };
        app.dispatch(BackendCommand::Mount);
        app
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.state.status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            reduce(&mut self.state, event);
        }
    }

    fn show_upload_row(&mut self, ui: &mut egui::Ui) {
        ui.heading("Upload OCR document");
        ui.horizontal(|ui| {
            if ui.button("Choose file...").clicked() {
                if let Some(path) = rfd::FileDialog::new().pick_file() {
                    self.dispatch(BackendCommand::ChooseFile { path });
                }
            }

            match self.state.view.pending_file.clone() {
                Some(name) => {
                    ui.label(name);
                    if !self.state.view.upload_pending && ui.small_button("x").clicked() {
                        self.dispatch(BackendCommand::ClearFile);
                    }
                }
                None => {
                    ui.weak("No file chosen");
                }
            }

            let affordance = self.state.view.upload_affordance();
            if ui
                .add_enabled(affordance.enabled, egui::Button::new(affordance.label))
                .clicked()
            {
                dispatch_upload(&self.cmd_tx, &mut self.state);
            }
            if self.state.view.upload_pending {
                ui.spinner();
            }
        });
    }

    fn show_search(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.state.search_query)
                    .hint_text("Search document text"),
            );
            let submitted =
                response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
            if ui.button("Search").clicked() || submitted {
                let query = self.state.search_query.trim().to_string();
                if !query.is_empty() {
                    self.dispatch(BackendCommand::Search { query });
                }
            }
        });

        let mut open: Option<DocumentId> = None;
        for hit in &self.state.search_hits {
            ui.horizontal(|ui| {
                ui.monospace(format!("{:.4}", hit.similarity));
                if ui.link(row_preview(&hit.text)).clicked() {
                    open = Some(hit.id.clone());
                }
            });
        }
        if let Some(id) = open {
            self.dispatch(BackendCommand::Select { id });
        }
    }

    fn render_document_row(ui: &mut egui::Ui, doc: &Document, loading: bool) -> (bool, bool) {
        let mut delete_clicked = false;
        let row = ui.scope_builder(
            egui::UiBuilder::new()
                .id_salt(("document_row", doc.id.as_str()))
                .sense(egui::Sense::click()),
            |ui| {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(row_preview(&doc.text));
                    ui.horizontal(|ui| {
                        ui.small(&doc.created_at);
                        if loading {
                            ui.spinner();
                        }
                    });
                    delete_clicked = ui
                        .add(
                            egui::Button::new(
                                egui::RichText::new("Delete").color(egui::Color32::RED),
                            )
                            .small(),
                        )
                        .clicked();
                });
            },
        );
        let row_clicked = row
            .response
            .on_hover_cursor(egui::CursorIcon::PointingHand)
            .clicked();
        (row_clicked, delete_clicked)
    }

    fn show_document_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Documents");
        if ui.small_button("Refresh").clicked() {
            self.dispatch(BackendCommand::Refresh);
        }
        if self.state.view.documents.is_empty() {
            ui.weak("No documents yet");
            return;
        }

        let loading_id = self.state.view.selection.loading_id().cloned();
        let mut actions = Vec::new();
        for doc in &self.state.view.documents {
            let loading = loading_id.as_ref() == Some(&doc.id);
            let (row_clicked, delete_clicked) = Self::render_document_row(ui, doc, loading);
            if let Some(action) = resolve_row_action(row_clicked, delete_clicked) {
                actions.push(row_command(action, doc.id.clone()));
            }
            ui.add_space(4.0);
        }
        for cmd in actions {
            self.dispatch(cmd);
        }
    }

    fn show_detail_panel(&mut self, ui: &mut egui::Ui) {
        let Some(doc) = self.state.view.selected_document().cloned() else {
            if self.state.view.selection.loading_id().is_some() {
                ui.separator();
                ui.spinner();
            }
            return;
        };

        ui.separator();
        let mut close = false;
        ui.horizontal(|ui| {
            ui.strong("Document detail");
            if self.state.view.selection.loading_id().is_some() {
                ui.spinner();
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                close = ui.button("Close").clicked();
            });
        });
        ui.label(&doc.text);
        ui.add_space(6.0);
        ui.small(format!("ID: {}", doc.id));
        ui.small(format!("Created: {}", doc.created_at));
        ui.small(format!("Vector: {}", doc.embedding_preview()));

        if close {
            self.dispatch(BackendCommand::CloseDetail);
        }
    }

    fn show_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| match &self.state.last_error {
            Some(err) if err.summary() == self.state.status => {
                ui.colored_label(
                    egui::Color32::LIGHT_RED,
                    format!("[{}] {}", err_label(err.category()), self.state.status),
                );
            }
            _ => {
                ui.label(&self.state.status);
            }
        });
    }
}

impl eframe::App for DocumentDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.show_status_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_upload_row(ui);
                ui.separator();
                self.show_search(ui);
                ui.separator();
                self.show_document_list(ui);
                self.show_detail_panel(ui);
            });
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
