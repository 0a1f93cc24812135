use eframe::egui;
use std::path::PathBuf;

use super::WorkspaceApp;
use crate::backend::ConnectionStatus;

/// Actions triggered by keyboard/mouse input, processed after input handling
#[derive(Default)]
pub(super) struct Actions {
    pub open: bool,
    /// Files dropped on the window from outside
    pub dropped_paths: Vec<PathBuf>,
    /// Picked from the recent files menu
    pub open_recent: Option<PathBuf>,
    pub generate: bool,
    pub cancel: bool,
    pub paste: bool,
    pub add_image: bool,
    pub add_mask: bool,
    pub left: bool,
    pub right: bool,
    pub delete_opened: bool,
    pub close_viewer: bool,
}

impl WorkspaceApp {
    /// Render the toolbar and return deferred action flags
    pub(super) fn render_toolbar(&mut self, ctx: &egui::Context) -> Actions {
        let mut actions = Actions::default();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let generating = self.workspace.pending().is_some();
                let connected = self.backend.status() == ConnectionStatus::Connected;

                if ui.button("Open").clicked() {
                    actions.open = true;
                }

                // Recent files submenu
                let recent_files = self.settings.recent_files().to_vec();
                ui.menu_button("Recent Files", |ui| {
                    if recent_files.is_empty() {
                        ui.label("No recent files");
                        return;
                    }
                    for path in &recent_files {
                        let display_name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.to_string_lossy().into_owned());

                        if ui
                            .button(&display_name)
                            .on_hover_text(path.to_string_lossy())
                            .clicked()
                        {
                            actions.open_recent = Some(path.clone());
                            ui.close_menu();
                        }
                    }
                    ui.separator();
                    if ui.button("Clear Recent Files").clicked() {
                        self.settings.clear_recent_files();
                        self.settings.save();
                        ui.close_menu();
                    }
                });

                if ui.button("Paste").on_hover_text("Paste from clipboard (Ctrl+V)").clicked() {
                    actions.paste = true;
                }

                ui.separator();

                if ui.button("+ Image").clicked() {
                    actions.add_image = true;
                }
                if ui.button("+ Mask").clicked() {
                    actions.add_mask = true;
                }

                ui.separator();

                if ui
                    .add_enabled(!generating && connected, egui::Button::new("Generate"))
                    .on_hover_text("Generate (Ctrl+Enter)")
                    .on_disabled_hover_text("Connect to a backend in Settings first")
                    .clicked()
                {
                    actions.generate = true;
                }
                if ui
                    .add_enabled(generating, egui::Button::new("Cancel"))
                    .clicked()
                {
                    actions.cancel = true;
                }
                let mut forever = self.workspace.forever();
                if ui
                    .checkbox(&mut forever, "Forever")
                    .on_hover_text("Start a new generation whenever one finishes")
                    .changed()
                {
                    self.workspace.set_forever(forever);
                }

                ui.separator();

                if ui
                    .add_enabled(
                        self.workspace.opened().is_some(),
                        egui::Button::new("Gallery"),
                    )
                    .on_hover_text("Close the viewer (Esc)")
                    .clicked()
                {
                    actions.close_viewer = true;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        self.settings_dialog_state.open_dialog();
                    }
                });
            });
        });

        actions
    }

    /// Process actions (deferred to avoid borrow conflicts)
    pub(super) fn process_actions(&mut self, ctx: &egui::Context, actions: Actions) {
        if actions.open {
            self.open_files_dialog();
        }
        if !actions.dropped_paths.is_empty() {
            self.drop_files(ctx, actions.dropped_paths);
        }
        if let Some(path) = actions.open_recent {
            self.open_files(vec![path]);
        }
        if actions.paste {
            self.paste_clipboard(ctx);
        }
        if actions.add_image {
            self.workspace.add_image();
        }
        if actions.add_mask {
            self.workspace.add_mask();
        }
        if actions.generate && self.workspace.pending().is_none() {
            self.generate();
        }
        if actions.cancel {
            self.cancel();
        }
        if actions.left {
            self.workspace.left();
        }
        if actions.right {
            self.workspace.right();
        }
        if actions.delete_opened {
            self.workspace.delete_opened();
        }
        if actions.close_viewer {
            self.workspace.close();
        }
    }
}
