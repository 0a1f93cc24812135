//! Settings dialog: backend connection, model manager and preferences

use crate::app::WorkspaceApp;
use crate::backend::ConnectionStatus;
use crate::manager::{upload_kind, ManagerTab, UPLOAD_MODES};
use crate::settings::CONFIG_DIR_NAME;
use eframe::egui;

/// Model kinds the backend can download
const DOWNLOAD_KINDS: [&str; 7] = [
    "checkpoint",
    "component",
    "lora",
    "hypernet",
    "embedding",
    "upscale",
    "controlnet",
];

/// State for the settings dialog
#[derive(Default)]
pub struct SettingsDialogState {
    /// Whether the dialog is visible
    pub dialog_open: bool,
    /// URL typed into the download field
    pub download_url: String,
    /// Index into [`DOWNLOAD_KINDS`]
    pub download_kind: usize,
}

impl SettingsDialogState {
    /// Open the settings dialog
    pub fn open_dialog(&mut self) {
        self.dialog_open = true;
    }

    /// Close the settings dialog
    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
    }

    pub fn download_kind(&self) -> &'static str {
        DOWNLOAD_KINDS[self.download_kind.min(DOWNLOAD_KINDS.len() - 1)]
    }
}

#[derive(Default)]
struct DialogActions {
    close: bool,
    clear_recent: bool,
    connect: bool,
    disconnect: bool,
    refresh: bool,
    download: bool,
    pick_upload: bool,
    upload: bool,
    restart: bool,
}

fn show_remote(ui: &mut egui::Ui, app: &mut WorkspaceApp, actions: &mut DialogActions) {
    let status = app.backend.status();
    ui.horizontal(|ui| {
        ui.label("Endpoint");
        ui.add_enabled(
            status == ConnectionStatus::Disconnected,
            egui::TextEdit::singleline(&mut app.settings.backend_endpoint),
        );
    });
    ui.horizontal(|ui| {
        ui.label(format!("Status: {}", status.label()));
        match status {
            ConnectionStatus::Disconnected => {
                if ui.button("Connect").clicked() {
                    actions.connect = true;
                }
            }
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                if ui.button("Disconnect").clicked() {
                    actions.disconnect = true;
                }
            }
        }
        if ui
            .add_enabled(status == ConnectionStatus::Connected, egui::Button::new("Refresh"))
            .on_hover_text("Ask the backend for its model lists")
            .clicked()
        {
            actions.refresh = true;
        }
    });
    if status == ConnectionStatus::Connecting {
        ui.spinner();
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.label("Hugging Face token");
        ui.add(egui::TextEdit::singleline(&mut app.settings.hf_token).password(true));
    });
}

fn show_models(ui: &mut egui::Ui, app: &mut WorkspaceApp, actions: &mut DialogActions) {
    let connected = app.backend.status() == ConnectionStatus::Connected;
    let state = &mut app.settings_dialog_state;

    ui.heading("Download");
    ui.horizontal(|ui| {
        let before = state.download_kind;
        egui::ComboBox::from_id_salt("download_kind")
            .selected_text(state.download_kind())
            .show_ui(ui, |ui| {
                for (i, kind) in DOWNLOAD_KINDS.iter().enumerate() {
                    ui.selectable_value(&mut state.download_kind, i, *kind);
                }
            });
        // Uploads usually follow the kind just downloaded
        if state.download_kind != before {
            app.manager.set_upload_mode(state.download_kind());
        }
        ui.add(egui::TextEdit::singleline(&mut state.download_url).hint_text("URL"));
        if ui
            .add_enabled(
                connected && !state.download_url.trim().is_empty(),
                egui::Button::new("Download"),
            )
            .clicked()
        {
            actions.download = true;
        }
    });

    ui.add_space(8.0);
    ui.heading("Upload");
    let manager = &mut app.manager;
    ui.horizontal(|ui| {
        egui::ComboBox::from_id_salt("upload_mode")
            .selected_text(UPLOAD_MODES[manager.upload_mode.min(UPLOAD_MODES.len() - 1)])
            .show_ui(ui, |ui| {
                for (i, mode) in UPLOAD_MODES.iter().enumerate() {
                    ui.selectable_value(&mut manager.upload_mode, i, *mode);
                }
            });
        if ui.button("Choose file...").clicked() {
            actions.pick_upload = true;
        }
    });
    match &manager.current_upload {
        Some(path) => ui.label(path.display().to_string()),
        None => ui.label(egui::RichText::new("No file chosen").color(egui::Color32::GRAY)),
    };
    if ui
        .add_enabled(
            connected && manager.current_upload.is_some(),
            egui::Button::new("Upload"),
        )
        .clicked()
    {
        actions.upload = true;
    }
}

fn show_log(ui: &mut egui::Ui, app: &mut WorkspaceApp, actions: &mut DialogActions) {
    egui::ScrollArea::vertical()
        .max_height(200.0)
        .stick_to_bottom(true)
        .show(ui, |ui| {
            let mut log = app.manager.log();
            ui.add(
                egui::TextEdit::multiline(&mut log)
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
        });
    if ui
        .button("Restart backend")
        .on_hover_text("Clear the log and reconnect")
        .clicked()
    {
        actions.restart = true;
    }
}

/// Show the settings dialog
pub fn show(ctx: &egui::Context, app: &mut WorkspaceApp) {
    if !app.settings_dialog_state.dialog_open {
        return;
    }

    let mut actions = DialogActions::default();

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(true)
        .default_width(480.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in ManagerTab::ALL {
                    ui.selectable_value(&mut app.manager.current_tab, tab, tab.label());
                }
            });
            ui.separator();

            match app.manager.current_tab {
                ManagerTab::Remote => show_remote(ui, app, &mut actions),
                ManagerTab::Models => show_models(ui, app, &mut actions),
                ManagerTab::Log => show_log(ui, app, &mut actions),
            }

            ui.add_space(16.0);

            // Preferences section
            ui.heading("Preferences");
            ui.add_space(4.0);

            ui.checkbox(&mut app.settings.show_extents, "Outline mask extents in the viewer")
                .on_hover_text("Draw the region each mask will be generated in");

            let recent_count = app.settings.recent_files().len();
            ui.horizontal(|ui| {
                ui.label(format!("{} recent file(s) stored", recent_count));
                if ui
                    .add_enabled(recent_count > 0, egui::Button::new("Clear"))
                    .clicked()
                {
                    actions.clear_recent = true;
                }
            });

            ui.add_space(16.0);

            ui.label(
                egui::RichText::new("Settings are saved automatically when the application closes.")
                    .small()
                    .color(egui::Color32::GRAY),
            );

            if let Some(path) = dirs::config_dir() {
                let settings_path = path.join(CONFIG_DIR_NAME).join("settings.json");
                ui.label(
                    egui::RichText::new(format!("Settings file: {}", settings_path.display()))
                        .small()
                        .color(egui::Color32::GRAY),
                );
            }

            ui.add_space(16.0);

            if ui.button("Close").clicked() {
                actions.close = true;
            }

            // Handle Escape to close
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                actions.close = true;
            }
        });

    // Process actions after UI scope
    process(ctx, app, actions);
}

fn process(ctx: &egui::Context, app: &mut WorkspaceApp, actions: DialogActions) {
    let status = app.backend.status();

    if actions.connect {
        app.connect_backend(ctx);
    }
    if actions.disconnect {
        app.disconnect_backend();
    }
    if actions.refresh {
        app.manager.refresh(&mut app.backend);
    }
    if actions.download {
        let kind = app.settings_dialog_state.download_kind();
        let url = app.settings_dialog_state.download_url.clone();
        let token = app.settings.token().map(str::to_string);
        if app
            .manager
            .download(&mut app.backend, status, kind, &url, token.as_deref())
            .is_some()
        {
            app.settings_dialog_state.download_url.clear();
            app.manager.current_tab = ManagerTab::Log;
        }
    }
    if actions.pick_upload {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Models", &["safetensors", "ckpt", "pt", "pth", "bin"])
            .add_filter("All files", &["*"])
            .pick_file()
        {
            app.manager.current_upload = Some(path);
        }
    }
    if actions.upload {
        let kind = upload_kind(app.manager.upload_mode);
        if let Some(path) = app.manager.current_upload.clone() {
            if app
                .manager
                .upload(&mut app.backend, status, kind, &path)
                .is_none()
            {
                app.report_error(format!("Cannot upload {}", path.display()));
            }
        }
    }
    if actions.restart {
        app.restart_backend(ctx);
    }
    if actions.clear_recent {
        app.settings.clear_recent_files();
    }
    if actions.close {
        app.settings_dialog_state.close_dialog();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_dialog_state_default() {
        let state = SettingsDialogState::default();
        assert!(!state.dialog_open);
        assert_eq!(state.download_kind(), "checkpoint");
    }

    #[test]
    fn test_settings_dialog_state_open_close() {
        let mut state = SettingsDialogState::default();

        state.open_dialog();
        assert!(state.dialog_open);

        state.close_dialog();
        assert!(!state.dialog_open);
    }

    #[test]
    fn test_download_kind_out_of_range() {
        let state = SettingsDialogState {
            download_kind: 99,
            ..Default::default()
        };
        assert_eq!(state.download_kind(), "controlnet");
    }
}
