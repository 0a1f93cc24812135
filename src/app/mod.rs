//! Main application state and egui integration

mod bridge;
pub(crate) mod clipboard;
mod fetch;
mod input;
mod preview;
mod toolbar;

pub use preview::{TextureCache, TextureKey};

use crate::backend::{BackendResponse, ConnectionStatus, RequestQueue};
use crate::manager::ManagerState;
use crate::settings::AppSettings;
use crate::ui::{
    inputs_panel, outputs_panel, parameters_panel,
    settings_dialog::{self, SettingsDialogState},
    viewer,
};
use crate::workspace::png_text::encode_png_with_parameters;
use crate::workspace::{
    Area, DropPayload, InputRole, OutputId, PasteEvent, Workspace,
};
use bridge::{Bridge, BridgeEvent};
use eframe::egui;
use fetch::{FetchResult, Fetcher};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Threshold for detecting window size changes (pixels)
const WINDOW_RESIZE_THRESHOLD: f32 = 1.0;

/// Debounce delay for window resize saves (milliseconds)
const WINDOW_RESIZE_DEBOUNCE_MS: u64 = 500;

/// Main application state
///
/// The workspace owns inputs and outputs; everything else here is view
/// state or a channel to the outside (backend queue, clipboard, downloads).
pub struct WorkspaceApp {
    pub workspace: Workspace,

    /// Requests waiting for the backend bridge, and its responses
    pub backend: RequestQueue,

    /// Model manager panel state
    pub manager: ManagerState,

    /// Uploaded textures for inputs and outputs
    pub textures: TextureCache,

    /// Settings/preferences dialog state
    pub settings_dialog_state: SettingsDialogState,

    /// Application settings (persisted to disk)
    pub settings: AppSettings,

    /// Last message for the status bar
    pub status_message: Option<String>,

    /// Pasted URL downloads
    fetcher: Fetcher,

    /// HTTP link that carries queued requests to the backend
    bridge: Bridge,

    /// Last known window size (for change detection)
    last_window_size: Option<egui::Vec2>,

    /// Timer for debouncing window resize saves
    window_resize_timer: Option<Instant>,
}

impl WorkspaceApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let mut workspace = Workspace::new(settings.generation.clone());
        let textures = TextureCache::default();
        textures.watch(&mut workspace);

        Self {
            workspace,
            backend: RequestQueue::new(),
            manager: ManagerState::default(),
            textures,
            settings_dialog_state: SettingsDialogState::default(),
            settings,
            status_message: None,
            fetcher: Fetcher::default(),
            bridge: Bridge::default(),
            last_window_size: None,
            window_resize_timer: None,
        }
    }

    /// Report an error in the status bar and the log
    pub fn report_error(&mut self, message: String) {
        log::error!("{}", message);
        self.status_message = Some(message);
    }

    /// Load image files as new inputs at the end of the list
    pub fn open_files(&mut self, paths: Vec<PathBuf>) {
        for path in &paths {
            self.settings.add_recent_file(path.clone());
        }
        let before = self.workspace.inputs().len();
        self.workspace.add_drop(DropPayload::Files(paths), None);
        if self.workspace.inputs().len() == before {
            self.status_message = Some("No readable images in drop".to_string());
        }
    }

    /// Files dropped on the window: paste them, parameters included
    pub fn drop_files(&mut self, ctx: &egui::Context, paths: Vec<PathBuf>) {
        let events = self.workspace.paste_files(&paths);
        if events.is_empty() {
            self.status_message = Some("No readable images in drop".to_string());
            return;
        }
        for path in paths {
            self.settings.add_recent_file(path);
        }
        self.route_paste_events(ctx, events);
    }

    /// Pick image files and add them as inputs
    pub fn open_files_dialog(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .add_filter("All files", &["*"])
            .pick_files()
        {
            self.open_files(paths);
        }
    }

    /// Pick a file for one input
    pub fn load_input_dialog(&mut self, index: usize) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .pick_file()
        else {
            return;
        };
        match self.workspace.load_input_file(index, &path) {
            Ok(_) => self.settings.add_recent_file(path),
            Err(e) => self.report_error(format!("Failed to load {}: {}", path.display(), e)),
        }
    }

    /// Save an output image to a file of the user's choice
    pub fn export_output(&mut self, id: OutputId) {
        let Some(output) = self.workspace.output(id) else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("output_{}.png", id))
            .add_filter("PNG", &["png"])
            .save_file()
        else {
            return;
        };
        let written = encode_png_with_parameters(&output.image, &output.parameters)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(|e| e.to_string()));
        match written {
            Ok(()) => log::info!("Exported output {} to {}", id, path.display()),
            Err(e) => self.report_error(format!("Failed to export: {}", e)),
        }
    }

    /// Open a session with the bridge at the configured endpoint
    pub fn connect_backend(&mut self, ctx: &egui::Context) {
        self.backend.set_status(ConnectionStatus::Connecting);
        self.bridge.connect(ctx, &self.settings.backend_endpoint);
    }

    /// Drop the bridge session. A pending generation is forgotten.
    pub fn disconnect_backend(&mut self) {
        self.bridge.disconnect();
        self.backend.disconnect();
        if let Some(id) = self.workspace.pending() {
            self.workspace.on_failed(id);
        }
    }

    /// Clear the model log and reconnect
    pub fn restart_backend(&mut self, ctx: &egui::Context) {
        self.manager.restart();
        self.disconnect_backend();
        self.connect_backend(ctx);
    }

    pub fn generate(&mut self) {
        if self.backend.status() != ConnectionStatus::Connected {
            self.status_message = Some("Not connected to a backend".to_string());
            return;
        }
        if let Err(e) = self.workspace.generate(&mut self.backend) {
            self.report_error(format!("Failed to encode inputs: {}", e));
        }
    }

    pub fn cancel(&mut self) {
        self.workspace.cancel(&mut self.backend);
    }

    /// Paste the system clipboard into the workspace
    pub fn paste_clipboard(&mut self, ctx: &egui::Context) {
        let content = clipboard::read();
        let events = self.workspace.paste(content);
        self.route_paste_events(ctx, events);
    }

    /// Paste the system clipboard as new inputs at `index`
    pub fn paste_item(&mut self, ctx: &egui::Context, index: Option<usize>) {
        let content = clipboard::read();
        let events = self.workspace.paste_item(index, content);
        self.route_paste_events(ctx, events);
    }

    /// Text updates parameters, images become inputs, URLs get downloaded
    fn route_paste_events(&mut self, ctx: &egui::Context, events: Vec<PasteEvent>) {
        for event in events {
            match event {
                PasteEvent::Text(text) => match self.workspace.import_parameters(&text) {
                    Ok(_) => self.settings.generation = self.workspace.parameters().clone(),
                    Err(e) => log::debug!("Pasted text is not parameters: {}", e),
                },
                PasteEvent::Image(image) => {
                    self.workspace.add_input(InputRole::Image, Some(image));
                }
                PasteEvent::Fetch(url) => self.fetcher.fetch(ctx, url),
            }
        }
    }

    /// Copy an input or output image to the system clipboard
    pub fn copy_item(&mut self, index: i64, area: Area) {
        let Some(image) = self.workspace.copy_item(index, area) else {
            return;
        };
        if let Err(e) = clipboard::write_image(&image) {
            self.report_error(format!("Failed to copy: {}", e));
        }
    }

    /// Handle finished downloads and backend responses
    fn poll_background(&mut self, ctx: &egui::Context) {
        for result in self.fetcher.poll() {
            match result {
                FetchResult::Fetched { url, bytes } => {
                    log::info!("Fetched {} ({} bytes)", url, bytes.len());
                    let events = self.workspace.on_fetched(&url, &bytes);
                    self.route_paste_events(ctx, events);
                }
                FetchResult::Failed { url, error } => {
                    self.workspace.on_fetch_failed(&url);
                    self.report_error(format!("Failed to fetch {}: {}", url, error));
                }
            }
        }

        for event in self.bridge.poll() {
            match event {
                BridgeEvent::Connected => {
                    self.backend.set_status(ConnectionStatus::Connected);
                    self.manager.refresh(&mut self.backend);
                }
                BridgeEvent::Failed(error) => {
                    self.disconnect_backend();
                    self.report_error(format!("Cannot reach backend: {}", error));
                }
                BridgeEvent::Responses(responses) => {
                    for response in responses {
                        self.backend.push_response(response);
                    }
                }
            }
        }

        for response in self.backend.take_responses() {
            self.manager.on_response(&mut self.backend, &response);
            match response {
                BackendResponse::Result { id, images } => {
                    if let Err(e) = self.workspace.on_result(id, images, &mut self.backend) {
                        self.report_error(format!("Failed to continue generating: {}", e));
                    }
                }
                BackendResponse::Error { id, message } => {
                    self.workspace.on_failed(id);
                    self.report_error(format!("Request {} failed: {}", id, message));
                }
                BackendResponse::Downloaded { .. } => {}
            }
        }

        if self.backend.status() == ConnectionStatus::Connected {
            for (id, request) in self.backend.drain_requests() {
                self.bridge
                    .forward(ctx, &self.settings.backend_endpoint, id, request);
            }
        }
    }

    /// Render the status bar
    fn render_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Backend: {}", self.backend.status().label()));
                ui.separator();
                ui.label(format!("{} input(s)", self.workspace.inputs().len()));
                ui.separator();
                ui.label(format!("{} output(s)", self.workspace.outputs().len()));
                if let Some(id) = self.workspace.pending() {
                    ui.separator();
                    ui.colored_label(egui::Color32::from_rgb(255, 180, 0), format!("Generating #{}", id));
                }
                if self.backend.pending_count() > 0 {
                    ui.separator();
                    ui.label(format!("{} queued", self.backend.pending_count()));
                }
                if let Some(message) = &self.status_message {
                    ui.separator();
                    ui.colored_label(egui::Color32::YELLOW, message);
                }
            });
        });
    }

    /// Render inputs, outputs and the viewer
    fn render_main_content(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("parameters_panel")
            .resizable(true)
            .default_width(280.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    parameters_panel::show(ui, self);
                });
            });

        egui::SidePanel::left("inputs_panel")
            .resizable(true)
            .default_width(260.0)
            .min_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Inputs");
                inputs_panel::show(ui, self);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.workspace.opened().is_some() {
                viewer::show(ui, self);
            } else {
                ui.heading("Outputs");
                outputs_panel::show(ui, self);
            }
        });
    }
}

impl eframe::App for WorkspaceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.settings.generation = self.workspace.parameters().clone();
            self.settings.save();
        }

        // Track window size changes (debounced save)
        let current_size = ctx.screen_rect().size();
        if let Some(last_size) = self.last_window_size {
            if (current_size.x - last_size.x).abs() > WINDOW_RESIZE_THRESHOLD
                || (current_size.y - last_size.y).abs() > WINDOW_RESIZE_THRESHOLD
            {
                self.window_resize_timer = Some(Instant::now());
                self.last_window_size = Some(current_size);
            }
        } else {
            self.last_window_size = Some(current_size);
        }

        // Save window size after debounce period of no resize activity
        if let Some(timer) = self.window_resize_timer {
            if timer.elapsed() > Duration::from_millis(WINDOW_RESIZE_DEBOUNCE_MS) {
                self.settings.window_width = current_size.x;
                self.settings.window_height = current_size.y;
                self.settings.save();
                self.window_resize_timer = None;
            }
        }

        self.poll_background(ctx);

        // Handle input and process actions
        let input_actions = self.handle_input(ctx);
        self.process_actions(ctx, input_actions);

        self.textures.prune(&self.workspace);

        // Render UI components
        let toolbar_actions = self.render_toolbar(ctx);
        self.process_actions(ctx, toolbar_actions);
        settings_dialog::show(ctx, self);
        self.render_status_bar(ctx);
        self.render_main_content(ctx);
    }
}
