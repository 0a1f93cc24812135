//! qd-workspace: image and mask workspace for diffusion inpainting
//!
//! Inputs are arranged in an ordered list where each mask links to the image
//! before it. The workspace works out the region of the image each mask
//! covers, builds generation requests for the backend, and collects the
//! resulting outputs in a gallery.

mod app;
mod backend;
mod manager;
mod settings;
mod ui;
mod workspace;

use app::WorkspaceApp;
use eframe::NativeOptions;
use settings::AppSettings;

fn main() -> eframe::Result<()> {
    env_logger::init();

    // Load settings for window size
    let settings = AppSettings::load();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([settings.window_width, settings.window_height])
        .with_min_inner_size([800.0, 600.0])
        .with_drag_and_drop(true);

    let options = NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "QD Workspace",
        options,
        Box::new(|cc| Ok(Box::new(WorkspaceApp::new(cc, settings)))),
    )
}
