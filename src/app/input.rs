use eframe::egui;

use super::toolbar::Actions;
use super::WorkspaceApp;

impl WorkspaceApp {
    /// Handle dropped files and keyboard shortcuts
    /// Returns flags for deferred actions
    pub(super) fn handle_input(&mut self, ctx: &egui::Context) -> Actions {
        let mut actions = Actions::default();
        // Text fields keep their own keys
        let typing = ctx.wants_keyboard_input();
        let viewing = self.workspace.opened().is_some();

        ctx.input(|i| {
            let dropped: Vec<_> = i
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect();
            if !dropped.is_empty() {
                actions.dropped_paths = dropped;
            }

            let ctrl = i.modifiers.ctrl || i.modifiers.mac_cmd;
            if ctrl && i.key_pressed(egui::Key::O) {
                actions.open = true;
            }
            if ctrl && i.key_pressed(egui::Key::Enter) {
                actions.generate = true;
            }
            if typing {
                return;
            }

            let pasted = i
                .events
                .iter()
                .any(|e| matches!(e, egui::Event::Paste(_)));
            if pasted || (ctrl && i.key_pressed(egui::Key::V)) {
                actions.paste = true;
            }
            if viewing {
                if i.key_pressed(egui::Key::ArrowLeft) {
                    actions.left = true;
                }
                if i.key_pressed(egui::Key::ArrowRight) {
                    actions.right = true;
                }
                if i.key_pressed(egui::Key::Delete) {
                    actions.delete_opened = true;
                }
                if i.key_pressed(egui::Key::Escape) {
                    actions.close_viewer = true;
                }
            }
        });

        actions
    }
}
