//! Gallery of generated outputs, newest first

use super::inputs_panel::{thumbnail_size, DragItem};
use crate::app::{TextureKey, WorkspaceApp};
use crate::workspace::{Area, DropPayload, OutputId};
use eframe::egui;

const THUMBNAIL_SIZE: f32 = 160.0;

enum OutputAction {
    Open(OutputId),
    Copy(OutputId),
    Export(OutputId),
    UseAsInput(OutputId),
    Delete(OutputId),
    DeleteOlder(OutputId),
}

/// Show the outputs gallery
pub fn show(ui: &mut egui::Ui, app: &mut WorkspaceApp) {
    if app.workspace.outputs().is_empty() {
        ui.label("No outputs yet");
        ui.label(
            egui::RichText::new("Press Generate (Ctrl+Enter) to create some")
                .small()
                .color(egui::Color32::GRAY),
        );
        return;
    }

    let ctx = ui.ctx().clone();
    let ids: Vec<OutputId> = app.workspace.outputs().ids_descending().collect();
    let mut action: Option<OutputAction> = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.horizontal_wrapped(|ui| {
            for id in ids {
                let Some(output) = app.workspace.output(id) else {
                    continue;
                };
                let size = thumbnail_size(output.image.width(), output.image.height(), THUMBNAIL_SIZE);
                let texture = app.textures.get_or_load(&ctx, TextureKey::Output(id), &output.image);
                let hover = format!("#{} ({})", id, output.size_label());

                let response = ui
                    .dnd_drag_source(egui::Id::new(("output_drag", id)), DragItem::Output(id), |ui| {
                        ui.add(egui::Image::new((texture.id(), size)).sense(egui::Sense::click()))
                    })
                    .inner
                    .on_hover_text(hover);

                if response.clicked() {
                    action = Some(OutputAction::Open(id));
                }
                response.context_menu(|ui| {
                    if ui.button("Copy").clicked() {
                        action = Some(OutputAction::Copy(id));
                        ui.close_menu();
                    }
                    if ui.button("Export...").clicked() {
                        action = Some(OutputAction::Export(id));
                        ui.close_menu();
                    }
                    if ui.button("Use as input").clicked() {
                        action = Some(OutputAction::UseAsInput(id));
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Delete").clicked() {
                        action = Some(OutputAction::Delete(id));
                        ui.close_menu();
                    }
                    if ui.button("Delete older").clicked() {
                        action = Some(OutputAction::DeleteOlder(id));
                        ui.close_menu();
                    }
                });
            }
        });
    });

    // Process actions after UI scope
    match action {
        Some(OutputAction::Open(id)) => {
            app.workspace.open(id, Area::Output);
        }
        Some(OutputAction::Copy(id)) => app.copy_item(id, Area::Output),
        Some(OutputAction::Export(id)) => app.export_output(id),
        Some(OutputAction::UseAsInput(id)) => {
            app.workspace.add_drop(DropPayload::Output(id), None);
        }
        Some(OutputAction::Delete(id)) => {
            app.workspace.delete_output(id);
        }
        Some(OutputAction::DeleteOlder(id)) => {
            let removed = app.workspace.delete_outputs_before(id);
            app.status_message = Some(format!("Deleted {} older output(s)", removed));
        }
        None => {}
    }
}
