//! Full size view of the opened input or output

use crate::app::{TextureKey, WorkspaceApp};
use crate::workspace::extent::Rect;
use crate::workspace::{Area, InputRole, Opened, Workspace};
use eframe::egui;

/// Extents to outline on the input at `index`.
///
/// A mask shows its own extent, an image shows the extents of the masks
/// linked to it.
pub fn extents_for(workspace: &Workspace, index: usize) -> Vec<Rect> {
    let Some(input) = workspace.inputs().get(index) else {
        return Vec::new();
    };
    match input.role() {
        InputRole::Mask => input.extent().into_iter().collect(),
        InputRole::Image => workspace
            .inputs()
            .iter()
            .filter(|other| other.link().is_some_and(|link| link.target == input.id()))
            .filter_map(|mask| mask.extent())
            .collect(),
    }
}

/// Map a rectangle in image pixels onto the screen rectangle showing the image
pub fn to_screen(rect: Rect, image_size: (u32, u32), screen: egui::Rect) -> egui::Rect {
    let sx = screen.width() / image_size.0.max(1) as f32;
    let sy = screen.height() / image_size.1.max(1) as f32;
    egui::Rect::from_min_size(
        screen.min + egui::vec2(rect.x as f32 * sx, rect.y as f32 * sy),
        egui::vec2(rect.width as f32 * sx, rect.height as f32 * sy),
    )
}

/// Largest size with the image's aspect ratio that fits `available`
fn fit_size(image_size: (u32, u32), available: egui::Vec2) -> egui::Vec2 {
    let (w, h) = (image_size.0.max(1) as f32, image_size.1.max(1) as f32);
    let scale = (available.x / w).min(available.y / h).min(1.0).max(0.0);
    egui::vec2(w * scale, h * scale)
}

enum ViewerAction {
    Left,
    Right,
    Close,
    Delete,
    Copy(i64, Area),
    Export(i64),
}

/// Show the viewer for the opened item
pub fn show(ui: &mut egui::Ui, app: &mut WorkspaceApp) {
    let Some(opened) = app.workspace.opened() else {
        return;
    };
    let ctx = ui.ctx().clone();
    let mut action: Option<ViewerAction> = None;

    ui.horizontal(|ui| {
        if ui.button("◀").on_hover_text("Previous (Left)").clicked() {
            action = Some(ViewerAction::Left);
        }
        if ui.button("▶").on_hover_text("Next (Right)").clicked() {
            action = Some(ViewerAction::Right);
        }
        match opened {
            Opened::Input(index) => {
                ui.label(format!("Input {}", index + 1));
                if ui.button("Copy").clicked() {
                    action = Some(ViewerAction::Copy(index as i64, Area::Input));
                }
            }
            Opened::Output(id) => {
                ui.label(format!("Output #{}", id));
                if ui.button("Copy").clicked() {
                    action = Some(ViewerAction::Copy(id, Area::Output));
                }
                if ui.button("Export...").clicked() {
                    action = Some(ViewerAction::Export(id));
                }
            }
        }
        if ui.button("Delete").on_hover_text("Delete (Del)").clicked() {
            action = Some(ViewerAction::Delete);
        }
        if ui.button("Close").on_hover_text("Close (Esc)").clicked() {
            action = Some(ViewerAction::Close);
        }
    });

    ui.separator();

    let (image, key, extents) = match opened {
        Opened::Input(index) => {
            let Some(input) = app.workspace.inputs().get(index) else {
                return;
            };
            let extents = if app.settings.show_extents {
                extents_for(&app.workspace, index)
            } else {
                Vec::new()
            };
            (input.image(), TextureKey::Input(input.id()), extents)
        }
        Opened::Output(id) => {
            let Some(output) = app.workspace.output(id) else {
                return;
            };
            egui::CollapsingHeader::new("Parameters")
                .default_open(true)
                .show(ui, |ui| {
                    let mut text = output.parameters.as_str();
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .desired_width(f32::INFINITY)
                            .desired_rows(2),
                    );
                    if ui.small_button("Copy parameters").clicked() {
                        ctx.copy_text(output.parameters.clone());
                    }
                });
            (Some(&output.image), TextureKey::Output(id), Vec::new())
        }
    };

    match image {
        Some(image) => {
            let image_size = (image.width(), image.height());
            let texture = app.textures.get_or_load(&ctx, key, image);
            let size = fit_size(image_size, ui.available_size());
            ui.centered_and_justified(|ui| {
                let response = ui.add(egui::Image::new((texture.id(), size)));
                for extent in &extents {
                    ui.painter().rect_stroke(
                        to_screen(*extent, image_size, response.rect),
                        0.0,
                        egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 80, 80)),
                    );
                }
            });
        }
        None => {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("Empty input").color(egui::Color32::GRAY));
            });
        }
    }

    // Process actions after UI scope
    match action {
        Some(ViewerAction::Left) => app.workspace.left(),
        Some(ViewerAction::Right) => app.workspace.right(),
        Some(ViewerAction::Close) => app.workspace.close(),
        Some(ViewerAction::Delete) => app.workspace.delete_opened(),
        Some(ViewerAction::Copy(index, area)) => app.copy_item(index, area),
        Some(ViewerAction::Export(id)) => app.export_output(id),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::GenerationParameters;
    use image::{Rgba, RgbaImage};

    fn workspace_with_mask() -> Workspace {
        let mut workspace = Workspace::new(GenerationParameters::default());
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let mut mask = RgbaImage::new(100, 100);
        mask.put_pixel(50, 50, Rgba([255, 255, 255, 255]));
        workspace.add_input(InputRole::Image, Some(image));
        workspace.add_input(InputRole::Mask, Some(mask));
        workspace
    }

    #[test]
    fn test_extents_for_mask_and_image() {
        let workspace = workspace_with_mask();
        let mask_extents = extents_for(&workspace, 1);
        assert_eq!(mask_extents.len(), 1);
        assert_eq!(extents_for(&workspace, 0), mask_extents);
    }

    #[test]
    fn test_extents_for_missing_index() {
        let workspace = workspace_with_mask();
        assert!(extents_for(&workspace, 5).is_empty());
    }

    #[test]
    fn test_to_screen_scales() {
        let screen = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(50.0, 100.0));
        let rect = to_screen(Rect::new(10, 20, 40, 60), (100, 200), screen);
        assert_eq!(rect.min, egui::pos2(15.0, 30.0));
        assert_eq!(rect.size(), egui::vec2(20.0, 30.0));
    }

    #[test]
    fn test_fit_size_never_upscales() {
        assert_eq!(fit_size((100, 50), egui::vec2(400.0, 400.0)), egui::vec2(100.0, 50.0));
        assert_eq!(fit_size((400, 200), egui::vec2(200.0, 200.0)), egui::vec2(200.0, 100.0));
    }
}
