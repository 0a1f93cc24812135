//! Inputs list: thumbnails, roles, link state and drop targets

use crate::app::{TextureKey, WorkspaceApp};
use crate::workspace::{Area, DropPayload, InputRole, LinkState, Opened, OutputId};
use eframe::egui;

/// Longest thumbnail side in points
const THUMBNAIL_SIZE: f32 = 96.0;

/// Item dragged between the inputs list and the gallery
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragItem {
    Input(usize),
    Output(OutputId),
}

impl From<DragItem> for DropPayload {
    fn from(item: DragItem) -> Self {
        match item {
            DragItem::Input(index) => DropPayload::Input(index),
            DragItem::Output(id) => DropPayload::Output(id),
        }
    }
}

/// Scale `(width, height)` to fit a square of `max` points
pub fn thumbnail_size(width: u32, height: u32, max: f32) -> egui::Vec2 {
    if width == 0 || height == 0 {
        return egui::vec2(max, max);
    }
    let scale = max / width.max(height) as f32;
    egui::vec2(width as f32 * scale, height as f32 * scale)
}

fn link_color(state: LinkState) -> egui::Color32 {
    match state {
        LinkState::Unlinked => egui::Color32::GRAY,
        LinkState::LinkedEmpty => egui::Color32::from_rgb(255, 180, 0),
        LinkState::LinkedReady => egui::Color32::from_rgb(100, 200, 100),
    }
}

fn link_label(state: LinkState) -> &'static str {
    match state {
        LinkState::Unlinked => "Unlinked",
        LinkState::LinkedEmpty => "Linked (empty)",
        LinkState::LinkedReady => "Linked",
    }
}

enum InputAction {
    Open(usize),
    Load(usize),
    Canvas(usize),
    Clear(usize),
    Copy(usize),
    Paste(usize),
    Delete(usize),
    SetRole(usize, InputRole),
    DropOn(usize, DragItem),
    Insert(Option<usize>, DragItem),
}

/// Thin drop target between rows; only visible while something is dragged
fn insert_strip(ui: &mut egui::Ui) -> Option<DragItem> {
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(ui.available_width(), 6.0), egui::Sense::hover());
    if response.dnd_hover_payload::<DragItem>().is_some() {
        ui.painter().hline(
            rect.x_range(),
            rect.center().y,
            egui::Stroke::new(2.0, ui.visuals().selection.bg_fill),
        );
    }
    response.dnd_release_payload::<DragItem>().map(|item| *item)
}

/// Dropping an input right before or after itself changes nothing
fn is_noop_insert(position: usize, item: DragItem) -> bool {
    matches!(item, DragItem::Input(source) if position == source || position == source + 1)
}

/// Show the inputs panel
pub fn show(ui: &mut egui::Ui, app: &mut WorkspaceApp) {
    let ctx = ui.ctx().clone();
    let opened = match app.workspace.opened() {
        Some(Opened::Input(index)) => Some(index),
        _ => None,
    };
    let mut action: Option<InputAction> = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        if app.workspace.inputs().is_empty() {
            ui.label("No inputs");
            ui.label(
                egui::RichText::new("Drop images here or use \"+ Image\"")
                    .small()
                    .color(egui::Color32::GRAY),
            );
        }

        for index in 0..app.workspace.inputs().len() {
            let Some(input) = app.workspace.inputs().get(index) else {
                continue;
            };
            let id = input.id();
            let role = input.role();
            let state = input.link_state();
            let size_label = input.size_label();
            let thumb = input.image().map(|image| {
                let texture = app.textures.get_or_load(&ctx, TextureKey::Input(id), image);
                let size = thumbnail_size(image.width(), image.height(), THUMBNAIL_SIZE);
                (texture, size)
            });

            ui.push_id(id, |ui| {
                if let Some(item) = insert_strip(ui) {
                    action = Some(InputAction::Insert(Some(index), item));
                }

                let mut frame = egui::Frame::group(ui.style());
                if opened == Some(index) {
                    frame = frame.stroke(ui.visuals().selection.stroke);
                }
                let row = frame
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.dnd_drag_source(egui::Id::new(("input_drag", id)), DragItem::Input(index), |ui| {
                                match &thumb {
                                    Some((texture, size)) => {
                                        let image = egui::Image::new((texture.id(), *size))
                                            .sense(egui::Sense::click());
                                        if ui.add(image).on_hover_text("Click to open").clicked() {
                                            action = Some(InputAction::Open(index));
                                        }
                                    }
                                    None => {
                                        let (rect, response) = ui.allocate_exact_size(
                                            egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE),
                                            egui::Sense::click(),
                                        );
                                        ui.painter().rect_stroke(
                                            rect,
                                            4.0,
                                            egui::Stroke::new(1.0, egui::Color32::GRAY),
                                        );
                                        ui.painter().text(
                                            rect.center(),
                                            egui::Align2::CENTER_CENTER,
                                            "Empty",
                                            egui::FontId::proportional(12.0),
                                            egui::Color32::GRAY,
                                        );
                                        if response.clicked() {
                                            action = Some(InputAction::Open(index));
                                        }
                                    }
                                }
                            });

                            ui.vertical(|ui| {
                                let mut selected = role;
                                egui::ComboBox::from_id_salt(("role", id))
                                    .selected_text(selected.label())
                                    .width(80.0)
                                    .show_ui(ui, |ui| {
                                        ui.selectable_value(&mut selected, InputRole::Image, InputRole::Image.label());
                                        ui.selectable_value(&mut selected, InputRole::Mask, InputRole::Mask.label());
                                    });
                                if selected != role {
                                    action = Some(InputAction::SetRole(index, selected));
                                }

                                if role == InputRole::Mask {
                                    ui.colored_label(link_color(state), link_label(state));
                                }
                                ui.label(egui::RichText::new(&size_label).small());

                                ui.horizontal_wrapped(|ui| {
                                    if ui.small_button("Load").clicked() {
                                        action = Some(InputAction::Load(index));
                                    }
                                    if role == InputRole::Mask
                                        && ui
                                            .small_button("Canvas")
                                            .on_hover_text("Blank mask sized to the linked image")
                                            .clicked()
                                    {
                                        action = Some(InputAction::Canvas(index));
                                    }
                                    if ui
                                        .add_enabled(thumb.is_some(), egui::Button::new("Clear").small())
                                        .clicked()
                                    {
                                        action = Some(InputAction::Clear(index));
                                    }
                                    if ui
                                        .add_enabled(thumb.is_some(), egui::Button::new("Copy").small())
                                        .clicked()
                                    {
                                        action = Some(InputAction::Copy(index));
                                    }
                                    if ui
                                        .small_button("Paste")
                                        .on_hover_text("Insert clipboard images here")
                                        .clicked()
                                    {
                                        action = Some(InputAction::Paste(index));
                                    }
                                    if ui.small_button("Delete").clicked() {
                                        action = Some(InputAction::Delete(index));
                                    }
                                });
                            });
                        });
                    })
                    .response;

                if let Some(item) = row.dnd_release_payload::<DragItem>() {
                    action = Some(InputAction::DropOn(index, *item));
                } else if row.dnd_hover_payload::<DragItem>().is_some() {
                    ui.painter().rect_stroke(
                        row.rect,
                        4.0,
                        egui::Stroke::new(2.0, ui.visuals().selection.bg_fill),
                    );
                }
            });
        }

        // Drop zone for appending
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), 40.0),
            egui::Sense::hover(),
        );
        let hovered = response.dnd_hover_payload::<DragItem>().is_some();
        ui.painter().rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(
                1.0,
                if hovered {
                    ui.visuals().selection.bg_fill
                } else {
                    egui::Color32::DARK_GRAY
                },
            ),
        );
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop to add",
            egui::FontId::proportional(12.0),
            egui::Color32::GRAY,
        );
        if let Some(item) = response.dnd_release_payload::<DragItem>() {
            action = Some(InputAction::Insert(None, *item));
        }
    });

    // Process actions after UI scope
    let Some(action) = action else {
        return;
    };
    match action {
        InputAction::Open(index) => {
            app.workspace.open(index as i64, Area::Input);
        }
        InputAction::Load(index) => app.load_input_dialog(index),
        InputAction::Canvas(index) => {
            app.workspace.set_input_canvas(index);
        }
        InputAction::Clear(index) => {
            app.workspace.clear_input_image(index);
        }
        InputAction::Copy(index) => app.copy_item(index as i64, Area::Input),
        InputAction::Paste(index) => app.paste_item(&ctx, Some(index)),
        InputAction::Delete(index) => {
            app.workspace.delete_input(index);
        }
        InputAction::SetRole(index, role) => {
            app.workspace.set_input_role(index, role);
        }
        InputAction::DropOn(target, item) => {
            if item != DragItem::Input(target) {
                app.workspace.set_input_drop(target, item.into());
            }
        }
        InputAction::Insert(index, item) => {
            let position = index.unwrap_or(app.workspace.inputs().len());
            if !is_noop_insert(position, item) {
                app.workspace.add_drop(item.into(), Some(position));
            }
        }
    }
}
