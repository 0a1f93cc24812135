//! Prompt and generation settings

use crate::app::{clipboard, WorkspaceApp};
use crate::workspace::highlight::unbalanced_brackets;
use crate::workspace::{GenerationParameters, Workspace};
use eframe::egui;
use egui::text::LayoutJob;
use std::sync::Arc;

/// Lay out prompt text, marking unbalanced brackets in red
pub fn highlight_job(text: &str, font: egui::FontId, color: egui::Color32, wrap_width: f32) -> LayoutJob {
    let bad = unbalanced_brackets(text);
    let normal = egui::TextFormat::simple(font.clone(), color);
    let error = egui::TextFormat {
        color: egui::Color32::from_rgb(255, 80, 80),
        background: egui::Color32::from_rgba_unmultiplied(255, 0, 0, 40),
        ..egui::TextFormat::simple(font, color)
    };

    let mut job = LayoutJob::default();
    job.wrap.max_width = wrap_width;
    let mut bad = bad.into_iter().peekable();
    let mut start = 0;
    for (position, (byte, c)) in text.char_indices().enumerate() {
        if bad.peek() == Some(&position) {
            bad.next();
            job.append(&text[start..byte], 0.0, normal.clone());
            let end = byte + c.len_utf8();
            job.append(&text[byte..end], 0.0, error.clone());
            start = end;
        }
    }
    job.append(&text[start..], 0.0, normal);
    job
}

fn prompt_editor(ui: &mut egui::Ui, text: &mut String, hint: &str) -> egui::Response {
    let mut layouter = |ui: &egui::Ui, text: &str, wrap_width: f32| -> Arc<egui::Galley> {
        let font = egui::TextStyle::Body.resolve(ui.style());
        let color = ui.visuals().text_color();
        let job = highlight_job(text, font, color, wrap_width);
        ui.fonts(|f| f.layout_job(job))
    };
    ui.add(
        egui::TextEdit::multiline(text)
            .hint_text(hint)
            .desired_width(f32::INFINITY)
            .desired_rows(3)
            .layouter(&mut layouter),
    )
}

/// Show the parameters panel
pub fn show(ui: &mut egui::Ui, app: &mut WorkspaceApp) {
    let mut params = app.workspace.parameters().clone();

    ui.heading("Prompt");
    ui.add_space(4.0);
    prompt_editor(ui, &mut params.prompt, "Prompt");
    ui.add_space(4.0);
    prompt_editor(ui, &mut params.negative_prompt, "Negative prompt");

    ui.add_space(12.0);
    ui.heading("Settings");
    ui.add_space(4.0);

    egui::Grid::new("generation_settings")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            ui.label("Width");
            ui.add(egui::DragValue::new(&mut params.width).range(64..=4096).speed(8.0));
            ui.end_row();

            ui.label("Height");
            ui.add(egui::DragValue::new(&mut params.height).range(64..=4096).speed(8.0));
            ui.end_row();

            ui.label("Padding")
                .on_hover_text("Context around the masked region, in source pixels");
            ui.add(egui::DragValue::new(&mut params.padding).range(0..=1024));
            ui.end_row();

            ui.label("Steps");
            ui.add(egui::DragValue::new(&mut params.steps).range(1..=150));
            ui.end_row();

            ui.label("CFG scale");
            ui.add(egui::DragValue::new(&mut params.scale).range(1.0..=30.0).speed(0.1));
            ui.end_row();

            ui.label("Strength");
            ui.add(egui::Slider::new(&mut params.strength, 0.0..=1.0));
            ui.end_row();

            ui.label("Seed");
            ui.horizontal(|ui| {
                ui.add(egui::DragValue::new(&mut params.seed).range(-1..=i64::from(u32::MAX)));
                if ui.small_button("Random").on_hover_text("Use a random seed").clicked() {
                    params.seed = -1;
                }
            });
            ui.end_row();
        });

    ui.add_space(8.0);
    let mut pasted = None;
    if ui
        .button("Paste parameters")
        .on_hover_text("Read settings from parameters text on the clipboard")
        .clicked()
    {
        match clipboard::read_text() {
            Ok(text) => pasted = Some(text),
            Err(e) => app.report_error(format!("Nothing to paste: {}", e)),
        }
    }

    let before = app.workspace.parameters().clone();
    if let Err(e) = commit(&mut app.workspace, params, pasted.as_deref()) {
        app.report_error(format!("Not valid parameters: {}", e));
    }
    if *app.workspace.parameters() != before {
        app.settings.generation = app.workspace.parameters().clone();
    }
}

/// Apply this frame's edits, then any pasted parameters text on top
fn commit(workspace: &mut Workspace, edited: GenerationParameters, pasted: Option<&str>) -> Result<(), String> {
    if edited != *workspace.parameters() {
        workspace.set_parameters(edited);
    }
    if let Some(text) = pasted {
        workspace.import_parameters(text)?;
    }
    Ok(())
}
