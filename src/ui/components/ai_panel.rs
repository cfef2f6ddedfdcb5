use eframe::egui;

use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    if state.selected_room.is_none() {
        ui.label("Select a room to analyze");
        return;
    }

    let Some(analysis) = state.visible_analysis() else {
        if state.analyzing {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing…");
            });
        } else {
            ui.label("No analysis for this room");
        }
        return;
    };

    ui.heading("Summary");
    ui.label(analysis.summary.as_deref().unwrap_or("Summary unavailable"));
    ui.add_space(12.0);

    egui::Grid::new("ai_labels").num_columns(2).show(ui, |ui| {
        ui.label("Sentiment:");
        ui.label(analysis.sentiment.as_deref().unwrap_or("–"));
        ui.end_row();

        ui.label("Emotion:");
        ui.label(analysis.emotion.as_deref().unwrap_or("–"));
        ui.end_row();
    });

    ui.add_space(12.0);
    ui.label(
        egui::RichText::new(format!("Analyzed {} messages", analysis.message_count)).weak(),
    );

    for error in &analysis.errors {
        ui.colored_label(egui::Color32::RED, error.as_str());
    }
}
