use eframe::egui;

use crate::common::Message;

/// Returns `true` when "Load older" was clicked.
pub fn render(ui: &mut egui::Ui, messages: &[Message], loading: bool, error: Option<&str>) -> bool {
    let mut load_older = false;

    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if ui.button("Load older").clicked() {
                load_older = true;
            }
            if let Some(error) = error {
                ui.colored_label(egui::Color32::RED, error);
            }

            if loading {
                ui.spinner();
            } else if messages.is_empty() {
                ui.label(egui::RichText::new("No messages").weak());
            }

            for message in messages {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(message.sender.as_str()).strong());
                        ui.label(egui::RichText::new(message.timestamp.as_str()).weak().small());
                    });
                    ui.label(message.text.as_str());
                });
            }
        });

    load_older
}
