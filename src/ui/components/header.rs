use eframe::egui;

use crate::common::SyncState;
use crate::ui::state::{AppState, Tab};

#[derive(Default)]
pub struct HeaderActions {
    pub logout: bool,
    pub check_health: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> HeaderActions {
    let mut actions = HeaderActions::default();

    ui.horizontal(|ui| {
        ui.heading("Matrix AI Dashboard");
        ui.separator();

        let color = match &state.sync_state {
            SyncState::Prepared | SyncState::Syncing => egui::Color32::GREEN,
            SyncState::Error(_) => egui::Color32::RED,
            SyncState::Stopped => egui::Color32::GRAY,
        };
        let dot = ui.colored_label(color, "●");
        if let SyncState::Error(message) = &state.sync_state {
            dot.on_hover_text(message.as_str());
        }
        ui.label(egui::RichText::new(state.sync_state.label()).weak());

        ui.separator();
        match &state.ai_health {
            Some(status) => ui.label(format!("AI: {status}")),
            None => ui.colored_label(egui::Color32::GRAY, "AI: offline"),
        };
        if ui.small_button("Recheck").clicked() {
            actions.check_health = true;
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Logout").clicked() {
                actions.logout = true;
            }
            if let Some(user_id) = &state.user_id {
                ui.label(user_id.as_str());
            }
        });
    });

    ui.horizontal(|ui| {
        ui.selectable_value(&mut state.active_tab, Tab::Messages, "Messages");
        ui.selectable_value(&mut state.active_tab, Tab::Ai, "AI Analysis");
    });

    actions
}
