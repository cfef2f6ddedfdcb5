use eframe::egui;

use crate::ui::state::AppState;

#[derive(Default)]
pub struct SidebarActions {
    pub select_room: Option<String>,
    pub refresh: bool,
}

pub fn render(ui: &mut egui::Ui, state: &AppState) -> SidebarActions {
    let mut actions = SidebarActions::default();

    ui.horizontal(|ui| {
        ui.heading("Rooms");
        if ui.small_button("⟳").on_hover_text("Refresh rooms").clicked() {
            actions.refresh = true;
        }
    });
    ui.separator();

    if state.rooms.is_empty() {
        ui.label("No rooms joined yet");
        return actions;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for room in &state.rooms {
            ui.horizontal(|ui| {
                let mut selected = state.selected_room.clone();
                if ui
                    .selectable_value(&mut selected, Some(room.id.clone()), room.name.as_str())
                    .clicked()
                    && state.selected_room.as_deref() != Some(room.id.as_str())
                {
                    actions.select_room = Some(room.id.clone());
                }

                if room.unread_count > 0 {
                    ui.colored_label(
                        egui::Color32::LIGHT_BLUE,
                        format!("({})", room.unread_count),
                    );
                }
            });
        }
    });

    actions
}
