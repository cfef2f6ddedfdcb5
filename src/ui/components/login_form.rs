use eframe::egui;

use crate::ui::state::AppState;

/// Returns `true` when the user asked to log in.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> bool {
    let mut submit = false;

    ui.vertical_centered(|ui| {
        ui.add_space(120.0);
        ui.heading("Matrix AI Dashboard");
        ui.add_space(16.0);

        ui.add(
            egui::TextEdit::singleline(&mut state.username_input)
                .hint_text("Username (admin)")
                .desired_width(280.0),
        );
        ui.add_space(8.0);

        let password = ui.add(
            egui::TextEdit::singleline(&mut state.password_input)
                .hint_text("Password")
                .password(true)
                .desired_width(280.0),
        );
        if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submit = true;
        }
        ui.add_space(8.0);

        if let Some(error) = &state.error {
            ui.colored_label(egui::Color32::RED, error.as_str());
            ui.add_space(8.0);
        }

        let label = if state.loading { "Connecting…" } else { "Login" };
        if ui
            .add_enabled(!state.loading, egui::Button::new(label).min_size(egui::vec2(280.0, 32.0)))
            .clicked()
        {
            submit = true;
        }

        ui.add_space(16.0);
        ui.label(egui::RichText::new("Matrix + Mautrix + AI").weak());
    });

    submit && !state.loading
}
