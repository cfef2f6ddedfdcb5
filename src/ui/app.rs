use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{DashboardCommand, DashboardEvent};

use super::components::{ai_panel, chat_area, header, login_form, sidebar};
use super::state::{AppState, Tab};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct DashboardApp {
    state: AppState,
    command_sender: mpsc::Sender<DashboardCommand>,
    event_receiver: mpsc::Receiver<DashboardEvent>,
}

impl DashboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<DashboardCommand>,
        event_receiver: mpsc::Receiver<DashboardEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_worker_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            if let Some(command) = self.state.apply(event) {
                self.send_command(command);
            }
        }
    }

    fn send_command(&mut self, command: DashboardCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to worker: {err}");
        }
    }

    fn render_login(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if login_form::render(ui, &mut self.state) {
                if let Some(command) = self.state.submit_login() {
                    self.send_command(command);
                }
            }
        });
    }

    fn render_dashboard(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let actions = header::render(ui, &mut self.state);
            if actions.check_health {
                self.send_command(DashboardCommand::CheckHealth);
            }
            if actions.logout {
                self.send_command(DashboardCommand::Logout);
            }
        });

        match self.state.active_tab {
            Tab::Messages => {
                egui::SidePanel::left("room_sidebar")
                    .resizable(true)
                    .default_width(240.0)
                    .show(ctx, |ui| {
                        let actions = sidebar::render(ui, &self.state);
                        if actions.refresh {
                            self.send_command(DashboardCommand::RefreshRooms);
                        }
                        if let Some(room_id) = actions.select_room {
                            let command = self.state.select_room(room_id);
                            self.send_command(command);
                        }
                    });

                egui::CentralPanel::default().show(ctx, |ui| {
                    let load_older = chat_area::render(
                        ui,
                        self.state.active_messages(),
                        self.state.loading,
                        self.state.error.as_deref(),
                    );
                    if load_older {
                        if let Some(room_id) = self.state.selected_room.clone() {
                            self.send_command(DashboardCommand::LoadOlder(room_id));
                        }
                    }
                });
            }
            Tab::Ai => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ai_panel::render(ui, &self.state);
                });
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_worker_events();

        if self.state.connected {
            self.render_dashboard(ctx);
        } else {
            self.render_login(ctx);
        }

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}
