use std::path::Path;

use eframe::egui::{self, Align, Context, Layout, RichText};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        snapshot_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("wallet bubbles");
                    ui.separator();
                    if let Some(market) = self.market() {
                        ui.label(RichText::new(market.title.as_str()).strong());
                    }
                    ui.label(format!("snapshot: {}", snapshot_path.display()));
                    ui.label(format!("wallets: {}", self.stakes.len()));
                    ui.label(format!(
                        "updated {}s ago",
                        self.loaded_at.elapsed().as_secs()
                    ));

                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload positions"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(error) = &self.refresh_error {
                            ui.colored_label(egui::Color32::from_rgb(230, 120, 100), "refresh failed")
                                .on_hover_text(error.as_str());
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_canvas(ui));
    }
}
