use eframe::egui::{self, Align, Layout, RichText, Ui};

use crate::bubbles::{Placement, Side};
use crate::util::{format_usd, short_id};

use super::super::render_utils::side_color;
use super::super::{ViewMode, ViewModel};

impl ViewModel {
    fn selected_placement(&self, id: &str) -> Option<Placement> {
        let placements = match self.mode {
            ViewMode::Live => self.live.placements(),
            ViewMode::Zone => self
                .zone_cache
                .as_ref()
                .map(|cache| cache.result.placements())
                .unwrap_or_default(),
        };
        placements.get(id).copied()
    }

    fn side_total(&self, side: Side) -> f64 {
        self.stakes
            .iter()
            .filter(|stake| stake.side == side)
            .map(|stake| stake.magnitude)
            .sum()
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Wallet Details");
        ui.add_space(6.0);

        self.draw_selection(ui);

        ui.separator();
        egui::CollapsingHeader::new("Top wallets")
            .default_open(true)
            .show(ui, |ui| self.draw_ranking(ui));
    }

    fn draw_selection(&mut self, ui: &mut Ui) {
        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click a bubble or a ranking row to inspect a wallet.");
            return;
        };

        let Some(stake) = self.stake(&selected_id).cloned() else {
            ui.label("Selected wallet is no longer in the current view.");
            return;
        };

        ui.label(RichText::new(short_id(stake.display_name())).strong());
        ui.small(stake.wallet.as_str());
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.label("Side:");
            ui.colored_label(side_color(stake.side), stake.side.label());
        });
        ui.label(format!("Tier: {}", stake.tier.label()));
        ui.label(format!("Stake: {}", format_usd(stake.magnitude)));
        ui.label(format!("Positions merged: {}", stake.records));

        let side_total = self.side_total(stake.side);
        if side_total > 0.0 {
            ui.label(format!(
                "Share of {} side: {:.1}%",
                stake.side.label(),
                stake.magnitude / side_total * 100.0
            ));
        }

        if let Some(placement) = self.selected_placement(&selected_id) {
            ui.label(format!("Radius: {:.1}px", placement.radius));
            ui.label(format!("Position: ({:.0}, {:.0})", placement.x, placement.y));
            if self.mode == ViewMode::Live {
                let speed = placement.vx.hypot(placement.vy);
                ui.label(format!("Speed: {speed:.2}px/frame"));
            }
        }

        ui.add_space(6.0);
        if ui.button("Clear selection").clicked() {
            self.set_selected(None);
        }
    }

    fn draw_ranking(&mut self, ui: &mut Ui) {
        let ids_len = self.stakes.len();
        let row_count = ids_len.min(self.ranking_rows_visible);
        let mut should_load_more = false;
        let mut selected_id = None;

        egui::ScrollArea::vertical()
            .id_salt("wallet_ranking_scroll")
            .max_height(420.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::RANKING_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for index in row_range {
                    let Some(stake) = self.stakes.get(index) else {
                        continue;
                    };

                    let is_selected = self.selected.as_deref() == Some(stake.entity_id.as_str());
                    let row_clicked = ui
                        .horizontal(|ui| {
                            ui.colored_label(side_color(stake.side), "●");
                            let clicked = ui
                                .selectable_label(is_selected, short_id(stake.display_name()))
                                .on_hover_text(stake.wallet.as_str())
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(format_usd(stake.magnitude));
                            });
                            clicked
                        })
                        .inner;

                    if row_clicked {
                        selected_id = Some(stake.entity_id.clone());
                    }
                }
            });

        if let Some(id) = selected_id {
            self.set_selected(Some(id));
        }

        if should_load_more && row_count < ids_len {
            self.ranking_rows_visible = (row_count + Self::RANKING_PAGE_ROWS).min(ids_len);
        }
    }
}
