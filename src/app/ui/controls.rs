use std::sync::Arc;

use eframe::egui::{self, RichText, Ui};

use crate::bubbles::{Side, Tier};
use crate::util::format_usd;

use super::super::{SideFilter, ViewMode, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout Controls");
        ui.separator();
        ui.add_space(4.0);

        let snapshot = Arc::clone(&self.snapshot);
        let current_title = self
            .market()
            .map(|market| market.title.clone())
            .unwrap_or_else(|| "No markets".to_owned());
        let mut chosen_market = None;
        egui::ComboBox::from_label("Market")
            .selected_text(current_title)
            .width(220.0)
            .show_ui(ui, |ui| {
                for market in &snapshot.markets {
                    let is_current = self.market_id.as_deref() == Some(market.id.as_str());
                    if ui
                        .selectable_label(is_current, market.title.as_str())
                        .on_hover_text(market.id.as_str())
                        .clicked()
                    {
                        chosen_market = Some(market.id.clone());
                    }
                }
            });
        if let Some(market_id) = chosen_market {
            self.select_market(market_id);
        }

        ui.add_space(6.0);
        ui.label("Search (wallet or name)")
            .on_hover_text("Fuzzy-highlight matching wallets without changing the layout.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();

        let mut mode = self.mode;
        ui.horizontal(|ui| {
            for candidate in [ViewMode::Zone, ViewMode::Live] {
                ui.selectable_value(&mut mode, candidate, candidate.label());
            }
        })
        .response
        .on_hover_text("Zones place stakes on radial bands; live animates size quadrants.");
        self.set_mode(mode);

        let mut filters_changed = false;
        ui.horizontal(|ui| {
            ui.label("Side");
            filters_changed |= ui
                .selectable_value(&mut self.side_filter, SideFilter::Both, "Both")
                .changed();
            filters_changed |= ui
                .selectable_value(&mut self.side_filter, SideFilter::Only(Side::Yes), "Yes")
                .changed();
            filters_changed |= ui
                .selectable_value(&mut self.side_filter, SideFilter::Only(Side::No), "No")
                .changed();
        });

        let ceiling = self.stake_ceiling.max(1.0);
        filters_changed |= ui
            .add(
                egui::Slider::new(&mut self.min_stake, 0.0..=ceiling)
                    .logarithmic(true)
                    .text("Min stake ($)"),
            )
            .on_hover_text("Hide wallets whose combined stake is below this amount.")
            .changed();
        if filters_changed {
            self.rebuild_entities();
        }

        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .button("Reseed")
                .on_hover_text("Draw a new random placement.")
                .clicked()
            {
                self.reseed();
            }
            ui.label(format!("seed {}", self.seed));
        });

        if self.mode == ViewMode::Live
            && ui
                .checkbox(&mut self.animate, "Animate")
                .on_hover_text("Keep the live simulation running.")
                .changed()
        {
            self.sync_ticker();
        }

        ui.separator();
        ui.label(RichText::new("Layout").strong());
        match self.mode {
            ViewMode::Zone => {
                if let Some(cache) = &self.zone_cache {
                    let stats = cache.result.stats;
                    ui.label(format!("Circles: {}", cache.result.bubbles.len()));
                    ui.label(format!("Relaxation passes: {}", stats.relax_iterations));
                    ui.label(format!(
                        "Clear pairs: {:.1}%  (worst overlap {:.1}px)",
                        stats.overlap.clear_ratio() * 100.0,
                        stats.overlap.max_overlap
                    ));
                }
            }
            ViewMode::Live => {
                ui.label(format!("Circles: {}", self.live.len()));
                ui.label(if !self.ticker.is_running() {
                    "Paused"
                } else if self.live.is_moving() {
                    "Settling..."
                } else {
                    "At rest"
                });
                ui.label(format!("Frames simulated: {}", self.ticker.ticks()));
            }
        }

        ui.separator();
        ui.label(RichText::new("Tiers").strong());
        egui::Grid::new("tier_counts")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                ui.label("");
                ui.label("yes");
                ui.label("no");
                ui.end_row();
                for tier in Tier::ALL.iter().rev() {
                    ui.label(format!("{} (≥ {})", tier.label(), format_usd(tier.floor())));
                    for side in Side::ALL {
                        let count = self
                            .stakes
                            .iter()
                            .filter(|stake| stake.side == side && stake.tier == *tier)
                            .count();
                        ui.label(count.to_string());
                    }
                    ui.end_row();
                }
            });
    }
}
