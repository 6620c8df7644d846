use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::bubbles::zone::ZONES;
use crate::bubbles::{Bubble, Container, Side};
use crate::util::{format_usd, short_id};

use super::render_utils::{
    blend_color, bubble_color, dim_color, draw_background, layout_to_screen, side_color,
};
use super::{SearchMatchCache, ViewMode, ViewModel};

const ARC_SEGMENTS: usize = 48;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn hovered_index(bubbles: &[Bubble], rect: Rect, pointer: Option<Pos2>) -> Option<usize> {
    let pointer = pointer?;
    bubbles
        .iter()
        .enumerate()
        .filter_map(|(index, bubble)| {
            let distance = layout_to_screen(rect, bubble.position).distance(pointer);
            (distance <= bubble.radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.entities_revision == self.entities_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .stakes
            .iter()
            .filter(|stake| {
                fuzzy_match_score(&matcher, &stake.wallet, query).is_some()
                    || stake
                        .label
                        .as_deref()
                        .is_some_and(|label| fuzzy_match_score(&matcher, label, query).is_some())
            })
            .map(|stake| stake.entity_id.clone())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            entities_revision: self.entities_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn draw_zone_guides(&self, painter: &Painter, rect: Rect) {
        let midline = rect.center().x;
        painter.line_segment(
            [Pos2::new(midline, rect.top()), Pos2::new(midline, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 130, 145, 90)),
        );

        for side in Side::ALL {
            let frame = self.zone.side_frame(side, self.container);
            let tint = side_color(side);

            for zone in ZONES.iter().filter(|zone| zone.outer < 1.0) {
                let distance = frame.ring * zone.outer;
                let points = (0..=ARC_SEGMENTS)
                    .map(|step| {
                        let t = step as f32 / ARC_SEGMENTS as f32;
                        let angle = frame.arc_start + (frame.arc_end - frame.arc_start) * t;
                        let offset = egui::vec2(angle.cos(), angle.sin()) * distance;
                        layout_to_screen(rect, frame.center + offset)
                    })
                    .collect::<Vec<_>>();
                painter.add(Shape::line(
                    points,
                    Stroke::new(1.0, Color32::from_rgba_unmultiplied(tint.r(), tint.g(), tint.b(), 70)),
                ));
            }

            let total = self
                .stakes
                .iter()
                .filter(|stake| stake.side == side)
                .map(|stake| stake.magnitude)
                .sum::<f64>();
            let anchor = match side {
                Side::Yes => (rect.left_top() + egui::vec2(12.0, 10.0), Align2::LEFT_TOP),
                Side::No => (rect.right_top() + egui::vec2(-12.0, 10.0), Align2::RIGHT_TOP),
            };
            painter.text(
                anchor.0,
                anchor.1,
                format!("{}  {}", side.label().to_uppercase(), format_usd(total)),
                FontId::proportional(15.0),
                tint,
            );
        }
    }

    fn draw_quadrant_guides(&self, painter: &Painter, rect: Rect) {
        let Some(quadrants) = self.live.quadrants() else {
            return;
        };

        for quadrant in quadrants {
            let tint = side_color(quadrant.side);
            let area = Rect::from_min_max(
                layout_to_screen(rect, quadrant.min),
                layout_to_screen(rect, quadrant.max),
            );
            painter.rect_stroke(
                area,
                6.0,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(tint.r(), tint.g(), tint.b(), 80)),
                egui::StrokeKind::Inside,
            );
            painter.text(
                area.left_top() + egui::vec2(8.0, 6.0),
                Align2::LEFT_TOP,
                format!("{} · {}", quadrant.side.label(), quadrant.bucket.label()),
                FontId::proportional(12.0),
                Color32::from_gray(170),
            );
        }
    }

    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);

        self.set_container(Container::new(rect.width(), rect.height()));
        let now = ui.input(|input| input.time);
        if self.advance_live(now) {
            ui.ctx().request_repaint();
        }

        match self.mode {
            ViewMode::Zone => self.draw_zone_guides(&painter, rect),
            ViewMode::Live => self.draw_quadrant_guides(&painter, rect),
        }

        let search_matches = self.cached_search_matches();
        let bubbles = self.visible_bubbles();
        if bubbles.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No positions match the current filters.",
                FontId::proportional(14.0),
                Color32::from_gray(180),
            );
        }

        let hovered = hovered_index(&bubbles, rect, ui.input(|input| input.pointer.hover_pos()));
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.map(|index| bubbles[index].id.clone()))
        } else {
            None
        };

        let selection_active = self.selected.is_some();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;

        for (index, bubble) in bubbles.iter().enumerate() {
            let position = layout_to_screen(rect, bubble.position);
            let is_selected = self.selected.as_deref() == Some(bubble.id.as_str());
            let is_hovered = hovered == Some(index);
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&bubble.id));

            let base_color = bubble_color(bubble.side, bubble.tier);
            let unselected_color = if is_hovered {
                blend_color(base_color, Color32::WHITE, 0.3)
            } else if is_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
            } else if search_active {
                dim_color(base_color, 0.38)
            } else if selection_active {
                dim_color(base_color, 0.6)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("bubble-selection", bubble.id.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            let color = blend_color(unselected_color, selected_color, selection_mix * 0.6);

            painter.circle_filled(position, bubble.radius, color);
            if selection_mix > 0.0 {
                let halo_alpha = (60.0 + selection_mix * 150.0) as u8;
                painter.circle_stroke(
                    position,
                    bubble.radius + 3.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.5,
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }
            painter.circle_stroke(
                position,
                bubble.radius,
                Stroke::new(
                    if is_match { 1.6 } else { 1.0 },
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                ),
            );

            if bubble.radius > 20.0 || is_hovered || is_selected {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    format_usd(bubble.magnitude),
                    FontId::proportional((bubble.radius * 0.32).clamp(10.0, 16.0)),
                    Color32::from_gray(240),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some(bubble) = hovered.map(|index| &bubbles[index])
            && let Some(stake) = self.stake(&bubble.id)
        {
            let name = short_id(stake.display_name());
            let summary = format!(
                "{} · {} · {}",
                stake.side.label(),
                stake.tier.label(),
                format_usd(stake.magnitude)
            );
            response.on_hover_ui_at_pointer(|ui| {
                ui.strong(name);
                ui.label(summary);
            });
        }

        if let Some(selected) = pending_selection {
            self.set_selected(selected);
        }
    }
}
