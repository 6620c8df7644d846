use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::bubbles::{Side, Tier};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn side_color(side: Side) -> Color32 {
    match side {
        Side::Yes => Color32::from_rgb(64, 186, 128),
        Side::No => Color32::from_rgb(222, 88, 92),
    }
}

/// Bigger stakes are drawn more saturated.
pub(super) fn bubble_color(side: Side, tier: Tier) -> Color32 {
    let base = side_color(side);
    match tier {
        Tier::Whale => base,
        Tier::Large => blend_color(base, Color32::from_rgb(40, 46, 56), 0.25),
        Tier::Small => blend_color(base, Color32::from_rgb(40, 46, 56), 0.5),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = 56.0;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 50));

    let mut x = rect.left() + step;
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + step;
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Layout coordinates have their origin at the canvas' top-left corner.
pub(super) fn layout_to_screen(rect: Rect, position: Vec2) -> Pos2 {
    rect.min + position
}
