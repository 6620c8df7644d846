//! Bubble layout engine.
//!
//! Turns weighted wallet entities into circles inside a container. Two
//! strategies share the tier and radius mapping: [`zone::ZoneLayout`] recomputes
//! a radial zone placement from scratch on every refresh, and
//! [`live::LiveField`] keeps a running simulation that new refreshes merge into.

use std::collections::HashMap;

use eframe::egui::Vec2;

pub mod live;
mod overlap;
mod quadtree;
pub mod ticker;
pub mod tier;
pub mod zone;

pub use overlap::{OverlapReport, measure_overlap};
pub use tier::{RadiusProfile, Tier, classify_tier, radius_for, sanitize_magnitude};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Yes, Side::No];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "up" | "long" => Some(Self::Yes),
            "no" | "n" | "false" | "down" | "short" => Some(Self::No),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Yes => 0,
            Self::No => 1,
        }
    }
}

/// A wallet's aggregated stake on one side of a market.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: String,
    pub side: Side,
    pub magnitude: f64,
    pub tier: Tier,
}

impl Entity {
    pub fn new(id: impl Into<String>, side: Side, magnitude: f64) -> Self {
        let magnitude = sanitize_magnitude(magnitude);
        Self {
            id: id.into(),
            side,
            magnitude,
            tier: classify_tier(magnitude),
        }
    }
}

/// Size of the drawing surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Container {
    pub width: f32,
    pub height: f32,
}

impl Container {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A container that has not been laid out yet reports a zero or
    /// non-finite size; layout passes skip it.
    pub fn is_measured(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 1.0 && self.height >= 1.0
    }

    #[cfg(test)]
    pub fn contains(self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }
}

/// A circle owned by one of the layout strategies.
#[derive(Clone, Debug, PartialEq)]
pub struct Bubble {
    pub id: String,
    pub side: Side,
    pub tier: Tier,
    pub magnitude: f64,
    pub radius: f32,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub vx: f32,
    pub vy: f32,
}

pub type Placements = HashMap<String, Placement>;

pub fn placements(bubbles: &[Bubble]) -> Placements {
    bubbles
        .iter()
        .map(|bubble| {
            (
                bubble.id.clone(),
                Placement {
                    x: bubble.position.x,
                    y: bubble.position.y,
                    radius: bubble.radius,
                    vx: bubble.velocity.x,
                    vy: bubble.velocity.y,
                },
            )
        })
        .collect()
}

pub fn max_magnitude(entities: &[Entity]) -> f64 {
    entities
        .iter()
        .map(|entity| entity.magnitude)
        .fold(0.0, f64::max)
}

/// Direction used when two centers coincide and no direction can be derived
/// from their offset.
pub(crate) fn fallback_direction(first: usize, second: usize) -> Vec2 {
    let angle =
        ((first as f32) * 0.618_034 + (second as f32) * 0.414_214 + 0.11) * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parse_accepts_common_spellings() {
        assert_eq!(Side::parse("YES"), Some(Side::Yes));
        assert_eq!(Side::parse(" no "), Some(Side::No));
        assert_eq!(Side::parse("maybe"), None);
    }

    #[test]
    fn entity_sanitizes_magnitude() {
        let entity = Entity::new("w", Side::Yes, f64::NAN);
        assert_eq!(entity.magnitude, 0.0);
        assert_eq!(entity.tier, Tier::Small);

        let entity = Entity::new("w", Side::No, -40.0);
        assert_eq!(entity.magnitude, 0.0);
    }

    #[test]
    fn unmeasured_container_is_detected() {
        assert!(!Container::new(0.0, 600.0).is_measured());
        assert!(!Container::new(700.0, f32::NAN).is_measured());
        assert!(Container::new(700.0, 600.0).is_measured());
    }

    #[test]
    fn fallback_direction_is_unit_length() {
        for (a, b) in [(0, 1), (3, 7), (12, 2)] {
            let direction = fallback_direction(a, b);
            assert!((direction.length() - 1.0).abs() < 1e-4);
        }
    }
}
