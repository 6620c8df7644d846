use eframe::egui::{Vec2, vec2};

use super::super::{Container, Side, Tier};

/// Coarse size split used by the live view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeBucket {
    /// Whale and large stakes.
    Major,
    Minor,
}

impl SizeBucket {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Whale | Tier::Large => Self::Major,
            Tier::Small => Self::Minor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Major => "whales & large",
            Self::Minor => "small",
        }
    }
}

/// Index of the quadrant for a side and bucket: yes on the left, no on the
/// right, major stakes on top.
pub fn quadrant_index(side: Side, bucket: SizeBucket) -> usize {
    let column = side.index();
    let row = match bucket {
        SizeBucket::Major => 0,
        SizeBucket::Minor => 1,
    };
    row * 2 + column
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quadrant {
    pub side: Side,
    pub bucket: SizeBucket,
    pub min: Vec2,
    pub max: Vec2,
}

impl Quadrant {
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Carries `position` to the same relative spot inside `target`.
    pub fn map_to(&self, target: &Quadrant, position: Vec2) -> Vec2 {
        let size = self.size();
        let relative = |value: f32, min: f32, extent: f32| {
            if extent > 0.0 {
                (value - min) / extent
            } else {
                0.5
            }
        };
        let target_size = target.size();
        target.min
            + vec2(
                relative(position.x, self.min.x, size.x) * target_size.x,
                relative(position.y, self.min.y, size.y) * target_size.y,
            )
    }

    /// Range a circle center may occupy on each axis. Circles wider than
    /// the quadrant collapse onto its center line.
    pub fn center_range(&self, radius: f32) -> (Vec2, Vec2) {
        let mut low = self.min + vec2(radius, radius);
        let mut high = self.max - vec2(radius, radius);
        if low.x > high.x {
            let mid = (self.min.x + self.max.x) * 0.5;
            low.x = mid;
            high.x = mid;
        }
        if low.y > high.y {
            let mid = (self.min.y + self.max.y) * 0.5;
            low.y = mid;
            high.y = mid;
        }
        (low, high)
    }

    pub fn clamp(&self, position: Vec2, radius: f32) -> Vec2 {
        let (low, high) = self.center_range(radius);
        vec2(
            position.x.clamp(low.x, high.x),
            position.y.clamp(low.y, high.y),
        )
    }
}

/// The four padded quarters of a measured container.
pub fn quadrants(container: Container, padding: f32) -> Option<[Quadrant; 4]> {
    if !container.is_measured() {
        return None;
    }

    let padding = padding.max(0.0);
    let half_width = container.width * 0.5;
    let half_height = container.height * 0.5;
    let build = |side: Side, bucket: SizeBucket| {
        let left = match side {
            Side::Yes => 0.0,
            Side::No => half_width,
        };
        let top = match bucket {
            SizeBucket::Major => 0.0,
            SizeBucket::Minor => half_height,
        };
        let min = vec2(left + padding, top + padding);
        let max = vec2(left + half_width - padding, top + half_height - padding);
        Quadrant {
            side,
            bucket,
            min,
            max: vec2(max.x.max(min.x), max.y.max(min.y)),
        }
    };

    Some([
        build(Side::Yes, SizeBucket::Major),
        build(Side::No, SizeBucket::Major),
        build(Side::Yes, SizeBucket::Minor),
        build(Side::No, SizeBucket::Minor),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_build_order() {
        let quadrants = quadrants(Container::new(800.0, 600.0), 4.0).expect("measured");
        for (index, quadrant) in quadrants.iter().enumerate() {
            assert_eq!(quadrant_index(quadrant.side, quadrant.bucket), index);
        }
    }

    #[test]
    fn quadrants_tile_the_container() {
        let quadrants = quadrants(Container::new(800.0, 600.0), 0.0).expect("measured");
        let total_area = quadrants
            .iter()
            .map(|quadrant| quadrant.size().x * quadrant.size().y)
            .sum::<f32>();
        assert!((total_area - 800.0 * 600.0).abs() < 1e-2);
        assert_eq!(quadrants[0].center(), vec2(200.0, 150.0));
        assert_eq!(quadrants[3].center(), vec2(600.0, 450.0));
    }

    #[test]
    fn map_to_keeps_relative_offsets() {
        let small = quadrants(Container::new(400.0, 300.0), 0.0).expect("measured");
        let large = quadrants(Container::new(800.0, 600.0), 0.0).expect("measured");

        assert_eq!(small[1].map_to(&large[1], small[1].center()), large[1].center());
        assert_eq!(small[0].map_to(&large[0], vec2(50.0, 75.0)), vec2(100.0, 150.0));
    }

    #[test]
    fn unmeasured_container_has_no_quadrants() {
        assert!(quadrants(Container::new(0.0, 300.0), 4.0).is_none());
    }

    #[test]
    fn oversized_circle_clamps_to_center_line() {
        let quadrant = quadrants(Container::new(100.0, 100.0), 0.0).expect("measured")[0];
        let clamped = quadrant.clamp(vec2(0.0, 0.0), 40.0);
        assert_eq!(clamped, vec2(25.0, 25.0));
    }
}
