use serde::{Deserialize, Deserializer};

pub const WHALE_THRESHOLD: f64 = 10_000.0;
pub const LARGE_THRESHOLD: f64 = 1_000.0;
const WHALE_CEILING: f64 = 100_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Small,
    Large,
    Whale,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Small, Tier::Large, Tier::Whale];

    pub fn label(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
            Self::Whale => "whale",
        }
    }

    /// Smallest magnitude that classifies into this tier.
    pub fn floor(self) -> f64 {
        match self {
            Self::Small => 0.0,
            Self::Large => LARGE_THRESHOLD,
            Self::Whale => WHALE_THRESHOLD,
        }
    }

    /// Magnitude that maps to the top of the tier's radius range under
    /// [`RadiusScale::TierCeiling`].
    pub fn ceiling(self) -> f64 {
        match self {
            Self::Small => LARGE_THRESHOLD,
            Self::Large => WHALE_THRESHOLD,
            Self::Whale => WHALE_CEILING,
        }
    }
}

pub fn sanitize_magnitude(magnitude: f64) -> f64 {
    if magnitude.is_finite() && magnitude > 0.0 {
        magnitude
    } else {
        0.0
    }
}

pub fn classify_tier(magnitude: f64) -> Tier {
    let magnitude = sanitize_magnitude(magnitude);
    if magnitude >= WHALE_THRESHOLD {
        Tier::Whale
    } else if magnitude >= LARGE_THRESHOLD {
        Tier::Large
    } else {
        Tier::Small
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct RadiusRange {
    pub min: f32,
    pub max: f32,
}

impl RadiusRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn lerp(self, t: f32) -> f32 {
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        low + (high - low) * t.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusScale {
    /// Normalize against fixed per-tier ceilings.
    #[default]
    TierCeiling,
    /// Normalize against the largest magnitude present in the current set.
    ObservedMax,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusProfile {
    pub small: RadiusRange,
    pub large: RadiusRange,
    pub whale: RadiusRange,
    pub scale: RadiusScale,
}

impl RadiusProfile {
    pub const ZONE: Self = Self {
        small: RadiusRange::new(16.0, 30.0),
        large: RadiusRange::new(30.0, 55.0),
        whale: RadiusRange::new(55.0, 90.0),
        scale: RadiusScale::TierCeiling,
    };

    /// Four quadrants share the container in the live view, so its circles
    /// run smaller.
    pub const LIVE: Self = Self {
        small: RadiusRange::new(10.0, 22.0),
        large: RadiusRange::new(22.0, 38.0),
        whale: RadiusRange::new(38.0, 64.0),
        scale: RadiusScale::ObservedMax,
    };

    pub fn range(&self, tier: Tier) -> RadiusRange {
        match tier {
            Tier::Small => self.small,
            Tier::Large => self.large,
            Tier::Whale => self.whale,
        }
    }
}

/// A `[*.radius]` table as written in the config file. Fields left out keep
/// the value of the profile the table overrides.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
struct RadiusOverrides {
    small: Option<RadiusRange>,
    large: Option<RadiusRange>,
    whale: Option<RadiusRange>,
    scale: Option<RadiusScale>,
}

impl RadiusOverrides {
    fn apply(self, base: RadiusProfile) -> RadiusProfile {
        RadiusProfile {
            small: self.small.unwrap_or(base.small),
            large: self.large.unwrap_or(base.large),
            whale: self.whale.unwrap_or(base.whale),
            scale: self.scale.unwrap_or(base.scale),
        }
    }
}

pub(crate) fn deserialize_zone_radius<'de, D>(deserializer: D) -> Result<RadiusProfile, D::Error>
where
    D: Deserializer<'de>,
{
    RadiusOverrides::deserialize(deserializer).map(|overrides| overrides.apply(RadiusProfile::ZONE))
}

pub(crate) fn deserialize_live_radius<'de, D>(deserializer: D) -> Result<RadiusProfile, D::Error>
where
    D: Deserializer<'de>,
{
    RadiusOverrides::deserialize(deserializer).map(|overrides| overrides.apply(RadiusProfile::LIVE))
}

/// Position of `magnitude` inside its tier's span, in `0..=1`.
pub fn normalized_in_tier(magnitude: f64, tier: Tier, max_in_set: f64, scale: RadiusScale) -> f32 {
    let magnitude = sanitize_magnitude(magnitude);
    let floor = tier.floor();
    let ceiling = match scale {
        RadiusScale::TierCeiling => tier.ceiling(),
        RadiusScale::ObservedMax => {
            let observed = sanitize_magnitude(max_in_set).max(magnitude);
            match tier {
                Tier::Whale => observed,
                Tier::Small | Tier::Large => observed.min(tier.ceiling()),
            }
        }
    };

    let span = ceiling - floor;
    if span <= f64::EPSILON {
        return if magnitude >= floor { 1.0 } else { 0.0 };
    }

    ((magnitude - floor) / span).clamp(0.0, 1.0) as f32
}

/// Radius for a circle of `magnitude` inside `tier`.
///
/// Interpolates by the square root of the normalized magnitude so area, not
/// diameter, tracks stake. The result always lies inside the tier's range and
/// never decreases as magnitude grows within a tier.
pub fn radius_for(magnitude: f64, tier: Tier, max_in_set: f64, profile: &RadiusProfile) -> f32 {
    let t = normalized_in_tier(magnitude, tier, max_in_set, profile.scale);
    profile.range(tier).lerp(t.sqrt())
}
