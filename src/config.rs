use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::bubbles::live::LiveConfig;
use crate::bubbles::zone::ZoneConfig;

/// Default config file path, read when present and `--config` is not given.
pub const CONFIG_PATH: &str = "bubbles.toml";

const MIN_REFRESH_SECS: u64 = 2;

/// Layout tunables deserialized from TOML. Every section and field is
/// optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub zone: ZoneConfig,
    pub live: LiveConfig,
    pub refresh: RefreshConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Snapshot lifetime before the file is read again.
    pub refresh_secs: u64,
    /// Aggregated stakes below this are hidden.
    pub min_stake: f64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 30,
            min_stake: 0.0,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

impl LayoutConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config.validated())
    }

    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let config = Self::load(path)?;
            info!(path = %path.display(), "loaded layout config");
            return Ok(config);
        }

        let default_path = Path::new(CONFIG_PATH);
        if default_path.exists() {
            let config = Self::load(default_path)?;
            info!(path = CONFIG_PATH, "loaded layout config");
            return Ok(config);
        }
        Ok(Self::default())
    }

    /// Replaces values the engine cannot use with their defaults.
    pub fn validated(mut self) -> Self {
        let zone_defaults = ZoneConfig::default();
        let live_defaults = LiveConfig::default();

        if self.zone.candidate_attempts == 0 {
            warn!("zone.candidate_attempts must be at least 1, using default");
            self.zone.candidate_attempts = zone_defaults.candidate_attempts;
        }
        if !(0.0..0.5).contains(&self.zone.center_inset) {
            warn!(
                value = self.zone.center_inset,
                "zone.center_inset must be in [0, 0.5), using default"
            );
            self.zone.center_inset = zone_defaults.center_inset;
        }
        if !self.zone.spacing.is_finite() || self.zone.spacing < 0.0 {
            warn!(value = self.zone.spacing, "zone.spacing must be non-negative, using default");
            self.zone.spacing = zone_defaults.spacing;
        }

        if !(0.0..=1.0).contains(&self.live.damping) {
            warn!(value = self.live.damping, "live.damping must be in [0, 1], using default");
            self.live.damping = live_defaults.damping;
        }
        if !(0.0..=1.0).contains(&self.live.restitution) {
            warn!(
                value = self.live.restitution,
                "live.restitution must be in [0, 1], using default"
            );
            self.live.restitution = live_defaults.restitution;
        }
        if !self.live.max_delta_secs.is_finite() || self.live.max_delta_secs <= 0.0 {
            warn!(
                value = self.live.max_delta_secs,
                "live.max_delta_secs must be positive, using default"
            );
            self.live.max_delta_secs = live_defaults.max_delta_secs;
        }

        if self.refresh.refresh_secs < MIN_REFRESH_SECS {
            warn!(
                value = self.refresh.refresh_secs,
                min = MIN_REFRESH_SECS,
                "refresh.refresh_secs too small, clamping"
            );
            self.refresh.refresh_secs = MIN_REFRESH_SECS;
        }
        if !self.refresh.min_stake.is_finite() || self.refresh.min_stake < 0.0 {
            warn!(value = self.refresh.min_stake, "refresh.min_stake must be non-negative");
            self.refresh.min_stake = 0.0;
        }

        self
    }
}
