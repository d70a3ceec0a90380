use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result};

/// Strategy parameters (TOML). Every field has a default, so an empty file
/// or a missing file yields the stock strategy.
///
/// Example `config/strategy.toml`:
/// ```toml
/// ema_period = 100
/// adx_period = 14
/// volume_window = 20
/// adx_threshold = 23.0
/// trail_fraction = 0.015
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    /// EMA period of the trend filter.
    pub ema_period: usize,
    /// Smoothing period of ATR, +DI/-DI and ADX.
    pub adx_period: usize,
    /// Window of the volume moving average.
    pub volume_window: usize,
    /// ADX must be strictly above this to count as a trend.
    pub adx_threshold: f64,
    /// Trailing stop distance below the best close, e.g. 0.015 = 1.5%.
    pub trail_fraction: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ema_period: 100,
            adx_period: 14,
            volume_window: 20,
            adx_threshold: 23.0,
            trail_fraction: 0.015,
        }
    }
}

impl StrategyParams {
    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist. Panics on unreadable or invalid content.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            info!(path, "Strategy config not found, using defaults");
            return Self::default();
        }
        let content = std::fs::read_to_string(path).unwrap_or_else(|e| {
            panic!("Failed to read strategy config at '{path}': {e}")
        });
        let params = Self::from_toml(&content).unwrap_or_else(|e| {
            panic!("Invalid strategy config at '{path}': {e}")
        });
        info!(path, ?params, "Strategy config loaded");
        params
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        let params: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ema_period == 0 || self.adx_period == 0 || self.volume_window == 0 {
            return Err(Error::Config("indicator periods must be >= 1".into()));
        }
        if !(self.trail_fraction > 0.0 && self.trail_fraction < 1.0) {
            return Err(Error::Config(format!(
                "trail_fraction must be in (0, 1), got {}",
                self.trail_fraction
            )));
        }
        if !self.adx_threshold.is_finite() {
            return Err(Error::Config("adx_threshold must be finite".into()));
        }
        Ok(())
    }
}
