use serde::{Deserialize, Serialize};

/// Panel sizing rules (`storefront.config.json` → `panels`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub min_width: f64,
    pub max_width: f64,
    pub default_width: f64,

    /// Widths a resize snaps to when released close enough
    pub preset_widths: Vec<f64>,

    /// Maximum distance in px for snapping
    pub snap_threshold: f64,

    /// Viewports narrower than this auto-collapse an expanded panel
    pub auto_collapse_breakpoint: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            min_width: 240.0,
            max_width: 560.0,
            default_width: 320.0,
            preset_widths: vec![280.0, 320.0, 400.0, 480.0],
            snap_threshold: 16.0,
            auto_collapse_breakpoint: 1024.0,
        }
    }
}

impl PanelConfig {
    /// Usable `(min, max)` width range. Non-finite bounds fall back to the
    /// defaults and an inverted range is swapped.
    pub fn width_bounds(&self) -> (f64, f64) {
        let defaults = PanelConfig::default();
        let min = if self.min_width.is_finite() {
            self.min_width
        } else {
            defaults.min_width
        };
        let max = if self.max_width.is_finite() {
            self.max_width
        } else {
            defaults.max_width
        };
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }

    pub fn clamp_width(&self, width: f64) -> f64 {
        let (min, max) = self.width_bounds();
        width.clamp(min, max)
    }

    /// Nearest preset within the snap threshold, if any
    pub fn snap_width(&self, width: f64) -> Option<f64> {
        self.preset_widths
            .iter()
            .copied()
            .filter(|preset| (preset - width).abs() <= self.snap_threshold)
            .min_by(|a, b| (a - width).abs().total_cmp(&(b - width).abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PanelConfig = serde_json::from_str(r#"{ "minWidth": 200 }"#).unwrap();
        assert_eq!(config.min_width, 200.0);
        assert_eq!(config.max_width, 560.0);
        assert_eq!(config.preset_widths.len(), 4);
    }

    #[test]
    fn test_snap_width() {
        let config = PanelConfig::default();
        assert_eq!(config.snap_width(390.0), Some(400.0));
        assert_eq!(config.snap_width(304.0), Some(320.0));
        assert_eq!(config.snap_width(360.0), None);

        // Equidistant picks the first preset
        let wide = PanelConfig {
            snap_threshold: 20.0,
            ..Default::default()
        };
        assert_eq!(wide.snap_width(300.0), Some(280.0));
    }

    #[test]
    fn test_clamp_width() {
        let config = PanelConfig::default();
        assert_eq!(config.clamp_width(100.0), 240.0);
        assert_eq!(config.clamp_width(900.0), 560.0);
        assert_eq!(config.clamp_width(333.0), 333.0);
    }

    #[test]
    fn test_inverted_or_broken_bounds_do_not_panic() {
        let config: PanelConfig =
            serde_json::from_str(r#"{ "minWidth": 600, "maxWidth": 300 }"#).unwrap();
        assert_eq!(config.width_bounds(), (300.0, 600.0));
        assert_eq!(config.clamp_width(100.0), 300.0);
        assert_eq!(config.clamp_width(700.0), 600.0);

        let broken = PanelConfig {
            min_width: f64::NAN,
            max_width: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(broken.width_bounds(), (240.0, 560.0));
        assert_eq!(broken.clamp_width(1000.0), 560.0);
    }
}
