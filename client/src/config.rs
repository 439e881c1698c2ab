use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::gesture::{GestureConfig, DOUBLE_TAP_WINDOW_MS};
use crate::palette::DEFAULT_PALETTE;
use crate::persistence::SAVE_QUIET_PERIOD;
use crate::viewport::{ZoomLimits, MAX_ZOOM, MIN_ZOOM};

const APP_DIR: &str = "planmark";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Viewer settings from `config.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub api_url: String,
    pub save_quiet_period_ms: u64,
    pub double_tap_ms: u64,
    pub tap_slop: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub palette: Vec<String>,
    pub request_timeout_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            save_quiet_period_ms: SAVE_QUIET_PERIOD.as_millis() as u64,
            double_tap_ms: DOUBLE_TAP_WINDOW_MS,
            tap_slop: 0.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            palette: DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ViewerConfig {
    /// Falls back to the default range when the configured one is unusable.
    pub fn zoom_limits(&self) -> ZoomLimits {
        let usable = self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && self.min_zoom > 0.0
            && self.min_zoom <= self.max_zoom;
        if !usable {
            tracing::warn!(
                min = self.min_zoom,
                max = self.max_zoom,
                "invalid zoom range in config; using defaults"
            );
            return ZoomLimits::default();
        }
        ZoomLimits {
            min: self.min_zoom,
            max: self.max_zoom,
        }
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            double_tap_window_ms: self.double_tap_ms,
            tap_slop: if self.tap_slop.is_finite() {
                self.tap_slop.max(0.0)
            } else {
                0.0
            },
            zoom_limits: self.zoom_limits(),
        }
    }

    pub fn save_quiet_period(&self) -> Duration {
        Duration::from_millis(self.save_quiet_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn load_viewer_config() -> ViewerConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_viewer_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_viewer_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> ViewerConfig {
    let Some(path) = viewer_config_path(xdg_config_home, home) else {
        return ViewerConfig::default();
    };
    if !path.exists() {
        return ViewerConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            ViewerConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            ViewerConfig::default()
        }
    }
}

fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

/// `$XDG_CONFIG_HOME/planmark/config.json`, else `~/.config/planmark/config.json`.
pub fn viewer_config_path(xdg_config_home: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let root = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home?.join(".config"),
    };
    Some(root.join(APP_DIR).join(APP_CONFIG_FILE))
}
