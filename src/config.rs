use crate::project::{DEFAULT_LEFT_OFFSET, DEFAULT_PIXELS_PER_SECOND, DEFAULT_UNDO_LIMIT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "clipdeck";
const CONFIG_FILE: &str = "config.json";

/// User settings, read from `<config dir>/clipdeck/config.json`.
///
/// Missing fields take their defaults, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Chromium-family browser used to screenshot slides.
    pub browser_path: String,
    pub workspace_dir: PathBuf,
    pub undo_limit: usize,
    pub pixels_per_second: f32,
    pub playhead_left_offset: f32,
    pub preview_max_age_hours: u64,
    pub slide_fps: u32,
    pub default_slide_seconds: f64,
    pub max_slides: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            browser_path: default_browser().to_string(),
            workspace_dir: default_workspace(),
            undo_limit: DEFAULT_UNDO_LIMIT,
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            playhead_left_offset: DEFAULT_LEFT_OFFSET,
            preview_max_age_hours: 1,
            slide_fps: 2,
            default_slide_seconds: 5.0,
            max_slides: 50,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults on any problem.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("no config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.undo_limit = self.undo_limit.max(1);
        self.slide_fps = self.slide_fps.max(1);
        self.max_slides = self.max_slides.max(1);
        if !self.default_slide_seconds.is_finite() || self.default_slide_seconds <= 0.0 {
            self.default_slide_seconds = 5.0;
        }
        self
    }
}

fn default_workspace() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_browser() -> &'static str {
    if cfg!(target_os = "windows") {
        r"C:\Program Files\Google\Chrome\Application\chrome.exe"
    } else if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else {
        "chromium"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "undo_limit": 50, "ffmpeg_path": "/opt/ffmpeg" }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.undo_limit, 50);
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(config.pixels_per_second, 20.0);
        assert_eq!(config.slide_fps, 2);
    }

    #[test]
    fn test_invalid_values_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "undo_limit": 0, "default_slide_seconds": -1 }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.undo_limit, 1);
        assert_eq!(config.default_slide_seconds, 5.0);
    }

    #[test]
    fn test_round_trip_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            max_slides: 12,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }
}
