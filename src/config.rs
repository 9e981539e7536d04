// Game configuration: RON file with serde defaults, plus command-line overrides

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::engine::camera::PhaseCamera;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub audio: AudioConfig,
    pub debug: DebugConfig,
    /// Fixed seed for the decorative randomness. Random per run when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Valentine Oyster".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    /// Share of the remaining distance the camera covers per 60 Hz frame.
    pub follow_rate: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub wheel_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            follow_rate: 0.04,
            zoom_min: 0.5,
            zoom_max: 2.0,
            wheel_step: 0.08,
        }
    }
}

impl CameraConfig {
    pub fn apply(&self, camera: &mut PhaseCamera) {
        camera.fov = self.fov_degrees.to_radians();
        camera.follow_rate = self.follow_rate;
        camera.zoom_min = self.zoom_min;
        camera.zoom_max = self.zoom_max;
        camera.wheel_step = self.wheel_step;
        // Re-clamp the current zoom into the new bounds
        camera.set_zoom(camera.zoom());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Master volume in [0, 1].
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Show the stats panel at startup (F3 toggles it).
    pub show_stats: bool,
    /// Used when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_stats: false,
            log_level: "info".to_string(),
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = ron::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_ron_str(&contents)
    }

    /// A missing file is not an error: it just means defaults.
    pub fn is_missing_file(err: &ConfigError) -> bool {
        matches!(err, ConfigError::Read(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be positive",
                self.window.width, self.window.height
            )));
        }
        let cam = &self.camera;
        if !(cam.zoom_min > 0.0 && cam.zoom_min <= cam.zoom_max) {
            return Err(ConfigError::Invalid(format!(
                "zoom bounds [{}, {}] are inverted or non-positive",
                cam.zoom_min, cam.zoom_max
            )));
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!("fov {} out of range", cam.fov_degrees)));
        }
        if !(cam.follow_rate > 0.0 && cam.follow_rate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "follow rate {} out of (0, 1]",
                cam.follow_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} out of [0, 1]",
                self.audio.volume
            )));
        }
        Ok(())
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.stats {
            self.debug.show_stats = true;
        }
        if args.mute {
            self.audio.enabled = false;
        }
        if let Some(seed) = args.seed {
            self.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

/// Command-line arguments. Values here win over the config file.
#[derive(Parser, Debug)]
#[command(
    name = "valentine_oyster",
    about = "Unscrew, shuck and feed an oyster to a very good dog"
)]
pub struct CliArgs {
    /// Path to the RON config file.
    #[arg(long, default_value = "oyster.ron")]
    pub config: PathBuf,

    /// Show the debug stats panel.
    #[arg(long)]
    pub stats: bool,

    /// Start with sound off.
    #[arg(long)]
    pub mute: bool,

    /// Seed for the decorative randomness.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = GameConfig::from_ron_str("()").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.camera.zoom_max, 2.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config =
            GameConfig::from_ron_str("(camera: (zoom_max: 3.0), seed: Some(9))").unwrap();
        assert_eq!(config.camera.zoom_max, 3.0);
        assert_eq!(config.camera.zoom_min, 0.5);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn inverted_zoom_is_rejected() {
        let err = GameConfig::from_ron_str("(camera: (zoom_min: 2.0, zoom_max: 1.0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn loud_volume_is_rejected() {
        let err = GameConfig::from_ron_str("(audio: (volume: 1.5))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let quiet = GameConfig::from_ron_str("(audio: (volume: 0.2))").unwrap();
        assert!(quiet.audio.enabled);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = GameConfig::from_ron_str("(window: (width: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = GameConfig::from_ron_str("(window: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_recognised() {
        let err = GameConfig::load(Path::new("definitely/not/here.ron")).unwrap_err();
        assert!(GameConfig::is_missing_file(&err));
        let err = GameConfig::from_ron_str("(window: [").unwrap_err();
        assert!(!GameConfig::is_missing_file(&err));
    }

    #[test]
    fn cli_overrides_win() {
        let args = CliArgs::parse_from([
            "valentine_oyster",
            "--stats",
            "--mute",
            "--seed",
            "7",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.config, PathBuf::from("oyster.ron"));
        let mut config = GameConfig::default();
        config.apply_cli_overrides(&args);
        assert!(config.debug.show_stats);
        assert!(!config.audio.enabled);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.debug.log_level, "debug");
    }

    #[test]
    fn camera_settings_apply() {
        let mut camera = PhaseCamera::new();
        let settings = CameraConfig { zoom_min: 1.2, ..CameraConfig::default() };
        settings.apply(&mut camera);
        assert_eq!(camera.zoom(), 1.2);
        assert!((camera.fov - 50.0_f32.to_radians()).abs() < 1e-6);
    }
}
