//! Configuration management (<config_dir>/config.toml)
//!
//! Handles loading, validating and providing defaults for shell settings.
//! Settings are stored in TOML format; every field has a serde default so
//! partial files are accepted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Largest accepted canvas width or height in pixels
pub const MAX_CANVAS_DIMENSION: u32 = 8192;

/// Longest accepted tick period
pub const MAX_TICK_STEP_MS: u32 = 60_000;

/// Errors produced while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShellConfig {
    /// Visible canvas settings
    #[serde(default)]
    pub canvas: CanvasConfig,
    /// Arguments forwarded to the simulation module
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Pan/zoom input settings
    #[serde(default)]
    pub camera: CameraConfig,
    /// Server connection settings
    #[serde(default)]
    pub network: NetworkConfig,
    /// Window and refresh settings
    #[serde(default)]
    pub video: VideoConfig,
}

/// Visible canvas configuration.
///
/// Width and height must match what the simulation module expects for its
/// map buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas identifier passed to the module (default: "game")
    #[serde(default = "default_canvas_id")]
    pub id: String,
    /// Width in pixels (default: 512)
    #[serde(default = "default_canvas_size")]
    pub width: u32,
    /// Height in pixels (default: 512)
    #[serde(default = "default_canvas_size")]
    pub height: u32,
}

/// Simulation module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Opaque palette/mode argument (default: 0)
    #[serde(default)]
    pub palette: i32,
    /// Fixed tick period in milliseconds (default: 100)
    #[serde(default = "default_tick_step_ms")]
    pub tick_step_ms: u32,
    /// Opaque trailing argument (default: 0)
    #[serde(default)]
    pub extra: i32,
    /// Linear memory ceiling for the module in MiB (default: 64)
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,
}

/// Camera input configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Scale change per wheel pixel (default: 0.001)
    #[serde(default = "default_zoom_sensitivity")]
    pub zoom_sensitivity: f32,
    /// Offset change per arrow key press in device pixels (default: 15)
    #[serde(default = "default_pan_step")]
    pub pan_step: u32,
    /// Smallest allowed scale (default: 0.1)
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    /// Largest allowed scale (default: 10.0)
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Server `host[:port]`. No connection is made when unset.
    #[serde(default)]
    pub host: Option<String>,
    /// Connection path (default: "/con")
    #[serde(default = "default_network_path")]
    pub path: String,
    /// Liveness probe sent once the connection opens (default: "PING")
    #[serde(default = "default_probe")]
    pub probe: String,
}

/// Video configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Integer window scale over the canvas size (default: 1)
    #[serde(default = "default_window_scale")]
    pub window_scale: u32,
    /// Whether to present with vsync (default: true)
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Refresh rate of the headless driver in Hz (default: 60)
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

fn default_canvas_id() -> String {
    "game".to_string()
}
fn default_canvas_size() -> u32 {
    512
}
fn default_tick_step_ms() -> u32 {
    100
}
fn default_memory_limit_mb() -> u32 {
    64
}
fn default_zoom_sensitivity() -> f32 {
    0.001
}
fn default_pan_step() -> u32 {
    15
}
fn default_min_scale() -> f32 {
    0.1
}
fn default_max_scale() -> f32 {
    10.0
}
fn default_network_path() -> String {
    "/con".to_string()
}
fn default_probe() -> String {
    "PING".to_string()
}
fn default_window_scale() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_refresh_hz() -> u32 {
    60
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            id: default_canvas_id(),
            width: default_canvas_size(),
            height: default_canvas_size(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            palette: 0,
            tick_step_ms: default_tick_step_ms(),
            extra: 0,
            memory_limit_mb: default_memory_limit_mb(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom_sensitivity: default_zoom_sensitivity(),
            pan_step: default_pan_step(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: None,
            path: default_network_path(),
            probe: default_probe(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            window_scale: default_window_scale(),
            vsync: default_true(),
            refresh_hz: default_refresh_hz(),
        }
    }
}

impl SimulationConfig {
    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb as usize * 1024 * 1024
    }
}

impl ShellConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and validate a config file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value the loops and the module depend on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.canvas.id.is_empty() {
            return invalid("canvas.id must not be empty".into());
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return invalid(format!(
                "canvas size must be positive, got {}x{}",
                self.canvas.width, self.canvas.height
            ));
        }
        if self.canvas.width > MAX_CANVAS_DIMENSION || self.canvas.height > MAX_CANVAS_DIMENSION {
            return invalid(format!(
                "canvas size must be at most {}x{}, got {}x{}",
                MAX_CANVAS_DIMENSION, MAX_CANVAS_DIMENSION, self.canvas.width, self.canvas.height
            ));
        }
        if self.simulation.tick_step_ms == 0 {
            return invalid("simulation.tick_step_ms must be positive".into());
        }
        if self.simulation.tick_step_ms > MAX_TICK_STEP_MS {
            return invalid(format!(
                "simulation.tick_step_ms must be at most {}, got {}",
                MAX_TICK_STEP_MS, self.simulation.tick_step_ms
            ));
        }
        if self.simulation.memory_limit_mb == 0 {
            return invalid("simulation.memory_limit_mb must be positive".into());
        }
        let camera = &self.camera;
        if !camera.zoom_sensitivity.is_finite() || camera.zoom_sensitivity <= 0.0 {
            return invalid(format!(
                "camera.zoom_sensitivity must be a positive number, got {}",
                camera.zoom_sensitivity
            ));
        }
        if !(camera.min_scale.is_finite() && camera.max_scale.is_finite())
            || camera.min_scale <= 0.0
            || camera.min_scale > 1.0
            || camera.max_scale < 1.0
        {
            return invalid(format!(
                "camera scale bounds must satisfy 0 < min_scale <= 1 <= max_scale, got [{}, {}]",
                camera.min_scale, camera.max_scale
            ));
        }
        if self.video.window_scale == 0 {
            return invalid("video.window_scale must be positive".into());
        }
        if self.video.refresh_hz == 0 {
            return invalid("video.refresh_hz must be positive".into());
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Paintwar\config`
/// On macOS: `~/Library/Application Support/io.paintwar.Paintwar`
/// On Linux: `~/.config/Paintwar`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.paintwar", "", "Paintwar")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns defaults if the file doesn't exist. A file that exists but cannot
/// be parsed or validated is reported and replaced by defaults.
pub fn load() -> ShellConfig {
    let Some(path) = config_dir().map(|dir| dir.join("config.toml")) else {
        return ShellConfig::default();
    };
    if !path.exists() {
        return ShellConfig::default();
    }
    match ShellConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{}; using defaults", e);
            ShellConfig::default()
        }
    }
}

/// Saves the configuration to the platform config directory.
pub fn save(config: &ShellConfig) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(&dir)?;
        let content = toml::to_string_pretty(config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(dir.join("config.toml"), content)?;
    }
    Ok(())
}
