use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};

/// Explicit configuration handed to the bridge and controller at construction.
///
/// Every field has a default, so a partial JSON object is a valid config.
///
/// # Example
/// ```
/// use annotation::AnnotatorConfig;
///
/// let config = AnnotatorConfig::from_json_str(r#"{ "playback": { "zoom_step": 20 } }"#)
///     .expect("valid config");
/// assert_eq!(config.playback.zoom_step, 20.0);
/// assert_eq!(config.playback.zoom_max, 700.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub palette: Palette,
    pub waveform: WaveformStyle,
    pub ruler: RulerStyle,
    pub playback: PlaybackConfig,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            waveform: WaveformStyle::default(),
            ruler: RulerStyle::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl AnnotatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| AnnotationError::ConfigParse { path: None, source })
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AnnotationError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AnnotationError::ConfigParse {
            path: Some(path.to_path_buf()),
            source,
        })
    }
}

/// Region colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub region_color: String,
    pub selected_region_color: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            region_color: "rgba(151, 160, 175, 0.3)".to_owned(),
            selected_region_color: "rgba(82, 196, 26, 0.4)".to_owned(),
        }
    }
}

/// Waveform appearance forwarded to the rendering surface on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformStyle {
    pub wave_color: String,
    pub progress_color: String,
    pub height: u32,
    pub split_channels: bool,
    /// Pointer travel in pixels before a drag becomes a region selection.
    pub drag_slop_px: u32,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            wave_color: "#97A0AF".to_owned(),
            progress_color: "#52c41a".to_owned(),
            height: 128,
            split_channels: true,
            drag_slop_px: 5,
        }
    }
}

/// Timeline ruler colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerStyle {
    pub primary_color: String,
    pub secondary_color: String,
    pub primary_font_color: String,
    pub secondary_font_color: String,
}

impl Default for RulerStyle {
    fn default() -> Self {
        Self {
            primary_color: "blue".to_owned(),
            secondary_color: "blue".to_owned(),
            primary_font_color: "#000".to_owned(),
            secondary_font_color: "#000".to_owned(),
        }
    }
}

/// Bounds and defaults for the transport controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
    pub default_zoom: f64,
    pub default_speed: f64,
    pub default_volume: f64,
    /// Speed menu entries, selected by 1-based key.
    pub speed_menu: Vec<f64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            zoom_min: 200.0,
            zoom_max: 700.0,
            zoom_step: 10.0,
            default_zoom: 230.0,
            default_speed: 1.0,
            default_volume: 1.0,
            speed_menu: vec![0.5, 1.0, 1.25, 1.5, 2.0],
        }
    }
}

impl PlaybackConfig {
    /// Zoom range with the ends ordered.
    pub fn zoom_range(&self) -> (f64, f64) {
        if self.zoom_min <= self.zoom_max {
            (self.zoom_min, self.zoom_max)
        } else {
            (self.zoom_max, self.zoom_min)
        }
    }
}
