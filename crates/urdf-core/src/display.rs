//! Display configuration pushed from host settings to the view

use std::fmt;
use std::str::FromStr;

use crate::protocol::ColorsPayload;
use crate::settings::{SettingsStore, keys};

/// Errors decoding a display configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum DisplayError {
    #[error("Invalid color '{0}' (expected #RRGGBB or #RRGGBBAA)")]
    Color(String),

    #[error("Invalid number for {field}: '{value}'")]
    Number { field: &'static str, value: String },

    #[error("Invalid boolean for {field}: '{value}'")]
    Bool { field: &'static str, value: String },
}

/// 8-bit RGBA color written as `#RRGGBB` or `#RRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Linear RGBA components in `0.0..=1.0`
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn to_rgb_f32(self) -> [f32; 3] {
        let [r, g, b, _] = self.to_rgba_f32();
        [r, g, b]
    }
}

impl FromStr for HexColor {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DisplayError::Color(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// Snapshot of the view's display settings
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    /// Orbit distance of the camera from the robot
    pub camera_radius: f32,
    pub background_color: HexColor,
    pub grid_minor_color: HexColor,
    pub grid_main_color: HexColor,
    pub grid_minor_opacity: f32,
    /// Minor lines per major line
    pub grid_frequency: f32,
    /// Spacing between minor lines
    pub grid_ratio: f32,
    pub debug_ui: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            camera_radius: 1.0,
            background_color: HexColor::BLACK,
            grid_minor_color: HexColor::rgb(0x00, 0xFF, 0x00),
            grid_main_color: HexColor::rgb(0x00, 0x11, 0x00),
            grid_minor_opacity: 0.4,
            grid_frequency: 5.0,
            grid_ratio: 0.1,
            debug_ui: false,
        }
    }
}

impl DisplayConfig {
    /// Read every display key from the host settings, falling back to the
    /// default for missing or unparsable values
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        let number = |key: &'static str, default: f32| read(store, key, default, parse_number);
        let color = |key: &'static str, default: HexColor| read(store, key, default, parse_color);
        Self {
            camera_radius: number(keys::CAMERA_DISTANCE, defaults.camera_radius),
            background_color: color(keys::BACKGROUND_COLOR, defaults.background_color),
            grid_minor_color: color(keys::GRID_MINOR_COLOR, defaults.grid_minor_color),
            grid_main_color: color(keys::GRID_MAIN_COLOR, defaults.grid_main_color),
            grid_minor_opacity: number(keys::GRID_MINOR_OPACITY, defaults.grid_minor_opacity),
            grid_frequency: number(keys::GRID_FREQUENCY, defaults.grid_frequency),
            grid_ratio: number(keys::GRID_RATIO, defaults.grid_ratio),
            debug_ui: read(store, keys::DEBUG_UI, defaults.debug_ui, parse_bool),
        }
    }

    /// String-encode for the `colors` message
    pub fn to_payload(&self) -> ColorsPayload {
        ColorsPayload {
            camera_radius: self.camera_radius.to_string(),
            background_color: self.background_color.to_string(),
            grid_line_color: self.grid_minor_color.to_string(),
            grid_main_color: self.grid_main_color.to_string(),
            grid_minor_opacity: self.grid_minor_opacity.to_string(),
            major_unit_frequency: self.grid_frequency.to_string(),
            grid_ratio: self.grid_ratio.to_string(),
            debug_ui: self.debug_ui.to_string(),
        }
    }

    /// Decode a `colors` message
    pub fn from_payload(payload: &ColorsPayload) -> Result<Self, DisplayError> {
        Ok(Self {
            camera_radius: parse_number(keys::CAMERA_DISTANCE, &payload.camera_radius)?,
            background_color: parse_color(keys::BACKGROUND_COLOR, &payload.background_color)?,
            grid_minor_color: parse_color(keys::GRID_MINOR_COLOR, &payload.grid_line_color)?,
            grid_main_color: parse_color(keys::GRID_MAIN_COLOR, &payload.grid_main_color)?,
            grid_minor_opacity: parse_number(
                keys::GRID_MINOR_OPACITY,
                &payload.grid_minor_opacity,
            )?,
            grid_frequency: parse_number(keys::GRID_FREQUENCY, &payload.major_unit_frequency)?,
            grid_ratio: parse_number(keys::GRID_RATIO, &payload.grid_ratio)?,
            debug_ui: parse_bool(keys::DEBUG_UI, &payload.debug_ui)?,
        })
    }
}

impl ColorsPayload {
    /// Decode on the view side
    pub fn parse(&self) -> Result<DisplayConfig, DisplayError> {
        DisplayConfig::from_payload(self)
    }
}

fn read<T>(
    store: &dyn SettingsStore,
    key: &'static str,
    default: T,
    parse: fn(&'static str, &str) -> Result<T, DisplayError>,
) -> T {
    match store.get(key) {
        Some(value) => parse(key, &value).unwrap_or_else(|e| {
            tracing::warn!("Ignoring setting {}: {}", key, e);
            default
        }),
        None => default,
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<f32, DisplayError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DisplayError::Number {
            field,
            value: value.to_string(),
        })
}

fn parse_color(_field: &'static str, value: &str) -> Result<HexColor, DisplayError> {
    value.parse()
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, DisplayError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        _ => Err(DisplayError::Bool {
            field,
            value: value.to_string(),
        }),
    }
}
