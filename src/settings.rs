//! Game settings and preferences
//!
//! Persisted in LocalStorage; any field can be overridden from the page URL
//! query string (`?autopilot=1&speed=0.012&fog=0`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected setting values
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{key} must be positive, got {value}")]
    NonPositive { key: &'static str, value: f32 },
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Tower geometry ===
    /// Height of each layer
    pub box_height: f32,
    /// Width and depth of the base layers (also the mass reference)
    pub original_box_size: f32,
    /// Perpendicular distance a new layer spawns from the tower axis
    pub original_box_offset: f32,
    /// Slide speed in units per millisecond
    pub speed: f32,

    // === Autopilot ===
    pub autopilot: bool,
    /// How far past the layer below the autopilot stops
    pub autopilot_error: f32,

    // === Camera / scene ===
    pub orthographic: bool,
    pub shadows: bool,
    pub fog: bool,
    /// Fixed overhead camera for placement debugging
    pub placement_mode: bool,
    pub placement_mode_height: f32,

    // === Audio ===
    pub background_music: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            box_height: 1.0,
            original_box_size: 5.0,
            original_box_offset: -10.0,
            speed: 0.008,

            autopilot: false,
            autopilot_error: 0.0,

            orthographic: false,
            shadows: false,
            fog: true,
            placement_mode: false,
            placement_mode_height: 120.0,

            background_music: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.5,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" | "" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_f32(key: &str, value: &str) -> Result<f32, SettingsError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl Settings {
    /// Check values the simulation divides by or sizes boxes with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("box_height", self.box_height),
            ("original_box_size", self.original_box_size),
            ("speed", self.speed),
            ("placement_mode_height", self.placement_mode_height),
        ];
        for (key, value) in positive {
            if value <= 0.0 {
                return Err(SettingsError::NonPositive { key, value });
            }
        }
        Ok(())
    }

    /// Apply one `key=value` override
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            "box_height" => self.box_height = parse_f32(key, value)?,
            "box_size" | "original_box_size" => self.original_box_size = parse_f32(key, value)?,
            "box_offset" | "original_box_offset" => {
                self.original_box_offset = parse_f32(key, value)?
            }
            "speed" => self.speed = parse_f32(key, value)?,
            "autopilot" => self.autopilot = parse_bool(key, value)?,
            "autopilot_error" => self.autopilot_error = parse_f32(key, value)?,
            "orthographic" => self.orthographic = parse_bool(key, value)?,
            "shadows" => self.shadows = parse_bool(key, value)?,
            "fog" => self.fog = parse_bool(key, value)?,
            "placement_mode" => self.placement_mode = parse_bool(key, value)?,
            "placement_mode_height" => self.placement_mode_height = parse_f32(key, value)?,
            "music" | "background_music" => self.background_music = parse_bool(key, value)?,
            "master_volume" => self.master_volume = parse_f32(key, value)?.clamp(0.0, 1.0),
            "sfx_volume" => self.sfx_volume = parse_f32(key, value)?.clamp(0.0, 1.0),
            "music_volume" => self.music_volume = parse_f32(key, value)?.clamp(0.0, 1.0),
            _ => log::debug!("Ignoring unknown setting {key}"),
        }
        Ok(())
    }

    /// Apply a URL query string (leading `?` optional); nothing changes on error.
    /// Returns whether any setting changed.
    pub fn apply_query(&mut self, query: &str) -> Result<bool, SettingsError> {
        let mut updated = self.clone();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            updated.apply_override(key, value)?;
        }
        updated.validate()?;
        let changed = updated != *self;
        *self = updated;
        Ok(changed)
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "stack_tower_settings";

    /// Load settings from LocalStorage, then apply URL overrides (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let window = web_sys::window();
        let storage = window
            .as_ref()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        let mut settings = storage
            .and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten())
            .and_then(|json| serde_json::from_str::<Settings>(&json).ok())
            .filter(|s| s.validate().is_ok())
            .unwrap_or_else(|| {
                log::info!("Using default settings");
                Self::default()
            });

        if let Some(search) = window.and_then(|w| w.location().search().ok()) {
            match settings.apply_query(&search) {
                // URL overrides stick for later visits
                Ok(true) => settings.save(),
                Ok(false) => {}
                Err(e) => log::warn!("Ignoring URL settings: {e}"),
            }
        }

        settings
    }

    /// Save settings to LocalStorage
    #[cfg(target_arch = "wasm32")]
    fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_query_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_query("?autopilot=1&speed=0.012&fog=off&box_size=4&utm_source=x")
            .unwrap();
        assert!(settings.autopilot);
        assert!((settings.speed - 0.012).abs() < 1e-6);
        assert!(!settings.fog);
        assert_eq!(settings.original_box_size, 4.0);
    }

    #[test]
    fn test_bare_flag_enables() {
        let mut settings = Settings::default();
        assert!(settings.apply_query("orthographic").unwrap());
        assert!(settings.orthographic);
    }

    #[test]
    fn test_query_reports_whether_anything_changed() {
        let mut settings = Settings::default();
        assert!(!settings.apply_query("").unwrap());
        assert!(!settings.apply_query("?").unwrap());
        assert!(!settings.apply_query("?fog=1&utm_source=x").unwrap());
        assert!(settings.apply_query("?fog=0").unwrap());
        assert!(!settings.apply_query("?fog=0").unwrap());
    }

    #[test]
    fn test_bad_query_leaves_settings_untouched() {
        let mut settings = Settings::default();
        let err = settings.apply_query("autopilot=1&speed=fast").unwrap_err();
        assert_eq!(
            err,
            SettingsError::InvalidValue {
                key: "speed".into(),
                value: "fast".into()
            }
        );
        assert_eq!(settings, Settings::default());

        let err = settings.apply_query("box_height=0").unwrap_err();
        assert!(matches!(err, SettingsError::NonPositive { key: "box_height", .. }));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"autopilot": true}"#).unwrap();
        assert!(settings.autopilot);
        assert_eq!(settings.original_box_size, 5.0);
    }
}
