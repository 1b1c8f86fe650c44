//! Editor settings bundle.
//!
//! # Responsibility
//! - Enumerate every recognized option with its default value.
//! - Backfill missing or unreadable values from defaults on deserialization.
//!
//! # Invariants
//! - A deserialized `Settings` never has an absent option.
//! - Deserializing settings never fails: a null, unknown or mistyped value
//!   falls back to that option's default without touching the others.
//! - Numeric options written as strings by older shells are accepted.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

pub const DEFAULT_FONT: &str = "'Unbounded', sans-serif";
pub const DEFAULT_FONT_SIZE: u32 = 16;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.6;
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Initial size applied to newly inserted images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Flat mapping of recognized options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    /// CSS font-family string.
    pub font: String,
    /// Pixels.
    pub font_size: u32,
    /// Unitless multiplier.
    pub line_height: f64,
    /// Empty string means no background image.
    pub background_url: String,
    /// Advisory: every mutation is persisted regardless.
    pub auto_save: bool,
    pub spell_check: bool,
    pub word_wrap: bool,
    pub auto_resize_images: bool,
    pub show_image_controls: bool,
    pub search_case_sensitive: bool,
    /// Restricts matches to whole words.
    pub search_whole_words: bool,
    pub default_image_size: ImageSize,
    /// Upper bound on the number of pages `create_page` will allow.
    pub max_pages: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            font: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            background_url: String::new(),
            auto_save: true,
            spell_check: true,
            word_wrap: true,
            auto_resize_images: true,
            show_image_controls: true,
            search_case_sensitive: false,
            search_whole_words: false,
            default_image_size: ImageSize::Medium,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Settings {
    /// Returns the background URL, or `None` when unset.
    pub fn background(&self) -> Option<&str> {
        let trimmed = self.background_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let mut settings = Self::default();
        let Some(fields) = raw.as_object() else {
            return Ok(settings);
        };

        read_value(fields, "theme", &mut settings.theme);
        read_value(fields, "font", &mut settings.font);
        read_number(fields, "fontSize", &mut settings.font_size);
        read_number(fields, "lineHeight", &mut settings.line_height);
        read_value(fields, "backgroundUrl", &mut settings.background_url);
        read_value(fields, "autoSave", &mut settings.auto_save);
        read_value(fields, "spellCheck", &mut settings.spell_check);
        read_value(fields, "wordWrap", &mut settings.word_wrap);
        read_value(fields, "autoResizeImages", &mut settings.auto_resize_images);
        read_value(fields, "showImageControls", &mut settings.show_image_controls);
        read_value(fields, "searchCaseSensitive", &mut settings.search_case_sensitive);
        read_value(fields, "searchWholeWords", &mut settings.search_whole_words);
        read_value(fields, "defaultImageSize", &mut settings.default_image_size);
        read_number(fields, "maxPages", &mut settings.max_pages);
        Ok(settings)
    }
}

/// Overwrites `slot` when `key` holds a readable value.
fn read_value<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str, slot: &mut T) {
    if let Some(value) = fields.get(key).and_then(|raw| T::deserialize(raw).ok()) {
        *slot = value;
    }
}

/// Like [`read_value`], but also accepts numbers written as text.
fn read_number<T: DeserializeOwned + FromStr>(fields: &Map<String, Value>, key: &str, slot: &mut T) {
    let parsed = match fields.get(key) {
        Some(Value::String(text)) => text.trim().parse::<T>().ok(),
        Some(raw) => T::deserialize(raw).ok(),
        None => None,
    };
    if let Some(value) = parsed {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageSize, Settings, Theme};

    #[test]
    fn missing_keys_are_backfilled() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.font_size, 16);
        assert_eq!(settings.max_pages, 50);
        assert_eq!(settings.default_image_size, ImageSize::Medium);
        assert!(settings.spell_check);
    }

    #[test]
    fn numeric_options_accept_text_values() {
        let settings: Settings =
            serde_json::from_str(r#"{"fontSize":"18","lineHeight":"1.8","maxPages":20}"#).unwrap();
        assert_eq!(settings.font_size, 18);
        assert!((settings.line_height - 1.8).abs() < f64::EPSILON);
        assert_eq!(settings.max_pages, 20);
    }

    #[test]
    fn unreadable_values_fall_back_per_option() {
        let settings: Settings = serde_json::from_str(
            r#"{"theme":"system","lineHeight":null,"fontSize":-3,"spellCheck":"yes","maxPages":"abc","wordWrap":false,"defaultImageSize":"large"}"#,
        )
        .unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!((settings.line_height - 1.6).abs() < f64::EPSILON);
        assert_eq!(settings.font_size, 16);
        assert!(settings.spell_check);
        assert_eq!(settings.max_pages, 50);
        assert!(!settings.word_wrap);
        assert_eq!(settings.default_image_size, ImageSize::Large);
    }

    #[test]
    fn non_object_settings_become_defaults() {
        let settings: Settings = serde_json::from_str("null").unwrap();
        assert_eq!(settings, Settings::default());
        let settings: Settings = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["searchWholeWords"], false);
        assert_eq!(value["defaultImageSize"], "medium");
        assert_eq!(value["theme"], "dark");
    }

    #[test]
    fn blank_background_is_none() {
        let mut settings = Settings::default();
        assert_eq!(settings.background(), None);
        settings.background_url = " https://example.com/bg.png ".to_string();
        assert_eq!(settings.background(), Some("https://example.com/bg.png"));
    }
}
