//! Engine configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by a sparse user file in the config directory.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [history]
//! capacity = 8                  # Recent topics kept (1-64)
//! storage_key = "aiwiki:history"
//!
//! [cover]
//! excerpt_chars = 260           # Lead characters quoted in the image prompt
//! count = 1                     # Images requested per cover (1-2)
//!
//! [stream]
//! chunk_size = 24               # Replay fragment size in chars
//!
//! [render]
//! link_prefix = "/visit/"       # Path prefix for internal topic links
//!
//! [colors.light]
//! background = "#fbfaf7"
//! text = "#1c1b22"
//! text_muted = "#6b6878"
//! border = "#e4e1ea"
//! link = "#1a4fd6"
//! accent = "#f4f0ff"
//!
//! [colors.dark]
//! background = "#0b0b10"
//! text = "#ececf1"
//! text_muted = "#9a9aa8"
//! border = "#2c2c36"
//! link = "#8fb0ff"
//! accent = "#1d1830"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::navigation::DEFAULT_HISTORY_CAPACITY;
use crate::storage::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const MAX_HISTORY_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtConfig {
    /// Recent-topic history.
    pub history: HistoryConfig,
    /// Cover image requests.
    pub cover: CoverConfig,
    /// Offline replay streaming.
    pub stream: StreamConfig,
    /// HTML rendering.
    pub render: RenderConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl NewtConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HISTORY_CAPACITY).contains(&self.history.capacity) {
            return Err(ConfigError::Validation(format!(
                "history.capacity must be 1-{MAX_HISTORY_CAPACITY}"
            )));
        }
        if self.history.storage_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "history.storage_key must not be empty".into(),
            ));
        }
        if !(1..=2).contains(&self.cover.count) {
            return Err(ConfigError::Validation("cover.count must be 1-2".into()));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "stream.chunk_size must be at least 1".into(),
            ));
        }
        if !self.render.link_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "render.link_prefix must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    /// Lead characters quoted as prompt context.
    pub excerpt_chars: usize,
    /// Images requested per cover.
    pub count: u8,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: 260,
            count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Fragment size in chars when replaying stored content.
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { chunk_size: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Internal topic links become `<link_prefix><encoded topic>`.
    pub link_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            link_prefix: "/visit/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    pub text_muted: String,
    pub border: String,
    pub link: String,
    /// Chips, cover placeholder, highlighted sections.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#fbfaf7".to_string(),
            text: "#1c1b22".to_string(),
            text_muted: "#6b6878".to_string(),
            border: "#e4e1ea".to_string(),
            link: "#1a4fd6".to_string(),
            accent: "#f4f0ff".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0b0b10".to_string(),
            text: "#ececf1".to_string(),
            text_muted: "#9a9aa8".to_string(),
            border: "#2c2c36".to_string(),
            link: "#8fb0ff".to_string(),
            accent: "#1d1830".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(NewtConfig::default())?)
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `config.toml` from `dir` without applying defaults.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<NewtConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: NewtConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config for `dir`: stock defaults overlaid with
/// `dir/config.toml` when it exists.
pub fn load_config(dir: &Path) -> Result<NewtConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// A fully commented stock `config.toml`, printed by `newt gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Newt Configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Recent-topic history
# ---------------------------------------------------------------------------
[history]
# Number of recent topics kept, most recent first (1-64).
capacity = 8

# Key the history list is stored under.
storage_key = "aiwiki:history"

# ---------------------------------------------------------------------------
# Cover images
# ---------------------------------------------------------------------------
[cover]
# Characters of the lead paragraph quoted as prompt context.
excerpt_chars = 260

# Images requested per cover (1-2). The first one is shown.
count = 1

# ---------------------------------------------------------------------------
# Replay streaming
# ---------------------------------------------------------------------------
[stream]
# Fragment size in chars when replaying stored pages.
chunk_size = 24

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Internal topic links point at <link_prefix><encoded topic>.
link_prefix = "/visit/"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#fbfaf7"
text = "#1c1b22"
text_muted = "#6b6878"    # Chips, captions, status lines
border = "#e4e1ea"
link = "#1a4fd6"
accent = "#f4f0ff"        # Cover placeholder, hero band

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0b0b10"
text = "#ececf1"
text_muted = "#9a9aa8"
border = "#2c2c36"
link = "#8fb0ff"
accent = "#1d1830"
"##
}

/// CSS custom properties for both color schemes.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-link: {light_link};
    --color-accent: {light_accent};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-link: {dark_link};
        --color-accent: {dark_accent};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_link = colors.light.link,
        light_accent = colors.light.accent,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_link = colors.dark.link,
        dark_accent = colors.dark.accent,
    )
}
