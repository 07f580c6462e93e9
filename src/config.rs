//! Engine configuration.
//!
//! Handles loading, validating, and merging `respimg.toml` files. User
//! config is sparse: stock defaults are the base layer and a config file
//! overrides only the keys it names. Unknown keys are rejected to catch
//! typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! available_widths = [160, 320, 640, 1440]  # Candidate asset widths
//! selector = ".responsive-image"            # Locates raw placeholders
//! class_name = "image-replace"              # Marks pending replacements
//! retina = true                             # Double widths on dense displays
//! debounce = true                           # Debounce resize notifications
//! interval_ms = 200                         # Debounce interval
//! preload = false                           # Load assets before swapping
//! css_background = false                    # Background-swap mode
//!
//! [events]
//! enabled = false       # Announce engine notifications
//! bubble = true
//! cancelable = true
//! retina = true         # Announce density recomputations
//! ```
//!
//! The URL-template `pattern` is also configurable for servers whose
//! endpoints deviate from the default `/image/...` scheme; it must be a
//! valid capture-group pattern (see [`crate::rewrite`]).

use crate::rewrite::{DEFAULT_PATTERN, SourcePattern};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("URL pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration.
///
/// All fields have documented defaults. User config files need only
/// specify the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Candidate asset widths, conventionally ascending. Must be
    /// non-empty with every entry positive; ascending order is not
    /// enforced.
    pub available_widths: Vec<u32>,
    /// Selector locating raw placeholder nodes.
    pub selector: String,
    /// Class marking nodes ready for replacement. Stored with or without
    /// a leading dot; [`class_selector`](Self::class_selector) and
    /// [`class_attribute`](Self::class_attribute) normalize both ways.
    pub class_name: String,
    /// URL-template capture pattern (see [`crate::rewrite`]).
    pub pattern: String,
    /// Double the selected width on high-density displays.
    pub retina: bool,
    /// Debounce resize notifications.
    pub debounce: bool,
    /// Debounce interval in milliseconds.
    pub interval_ms: u64,
    /// Defer each swap until the asset has finished loading.
    pub preload: bool,
    /// Write `background-image` styles in place instead of swapping
    /// placeholder nodes.
    pub css_background: bool,
    /// Notification settings.
    pub events: EventsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            available_widths: vec![160, 320, 640, 1440],
            selector: ".responsive-image".to_string(),
            class_name: "image-replace".to_string(),
            pattern: DEFAULT_PATTERN.to_string(),
            retina: true,
            debounce: true,
            interval_ms: 200,
            preload: false,
            css_background: false,
            events: EventsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// The replacement class as a selector: exactly one leading dot.
    pub fn class_selector(&self) -> String {
        format!(".{}", self.class_name.trim_start_matches('.'))
    }

    /// The replacement class as written to node class attributes: no dot.
    pub fn class_attribute(&self) -> &str {
        self.class_name.trim_start_matches('.')
    }

    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.available_widths.is_empty() {
            return Err(ConfigError::Validation(
                "available_widths must not be empty".into(),
            ));
        }
        if self.available_widths.iter().any(|&w| w == 0) {
            return Err(ConfigError::Validation(
                "available_widths entries must be positive".into(),
            ));
        }
        if self.selector.trim().is_empty() {
            return Err(ConfigError::Validation("selector must not be empty".into()));
        }
        if self.class_attribute().is_empty() {
            return Err(ConfigError::Validation(
                "class_name must not be empty".into(),
            ));
        }
        if self.debounce && self.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "interval_ms must be positive when debounce is enabled".into(),
            ));
        }
        SourcePattern::compile(&self.pattern)?;
        Ok(())
    }
}

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Master switch; nothing is announced while false.
    pub enabled: bool,
    /// Delivery flag copied onto every notification.
    pub bubble: bool,
    /// Delivery flag copied onto every notification.
    pub cancelable: bool,
    /// Announce density recomputations (`retinaStatus`).
    pub retina: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bubble: true,
            cancelable: true,
            retina: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EngineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# respimg Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Each file only needs the keys it
# wants to override. Unknown keys will cause an error.

# Candidate asset widths. The engine picks the smallest candidate at
# least as wide as a placeholder's rendered width.
available_widths = [160, 320, 640, 1440]

# Selector locating raw placeholder nodes.
selector = ".responsive-image"

# Class marking nodes that are ready for replacement (with or without a
# leading dot).
class_name = "image-replace"

# URL-template capture pattern. Capture groups, in order:
# mode, width, height, crop (optional), background (optional), path.
pattern = '(?i)/image/(\d)/(\d+)/(\d+)/?(\d)?/?([0-9a-fA-F]{3,6})?/?(.+)$'

# Double the selected width on high-density ("retina") displays.
retina = true

# Debounce resize notifications, collapsing bursts to one pass per
# interval.
debounce = true
interval_ms = 200

# Defer each swap until the asset has finished loading.
preload = false

# Write background-image styles in place instead of swapping placeholder
# nodes.
css_background = false

# ---------------------------------------------------------------------------
# Notifications
# ---------------------------------------------------------------------------
[events]
# Announce engine notifications (startReplacement, imageUpdated,
# retinaStatus).
enabled = false

# Delivery flags copied onto every notification.
bubble = true
cancelable = true

# Announce density recomputations.
retina = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.available_widths, vec![160, 320, 640, 1440]);
        assert_eq!(config.selector, ".responsive-image");
        assert_eq!(config.class_name, "image-replace");
        assert_eq!(config.pattern, DEFAULT_PATTERN);
        assert!(config.retina);
        assert!(config.debounce);
        assert_eq!(config.interval_ms, 200);
        assert!(!config.preload);
        assert!(!config.css_background);
        assert!(!config.events.enabled);
        assert!(config.events.bubble);
        assert!(config.events.cancelable);
        assert!(config.events.retina);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
available_widths = [400, 800]
preload = true
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.available_widths, vec![400, 800]);
        assert!(config.preload);
        // Defaults preserved
        assert_eq!(config.selector, ".responsive-image");
        assert_eq!(config.interval_ms, 200);
    }

    #[test]
    fn parse_events_section() {
        let toml = r#"
[events]
enabled = true
bubble = false
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert!(config.events.enabled);
        assert!(!config.events.bubble);
        assert!(config.events.cancelable);
    }

    // =========================================================================
    // Class normalization
    // =========================================================================

    #[test]
    fn class_selector_gets_exactly_one_dot() {
        let mut config = EngineConfig::default();
        assert_eq!(config.class_selector(), ".image-replace");

        config.class_name = ".image-replace".to_string();
        assert_eq!(config.class_selector(), ".image-replace");

        config.class_name = "...image-replace".to_string();
        assert_eq!(config.class_selector(), ".image-replace");
    }

    #[test]
    fn class_attribute_has_no_dot() {
        let mut config = EngineConfig::default();
        assert_eq!(config.class_attribute(), "image-replace");

        config.class_name = ".image-replace".to_string();
        assert_eq!(config.class_attribute(), "image-replace");
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_widths() {
        let mut config = EngineConfig::default();
        config.available_widths = vec![];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("available_widths"));
    }

    #[test]
    fn validate_zero_width() {
        let mut config = EngineConfig::default();
        config.available_widths = vec![160, 0, 640];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_empty_selector() {
        let mut config = EngineConfig::default();
        config.selector = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_dot_only_class_name() {
        let mut config = EngineConfig::default();
        config.class_name = ".".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_interval_with_debounce() {
        let mut config = EngineConfig::default();
        config.interval_ms = 0;
        assert!(config.validate().is_err());

        config.debounce = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_bad_pattern() {
        let mut config = EngineConfig::default();
        config.pattern = "(unclosed".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Pattern(_))));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str("prelod = true");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_events_key_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str(
            r#"
[events]
bublbe = true
"#,
        );
        assert!(result.is_err());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("interval_ms = 200").unwrap();
        let overlay: toml::Value = toml::from_str("interval_ms = 50").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("interval_ms").unwrap().as_integer(), Some(50));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("retina = true\npreload = false").unwrap();
        let overlay: toml::Value = toml::from_str("preload = true").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("retina").unwrap().as_bool(), Some(true));
        assert_eq!(merged.get("preload").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn merge_toml_nested_table() {
        let base: toml::Value = toml::from_str(
            r#"
[events]
enabled = false
bubble = true
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[events]
enabled = true
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let events = merged.get("events").unwrap();
        assert_eq!(events.get("enabled").unwrap().as_bool(), Some(true));
        assert_eq!(events.get("bubble").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn merge_toml_array_replaces_entirely() {
        let base: toml::Value = toml::from_str("available_widths = [160, 320]").unwrap();
        let overlay: toml::Value = toml::from_str("available_widths = [800]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged
                .get("available_widths")
                .unwrap()
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    // =========================================================================
    // load_config
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("respimg.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("respimg.toml");
        std::fs::write(
            &path,
            r#"
available_widths = [96, 640]
retina = false
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.available_widths, vec![96, 640]);
        assert!(!config.retina);
        assert_eq!(config.selector, ".responsive-image");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("respimg.toml");
        std::fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("respimg.toml");
        std::fs::write(&path, "available_widths = []").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("respimg.toml");
        std::fs::write(&path, "not_an_option = 1").unwrap();
        assert!(load_config(&path).is_err());
    }

    // =========================================================================
    // resolve_config / stock config
    // =========================================================================

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str("css_background = true").unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert!(config.css_background);
        assert_eq!(config.available_widths, vec![160, 320, 640, 1440]);
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("available_widths = [0]").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EngineConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.get("available_widths").is_some());
        assert!(val.get("pattern").is_some());
        assert!(val.get("events").is_some());
    }
}
