//! Editor configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::DEFAULT_TAB_WIDTH;
use crate::search::DEFAULT_SCAN_GUARD;
use crate::viewport::DEFAULT_VERTICAL_THRESHOLD;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    /// The TOML text could not be parsed.
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    /// A value is out of range.
    Invalid(&'static str),
}

/// Settings shared by every view of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tab stop distance, in cells.
    pub tab_width: usize,
    /// Screen lines kept between the cursor and the top/bottom edge.
    pub vertical_threshold: usize,
    /// Insert spaces instead of a tab character.
    pub soft_tab: bool,
    /// Copy the current row's indentation when inserting a newline.
    pub auto_indent: bool,
    /// Matches scanned within one row between cancellation checks.
    pub search_scan_guard: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            vertical_threshold: DEFAULT_VERTICAL_THRESHOLD,
            soft_tab: false,
            auto_indent: true,
            search_scan_guard: DEFAULT_SCAN_GUARD,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::Invalid("tab_width must be at least 1"));
        }
        if self.search_scan_guard == 0 {
            return Err(ConfigError::Invalid("search_scan_guard must be at least 1"));
        }
        Ok(())
    }
}
