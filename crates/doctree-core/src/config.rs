//! Configuration for doctree
//!
//! Stored in .doctree/config.toml

use serde::{Deserialize, Serialize};
use std::path::Path;

/// doctree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document ID prefix (e.g., "doc", "myproject")
    pub prefix: String,

    /// Default document type for new nodes
    pub default_type: String,

    /// Versions to retain when pruning history
    pub keep_versions: usize,

    /// Editor command for editing document content
    pub editor: Option<String>,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "doc".to_string(),
            default_type: "task".to_string(),
            keep_versions: 20,
            editor: None,
            display: DisplayConfig::default(),
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use colors in output
    pub colors: bool,

    /// Date format for display
    pub date_format: String,

    /// Maximum title length before truncation
    pub max_title_length: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            date_format: "%Y-%m-%d %H:%M".to_string(),
            max_title_length: 80,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Other(format!("Invalid config: {}", e)))?;
        Ok(config)
    }

    /// Render this config as a commented TOML file; written by store init
    pub fn with_comments(&self) -> String {
        format!(
            r#"# doctree configuration

# Document ID prefix (e.g., "doc", "myproject")
prefix = "{prefix}"

# Default document type (feature_list, architecture, tech_design, background,
# requirements, meeting, task)
default_type = "{default_type}"

# Versions to retain when pruning history
keep_versions = {keep_versions}

# Editor command for editing document content (uses $EDITOR if not set)
# editor = "vim"

[display]
# Use colors in output
colors = {colors}

# Date format for display (strftime format)
date_format = "{date_format}"

# Maximum title length before truncation
max_title_length = {max_title_length}
"#,
            prefix = self.prefix,
            default_type = self.default_type,
            keep_versions = self.keep_versions,
            colors = self.display.colors,
            date_format = self.display.date_format,
            max_title_length = self.display.max_title_length,
        )
    }
}
