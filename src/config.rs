use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::transcript::{ParseOptions, SizeLimit, TextContentOptions, DEFAULT_MAX_SIZE};

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub text_content: TextContentOptions,
}

/// `[parser]` section.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserConfig {
    /// Size bound in bytes; 0 disables it.
    /// Default: 16 MiB
    pub max_size: usize,
    /// One of "truncate", "reject", "ignore".
    /// Default: "truncate"
    pub size_limit: SizeLimit,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            size_limit: SizeLimit::default(),
        }
    }
}

impl Config {
    /// Load configuration from ~/.config/turnscribe/config.toml
    ///
    /// - File missing: returns default config (Ok)
    /// - File exists but invalid TOML: returns Err so caller can show warning
    /// - Field missing: uses its default
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, with the same fallbacks as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_size: self.parser.max_size,
            size_limit: self.parser.size_limit,
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|d| d.join(".config").join("turnscribe").join("config.toml"))
    }
}
