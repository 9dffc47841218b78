use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

use crate::render::OutputFormat;

/// Main configuration structure for nutrichef
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AI provider configurations
    #[serde(default)]
    pub ai_providers: AIProvidersConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIProvidersConfig {
    /// Gemini configuration
    pub gemini: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature setting
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Request deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// API root, without the `/models/...` path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overrides GEMINI_API_KEY when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while a request is outstanding
    #[serde(default = "default_spinner")]
    pub spinner: bool,

    /// Output format ("terminal", "json", "plain")
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Characters of a request shown in `/history`
    #[serde(default = "default_history_summary_width")]
    pub history_summary_width: usize,
}

// Default value functions
fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_output_tokens() -> usize { 250 }
fn default_timeout_ms() -> u64 { 5000 }
fn default_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_colorful() -> bool { true }
fn default_spinner() -> bool { true }
fn default_history_summary_width() -> usize { crate::history::DEFAULT_SUMMARY_WIDTH }

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            enabled: true,
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_ms: default_timeout_ms(),
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            spinner: default_spinner(),
            output_format: OutputFormat::default(),
            history_summary_width: default_history_summary_width(),
        }
    }
}

impl Default for AIProvidersConfig {
    fn default() -> Self {
        AIProvidersConfig {
            gemini: Some(ProviderConfig::default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ai_providers: AIProvidersConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let default_paths = [
            "nutrichef.toml",
            ".nutrichef.toml",
            "~/.config/nutrichef/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Gemini settings, if the provider is configured and enabled
    pub fn gemini(&self) -> Option<&ProviderConfig> {
        self.ai_providers.gemini.as_ref().filter(|p| p.enabled)
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool, format: Option<OutputFormat>) {
        if headless {
            self.ui.colorful = false;
            self.ui.spinner = false;
        }
        if let Some(format) = format {
            self.ui.output_format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_generation_settings() {
        let config = Config::default();
        let gemini = config.gemini().unwrap();
        assert_eq!(gemini.model, "gemini-2.0-flash");
        assert_eq!(gemini.temperature, 0.7);
        assert_eq!(gemini.max_output_tokens, 250);
        assert_eq!(gemini.timeout_ms, 5000);
        assert_eq!(config.ui.history_summary_width, 50);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ai_providers.gemini]
            enabled = true
            temperature = 0.2

            [ui]
            output_format = "json"
            "#,
        )
        .unwrap();
        let gemini = config.gemini().unwrap();
        assert_eq!(gemini.temperature, 0.2);
        assert_eq!(gemini.max_output_tokens, 250);
        assert_eq!(config.ui.output_format, OutputFormat::Json);
        assert!(config.ui.colorful);
    }

    #[test]
    fn test_disabled_provider_is_hidden() {
        let config: Config = toml::from_str(
            r#"
            [ai_providers.gemini]
            enabled = false
            "#,
        )
        .unwrap();
        assert!(config.gemini().is_none());
    }

    #[test]
    fn test_headless_disables_decorations() {
        let mut config = Config::default();
        config.merge_with_args(true, Some(OutputFormat::Plain));
        assert!(!config.ui.colorful);
        assert!(!config.ui.spinner);
        assert_eq!(config.ui.output_format, OutputFormat::Plain);
    }
}
