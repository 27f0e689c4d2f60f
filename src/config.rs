//! Configuration for the validation engine and the `attr-validate` CLI
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (validations.toml)
//! - Environment variables (VALIDATIONS__*)
//!
//! ## Example config file (validations.toml):
//! ```toml
//! [engine]
//! non_text = "reject"
//! date_pattern = '^\d{4}-\d{2}-\d{2}$'
//!
//! [output]
//! format = "compact"
//! quiet = false
//!
//! [input]
//! schema = "schemas/person.json"
//! extensions = ["json"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::compiler::CompileOptions;
use crate::rules::NonTextPolicy;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationsConfig {
    /// Rule binding settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Record discovery settings
    #[serde(default)]
    pub input: InputConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How pattern, format, email and url rules treat non-string values
    #[serde(default)]
    pub non_text: NonTextPolicy,

    /// Replacement regex for `format: "date"`
    #[serde(default)]
    pub date_pattern: Option<String>,
}

impl EngineConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            non_text: self.non_text,
            date_pattern: self.date_pattern.clone(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,

    /// Only report invalid records
    #[serde(default)]
    pub quiet: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Schema used when none is given on the command line
    #[serde(default)]
    pub schema: Option<PathBuf>,

    /// File extensions picked up when walking directories
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            schema: None,
            extensions: default_extensions(),
        }
    }
}

impl InputConfig {
    /// Whether a walked file should be read as a record
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }
}

impl ValidationsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "validations.toml",
            ".validations.toml",
            "config/validations.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "attr-validations", "validations") {
            let xdg_config = config_dir.config_dir().join("validations.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // VALIDATIONS__ENGINE__NON_TEXT=reject
        builder = builder.add_source(
            Environment::with_prefix("VALIDATIONS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
