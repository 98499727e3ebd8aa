//! TOML-backed configuration for the Silica synthesis pipeline.
//!
//! A [`SynthConfig`] collects the knobs of the optimization and mapping
//! passes. Every field has a default, so an empty file (or no file) is a
//! valid configuration; loading validates ranges and reports typed
//! errors.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// The offending path.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML failed to parse or deserialize.
    #[error("cannot parse config {path}: {message}")]
    Parse {
        /// The offending path.
        path: String,
        /// The parser's message.
        message: String,
    },

    /// A field value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rewriter pass options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Maximum cut size.
    pub cut_size: usize,
    /// Maximum cuts stored per node.
    pub max_cuts: usize,
    /// Maximum arity of resynthesized cells.
    pub max_arity: u16,
    /// Commit zero-gain rewrites as well.
    pub zero_cost: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            cut_size: 4,
            max_cuts: 16,
            max_arity: 2,
            zero_cost: false,
        }
    }
}

/// Mapper options: cut bounds, retry budget, and the criterion.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Maximum cut size.
    pub cut_size: usize,
    /// Maximum cuts stored per node.
    pub max_cuts: usize,
    /// Mapping attempts before the forced final pass.
    pub max_tries: u32,
    /// Enables early-recovery restarts.
    pub recovery: bool,
    /// Area bound (unset means unconstrained).
    pub max_area: Option<f32>,
    /// Delay bound.
    pub max_delay: Option<f32>,
    /// Power bound.
    pub max_power: Option<f32>,
    /// Highest-priority dimension: `"area"`, `"delay"`, or `"power"`.
    pub primary: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cut_size: 4,
            max_cuts: 16,
            max_tries: 4,
            recovery: true,
            max_area: None,
            max_delay: None,
            max_power: None,
            primary: "area".into(),
        }
    }
}

/// The whole pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    /// Rewriter options.
    pub rewrite: RewriteConfig,
    /// Mapper options.
    pub map: MapConfig,
}

impl SynthConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file; a missing path yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rewrite.cut_size < 2 || self.map.cut_size < 2 {
            return Err(ConfigError::Invalid("cut_size must be at least 2".into()));
        }
        if self.rewrite.max_arity < 2 {
            return Err(ConfigError::Invalid("max_arity must be at least 2".into()));
        }
        if self.map.max_tries == 0 {
            return Err(ConfigError::Invalid("max_tries must be positive".into()));
        }
        if !matches!(self.map.primary.as_str(), "area" | "delay" | "power") {
            return Err(ConfigError::Invalid(format!(
                "unknown priority dimension `{}`",
                self.map.primary
            )));
        }
        for (name, bound) in [
            ("max_area", self.map.max_area),
            ("max_delay", self.map.max_delay),
            ("max_power", self.map.max_power),
        ] {
            if let Some(value) = bound {
                if value.is_nan() || value <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must be positive, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}
