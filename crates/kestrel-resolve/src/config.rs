//! Resolver configuration.
//!
//! The resolver reads an optional `[resolver]` table from the project
//! manifest. Every key has a default, so an empty manifest is valid:
//!
//! ```toml
//! [resolver]
//! initial_capacity = 256
//! max_load_factor = 0.5
//! warn_on_shadowing = true
//! builtin_types = ["int", "bool"]
//! ```

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

/// Tuning knobs and language defaults for a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Bucket count the symbol table starts with; rounded up to a power of two.
    pub initial_capacity: usize,

    /// Fraction of claimed buckets above which the table doubles.
    pub max_load_factor: f64,

    /// Emit a warning whenever a local declaration shadows an outer one.
    pub warn_on_shadowing: bool,

    /// Names declared as builtin types in the global scope.
    pub builtin_types: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 128,
            max_load_factor: 0.75,
            warn_on_shadowing: false,
            builtin_types: default_builtin_types(),
        }
    }
}

pub fn default_builtin_types() -> Vec<String> {
    ["int", "float", "bool", "string", "void"].iter().map(|s| s.to_string()).collect()
}

impl ResolverConfig {
    /// Parse the `[resolver]` table of a TOML manifest and validate it.
    ///
    /// Other tables in the manifest are ignored.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let manifest: toml::Table = toml::from_str(source)?;
        let config: Self = match manifest.get("resolver") {
            Some(table) => table.clone().try_into()?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.initial_capacity));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(ConfigError::InvalidLoadFactor(self.max_load_factor));
        }
        Ok(())
    }

    /// The bucket count the symbol table actually starts with.
    pub fn bucket_capacity(&self) -> usize {
        self.initial_capacity.max(2).next_power_of_two()
    }
}

/// Errors produced while loading a [`ResolverConfig`].
#[derive(Debug, Error, Diagnostic, Clone, PartialEq)]
pub enum ConfigError {
    /// The manifest is not valid TOML or a key has the wrong type.
    #[error("Invalid resolver configuration: {0}")]
    #[diagnostic(
        code(kestrel_resolve::config_parse),
        help("check the `[resolver]` table of the manifest")
    )]
    Parse(String),

    #[error("Invalid initial capacity {0}: the symbol table needs at least one bucket")]
    #[diagnostic(code(kestrel_resolve::config_capacity))]
    InvalidCapacity(usize),

    #[error("Invalid load factor {0}: expected a value strictly between 0 and 1")]
    #[diagnostic(
        code(kestrel_resolve::config_load_factor),
        help("a full table would make lookups of missing names loop forever")
    )]
    InvalidLoadFactor(f64),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
