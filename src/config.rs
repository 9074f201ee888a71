//! TOML-based configuration.
//!
//! Named connection profiles plus the path of the native engine library,
//! with `${ENV_VAR}` expansion applied before parsing so secrets stay out of
//! the file itself.
//!
//! Example configuration:
//! ```toml
//! library = "./native/mssql_engine.dll"
//!
//! [connections.production]
//! host = "db.example.com"
//! port = 1433
//! instance = "MSSQLSERVER"
//! database = "orders"
//! user = "app"
//! password = "${MSSQL_PASSWORD}"
//! trustCert = true
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::worker::protocol::ConnectOptions;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named connection profiles.
    pub connections: HashMap<String, ConnectOptions>,

    /// Path to the native engine library.
    pub library: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse settings from TOML text, expanding `${VAR}` references first.
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        let expanded = expand_env_vars(raw)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Look up a named connection profile.
    pub fn connection(&self, name: &str) -> Result<&ConnectOptions, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }
}

/// Expand `${VAR}` environment references in a string. A `$` not followed by
/// `{` is kept as-is.
fn expand_env_vars(raw: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();
        let mut name = String::new();
        for ch in chars.by_ref() {
            if ch == '}' {
                break;
            }
            name.push(ch);
        }
        let value = env::var(&name).map_err(|_| SettingsError::MissingEnvVar(name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
