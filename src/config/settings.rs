//! Application settings loaded from `config.toml`.
//!
//! The file names the branch this instance serves, the formas de pago to seed
//! and the default expected prices used by the rinde calculator.

use crate::{
    core::medio::Medio,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the settings file location
pub const CONFIG_PATH_VAR: &str = "TESORERO_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Branch used when a command does not name one
    #[serde(default = "default_sucursal")]
    pub sucursal_id: i64,
    /// Formas de pago to seed
    #[serde(default)]
    pub formas_pago: Vec<FormaPagoConfig>,
    /// Default rinde prices
    #[serde(default)]
    pub rinde: RindePrecios,
}

/// One forma de pago to seed
#[derive(Debug, Clone, Deserialize)]
pub struct FormaPagoConfig {
    /// Display name
    pub nombre: String,
    /// Medio; inferred from the name when omitted
    #[serde(default)]
    pub medio: Option<Medio>,
}

/// Expected price per kilogram for each category
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RindePrecios {
    /// Novillo
    #[serde(default)]
    pub precio_novillo: Decimal,
    /// Vaca, at export price
    #[serde(default)]
    pub precio_exportacion: Decimal,
    /// Cerdo
    #[serde(default)]
    pub precio_cerdo: Decimal,
}

const fn default_sucursal() -> i64 {
    1
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid,
/// or a required field is missing.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading settings from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_settings(&contents)
}

/// Parses settings from TOML text
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `$TESORERO_CONFIG`, or `./config.toml` when unset
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    load_settings(path)
}
